use std::fmt;

use tracing::debug;

use crate::error::{EcsError, Result};

/// Low bits of an entity handle holding the slot index.
pub const INDEX_BITS: u32 = 20;
/// High bits of an entity handle holding the recycle count.
pub const VERSION_BITS: u32 = u32::BITS - INDEX_BITS;
/// Number of addressable entity slots.
pub const MAX_ENTITIES: u32 = 1 << INDEX_BITS;
/// Highest version a slot can reach before it is retired.
pub const MAX_VERSION: u32 = (1 << VERSION_BITS) - 1;

const INDEX_MASK: u32 = MAX_ENTITIES - 1;

/// A versioned entity handle: slot index in the low bits, version in the high bits.
///
/// Two handles name the same entity only if both fields match. A handle whose
/// version is older than its slot's refers to a destroyed entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(u32);

impl Entity {
    pub(crate) fn new(index: u32, version: u32) -> Self {
        debug_assert!(index < MAX_ENTITIES && version <= MAX_VERSION);
        Self((version << INDEX_BITS) | index)
    }

    /// Rebuild an entity from its packed representation.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The packed representation.
    pub fn to_bits(self) -> u32 {
        self.0
    }

    /// The slot index of this entity.
    pub fn index(self) -> u32 {
        self.0 & INDEX_MASK
    }

    /// How many times the slot had been recycled when this handle was issued.
    pub fn version(self) -> u32 {
        self.0 >> INDEX_BITS
    }

    /// Same slot, next version. `None` once the version field is exhausted.
    fn next_version(self) -> Option<Entity> {
        let version = self.version();
        (version < MAX_VERSION).then(|| Entity::new(self.index(), version + 1))
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index(), self.version())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.version())
    }
}

/// Allocates and recycles entity slots.
///
/// Destroyed slots keep their index; the bumped handle waits on a LIFO free list
/// and is handed out by the next [`create`](EntityManager::create).
pub struct EntityManager {
    /// Current handle per slot: the live entity, or the next one to hand out.
    slots: Vec<Entity>,
    alive: Vec<bool>,
    free_list: Vec<Entity>,
    limit: u32,
    len: usize,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::with_limit(MAX_ENTITIES, 0)
    }

    /// A manager that refuses to allocate more than `limit` slots.
    pub fn with_limit(limit: u32, capacity: usize) -> Self {
        let limit = limit.min(MAX_ENTITIES);
        let capacity = capacity.min(limit as usize);
        Self {
            slots: Vec::with_capacity(capacity),
            alive: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            limit,
            len: 0,
        }
    }

    /// Allocate an entity, reusing the most recently freed slot if there is one.
    pub fn create(&mut self) -> Result<Entity> {
        if let Some(entity) = self.free_list.pop() {
            self.alive[entity.index() as usize] = true;
            self.len += 1;
            return Ok(entity);
        }

        let index = self.slots.len() as u32;
        if index >= self.limit {
            debug!("Entity capacity of {} slots exhausted", self.limit);
            return Err(EcsError::CapacityExceeded { limit: self.limit });
        }
        let entity = Entity::new(index, 0);
        self.slots.push(entity);
        self.alive.push(true);
        self.len += 1;
        Ok(entity)
    }

    /// Destroy an entity. Returns `false` if it was not alive.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.alive(entity) {
            return false;
        }
        let idx = entity.index() as usize;
        self.alive[idx] = false;
        self.len -= 1;

        match entity.next_version() {
            Some(next) => {
                self.slots[idx] = next;
                self.free_list.push(next);
            }
            None => debug!("Retiring entity slot {} after {} reuses", idx, MAX_VERSION),
        }
        true
    }

    /// Whether the handle names the entity currently occupying its slot.
    pub fn alive(&self, entity: Entity) -> bool {
        let idx = entity.index() as usize;
        idx < self.slots.len() && self.alive[idx] && self.slots[idx] == entity
    }

    /// Iterate over every live entity in slot order.
    pub fn live(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots
            .iter()
            .zip(self.alive.iter())
            .filter_map(|(&entity, &alive)| alive.then_some(entity))
    }

    /// Forget every slot and free-list entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.alive.clear();
        self.free_list.clear();
        self.len = 0;
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever allocated, live or not.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl Default for EntityManager {
    fn default() -> Self {
        Self::new()
    }
}
