use std::any::TypeId;
use std::collections::HashMap;

use sable_core::Cursor;
use tracing::{debug, trace, warn};

use crate::changes::ChangeLedger;
use crate::component::{Bundle, Component};
use crate::composition::Composition;
use crate::config::WorldConfig;
use crate::entity::{Entity, EntityManager};
use crate::error::{EcsError, Result};
use crate::filter::Filter;
use crate::query::{Query, QueryBuilder, QueryCache, QueryEvent, QueryId};
use crate::registry::{ComponentId, ComponentRegistry};
use crate::storage::{ComponentStorage, Storage, StorageMut};

/// The central ECS container. Owns all entities, component storages, and queries.
///
/// A frame consists of any number of structural changes followed by exactly one
/// [`update`](World::update). Queries only reflect changes made before the
/// most recent update.
pub struct World {
    config: WorldConfig,
    entities: EntityManager,
    changes: ChangeLedger,
    registry: ComponentRegistry,
    storages: HashMap<TypeId, Box<dyn ComponentStorage>>,
    queries: QueryCache,
    ticks: u64,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    pub fn with_config(config: WorldConfig) -> Self {
        let entities = EntityManager::with_limit(config.entity_limit(), config.initial_capacity);
        Self {
            config,
            entities,
            changes: ChangeLedger::new(),
            registry: ComponentRegistry::new(),
            storages: HashMap::new(),
            queries: QueryCache::new(),
            ticks: 0,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ---- Entity management ----

    /// Create an entity with no components.
    pub fn spawn(&mut self) -> Result<Entity> {
        let entity = self.entities.create()?;
        self.changes.touch(entity);
        Ok(entity)
    }

    /// Create an entity and attach every component in `bundle`.
    ///
    /// Component types are registered before the entity is allocated, so a
    /// failure leaves no entity behind.
    ///
    /// # Example
    /// ```
    /// # use sable_ecs::World;
    /// struct Position(f32, f32);
    /// struct Velocity(f32, f32);
    ///
    /// let mut world = World::new();
    /// let entity = world.insert((Position(0.0, 0.0), Velocity(1.0, 0.0))).unwrap();
    /// assert!(world.alive(entity));
    /// ```
    pub fn insert<B: Bundle>(&mut self, bundle: B) -> Result<Entity> {
        B::register(&mut self.registry)?;
        let entity = self.spawn()?;
        bundle.insert_into(self, entity)?;
        Ok(entity)
    }

    /// Destroy an entity. Returns `false` if it was already dead.
    ///
    /// Component storages keep the entity's entries until they are removed or
    /// overwritten by the slot's next occupant; the dead handle can no longer
    /// add anything new.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.entities.destroy(entity) {
            return false;
        }
        self.changes.destroy(entity);
        true
    }

    pub fn alive(&self, entity: Entity) -> bool {
        self.entities.alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Iterate over every live entity.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.live()
    }

    /// The entity's current component set.
    pub fn composition(&self, entity: Entity) -> Composition {
        self.changes.composition(entity)
    }

    // ---- Component management ----

    /// Component id for `T`, registering it on first use.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId> {
        self.registry.register::<T>()
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Mutable access to the storage for `T`, creating it on first use.
    pub fn storage<T: Component>(&mut self) -> Result<StorageMut<'_, T>> {
        let id = self.registry.register::<T>()?;
        let storage = self
            .storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Storage::<T>::new(id)))
            .as_any_mut()
            .downcast_mut::<Storage<T>>()
            .expect("component type mismatch");
        Ok(StorageMut {
            storage,
            changes: &mut self.changes,
            entities: &self.entities,
        })
    }

    /// Read-only access to the storage for `T`, if one exists.
    pub fn storage_ref<T: Component>(&self) -> Option<&Storage<T>> {
        self.storages
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<Storage<T>>())
    }

    /// Shorthand for reading one component.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage_ref::<T>()?.try_get(entity)
    }

    /// Whether the entity owns a `T`.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.storage_ref::<T>().is_some_and(|s| s.has(entity))
    }

    // ---- Queries ----

    /// Start declaring a query.
    ///
    /// # Example
    /// ```
    /// # use sable_ecs::World;
    /// struct Position;
    /// struct Frozen;
    ///
    /// let mut world = World::new();
    /// let movers = world.query().contains::<Position>().excludes::<Frozen>().build().unwrap();
    /// assert!(world.query_by_id(movers).unwrap().is_empty());
    /// ```
    pub fn query(&mut self) -> QueryBuilder<'_> {
        QueryBuilder {
            registry: &mut self.registry,
            entities: &self.entities,
            changes: &self.changes,
            cache: &mut self.queries,
            filter: Filter::default(),
            error: None,
        }
    }

    pub fn query_by_id(&self, id: QueryId) -> Result<&Query> {
        self.queries.get(id).ok_or(EcsError::UnknownQuery(id))
    }

    /// Matching entities of a cached query.
    pub fn query_entities(&self, id: QueryId) -> Result<&[Entity]> {
        self.query_by_id(id).map(Query::entities)
    }

    pub fn queries(&self) -> &QueryCache {
        &self.queries
    }

    /// Start receiving membership events of a query.
    pub fn subscribe_query(&mut self, id: QueryId) -> Result<Cursor> {
        self.queries
            .get_mut(id)
            .map(Query::subscribe)
            .ok_or(EcsError::UnknownQuery(id))
    }

    pub fn read_query_events(&mut self, id: QueryId, cursor: Cursor) -> Result<Vec<QueryEvent>> {
        self.queries
            .get_mut(id)
            .map(|query| query.read_events(cursor))
            .ok_or(EcsError::UnknownQuery(id))
    }

    // ---- Frame ----

    /// The per-frame tick: reconcile every query with this frame's changes,
    /// then start a new frame.
    ///
    /// Call exactly once per frame, after all structural changes for it.
    pub fn update(&mut self) {
        if self.changes.is_dirty() {
            trace!(
                "Tick {}: {} changed, {} destroyed",
                self.ticks,
                self.changes.changed().len(),
                self.changes.destroyed().len()
            );
            self.queries.sync(&self.changes);
        }
        self.changes.clear();
        self.ticks += 1;
        self.check_backlogs();
    }

    /// Number of completed updates.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Read-only view of the current frame's change ledger.
    pub fn changes(&self) -> &ChangeLedger {
        &self.changes
    }

    /// Destroy every live entity and empty every storage.
    ///
    /// Already-destroyed entities are left alone. Queries empty out on the next
    /// [`update`](World::update); registrations and cached queries survive.
    pub fn reset(&mut self) {
        let live: Vec<Entity> = self.entities.live().collect();
        for &entity in &live {
            self.destroy(entity);
        }
        let mut removed = 0;
        for storage in self.storages.values_mut() {
            removed += storage.clear(&mut self.changes);
        }
        debug!(
            "World reset: destroyed {} entities, dropped {} components",
            live.len(),
            removed
        );
    }

    fn check_backlogs(&self) {
        let limit = self.config.event_backlog_warning;
        for storage in self.storages.values() {
            if storage.event_backlog() > limit {
                warn!(
                    "{} events of {} are unread; a subscriber is not consuming its cursor",
                    storage.event_backlog(),
                    storage.component_name()
                );
            }
        }
        for query in self.queries.iter() {
            if query.event_backlog() > limit {
                warn!(
                    "{} events of query {:?} are unread; a subscriber is not consuming its cursor",
                    query.event_backlog(),
                    query.id()
                );
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
