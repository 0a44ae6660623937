use std::any::{type_name, Any};
use std::ops::Deref;

use sable_core::{Cursor, EventLog};

use crate::changes::ChangeLedger;
use crate::component::Component;
use crate::entity::{Entity, EntityManager};
use crate::error::{EcsError, Result};
use crate::registry::ComponentId;

/// Notification emitted by a [`Storage`] when its contents change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentEvent {
    Added(Entity),
    Removed(Entity),
    Updated(Entity),
}

/// Type-erased storage interface, so the world can hold every storage in one map.
pub(crate) trait ComponentStorage: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clear(&mut self, changes: &mut ChangeLedger) -> usize;
    fn event_backlog(&self) -> usize;
    fn component_name(&self) -> &'static str;
}

/// Sparse-set storage for a single component type.
///
/// Slots are addressed by entity index; each dense entry remembers the full
/// entity that owns it, so a recycled index never sees its predecessor's data.
pub struct Storage<T> {
    id: ComponentId,
    /// Maps entity index → dense index. `None` means no component in that slot.
    sparse: Vec<Option<usize>>,
    /// Packed component values.
    dense: Vec<T>,
    /// Owning entity of each dense entry.
    owners: Vec<Entity>,
    events: EventLog<ComponentEvent>,
}

impl<T: Component> Storage<T> {
    pub(crate) fn new(id: ComponentId) -> Self {
        Self {
            id,
            sparse: Vec::new(),
            dense: Vec::new(),
            owners: Vec::new(),
            events: EventLog::new(),
        }
    }

    /// Component id this storage sets in entity compositions.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        let dense_idx = (*self.sparse.get(entity.index() as usize)?)?;
        (self.owners[dense_idx] == entity).then_some(dense_idx)
    }

    pub fn has(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    /// The entity's component, or [`EcsError::MissingComponent`].
    pub fn get(&self, entity: Entity) -> Result<&T> {
        self.try_get(entity).ok_or(EcsError::MissingComponent {
            component: type_name::<T>(),
            entity,
        })
    }

    pub fn try_get(&self, entity: Entity) -> Option<&T> {
        self.slot(entity).map(|dense_idx| &self.dense[dense_idx])
    }

    /// The entity owning this exact instance, compared by address.
    ///
    /// Zero-sized components share one address and have no owner.
    pub fn owner(&self, instance: &T) -> Option<Entity> {
        let size = std::mem::size_of::<T>();
        if size == 0 {
            return None;
        }
        let base = self.dense.as_ptr() as usize;
        let offset = (instance as *const T as usize).checked_sub(base)?;
        if offset % size != 0 {
            return None;
        }
        self.owners.get(offset / size).copied()
    }

    /// Iterate over all (entity, &component) pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    /// Entities owning a component, in storage order.
    pub fn entities(&self) -> &[Entity] {
        &self.owners
    }

    /// Number of components stored.
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Unread events queued for slow subscribers.
    pub fn event_backlog(&self) -> usize {
        self.events.backlog()
    }

    /// Store a value, replacing whatever the slot held. Returns the dense index.
    fn insert(&mut self, entity: Entity, value: T) -> usize {
        let idx = entity.index() as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }
        if let Some(dense_idx) = self.sparse[idx] {
            // Either the same entity or a destroyed predecessor in a recycled slot.
            self.dense[dense_idx] = value;
            self.owners[dense_idx] = entity;
            dense_idx
        } else {
            let dense_idx = self.dense.len();
            self.sparse[idx] = Some(dense_idx);
            self.dense.push(value);
            self.owners.push(entity);
            dense_idx
        }
    }

    fn take(&mut self, entity: Entity) -> Option<T> {
        let dense_idx = self.slot(entity)?;
        self.sparse[entity.index() as usize] = None;

        let last = self.dense.len() - 1;
        if dense_idx != last {
            // Swap-remove: move the last element into the removed slot.
            self.dense.swap(dense_idx, last);
            self.owners.swap(dense_idx, last);
            let moved = self.owners[dense_idx];
            self.sparse[moved.index() as usize] = Some(dense_idx);
        }
        self.owners.pop();
        self.dense.pop()
    }
}

impl<T: Component> ComponentStorage for Storage<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clear(&mut self, changes: &mut ChangeLedger) -> usize {
        let removed = self.owners.len();
        for &entity in &self.owners {
            changes.remove(entity, self.id);
            self.events.publish(ComponentEvent::Removed(entity));
        }
        self.sparse.clear();
        self.dense.clear();
        self.owners.clear();
        removed
    }

    fn event_backlog(&self) -> usize {
        self.events.backlog()
    }

    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Mutable access to one component storage.
///
/// Borrows the storage together with the world's change ledger, so every
/// structural write is mirrored into the entity's composition.
pub struct StorageMut<'w, T: Component> {
    pub(crate) storage: &'w mut Storage<T>,
    pub(crate) changes: &'w mut ChangeLedger,
    pub(crate) entities: &'w EntityManager,
}

impl<'w, T: Component> StorageMut<'w, T> {
    fn ensure_alive(&self, entity: Entity) -> Result<()> {
        if self.entities.alive(entity) {
            Ok(())
        } else {
            Err(EcsError::DeadEntity(entity))
        }
    }

    /// Store `value` on a live entity and emit [`ComponentEvent::Added`].
    pub fn set(&mut self, entity: Entity, value: T) -> Result<&mut T> {
        self.ensure_alive(entity)?;
        let dense_idx = self.storage.insert(entity, value);
        self.changes.set(entity, self.storage.id);
        self.storage.events.publish(ComponentEvent::Added(entity));
        Ok(&mut self.storage.dense[dense_idx])
    }

    /// Attach a default-constructed component.
    pub fn add(&mut self, entity: Entity) -> Result<&mut T>
    where
        T: Default,
    {
        self.set(entity, T::default())
    }

    /// Attach a default-constructed component after applying `overrides` to it.
    pub fn add_with(&mut self, entity: Entity, overrides: impl FnOnce(&mut T)) -> Result<&mut T>
    where
        T: Default,
    {
        let mut value = T::default();
        overrides(&mut value);
        self.set(entity, value)
    }

    /// Merge changes into an existing component and emit [`ComponentEvent::Updated`].
    ///
    /// Returns `false` without calling `merge` if the entity is dead or has no
    /// component. The composition is left alone since the component set did
    /// not change.
    pub fn update(&mut self, entity: Entity, merge: impl FnOnce(&mut T)) -> bool {
        if !self.entities.alive(entity) {
            return false;
        }
        let Some(dense_idx) = self.storage.slot(entity) else {
            return false;
        };
        merge(&mut self.storage.dense[dense_idx]);
        self.storage.events.publish(ComponentEvent::Updated(entity));
        true
    }

    /// Detach the component. Returns `true` if there was one.
    pub fn remove(&mut self, entity: Entity) -> bool {
        self.take(entity).is_some()
    }

    /// Detach and return the component.
    pub fn take(&mut self, entity: Entity) -> Option<T> {
        let value = self.storage.take(entity)?;
        self.changes.remove(entity, self.storage.id);
        self.storage.events.publish(ComponentEvent::Removed(entity));
        Some(value)
    }

    /// Mutable access without emitting an update event.
    pub fn get_mut(&mut self, entity: Entity) -> Result<&mut T> {
        match self.storage.slot(entity) {
            Some(dense_idx) => Ok(&mut self.storage.dense[dense_idx]),
            None => Err(EcsError::MissingComponent {
                component: type_name::<T>(),
                entity,
            }),
        }
    }

    /// Iterate over all (entity, &mut component) pairs in storage order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.storage
            .owners
            .iter()
            .copied()
            .zip(self.storage.dense.iter_mut())
    }

    /// Remove every component, clearing its bit from each owner's composition.
    /// Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        self.storage.clear(self.changes)
    }

    /// Start receiving this storage's events.
    pub fn subscribe(&mut self) -> Cursor {
        self.storage.events.subscribe()
    }

    pub fn unsubscribe(&mut self, cursor: Cursor) -> bool {
        self.storage.events.unsubscribe(cursor)
    }

    /// Events published since the cursor's previous read.
    pub fn read_events(&mut self, cursor: Cursor) -> Vec<ComponentEvent> {
        self.storage.events.read(cursor)
    }
}

impl<T: Component> Deref for StorageMut<'_, T> {
    type Target = Storage<T>;

    fn deref(&self) -> &Storage<T> {
        self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Health {
        current: i32,
        max: i32,
    }

    struct Fixture {
        storage: Storage<Health>,
        changes: ChangeLedger,
        entities: EntityManager,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                storage: Storage::new(ComponentId::from_index(3)),
                changes: ChangeLedger::new(),
                entities: EntityManager::new(),
            }
        }

        fn spawn(&mut self) -> Entity {
            self.entities.create().unwrap()
        }

        fn access(&mut self) -> StorageMut<'_, Health> {
            StorageMut {
                storage: &mut self.storage,
                changes: &mut self.changes,
                entities: &self.entities,
            }
        }
    }

    #[test]
    fn add_sets_composition_bit() {
        let mut fx = Fixture::new();
        let e = fx.spawn();
        let id = fx.storage.id();
        fx.access().add(e).unwrap();
        assert!(fx.changes.composition(e).has(id));
        assert_eq!(fx.changes.changed(), &[e]);
        assert_eq!(fx.storage.get(e).unwrap(), &Health::default());
    }

    #[test]
    fn add_with_applies_overrides() {
        let mut fx = Fixture::new();
        let e = fx.spawn();
        let mut access = fx.access();
        let health = access.add_with(e, |h| h.max = 10).unwrap();
        assert_eq!(*health, Health { current: 0, max: 10 });
    }

    #[test]
    fn remove_clears_composition_bit() {
        let mut fx = Fixture::new();
        let e = fx.spawn();
        let id = fx.storage.id();
        let mut access = fx.access();
        access.add(e).unwrap();
        assert!(access.remove(e));
        assert!(!access.remove(e));
        assert!(!fx.changes.composition(e).has(id));
        assert!(!fx.storage.has(e));
    }

    #[test]
    fn get_missing_component() {
        let mut fx = Fixture::new();
        let e = fx.spawn();
        let err = fx.storage.get(e).unwrap_err();
        assert!(matches!(err, EcsError::MissingComponent { entity, .. } if entity == e));
        assert!(fx.access().get_mut(e).is_err());
    }

    #[test]
    fn set_on_dead_entity_is_rejected() {
        let mut fx = Fixture::new();
        let e = fx.spawn();
        fx.entities.destroy(e);
        let err = fx.access().set(e, Health::default()).unwrap_err();
        assert_eq!(err, EcsError::DeadEntity(e));
        assert!(fx.storage.is_empty());
        assert!(!fx.changes.is_dirty());
    }

    #[test]
    fn update_merges_without_touching_composition() {
        let mut fx = Fixture::new();
        let e = fx.spawn();
        fx.access().set(e, Health { current: 5, max: 10 }).unwrap();
        fx.changes.clear();

        assert!(fx.access().update(e, |h| h.current = 9));
        assert_eq!(fx.storage.get(e).unwrap().current, 9);
        assert!(!fx.changes.is_dirty());

        let other = fx.spawn();
        assert!(!fx.access().update(other, |_| panic!("merge called without component")));
    }

    #[test]
    fn events_follow_mutations() {
        let mut fx = Fixture::new();
        let e = fx.spawn();
        let mut access = fx.access();
        let cursor = access.subscribe();

        access.add(e).unwrap();
        access.update(e, |h| h.current = 1);
        access.remove(e);
        assert_eq!(
            access.read_events(cursor),
            vec![
                ComponentEvent::Added(e),
                ComponentEvent::Updated(e),
                ComponentEvent::Removed(e),
            ]
        );
        assert!(access.read_events(cursor).is_empty());
    }

    #[test]
    fn swap_remove_keeps_lookup_consistent() {
        let mut fx = Fixture::new();
        let a = fx.spawn();
        let b = fx.spawn();
        let c = fx.spawn();
        let mut access = fx.access();
        for (entity, current) in [(a, 1), (b, 2), (c, 3)] {
            access.set(entity, Health { current, max: 3 }).unwrap();
        }
        assert!(access.remove(a));
        assert_eq!(access.get(b).unwrap().current, 2);
        assert_eq!(access.get(c).unwrap().current, 3);
        assert_eq!(access.len(), 2);
        assert_eq!(access.entities(), &[c, b]);
    }

    #[test]
    fn owner_is_identity_based() {
        let mut fx = Fixture::new();
        let a = fx.spawn();
        let b = fx.spawn();
        let mut access = fx.access();
        access.set(a, Health { current: 1, max: 1 }).unwrap();
        access.set(b, Health { current: 1, max: 1 }).unwrap();

        let instance = fx.storage.get(b).unwrap();
        assert_eq!(fx.storage.owner(instance), Some(b));

        // An equal value that is not stored has no owner.
        let lookalike = Health { current: 1, max: 1 };
        assert_eq!(fx.storage.owner(&lookalike), None);
    }

    #[test]
    fn owner_follows_swap_remove() {
        let mut fx = Fixture::new();
        let a = fx.spawn();
        let b = fx.spawn();
        let c = fx.spawn();
        let mut access = fx.access();
        for entity in [a, b, c] {
            access.add(entity).unwrap();
        }
        access.remove(a);

        for entity in [b, c] {
            let instance = fx.storage.get(entity).unwrap();
            assert_eq!(fx.storage.owner(instance), Some(entity));
        }

        // Addresses past the live entries belong to nobody.
        let other: Storage<Health> = Storage::new(ComponentId::from_index(4));
        let stray = [Health::default()];
        assert_eq!(fx.storage.owner(&stray[0]), None);
        assert_eq!(other.owner(&stray[0]), None);
    }

    #[test]
    fn update_on_dead_entity_is_ignored() {
        let mut fx = Fixture::new();
        let e = fx.spawn();
        let mut access = fx.access();
        let cursor = access.subscribe();
        access.set(e, Health { current: 3, max: 3 }).unwrap();
        access.read_events(cursor);

        fx.entities.destroy(e);
        let mut access = fx.access();
        assert!(!access.update(e, |_| panic!("merge called on a dead entity")));
        assert!(access.read_events(cursor).is_empty());
        assert_eq!(fx.storage.get(e).unwrap().current, 3);
    }

    #[test]
    fn recycled_index_does_not_see_predecessor() {
        let mut fx = Fixture::new();
        let old = fx.spawn();
        fx.access().set(old, Health { current: 7, max: 7 }).unwrap();
        fx.entities.destroy(old);
        let new = fx.spawn();
        assert_eq!(new.index(), old.index());

        assert!(!fx.storage.has(new));
        assert!(fx.storage.has(old));

        fx.access().add(new).unwrap();
        assert!(fx.storage.has(new));
        assert!(!fx.storage.has(old));
        assert_eq!(fx.storage.len(), 1);
    }

    #[test]
    fn clear_drops_everything_and_composition_bits() {
        let mut fx = Fixture::new();
        let a = fx.spawn();
        let b = fx.spawn();
        let id = fx.storage.id();
        let mut access = fx.access();
        let cursor = access.subscribe();
        access.add(a).unwrap();
        access.add(b).unwrap();
        access.read_events(cursor);

        assert_eq!(access.clear(), 2);
        assert_eq!(
            access.read_events(cursor),
            vec![ComponentEvent::Removed(a), ComponentEvent::Removed(b)]
        );
        assert!(fx.storage.is_empty());
        assert!(!fx.changes.composition(a).has(id));
        assert!(!fx.changes.composition(b).has(id));
    }

    #[test]
    fn iter_mut_visits_every_component() {
        let mut fx = Fixture::new();
        let a = fx.spawn();
        let b = fx.spawn();
        let mut access = fx.access();
        access.add(a).unwrap();
        access.add(b).unwrap();
        for (_, health) in access.iter_mut() {
            health.current += 4;
        }
        assert!(fx.storage.iter().all(|(_, h)| h.current == 4));
    }
}
