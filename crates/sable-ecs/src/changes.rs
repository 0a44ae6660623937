use std::collections::HashMap;

use crate::composition::Composition;
use crate::entity::Entity;
use crate::registry::ComponentId;

#[derive(Default)]
struct Record {
    composition: Composition,
    /// Listed in `changed` this frame.
    changed: bool,
    /// Listed in `destroyed` this frame.
    destroyed: bool,
}

/// Per-frame record of composition changes and destructions, plus the
/// authoritative composition of every entity.
///
/// Queries reconcile against `changed` and `destroyed` once per tick, after
/// which [`clear`](ChangeLedger::clear) starts the next frame. Both lists keep
/// first-touch order and never hold an entity twice.
#[derive(Default)]
pub struct ChangeLedger {
    records: HashMap<Entity, Record>,
    changed: Vec<Entity>,
    destroyed: Vec<Entity>,
}

impl ChangeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entity's current composition. Entities never touched have none.
    pub fn composition(&self, entity: Entity) -> Composition {
        self.records
            .get(&entity)
            .map_or(Composition::EMPTY, |record| record.composition)
    }

    /// Record a newly created entity, so queries see it even while its
    /// composition is empty.
    pub fn touch(&mut self, entity: Entity) {
        let record = self.records.entry(entity).or_default();
        if !record.changed && !record.destroyed {
            record.changed = true;
            self.changed.push(entity);
        }
    }

    /// Add a component to the entity's composition. Returns `true` if it changed.
    ///
    /// Entities destroyed this frame keep the composition they died with.
    pub fn set(&mut self, entity: Entity, id: ComponentId) -> bool {
        let record = self.records.entry(entity).or_default();
        if record.destroyed || !record.composition.set(id) {
            return false;
        }
        if !record.changed {
            record.changed = true;
            self.changed.push(entity);
        }
        true
    }

    /// Remove a component from the entity's composition. Returns `true` if it changed.
    pub fn remove(&mut self, entity: Entity, id: ComponentId) -> bool {
        // An entity without a record owns nothing, so there is nothing to remove.
        let Some(record) = self.records.get_mut(&entity) else {
            return false;
        };
        if record.destroyed || !record.composition.remove(id) {
            return false;
        }
        if !record.changed {
            record.changed = true;
            self.changed.push(entity);
        }
        true
    }

    /// Mark the entity as destroyed this frame.
    pub fn destroy(&mut self, entity: Entity) {
        let record = self.records.entry(entity).or_default();
        if !record.destroyed {
            record.destroyed = true;
            self.destroyed.push(entity);
        }
    }

    /// Whether the entity was destroyed this frame.
    pub fn is_destroyed(&self, entity: Entity) -> bool {
        self.records.get(&entity).is_some_and(|record| record.destroyed)
    }

    /// Entities whose composition changed this frame, in first-change order.
    pub fn changed(&self) -> &[Entity] {
        &self.changed
    }

    /// Entities destroyed this frame, in destruction order.
    pub fn destroyed(&self) -> &[Entity] {
        &self.destroyed
    }

    pub fn is_dirty(&self) -> bool {
        !self.changed.is_empty() || !self.destroyed.is_empty()
    }

    /// Number of entities with a composition record.
    pub fn tracked(&self) -> usize {
        self.records.len()
    }

    /// End the frame: empty both lists.
    ///
    /// Destroyed entities also lose their composition record. Their handles
    /// can never become alive again, so the record would only leak.
    pub fn clear(&mut self) {
        for entity in self.changed.drain(..) {
            if let Some(record) = self.records.get_mut(&entity) {
                record.changed = false;
            }
        }
        for entity in self.destroyed.drain(..) {
            self.records.remove(&entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: usize) -> ComponentId {
        ComponentId::from_index(index)
    }

    fn entity(index: u32) -> Entity {
        Entity::new(index, 0)
    }

    #[test]
    fn untouched_entity_has_empty_composition() {
        let ledger = ChangeLedger::new();
        assert!(ledger.composition(entity(0)).is_empty());
        assert!(!ledger.is_dirty());
    }

    #[test]
    fn set_records_change_once() {
        let mut ledger = ChangeLedger::new();
        let e = entity(0);
        assert!(ledger.set(e, id(0)));
        assert!(ledger.set(e, id(1)));
        assert!(!ledger.set(e, id(1)));
        assert_eq!(ledger.changed(), &[e]);
        assert!(ledger.composition(e).has(id(0)));
        assert!(ledger.composition(e).has(id(1)));
        assert!(ledger.is_dirty());
    }

    #[test]
    fn noop_mutations_do_not_mark_changed() {
        let mut ledger = ChangeLedger::new();
        let e = entity(3);
        assert!(!ledger.remove(e, id(2)));
        assert!(ledger.changed().is_empty());
        assert_eq!(ledger.tracked(), 0);

        ledger.set(e, id(2));
        ledger.clear();
        assert!(!ledger.set(e, id(2)));
        assert!(!ledger.is_dirty());
    }

    #[test]
    fn changed_keeps_insertion_order() {
        let mut ledger = ChangeLedger::new();
        let (a, b, c) = (entity(2), entity(0), entity(1));
        ledger.set(a, id(0));
        ledger.set(b, id(0));
        ledger.set(a, id(1));
        ledger.set(c, id(0));
        ledger.remove(b, id(0));
        assert_eq!(ledger.changed(), &[a, b, c]);
    }

    #[test]
    fn destroy_is_deduplicated() {
        let mut ledger = ChangeLedger::new();
        let e = entity(0);
        ledger.destroy(e);
        ledger.destroy(e);
        assert_eq!(ledger.destroyed(), &[e]);
        assert!(ledger.is_dirty());
    }

    #[test]
    fn clear_resets_lists_but_keeps_live_compositions() {
        let mut ledger = ChangeLedger::new();
        let e = entity(0);
        ledger.set(e, id(5));
        ledger.clear();
        assert!(!ledger.is_dirty());
        assert!(ledger.changed().is_empty());
        assert!(ledger.composition(e).has(id(5)));

        // A fresh frame records the entity again.
        ledger.remove(e, id(5));
        assert_eq!(ledger.changed(), &[e]);
    }

    #[test]
    fn clear_evicts_destroyed_compositions() {
        let mut ledger = ChangeLedger::new();
        let dead = entity(0);
        let live = entity(1);
        ledger.set(dead, id(0));
        ledger.set(live, id(0));
        ledger.destroy(dead);
        ledger.clear();
        assert_eq!(ledger.tracked(), 1);
        assert!(ledger.composition(dead).is_empty());

        // Late removals against the dead handle are no-ops.
        assert!(!ledger.remove(dead, id(0)));
        assert!(!ledger.is_dirty());
    }

    #[test]
    fn touch_lists_new_entity_without_bits() {
        let mut ledger = ChangeLedger::new();
        let e = entity(0);
        ledger.touch(e);
        ledger.set(e, id(1));
        ledger.touch(e);
        assert_eq!(ledger.changed(), &[e]);
        assert_eq!(ledger.composition(e).len(), 1);
        assert!(ledger.is_dirty());
    }

    #[test]
    fn writes_after_destroy_are_ignored() {
        let mut ledger = ChangeLedger::new();
        let e = entity(0);
        ledger.set(e, id(0));
        ledger.set(e, id(1));
        ledger.clear();

        ledger.destroy(e);
        assert!(ledger.is_destroyed(e));
        assert!(!ledger.remove(e, id(1)));
        assert!(!ledger.set(e, id(2)));
        assert!(ledger.changed().is_empty());
        assert_eq!(ledger.destroyed(), &[e]);
        assert!(ledger.composition(e).has(id(1)));
    }
}
