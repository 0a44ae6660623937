use std::collections::{HashMap, HashSet};

use sable_core::{Cursor, EventLog};
use tracing::{debug, trace};

use crate::changes::ChangeLedger;
use crate::component::Component;
use crate::entity::{Entity, EntityManager};
use crate::error::{EcsError, Result};
use crate::filter::Filter;
use crate::registry::ComponentRegistry;

/// Handle to a cached query. Equal filters always yield the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(u32);

/// Membership transition of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryEvent {
    Added(Entity),
    Removed(Entity),
}

/// A live set of entities matching a [`Filter`], in the order they started matching.
pub struct Query {
    id: QueryId,
    filter: Filter,
    entities: Vec<Entity>,
    members: HashSet<Entity>,
    events: EventLog<QueryEvent>,
}

impl Query {
    fn new(id: QueryId, filter: Filter) -> Self {
        Self {
            id,
            filter,
            entities: Vec::new(),
            members: HashSet::new(),
            events: EventLog::new(),
        }
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Matching entities as of the last [`World::update`](crate::World::update).
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn subscribe(&mut self) -> Cursor {
        self.events.subscribe()
    }

    pub fn unsubscribe(&mut self, cursor: Cursor) -> bool {
        self.events.unsubscribe(cursor)
    }

    /// Membership transitions since the cursor's previous read.
    pub fn read_events(&mut self, cursor: Cursor) -> Vec<QueryEvent> {
        self.events.read(cursor)
    }

    /// Unread events queued for slow subscribers.
    pub fn event_backlog(&self) -> usize {
        self.events.backlog()
    }

    fn insert(&mut self, entity: Entity) -> bool {
        if !self.members.insert(entity) {
            return false;
        }
        self.entities.push(entity);
        self.events.publish(QueryEvent::Added(entity));
        true
    }

    fn evict(&mut self, entity: Entity) -> bool {
        if !self.members.remove(&entity) {
            return false;
        }
        // Linear in the match count; keeps the remaining matches in order.
        if let Some(pos) = self.entities.iter().position(|&e| e == entity) {
            self.entities.remove(pos);
        }
        self.events.publish(QueryEvent::Removed(entity));
        true
    }

    /// Reconcile membership with this frame's ledger.
    ///
    /// Composition changes are applied first, then every destroyed entity is
    /// evicted whatever its composition says.
    fn sync(&mut self, changes: &ChangeLedger) -> (usize, usize) {
        let (mut added, mut removed) = (0, 0);
        for &entity in changes.changed() {
            let matches = self.filter.test(&changes.composition(entity));
            if self.members.contains(&entity) {
                if !matches && self.evict(entity) {
                    removed += 1;
                }
            } else if matches && self.insert(entity) {
                added += 1;
            }
        }
        for &entity in changes.destroyed() {
            if self.evict(entity) {
                removed += 1;
            }
        }
        (added, removed)
    }
}

/// Every query built in a world, deduplicated by filter.
#[derive(Default)]
pub struct QueryCache {
    queries: Vec<Query>,
    by_filter: HashMap<Filter, QueryId>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached query for an equal filter, if one was built.
    pub fn find(&self, filter: &Filter) -> Option<QueryId> {
        self.by_filter.get(filter).copied()
    }

    pub fn get(&self, id: QueryId) -> Option<&Query> {
        self.queries.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: QueryId) -> Option<&mut Query> {
        self.queries.get_mut(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Query> {
        self.queries.iter()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Cache a new query, seeding it from a full scan of the live entities.
    fn insert(&mut self, filter: Filter, entities: &EntityManager, changes: &ChangeLedger) -> QueryId {
        let id = QueryId(self.queries.len() as u32);
        let mut query = Query::new(id, filter);
        for entity in entities.live() {
            if filter.test(&changes.composition(entity)) {
                query.insert(entity);
            }
        }
        debug!(
            "Built query {:?} with {} initial matches",
            id,
            query.len()
        );
        self.queries.push(query);
        self.by_filter.insert(filter, id);
        id
    }

    /// Reconcile every cached query with the ledger.
    pub(crate) fn sync(&mut self, changes: &ChangeLedger) {
        for query in &mut self.queries {
            let (added, removed) = query.sync(changes);
            if added + removed > 0 {
                trace!(
                    "Query {:?}: +{} -{} ({} matching)",
                    query.id,
                    added,
                    removed,
                    query.len()
                );
            }
        }
    }
}

/// Accumulates component constraints and resolves them to a cached [`Query`].
///
/// Naming a component type registers it with the world if needed.
pub struct QueryBuilder<'w> {
    pub(crate) registry: &'w mut ComponentRegistry,
    pub(crate) entities: &'w EntityManager,
    pub(crate) changes: &'w ChangeLedger,
    pub(crate) cache: &'w mut QueryCache,
    pub(crate) filter: Filter,
    pub(crate) error: Option<EcsError>,
}

impl<'w> QueryBuilder<'w> {
    /// Require entities to own a `T`.
    pub fn contains<T: Component>(mut self) -> Self {
        match self.registry.register::<T>() {
            Ok(id) => self.filter.include(id),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// Require entities not to own a `T`.
    pub fn excludes<T: Component>(mut self) -> Self {
        match self.registry.register::<T>() {
            Ok(id) => self.filter.exclude(id),
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// The filter accumulated so far.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Return the cached query for this filter, building it on first use.
    pub fn build(self) -> Result<QueryId> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if let Some(id) = self.cache.find(&self.filter) {
            return Ok(id);
        }
        Ok(self.cache.insert(self.filter, self.entities, self.changes))
    }
}
