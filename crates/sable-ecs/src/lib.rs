//! Sable ECS - Entity Component System core
//!
//! Entities are packed index + version handles recycled through a free list.
//! Each entity's component set is a fixed-width bitset ([`Composition`]); queries
//! are cached per [`Filter`] and kept up to date incrementally from a per-frame
//! change ledger instead of rescanning every entity.
//!
//! All structural changes for a frame (spawning, destroying, adding and removing
//! components) must happen before the single [`World::update`] call that consumes
//! them. The world is single-threaded; nothing here blocks or synchronizes.

mod bitset;
mod changes;
mod component;
mod composition;
mod config;
mod entity;
mod error;
mod filter;
mod query;
mod registry;
mod schedule;
mod storage;
mod world;

pub use bitset::Bitset;
pub use changes::ChangeLedger;
pub use component::{Bundle, Component};
pub use composition::{Composition, MAX_COMPONENTS};
pub use config::WorldConfig;
pub use entity::{Entity, EntityManager, INDEX_BITS, MAX_ENTITIES, MAX_VERSION, VERSION_BITS};
pub use error::{EcsError, Result, ScheduleError};
pub use filter::Filter;
pub use query::{Query, QueryBuilder, QueryCache, QueryEvent, QueryId};
pub use registry::{ComponentId, ComponentRegistry};
pub use schedule::{System, SystemSchedule};
pub use storage::{ComponentEvent, Storage, StorageMut};
pub use world::World;

pub use sable_core::{Cursor, EventLog};
