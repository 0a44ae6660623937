use crate::entity::Entity;
use crate::query::QueryId;

/// Errors reported by the ECS core.
///
/// Every variant is a caller contract violation; the core never leaves its data
/// half-updated when returning one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    #[error("entity capacity exceeded: at most {limit} entity slots")]
    CapacityExceeded { limit: u32 },

    #[error("entity {entity} has no {component} component")]
    MissingComponent {
        component: &'static str,
        entity: Entity,
    },

    #[error("cannot register {component}: at most {limit} component types per world")]
    ComponentLimitExceeded {
        component: &'static str,
        limit: usize,
    },

    #[error("entity {0} is not alive")]
    DeadEntity(Entity),

    #[error("unknown query {0:?}")]
    UnknownQuery(QueryId),
}

pub type Result<T> = std::result::Result<T, EcsError>;

/// Errors raised while building a system schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("a system named '{0}' is already scheduled")]
    DuplicateSystem(String),
}
