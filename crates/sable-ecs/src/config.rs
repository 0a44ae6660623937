use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entity::MAX_ENTITIES;

/// Tunables for a [`World`](crate::World).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Maximum number of entity slots. Clamped to [`MAX_ENTITIES`].
    pub max_entities: u32,
    /// Entity slots to reserve up front
    pub initial_capacity: usize,
    /// Warn when a storage or query event log retains more unread events than this
    pub event_backlog_warning: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_entities: MAX_ENTITIES,
            initial_capacity: 1024,
            event_backlog_warning: 4096,
        }
    }
}

impl WorldConfig {
    /// Effective entity limit after clamping to the index width.
    pub fn entity_limit(&self) -> u32 {
        if self.max_entities > MAX_ENTITIES {
            warn!(
                "max_entities {} exceeds the index width, clamping to {}",
                self.max_entities, MAX_ENTITIES
            );
            return MAX_ENTITIES;
        }
        self.max_entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_partial_toml() {
        let config: WorldConfig = toml::from_str("max_entities = 16").unwrap();
        assert_eq!(config.max_entities, 16);
        assert_eq!(config.initial_capacity, 1024);
        assert_eq!(config.entity_limit(), 16);
    }

    #[test]
    fn limit_is_clamped() {
        let config = WorldConfig {
            max_entities: u32::MAX,
            ..Default::default()
        };
        assert_eq!(config.entity_limit(), MAX_ENTITIES);
    }
}
