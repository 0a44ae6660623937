//! Simulation settings with persistence
//!
//! Settings are read from `~/.config/sable/settings.toml` unless a path is given
//! on the command line.

use std::fs;
use std::path::{Path, PathBuf};

use sable_core::TimeConfig;
use sable_ecs::WorldConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Level};

/// All simulation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub world: WorldConfig,
    pub time: TimeConfig,
    pub simulation: SimulationSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sable"))
    }

    /// Get the default settings file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from `path`, or the default location, falling back to defaults
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => {
                    warn!("Could not determine config directory");
                    return Self::default();
                }
            },
        };

        if !path.exists() {
            info!("No settings file at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to `path`, creating parent directories as needed
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// Parameters of the demo population
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Frames to simulate before exiting
    pub frames: u64,
    /// Population kept alive by the spawner
    pub population: usize,
    /// Seed for spawn positions and velocities
    pub seed: u64,
    /// Half-extent of the square arena; movers leaving it are frozen
    pub arena_half_extent: f32,
    /// Seconds an entity lives before it is destroyed and its slot recycled
    pub lifetime: f32,
}

/// Smallest arena the spawner can sample positions from
pub const MIN_ARENA_HALF_EXTENT: f32 = 1.0;

impl SimulationSettings {
    /// Arena half-extent, raised to [`MIN_ARENA_HALF_EXTENT`] if the configured one is unusable
    pub fn half_extent(&self) -> f32 {
        if self.arena_half_extent >= MIN_ARENA_HALF_EXTENT {
            return self.arena_half_extent;
        }
        warn!(
            "arena_half_extent {} is too small, using {}",
            self.arena_half_extent, MIN_ARENA_HALF_EXTENT
        );
        MIN_ARENA_HALF_EXTENT
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            frames: 600,
            population: 256,
            seed: 7,
            arena_half_extent: 50.0,
            lifetime: 3.0,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// One of trace, debug, info, warn, error. `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Parse the configured level, defaulting to INFO
    pub fn level(&self) -> Level {
        self.level.parse().unwrap_or(Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [world]
            max_entities = 512

            [simulation]
            frames = 10
            "#,
        )
        .unwrap();
        assert_eq!(settings.world.max_entities, 512);
        assert_eq!(settings.simulation.frames, 10);
        assert_eq!(settings.simulation.population, 256);
        assert_eq!(settings.time, TimeConfig::default());
    }

    #[test]
    fn save_and_load() {
        let dir = std::env::temp_dir().join(format!("sable-settings-{}", std::process::id()));
        let path = dir.join("settings.toml");
        let mut settings = Settings::default();
        settings.simulation.seed = 99;
        settings.logging.level = "debug".into();
        settings.save(&path).unwrap();

        let loaded = Settings::load(Some(&path));
        assert_eq!(loaded.simulation.seed, 99);
        assert_eq!(loaded.logging.level(), Level::DEBUG);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_file_uses_defaults() {
        let loaded = Settings::load(Some(Path::new("/nonexistent/sable/settings.toml")));
        assert_eq!(loaded.simulation.frames, 600);
    }

    #[test]
    fn degenerate_arena_is_clamped() {
        let mut simulation = SimulationSettings::default();
        assert_eq!(simulation.half_extent(), 50.0);
        for bad in [0.0, -5.0, f32::NAN] {
            simulation.arena_half_extent = bad;
            assert_eq!(simulation.half_extent(), MIN_ARENA_HALF_EXTENT);
        }
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let logging = LoggingSettings {
            level: "chatty".into(),
        };
        assert_eq!(logging.level(), Level::INFO);
    }
}
