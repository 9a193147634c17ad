//! Configuration for strafe
//!
//! Settings live in a single TOML file next to the host executable:
//! `<exe dir>/strafe/strafe.toml`. A default file is written the first time
//! the tool runs, and the file can be reloaded in place.
//!
//! # Example
//!
//! ```toml
//! version = 1
//! debug = false
//! mode = "overlay"
//!
//! [toggles]
//! autohop_key = 116
//! movement_key = 117
//!
//! [movement]
//! ground_acceleration = 0.01
//! air_acceleration = 0.0075
//! ground_friction = 0.0
//! max_ground_speed = 1.0
//! max_air_speed = 10.0
//! jump_velocity = 2.0
//! debounce_ms = 250
//! ```

mod loader;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::movement::Tunables;
use crate::toggles::DEBOUNCE_MS;
use strafe_sdk::keys;

pub use loader::{base_dir, config_path, gamedata_path};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write config file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Could not determine config directory from the executable location
    #[error("Config directory not available - could not resolve executable path")]
    NoConfigDirectory,
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where the integrated velocity is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMode {
    /// Overwrite velocity from the input-check hook, before the host moves
    #[default]
    Overlay,
    /// Overwrite velocity from mid-hooks after the host's own friction step
    MidHook,
}

/// Virtual-key codes for the feature toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleKeys {
    pub autohop_key: u8,
    pub movement_key: u8,
}

impl Default for ToggleKeys {
    fn default() -> Self {
        Self {
            autohop_key: keys::VK_F5,
            movement_key: keys::VK_F6,
        }
    }
}

/// `[movement]` table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    #[serde(flatten)]
    pub tunables: Tunables,

    /// Minimum time between toggle changes
    pub debounce_ms: u64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            tunables: Tunables::default(),
            debounce_ms: DEBOUNCE_MS,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrafeConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    pub mode: IntegrationMode,

    pub toggles: ToggleKeys,

    pub movement: MovementConfig,
}

impl Default for StrafeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            mode: IntegrationMode::default(),
            toggles: ToggleKeys::default(),
            movement: MovementConfig::default(),
        }
    }
}

impl StrafeConfig {
    /// Load config from the default location, creating it if missing
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&config_path()?)
    }

    /// Save config to the default location
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&config_path()?)
    }

    /// Reload config from the default location
    pub fn reload(&mut self) -> ConfigResult<()> {
        self.reload_from(&config_path()?)
    }

    /// Load config from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::debug!("Loaded config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save_to(path)?;
            tracing::info!("Created default config at {:?}", path);
            Ok(default)
        }
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Replace self with the contents of `path`
    pub fn reload_from(&mut self, path: &Path) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path)?;
        *self = toml::from_str(&content)?;
        tracing::debug!("Reloaded config from {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("strafe-config-test-{}", std::process::id()))
            .join(name)
            .join("strafe.toml")
    }

    #[test]
    fn test_config_default() {
        let config = StrafeConfig::default();
        assert_eq!(config.version, 1);
        assert!(!config.debug);
        assert_eq!(config.mode, IntegrationMode::Overlay);
        assert_eq!(config.toggles.autohop_key, 0x74);
        assert_eq!(config.toggles.movement_key, 0x75);
        assert_eq!(config.movement.debounce_ms, 250);
    }

    #[test]
    fn test_config_serialize_deserialize() {
        let mut config = StrafeConfig::default();
        config.mode = IntegrationMode::MidHook;
        config.movement.tunables.max_air_speed = 12.5;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("mode = \"mid_hook\""));

        let parsed: StrafeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: StrafeConfig = toml::from_str(
            r#"
            debug = true

            [movement]
            ground_friction = 0.004
            "#,
        )
        .unwrap();

        assert!(parsed.debug);
        assert_eq!(parsed.movement.tunables.ground_friction, 0.004);
        assert_eq!(parsed.movement.tunables.air_acceleration, 0.0075);
        assert_eq!(parsed.movement.debounce_ms, 250);
        assert_eq!(parsed.toggles, ToggleKeys::default());
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let result: Result<StrafeConfig, _> = toml::from_str(r#"mode = "teleport""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_creates_default_then_reload() {
        let path = scratch_path("create");
        let _ = std::fs::remove_file(&path);

        let mut config = StrafeConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, StrafeConfig::default());

        std::fs::write(&path, "debug = true\nmode = \"mid_hook\"\n").unwrap();
        config.reload_from(&path).unwrap();
        assert!(config.debug);
        assert_eq!(config.mode, IntegrationMode::MidHook);

        let _ = std::fs::remove_file(&path);
    }
}
