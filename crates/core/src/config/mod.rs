//! Configuration for tinyproto
//!
//! A single TOML file selects the host runtime profile, enables or disables
//! individual escalation tiers and sets the symbol style per entity kind.
//! Every key is optional.
//!
//! # Example
//!
//! ```toml
//! version = 1
//! debug = false
//!
//! [host]
//! generation = "modular"
//!
//! [tiers]
//! legacy_metadata = true
//! metadata_handle = true
//! raw_memory = true
//! zero_init_allocation = true
//!
//! [symbols]
//! member = "verbatim"
//! type = "path-to-dot"
//! ```

mod loader;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tinyproto_mappings::SymbolStyles;
use tinyproto_runtime::HostProfile;

pub use loader::{base_dir, config_dir, default_config_path};

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

    /// Could not determine the config directory from the executable location
    #[error("Config directory not available - could not resolve base path")]
    NoConfigDirectory,
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Which escalation tiers may be attempted
///
/// Disabling a tier removes it from the ladder; the remaining tiers keep
/// their order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierSettings {
    /// Strip immutability through directly writable metadata
    pub legacy_metadata: bool,
    /// Strip immutability through a privileged metadata handle
    pub metadata_handle: bool,
    /// Offset-based writes and raw allocation
    pub raw_memory: bool,
    /// Allocate without running a constructor when the zero-argument
    /// constructor is missing or fails
    pub zero_init_allocation: bool,
}

impl Default for TierSettings {
    fn default() -> Self {
        Self {
            legacy_metadata: true,
            metadata_handle: true,
            raw_memory: true,
            zero_init_allocation: true,
        }
    }
}

/// Core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Enable debug logging
    pub debug: bool,

    /// Host runtime generation and capabilities
    pub host: HostProfile,

    pub tiers: TierSettings,

    /// Symbol normalization per entity kind
    pub symbols: SymbolStyles,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            version: 1,
            debug: false,
            host: HostProfile::default(),
            tiers: TierSettings::default(),
            symbols: SymbolStyles::default(),
        }
    }
}

impl CoreConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from `path`, creating the default if missing.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml_str(&content)?;
            tracing::info!("Loaded config from {:?}", path);
            Ok(config)
        } else {
            let default = Self::default();
            default.save(path)?;
            tracing::info!("Created default config at {:?}", path);
            Ok(default)
        }
    }

    /// Load config from the default location next to the executable.
    pub fn load_default() -> ConfigResult<Self> {
        Self::load(&default_config_path()?)
    }

    /// Save config to `path`.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reload config from `path`.
    pub fn reload(&mut self, path: &Path) -> ConfigResult<()> {
        let content = std::fs::read_to_string(path)?;
        *self = Self::from_toml_str(&content)?;
        tracing::debug!("Reloaded config from {:?}", path);
        Ok(())
    }
}
