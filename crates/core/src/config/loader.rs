//! Config path resolution
//!
//! The default config lives next to the executable that embeds tinyproto.

use std::path::PathBuf;

use super::{ConfigError, ConfigResult};

/// Environment variable overriding the base directory
pub const BASE_DIR_ENV: &str = "TINYPROTO_HOME";

/// Returns the tinyproto base directory.
///
/// `TINYPROTO_HOME` when set, otherwise the directory holding the running
/// executable.
pub fn base_dir() -> ConfigResult<PathBuf> {
    if let Some(home) = std::env::var_os(BASE_DIR_ENV) {
        return Ok(PathBuf::from(home));
    }

    let exe = std::env::current_exe().map_err(ConfigError::IoError)?;
    exe.parent()
        .map(PathBuf::from)
        .ok_or(ConfigError::NoConfigDirectory)
}

/// Returns the configs directory.
///
/// Path: `{base}/config/`
pub fn config_dir() -> ConfigResult<PathBuf> {
    Ok(base_dir()?.join("config"))
}

/// Returns the default config file path.
///
/// Path: `{base}/config/tinyproto.toml`
pub fn default_config_path() -> ConfigResult<PathBuf> {
    Ok(config_dir()?.join("tinyproto.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path_format() {
        let path = default_config_path().unwrap();
        assert!(path.ends_with("config/tinyproto.toml"));
    }
}
