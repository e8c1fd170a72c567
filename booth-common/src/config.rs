//! Configuration file resolution and loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Steps 1 and 2 are handled by each binary's argument parser; this module
//! locates and reads the TOML file. A missing config file is never fatal.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "BOOTH_CONFIG";

/// Locate the config file for `app_name`
///
/// Order: explicit path, `$BOOTH_CONFIG`, `<config dir>/booth/<app_name>.toml`,
/// `/etc/booth/<app_name>.toml` (Linux only). Only existing files are returned.
pub fn resolve_config_path(explicit: Option<&Path>, app_name: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let file_name = format!("{app_name}.toml");
    let user_config = dirs::config_dir().map(|d| d.join("booth").join(&file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/booth").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default storage root
pub fn default_storage_root() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/booth (or /var/lib/booth for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("booth"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/booth"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/booth
        dirs::data_dir()
            .map(|d| d.join("booth"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/booth"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\booth
        dirs::data_local_dir()
            .map(|d| d.join("booth"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\booth"))
    } else {
        PathBuf::from("./booth_data")
    }
}

/// Parse a TOML config file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
}

/// Load a config file, falling back to defaults when it is missing
///
/// A file that exists but fails to parse is an error; a file that does not
/// exist only produces a warning.
pub fn load_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    match path {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            load_toml(path)
        }
        Some(path) => {
            warn!("Config file {} not found, using defaults", path.display());
            Ok(T::default())
        }
        None => {
            info!("No config file found, using defaults");
            Ok(T::default())
        }
    }
}
