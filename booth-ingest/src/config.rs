//! booth-ingest configuration
//!
//! Each setting resolves from, highest priority first: command-line flag or
//! environment variable (handled by the argument parser in `main`), the TOML
//! config file, then compiled defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::groups::StorageLayout;
use crate::hub::DEFAULT_OUTBOUND_CAPACITY;
use crate::watcher::DEFAULT_SETTLE;

/// Default listen address for the HTTP API and hub
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3001";

/// Overlay file name looked up under the storage root when not configured
pub const DEFAULT_OVERLAY_FILE: &str = "watermark.png";

/// Settings read from the TOML file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub bind_addr: Option<String>,
    pub storage_root: Option<PathBuf>,
    pub overlay_path: Option<PathBuf>,
    pub settle_ms: Option<u64>,
    pub hub_outbound_capacity: Option<usize>,
    pub log_level: Option<String>,
}

/// Settings given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind_addr: Option<String>,
    pub storage_root: Option<PathBuf>,
    pub overlay_path: Option<PathBuf>,
    pub settle_ms: Option<u64>,
}

/// Resolved booth-ingest configuration
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub bind_addr: String,
    /// Parent of `buffer/`, `draft/`, `sent/`, `trash/`
    pub storage_root: PathBuf,
    /// Watermark overlay asset
    pub overlay_path: PathBuf,
    pub settle: Duration,
    pub hub_outbound_capacity: usize,
    pub log_level: String,
}

impl IngestConfig {
    /// Merge overrides over the config file over compiled defaults
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self> {
        let storage_root = overrides
            .storage_root
            .or(file.storage_root)
            .unwrap_or_else(booth_common::config::default_storage_root);

        let overlay_path = overrides
            .overlay_path
            .or(file.overlay_path)
            .unwrap_or_else(|| storage_root.join(DEFAULT_OVERLAY_FILE));

        let bind_addr = overrides
            .bind_addr
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        if bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(Error::Config(format!("Invalid bind address: {bind_addr}")));
        }

        let settle = overrides
            .settle_ms
            .or(file.settle_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SETTLE);

        let hub_outbound_capacity = file
            .hub_outbound_capacity
            .unwrap_or(DEFAULT_OUTBOUND_CAPACITY);
        if hub_outbound_capacity == 0 {
            return Err(Error::Config("hub_outbound_capacity must be at least 1".to_string()));
        }

        Ok(Self {
            bind_addr,
            storage_root,
            overlay_path,
            settle,
            hub_outbound_capacity,
            log_level: file.log_level.unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Locate and read the config file, then resolve
    pub fn load(config_file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let path = booth_common::config::resolve_config_path(config_file, "ingest");
        let file: FileConfig = booth_common::config::load_or_default(path.as_deref())?;
        Self::resolve(file, overrides)
    }

    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(&self.storage_root)
    }
}
