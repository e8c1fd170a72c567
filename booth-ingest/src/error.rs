//! Error types for booth-ingest
//!
//! Nothing here is fatal to the daemon once it is running: a failure either
//! leaves one capture file in the landing zone or drops one control message.

use std::path::PathBuf;
use thiserror::Error;

use crate::watermark::ProcessingError;

/// Main error type for booth-ingest
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Watermark decode/composite/encode failure; the source stays in place
    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    /// Directory create, write, rename, or delete failure during relocation
    #[error("Relocation failed for {path}: {source}")]
    Relocation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem watcher errors
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from shared booth code (group store, config files)
    #[error(transparent)]
    Common(#[from] booth_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn relocation(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Relocation {
            path: path.into(),
            source,
        }
    }
}

/// Convenience Result type using booth-ingest Error
pub type Result<T> = std::result::Result<T, Error>;
