//! Error types for hive loading operations.
//!
//! This module defines [`HiveError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Settings-file read failures are retried; only an exhausted retry ceiling
//!   produces `SettingsRead`
//! - Parse failures of persisted artifacts are always fatal and name the file
//! - Dangling references inside caches are recovered locally and logged, they
//!   never surface as errors
//! - Lookup misses (unknown generator, unknown mount point, absent file) are
//!   reported as `None`/`false` return values, not errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for hive loading operations.
#[derive(Debug, Error)]
pub enum HiveError {
    /// Settings file could not be read after the retry ceiling was exhausted.
    #[error("Failed to read settings file {path} after repeated attempts")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted settings content is malformed.
    #[error("Failed to parse settings file {path}: {message}")]
    SettingsParse { path: PathBuf, message: String },

    /// A persisted cache file is malformed.
    #[error("Failed to parse cache file {path}: {message}")]
    CacheParse { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for hive loading operations.
pub type Result<T> = std::result::Result<T, HiveError>;
