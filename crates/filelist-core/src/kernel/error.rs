//! # Filelist Core Kernel Errors
//!
//! Defines the crate-wide [`Error`] type.
//!
//! Each subsystem owns a typed error enum (manifest, plugin system, storage);
//! this module aggregates them so hosts can use a single `Result` alias.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::manifest::error::ManifestError;
use crate::plugin_system::error::PluginSystemError;
use crate::storage::error::StorageSystemError;

/// Custom error type for the filelist provider
#[derive(Debug, ThisError)]
pub enum Error {
    /// Manifest read/write or validation failure
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Specific, typed plugin system error
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Specific, typed storage system error
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}
