//! # Plugin System Errors
//!
//! Defines [`PluginSystemError`], the error type shared by the resolver, the
//! manifest loader, the rebuilder and the provider lifecycle. Variants carry
//! the library path they concern so failures can be reported with context.
use std::path::PathBuf;

use crate::manifest::error::ManifestError;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument {
        argument: &'static str,
        message: String,
    },

    #[error("'{path}' is not a loadable library image: {message}")]
    InvalidImage { path: PathBuf, message: String },

    #[error("Library loading failed for '{path}': {source}")]
    LoadingError {
        path: PathBuf,
        #[source]
        source: Box<PluginSystemErrorSource>,
    },

    #[error("Failed to instantiate '{type_name}' from '{path}': {message}")]
    InstantiationError {
        path: PathBuf,
        type_name: String,
        message: String,
    },

    #[error("Plugin registration error for '{type_name}' from '{path}': {message}")]
    RegistrationError {
        path: PathBuf,
        type_name: String,
        message: String,
    },

    #[error("Failed to watch '{path}': {source}")]
    WatchError {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Plugin provider '{provider}' can't be unloaded by the user")]
    UnloadNotSupported { provider: &'static str },

    #[error("Plugin list error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Internal plugin system error: {0}")]
    InternalError(String),
}

impl PluginSystemError {
    pub(crate) fn loading(path: impl Into<PathBuf>, source: impl Into<PluginSystemErrorSource>) -> Self {
        PluginSystemError::LoadingError {
            path: path.into(),
            source: Box::new(source.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemErrorSource {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Library(#[from] libloading::Error),
    #[error("Other: {0}")]
    Other(String),
}
