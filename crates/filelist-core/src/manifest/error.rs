//! # Manifest Errors
//!
//! [`ManifestError`] covers everything that can go wrong reading or writing a
//! plugin list: file access, XML that is not well-formed, documents that break
//! the embedded schema and descriptors that violate their invariants.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("I/O error during operation '{operation}' on manifest '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest '{path}' is not well-formed XML (near byte {position}): {source}")]
    Malformed {
        path: PathBuf,
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Manifest '{path}' failed schema validation: {message}")]
    Validation { path: PathBuf, message: String },

    #[error("Failed to serialize manifest '{path}': {message}")]
    Serialize { path: PathBuf, message: String },

    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument {
        argument: &'static str,
        message: String,
    },

    #[error("Invalid plugin descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
}

impl ManifestError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        ManifestError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }

    pub(crate) fn validation(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the error comes from the document itself rather than from
    /// file access.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ManifestError::Malformed { .. }
                | ManifestError::Validation { .. }
                | ManifestError::Descriptor(_)
        )
    }
}

/// Invariant violations when building a [`PluginDescriptor`](super::PluginDescriptor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("library identifier must not be empty")]
    EmptyLibraryId,

    #[error("library '{library_id}' declares no types to instantiate")]
    NoTypeNames { library_id: String },

    #[error("library '{library_id}' has an empty type name at position {index}")]
    EmptyTypeName { library_id: String, index: usize },
}
