use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
#[cfg(feature = "yaml-config")]
use serde_yaml;
#[cfg(feature = "toml-config")]
use toml;

use crate::kernel::constants;
use crate::storage::error::StorageSystemError;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// Settings of a filelist provider.
///
/// `plugin_paths` is the ordered search-path set: manifests are loaded from
/// each directory in turn and library resolution probes them in this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Directories holding a manifest and the libraries it names
    pub plugin_paths: Vec<PathBuf>,
    /// Manifest file name looked up in every plugin directory
    pub manifest_file_name: String,
    /// File extensions treated as loadable libraries during resolution
    pub library_extensions: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            plugin_paths: Vec::new(),
            manifest_file_name: constants::MANIFEST_FILE_NAME.to_string(),
            library_extensions: constants::LIBRARY_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl ProviderConfig {
    /// Configuration searching the given directories with default settings.
    pub fn with_plugin_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            plugin_paths: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Append a search directory (lowest precedence).
    pub fn add_plugin_path(&mut self, path: impl Into<PathBuf>) {
        self.plugin_paths.push(path.into());
    }

    /// Load and validate a configuration file; the format follows the extension.
    pub fn load(path: &Path) -> Result<Self, StorageSystemError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            StorageSystemError::UnsupportedConfigFormat(path.display().to_string())
        })?;
        let content = fs::read_to_string(path)
            .map_err(|e| StorageSystemError::io(e, "read_config", path.to_path_buf()))?;
        Self::parse(&content, format)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, StorageSystemError> {
        let config: ProviderConfig = match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| {
                StorageSystemError::DeserializationError {
                    format: "JSON".to_string(),
                    source: Box::new(e),
                }
            })?,
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
                StorageSystemError::DeserializationError {
                    format: "YAML".to_string(),
                    source: Box::new(e),
                }
            })?,
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| {
                StorageSystemError::DeserializationError {
                    format: "TOML".to_string(),
                    source: Box::new(e),
                }
            })?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Serialize to string based on format
    pub fn serialize(&self, format: ConfigFormat) -> Result<String, StorageSystemError> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| {
                StorageSystemError::SerializationError {
                    format: "JSON".to_string(),
                    source: Box::new(e),
                }
            }),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(|e| {
                StorageSystemError::SerializationError {
                    format: "YAML".to_string(),
                    source: Box::new(e),
                }
            }),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| {
                StorageSystemError::SerializationError {
                    format: "TOML".to_string(),
                    source: Box::new(e),
                }
            }),
        }
    }

    /// Check the invariants the provider relies on.
    pub fn validate(&self) -> Result<(), StorageSystemError> {
        if self.manifest_file_name.is_empty() {
            return Err(StorageSystemError::InvalidConfig {
                key: "manifest_file_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.manifest_file_name.contains(['/', '\\']) {
            return Err(StorageSystemError::InvalidConfig {
                key: "manifest_file_name".to_string(),
                reason: format!("'{}' must be a bare file name", self.manifest_file_name),
            });
        }
        if self.library_extensions.iter().any(|ext| ext.trim_start_matches('.').is_empty()) {
            return Err(StorageSystemError::InvalidConfig {
                key: "library_extensions".to_string(),
                reason: "entries must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Extensions without a leading dot, as compared against `Path::extension`.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.library_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .collect()
    }
}
