use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::kernel::Trace;
use crate::manifest::{ManifestFile, PluginDescriptor};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::PluginHost;
use crate::utils::fs::{path_starts_with_ignore_case, unique_file_name};

/// Writes manifests describing what the host currently has loaded.
///
/// Existing manifests are never overwritten: output goes to the first free
/// name among `list.xml`, `list(1).xml`, `list(2).xml` and so on.
pub struct ManifestRebuilder {
    host: Arc<dyn PluginHost>,
    manifest_file_name: String,
    trace: Trace,
}

impl ManifestRebuilder {
    pub fn new(host: Arc<dyn PluginHost>, manifest_file_name: impl Into<String>, trace: Trace) -> Self {
        Self {
            host,
            manifest_file_name: manifest_file_name.into(),
            trace,
        }
    }

    /// One descriptor per registered plugin whose source lies under
    /// `directory`, in host order.
    pub fn collect(&self, directory: &Path) -> Vec<PluginDescriptor> {
        self.host
            .registered_plugins()
            .into_iter()
            .filter(|plugin| path_starts_with_ignore_case(&plugin.source_path, directory))
            .filter_map(|plugin| {
                let file_name = plugin
                    .source_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match PluginDescriptor::single(file_name, plugin.type_name.clone()) {
                    Ok(descriptor) => Some(descriptor),
                    Err(e) => {
                        self.trace.warn(format_args!(
                            "Leaving {} out of the rebuilt list: {}",
                            plugin.source_path.display(),
                            e
                        ));
                        None
                    }
                }
            })
            .collect()
    }

    /// Returns the path written, or `None` when nothing matched.
    pub fn rebuild_for(&self, directory: &Path) -> Result<Option<PathBuf>, PluginSystemError> {
        if directory.as_os_str().is_empty() {
            return Err(PluginSystemError::InvalidArgument {
                argument: "directory",
                message: "directory must not be empty".to_string(),
            });
        }

        let descriptors = self.collect(directory);
        if descriptors.is_empty() {
            self.trace.debug(format_args!(
                "No loaded plugins under {}, nothing to write",
                directory.display()
            ));
            return Ok(None);
        }

        let file_name = unique_file_name(directory, &self.manifest_file_name);
        let path = directory.join(file_name);
        ManifestFile::new(&path)?.write(&descriptors)?;
        self.trace.info(format_args!(
            "Wrote {} plugin(s) to {}",
            descriptors.len(),
            path.display()
        ));
        Ok(Some(path))
    }
}
