//! Loads the plugins a manifest lists, skipping what the host already has.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::kernel::Trace;
use crate::manifest::{Manifest, PluginDescriptor};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::{ConnectMode, LibraryInspector, PluginHost};
use crate::utils::fs::paths_equal_ignore_case;

/// A type the host instantiated during a load pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPlugin {
    pub source_path: PathBuf,
    pub type_name: String,
}

/// A descriptor that could not be (fully) loaded.
#[derive(Debug)]
pub struct LoadFailure {
    /// Expected location of the library
    pub library_path: PathBuf,
    /// The type being instantiated, `None` when the library itself failed
    pub type_name: Option<String>,
    pub error: PluginSystemError,
}

/// Outcome of one or more load passes.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<LoadedPlugin>,
    /// Libraries left alone because the host already had them
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn merge(&mut self, other: LoadReport) {
        self.loaded.extend(other.loaded);
        self.skipped.extend(other.skipped);
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives the host through the descriptors of a manifest.
pub struct ManifestLoader {
    host: Arc<dyn PluginHost>,
    inspector: Arc<dyn LibraryInspector>,
    manifest_file_name: String,
    trace: Trace,
}

impl ManifestLoader {
    pub fn new(
        host: Arc<dyn PluginHost>,
        inspector: Arc<dyn LibraryInspector>,
        manifest_file_name: impl Into<String>,
        trace: Trace,
    ) -> Self {
        Self {
            host,
            inspector,
            manifest_file_name: manifest_file_name.into(),
            trace,
        }
    }

    pub fn manifest_path(&self, directory: &Path) -> PathBuf {
        directory.join(&self.manifest_file_name)
    }

    /// Load the manifest of `directory`, if it has one.
    ///
    /// A missing manifest is not an error. A manifest that fails to parse is,
    /// and nothing from it gets loaded.
    pub fn load_from_directory(
        &self,
        directory: &Path,
        mode: ConnectMode,
    ) -> Result<LoadReport, PluginSystemError> {
        let manifest_path = self.manifest_path(directory);
        if !manifest_path.is_file() {
            self.trace.info(format_args!(
                "Plugin list {} not found in target directory",
                manifest_path.display()
            ));
            return Ok(LoadReport::default());
        }

        let manifest = Manifest::load(directory, &self.manifest_file_name)?;
        self.trace.debug(format_args!(
            "Read {} descriptor(s) from {}",
            manifest.len(),
            manifest_path.display()
        ));
        Ok(self.reconcile(&manifest, mode))
    }

    /// Load every descriptor of `manifest` the host does not already have.
    ///
    /// Descriptors are handled independently; a failure is recorded and the
    /// pass moves on to the next one.
    pub fn reconcile(&self, manifest: &Manifest, mode: ConnectMode) -> LoadReport {
        let mut report = LoadReport::default();

        for descriptor in manifest.descriptors() {
            let library_path = manifest.library_path(descriptor);
            if self.is_registered(&library_path) {
                self.trace.debug(format_args!(
                    "{} is already loaded, skipping",
                    library_path.display()
                ));
                report.skipped.push(library_path);
                continue;
            }

            if let Err(failure) = self.load_descriptor(descriptor, &library_path, mode, &mut report) {
                match &failure.type_name {
                    Some(type_name) => self.trace.error(format_args!(
                        "Failed to load plugin {} from {}: {}",
                        type_name,
                        library_path.display(),
                        failure.error
                    )),
                    None => self.trace.error(format_args!(
                        "Failed to load plugin library {}: {}",
                        library_path.display(),
                        failure.error
                    )),
                }
                report.failures.push(failure);
            }
        }

        report
    }

    fn is_registered(&self, library_path: &Path) -> bool {
        self.host
            .registered_plugins()
            .iter()
            .any(|plugin| paths_equal_ignore_case(&plugin.source_path, library_path))
    }

    fn load_descriptor(
        &self,
        descriptor: &PluginDescriptor,
        library_path: &Path,
        mode: ConnectMode,
        report: &mut LoadReport,
    ) -> Result<(), LoadFailure> {
        let library = self
            .inspector
            .load_library(library_path)
            .map_err(|error| LoadFailure {
                library_path: library_path.to_path_buf(),
                type_name: None,
                error,
            })?;

        // The first type that fails ends this descriptor.
        for type_name in descriptor.type_names() {
            self.host
                .load_plugin(&library, type_name, library_path, mode)
                .map_err(|error| LoadFailure {
                    library_path: library_path.to_path_buf(),
                    type_name: Some(type_name.clone()),
                    error,
                })?;
            self.trace.info(format_args!(
                "Loaded plugin {} from {}",
                type_name,
                library_path.display()
            ));
            report.loaded.push(LoadedPlugin {
                source_path: library_path.to_path_buf(),
                type_name: type_name.clone(),
            });
        }
        Ok(())
    }
}
