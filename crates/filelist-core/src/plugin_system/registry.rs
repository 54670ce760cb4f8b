use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::kernel::Trace;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::{
    ConnectMode, LibraryHandle, PluginHost, PluginInstance, RegisteredPlugin,
};
use crate::utils::fs::paths_equal_ignore_case;

/// A plugin instance held by the registry
#[derive(Debug, Clone)]
pub struct PluginEntry {
    pub source_path: PathBuf,
    pub mode: ConnectMode,
    pub instance: Arc<dyn PluginInstance>,
    // Keeps the library mapped for as long as the instance lives.
    library: LibraryHandle,
}

impl PluginEntry {
    pub fn type_name(&self) -> &str {
        self.instance.type_name()
    }

    pub fn library(&self) -> &LibraryHandle {
        &self.library
    }
}

/// In-memory [`PluginHost`].
///
/// Refuses to register the same type twice from the same library file.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: RwLock<Vec<PluginEntry>>,
    trace: Trace,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace(trace: Trace) -> Self {
        Self {
            plugins: RwLock::default(),
            trace,
        }
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Snapshot of every entry in registration order
    pub fn entries(&self) -> Vec<PluginEntry> {
        self.plugins.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_registered(&self, source: &Path, type_name: &str) -> bool {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| entry.type_name() == type_name && paths_equal_ignore_case(&entry.source_path, source))
    }

    /// Drop every instance, newest first.
    pub fn shutdown_all(&self) -> usize {
        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        let count = plugins.len();
        while let Some(entry) = plugins.pop() {
            self.trace.debug(format_args!(
                "Releasing plugin '{}' from {}",
                entry.type_name(),
                entry.source_path.display()
            ));
        }
        count
    }
}

impl PluginHost for PluginRegistry {
    fn registered_plugins(&self) -> Vec<RegisteredPlugin> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| RegisteredPlugin::new(entry.source_path.clone(), entry.type_name()))
            .collect()
    }

    fn load_plugin(
        &self,
        library: &LibraryHandle,
        type_name: &str,
        source: &Path,
        mode: ConnectMode,
    ) -> Result<(), PluginSystemError> {
        if self.is_registered(source, type_name) {
            return Err(PluginSystemError::RegistrationError {
                path: source.to_path_buf(),
                type_name: type_name.to_string(),
                message: "already registered".to_string(),
            });
        }

        let instance: Arc<dyn PluginInstance> = library.instantiate(type_name)?.into();
        self.plugins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PluginEntry {
                source_path: source.to_path_buf(),
                mode,
                instance,
                library: Arc::clone(library),
            });
        self.trace.debug(format_args!(
            "Registered plugin '{}' from {} ({})",
            type_name,
            source.display(),
            mode
        ));
        Ok(())
    }
}
