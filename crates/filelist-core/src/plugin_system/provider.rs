use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};

use crate::kernel::{Result as KernelResult, Trace};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::loader::DynamicLibraryInspector;
use crate::plugin_system::rebuilder::ManifestRebuilder;
use crate::plugin_system::reconciler::{LoadReport, ManifestLoader};
use crate::plugin_system::resolver::DirectoryResolver;
use crate::plugin_system::traits::{
    AssemblyResolver, ConnectMode, DisconnectMode, LibraryInspector, PluginHost, PluginProvider,
    ResolvedLibrary,
};
use crate::storage::config::ProviderConfig;
use crate::watch::{ChangeHandler, ManifestChange, NotifyWatchService, Subscription, WatchService};

const PROVIDER_NAME: &str = "filelist";

/// Plugin provider driven by per-directory `list.xml` manifests.
///
/// Loads the plugins each configured directory lists, resolves libraries by
/// identity across the same directories, rebuilds manifests from the host's
/// state and watches the manifests it loaded while attached.
pub struct FileListProvider {
    config: ProviderConfig,
    loader: ManifestLoader,
    rebuilder: ManifestRebuilder,
    resolver: DirectoryResolver,
    watch_service: Arc<dyn WatchService>,
    changes: Option<Sender<ManifestChange>>,
    // `None` while detached. Locked because subscriptions are only `Send`.
    monitors: Mutex<Option<Vec<Box<dyn Subscription>>>>,
    mode: ConnectMode,
    trace: Trace,
}

impl FileListProvider {
    pub fn builder(host: Arc<dyn PluginHost>) -> FileListProviderBuilder {
        FileListProviderBuilder::new(host)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn is_attached(&self) -> bool {
        self.monitors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn connect_mode(&self) -> ConnectMode {
        self.mode
    }

    /// Directories currently under watch
    pub fn watched_directories(&self) -> Vec<PathBuf> {
        self.monitors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .flatten()
            .map(|subscription| subscription.directory().to_path_buf())
            .collect()
    }

    /// Load the manifest of a single directory with the current connect mode.
    pub fn load_from_directory(&self, directory: &Path) -> Result<LoadReport, PluginSystemError> {
        self.loader.load_from_directory(directory, self.mode)
    }

    pub fn rebuild_manifest_for(&self, directory: &Path) -> Result<Option<PathBuf>, PluginSystemError> {
        self.rebuilder.rebuild_for(directory)
    }

    /// Rebuild the manifest of every configured directory; returns the files
    /// written.
    pub fn rebuild_manifests(&self) -> Result<Vec<PathBuf>, PluginSystemError> {
        let mut written = Vec::new();
        for directory in &self.config.plugin_paths {
            if let Some(path) = self.rebuilder.rebuild_for(directory)? {
                written.push(path);
            }
        }
        Ok(written)
    }

    fn add_monitor(&mut self, directory: &Path) {
        let monitors = self.monitors.get_mut().unwrap_or_else(PoisonError::into_inner);
        let Some(monitors) = monitors.as_mut() else {
            self.trace.debug(format_args!(
                "Not attached, {} will not be watched",
                directory.display()
            ));
            return;
        };
        if monitors.iter().any(|subscription| subscription.directory() == directory) {
            return;
        }

        let trace = self.trace.clone();
        let changes = self.changes.clone();
        let handler: ChangeHandler = Arc::new(move |change: ManifestChange| {
            trace.info(format_args!("File {} {}", change.path.display(), change.kind));
            if let Some(sender) = &changes {
                // A dropped receiver only means nobody is listening.
                let _ = sender.send(change);
            }
        });

        match self
            .watch_service
            .watch(directory, &self.config.manifest_file_name, handler)
        {
            Ok(subscription) => monitors.push(subscription),
            Err(e) => self.trace.warn(format_args!(
                "Unable to watch {}: {}",
                directory.display(),
                e
            )),
        }
    }
}

impl AssemblyResolver for FileListProvider {
    fn resolve(&self, library_name: &str) -> Result<Option<ResolvedLibrary>, PluginSystemError> {
        self.resolver.resolve(library_name)
    }
}

impl PluginProvider for FileListProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn attach(&mut self, mode: ConnectMode) -> Result<(), PluginSystemError> {
        self.mode = mode;
        self.monitors
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(Vec::new);
        self.trace
            .debug(format_args!("Provider {} attached ({})", PROVIDER_NAME, mode));
        Ok(())
    }

    fn detach(&mut self, mode: DisconnectMode) -> Result<(), PluginSystemError> {
        if mode == DisconnectMode::UserClosed {
            return Err(PluginSystemError::UnloadNotSupported {
                provider: PROVIDER_NAME,
            });
        }

        let monitors = self
            .monitors
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(monitors) = monitors {
            for subscription in monitors {
                self.trace.info(format_args!(
                    "Stop monitoring {}",
                    subscription.directory().display()
                ));
                subscription.cancel();
            }
        }
        Ok(())
    }

    fn load_plugins(&mut self) -> LoadReport {
        let mut report = LoadReport::default();
        let directories = self.config.plugin_paths.clone();

        for directory in &directories {
            if !directory.is_dir() {
                self.trace.debug(format_args!(
                    "Plugin directory {} does not exist",
                    directory.display()
                ));
                continue;
            }

            if !self.loader.manifest_path(directory).is_file() {
                self.trace.info(format_args!(
                    "Plugin list {} not found in target directory",
                    self.loader.manifest_path(directory).display()
                ));
                continue;
            }

            match self.loader.load_from_directory(directory, self.mode) {
                Ok(directory_report) => report.merge(directory_report),
                Err(e) => self.trace.error(format_args!(
                    "Skipping {}: {}",
                    directory.display(),
                    e
                )),
            }
            self.add_monitor(directory);
        }

        report
    }

    fn parent(&self) -> Option<&Arc<dyn AssemblyResolver>> {
        self.resolver.parent()
    }
}

/// Assembles a [`FileListProvider`] around a host.
pub struct FileListProviderBuilder {
    host: Arc<dyn PluginHost>,
    config: ProviderConfig,
    inspector: Option<Arc<dyn LibraryInspector>>,
    watch_service: Option<Arc<dyn WatchService>>,
    parent: Option<Arc<dyn AssemblyResolver>>,
    changes: Option<Sender<ManifestChange>>,
    trace: Option<Trace>,
}

impl FileListProviderBuilder {
    pub fn new(host: Arc<dyn PluginHost>) -> Self {
        Self {
            host,
            config: ProviderConfig::default(),
            inspector: None,
            watch_service: None,
            parent: None,
            changes: None,
            trace: None,
        }
    }

    pub fn config(mut self, config: ProviderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn plugin_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.add_plugin_path(path);
        self
    }

    pub fn inspector(mut self, inspector: Arc<dyn LibraryInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    pub fn watch_service(mut self, watch_service: Arc<dyn WatchService>) -> Self {
        self.watch_service = Some(watch_service);
        self
    }

    /// Resolver asked when a library is not found locally
    pub fn parent(mut self, parent: Arc<dyn AssemblyResolver>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Forward manifest change events to `sender` in addition to logging them.
    pub fn change_channel(mut self, sender: Sender<ManifestChange>) -> Self {
        self.changes = Some(sender);
        self
    }

    pub fn trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn build(self) -> KernelResult<FileListProvider> {
        self.config.validate()?;

        let trace = self
            .trace
            .unwrap_or_else(Trace::global);
        let inspector = self
            .inspector
            .unwrap_or_else(|| Arc::new(DynamicLibraryInspector::new(trace.clone())));
        let watch_service = self
            .watch_service
            .unwrap_or_else(|| Arc::new(NotifyWatchService::new(trace.clone())));

        let loader = ManifestLoader::new(
            Arc::clone(&self.host),
            Arc::clone(&inspector),
            self.config.manifest_file_name.clone(),
            trace.clone(),
        );
        let rebuilder = ManifestRebuilder::new(
            Arc::clone(&self.host),
            self.config.manifest_file_name.clone(),
            trace.clone(),
        );
        let resolver = DirectoryResolver::new(
            self.config.plugin_paths.clone(),
            self.config.normalized_extensions(),
            inspector,
            trace.clone(),
        )
        .with_parent(self.parent);

        Ok(FileListProvider {
            config: self.config,
            loader,
            rebuilder,
            resolver,
            watch_service,
            changes: self.changes,
            monitors: Mutex::new(None),
            mode: ConnectMode::default(),
            trace,
        })
    }
}
