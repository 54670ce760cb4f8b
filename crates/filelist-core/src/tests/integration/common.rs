#![cfg(test)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{Level, Log, Metadata, Record};

use crate::kernel::Trace;
use crate::plugin_system::error::{PluginSystemError, PluginSystemErrorSource};
use crate::plugin_system::traits::{
    AssemblyResolver, ConnectMode, LibraryHandle, LibraryInspector, LoadedLibrary, PluginHost,
    PluginInstance, RegisteredPlugin, ResolvedLibrary,
};
use crate::watch::{ChangeHandler, ManifestChange, Subscription, WatchService};

// ===== LOGGING =====

/// Logger keeping every record it receives.
#[derive(Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.messages(level).iter().any(|m| m.contains(needle))
    }

    pub fn count(&self, level: Level) -> usize {
        self.messages(level).len()
    }
}

impl Log for MemoryLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

pub fn memory_trace() -> (Trace, Arc<MemoryLogger>) {
    let logger = Arc::new(MemoryLogger::default());
    (Trace::new(logger.clone()), logger)
}

// ===== LIBRARIES =====

#[derive(Debug)]
pub struct FakeInstance {
    type_name: String,
}

impl PluginInstance for FakeInstance {
    fn type_name(&self) -> &str {
        &self.type_name
    }
}

#[derive(Debug)]
pub struct FakeLibrary {
    path: PathBuf,
    failing_types: HashSet<String>,
}

impl FakeLibrary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            failing_types: HashSet::new(),
        }
    }

    pub fn handle(path: impl Into<PathBuf>) -> LibraryHandle {
        Arc::new(Self::new(path))
    }
}

impl LoadedLibrary for FakeLibrary {
    fn path(&self) -> &Path {
        &self.path
    }

    fn instantiate(&self, type_name: &str) -> Result<Box<dyn PluginInstance>, PluginSystemError> {
        if self.failing_types.contains(type_name) {
            return Err(PluginSystemError::InstantiationError {
                path: self.path.clone(),
                type_name: type_name.to_string(),
                message: "constructor failed".to_string(),
            });
        }
        Ok(Box::new(FakeInstance {
            type_name: type_name.to_string(),
        }))
    }
}

/// Inspector working on real files: a path must exist to be read or loaded,
/// and only files given an identity count as library images.
#[derive(Default)]
pub struct FakeInspector {
    identities: HashMap<PathBuf, String>,
    broken: HashSet<PathBuf>,
    unreadable: HashMap<PathBuf, String>,
    failing_types: HashSet<String>,
    identity_reads: Mutex<Vec<PathBuf>>,
    loads: Mutex<Vec<PathBuf>>,
}

impl FakeInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, path: impl Into<PathBuf>, identity: &str) -> Self {
        self.identities.insert(path.into(), identity.to_string());
        self
    }

    /// Identity can be read but loading fails.
    pub fn with_broken(mut self, path: impl Into<PathBuf>) -> Self {
        self.broken.insert(path.into());
        self
    }

    /// Reading the identity fails with an internal error.
    pub fn with_unreadable(mut self, path: impl Into<PathBuf>, message: &str) -> Self {
        self.unreadable.insert(path.into(), message.to_string());
        self
    }

    pub fn with_failing_type(mut self, type_name: &str) -> Self {
        self.failing_types.insert(type_name.to_string());
        self
    }

    pub fn identity_reads(&self) -> Vec<PathBuf> {
        self.identity_reads.lock().unwrap().clone()
    }

    pub fn loads(&self) -> Vec<PathBuf> {
        self.loads.lock().unwrap().clone()
    }

    fn missing(path: &Path) -> PluginSystemError {
        PluginSystemError::LoadingError {
            path: path.to_path_buf(),
            source: Box::new(PluginSystemErrorSource::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            ))),
        }
    }
}

impl LibraryInspector for FakeInspector {
    fn read_identity(&self, path: &Path) -> Result<String, PluginSystemError> {
        self.identity_reads.lock().unwrap().push(path.to_path_buf());
        if !path.is_file() {
            return Err(Self::missing(path));
        }
        if let Some(message) = self.unreadable.get(path) {
            return Err(PluginSystemError::InternalError(message.clone()));
        }
        self.identities
            .get(path)
            .cloned()
            .ok_or_else(|| PluginSystemError::InvalidImage {
                path: path.to_path_buf(),
                message: "not a library".to_string(),
            })
    }

    fn load_library(&self, path: &Path) -> Result<LibraryHandle, PluginSystemError> {
        self.loads.lock().unwrap().push(path.to_path_buf());
        if !path.is_file() {
            return Err(Self::missing(path));
        }
        if self.broken.contains(path) {
            return Err(PluginSystemError::LoadingError {
                path: path.to_path_buf(),
                source: Box::new(PluginSystemErrorSource::Other("bad image".to_string())),
            });
        }
        Ok(Arc::new(FakeLibrary {
            path: path.to_path_buf(),
            failing_types: self.failing_types.clone(),
        }))
    }
}

// ===== HOST =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAttempt {
    pub library_path: PathBuf,
    pub type_name: String,
    pub source: PathBuf,
    pub mode: ConnectMode,
}

/// Host recording every load request and registering what instantiates.
#[derive(Default)]
pub struct FakeHost {
    plugins: Mutex<Vec<RegisteredPlugin>>,
    attempts: Mutex<Vec<LoadAttempt>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugins(plugins: Vec<RegisteredPlugin>) -> Self {
        Self {
            plugins: Mutex::new(plugins),
            attempts: Mutex::default(),
        }
    }

    pub fn attempts(&self) -> Vec<LoadAttempt> {
        self.attempts.lock().unwrap().clone()
    }
}

impl PluginHost for FakeHost {
    fn registered_plugins(&self) -> Vec<RegisteredPlugin> {
        self.plugins.lock().unwrap().clone()
    }

    fn load_plugin(
        &self,
        library: &LibraryHandle,
        type_name: &str,
        source: &Path,
        mode: ConnectMode,
    ) -> Result<(), PluginSystemError> {
        self.attempts.lock().unwrap().push(LoadAttempt {
            library_path: library.path().to_path_buf(),
            type_name: type_name.to_string(),
            source: source.to_path_buf(),
            mode,
        });
        let instance = library.instantiate(type_name)?;
        self.plugins
            .lock()
            .unwrap()
            .push(RegisteredPlugin::new(source, instance.type_name()));
        Ok(())
    }
}

// ===== RESOLVERS =====

/// Parent resolver returning a fixed answer.
pub struct StaticResolver {
    answer: Option<PathBuf>,
    calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new(answer: Option<PathBuf>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AssemblyResolver for StaticResolver {
    fn resolve(&self, _library_name: &str) -> Result<Option<ResolvedLibrary>, PluginSystemError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.as_ref().map(|path| ResolvedLibrary {
            path: path.clone(),
            library: FakeLibrary::handle(path.clone()),
        }))
    }
}

// ===== WATCHES =====

/// Watch service whose events are fired by hand.
#[derive(Default)]
pub struct FakeWatchService {
    handlers: Mutex<Vec<(PathBuf, String, ChangeHandler)>>,
    cancelled: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeWatchService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories and file names watched so far, in order.
    pub fn watched(&self) -> Vec<(PathBuf, String)> {
        self.handlers
            .lock()
            .unwrap()
            .iter()
            .map(|(dir, name, _)| (dir.clone(), name.clone()))
            .collect()
    }

    pub fn cancelled(&self) -> Vec<PathBuf> {
        self.cancelled.lock().unwrap().clone()
    }

    /// Deliver `change` to every handler watching `directory`.
    pub fn fire(&self, directory: &Path, change: ManifestChange) {
        let handlers: Vec<ChangeHandler> = self
            .handlers
            .lock()
            .unwrap()
            .iter()
            .filter(|(dir, _, _)| dir == directory)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(change.clone());
        }
    }
}

impl WatchService for FakeWatchService {
    fn watch(
        &self,
        directory: &Path,
        file_name: &str,
        on_change: ChangeHandler,
    ) -> Result<Box<dyn Subscription>, PluginSystemError> {
        self.handlers.lock().unwrap().push((
            directory.to_path_buf(),
            file_name.to_string(),
            on_change,
        ));
        Ok(Box::new(FakeSubscription {
            directory: directory.to_path_buf(),
            cancelled: Arc::clone(&self.cancelled),
        }))
    }
}

struct FakeSubscription {
    directory: PathBuf,
    cancelled: Arc<Mutex<Vec<PathBuf>>>,
}

impl Subscription for FakeSubscription {
    fn directory(&self) -> &Path {
        &self.directory
    }

    fn cancel(self: Box<Self>) {
        self.cancelled.lock().unwrap().push(self.directory.clone());
    }
}

// ===== FILES =====

/// Create a placeholder file (and its parent directories).
pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"stub").unwrap();
}

pub fn write_manifest(directory: &Path, text: &str) -> PathBuf {
    let path = directory.join("list.xml");
    fs::write(&path, text).unwrap();
    path
}

/// Manifest text for `(library, [types])` pairs.
pub fn manifest_xml(entries: &[(&str, &[&str])]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Plugins>\n");
    for (library, types) in entries {
        xml.push_str(&format!("  <Plugin Assembly=\"{}\">\n", library));
        for type_name in *types {
            xml.push_str(&format!("    <Instance>{}</Instance>\n", type_name));
        }
        xml.push_str("  </Plugin>\n");
    }
    xml.push_str("</Plugins>\n");
    xml
}
