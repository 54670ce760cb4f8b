//! Interfaces between the provider and its host.
//!
//! The provider never loads code or keeps plugin instances itself. It asks a
//! [`LibraryInspector`] to read and open library files, hands the opened
//! [`LoadedLibrary`] to the [`PluginHost`] for instantiation, and reads the
//! host's [`RegisteredPlugin`] view back for reconciliation and rebuilds.
use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::reconciler::LoadReport;

/// Why the host is connecting a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectMode {
    /// Loaded while the host starts up
    #[default]
    Startup,
    /// Loaded into an already running host
    AfterStartup,
}

/// Why the host is disconnecting a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectMode {
    /// The host is shutting down
    HostShutdown,
    /// A user asked to unload the plugin
    UserClosed,
}

impl fmt::Display for ConnectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectMode::Startup => write!(f, "startup"),
            ConnectMode::AfterStartup => write!(f, "after-startup"),
        }
    }
}

/// A live plugin object created from a library.
pub trait PluginInstance: Send + Sync + Debug {
    /// Fully qualified runtime type name, as written in manifests.
    fn type_name(&self) -> &str;
}

/// A library opened by a [`LibraryInspector`].
pub trait LoadedLibrary: Send + Sync + Debug {
    /// File the library was opened from
    fn path(&self) -> &Path;

    /// Create an instance of `type_name`.
    fn instantiate(&self, type_name: &str) -> Result<Box<dyn PluginInstance>, PluginSystemError>;
}

/// Shared handle to an opened library
pub type LibraryHandle = Arc<dyn LoadedLibrary>;

/// Library introspection primitive.
pub trait LibraryInspector: Send + Sync {
    /// Read the strong identity embedded in a library file.
    ///
    /// Fails with [`PluginSystemError::InvalidImage`] for files that are not
    /// library images of the expected kind.
    fn read_identity(&self, path: &Path) -> Result<String, PluginSystemError>;

    /// Open a library for instantiation.
    fn load_library(&self, path: &Path) -> Result<LibraryHandle, PluginSystemError>;
}

/// Read-only view of a plugin the host has registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredPlugin {
    /// Absolute path of the library the plugin was created from
    pub source_path: PathBuf,
    /// Runtime type name of the instance
    pub type_name: String,
}

impl RegisteredPlugin {
    pub fn new(source_path: impl Into<PathBuf>, type_name: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            type_name: type_name.into(),
        }
    }
}

/// The host's plugin registry as seen by the provider.
pub trait PluginHost: Send + Sync {
    /// Snapshot of every registered plugin.
    fn registered_plugins(&self) -> Vec<RegisteredPlugin>;

    /// Instantiate `type_name` from `library` and register it with `source`
    /// as provenance.
    fn load_plugin(
        &self,
        library: &LibraryHandle,
        type_name: &str,
        source: &Path,
        mode: ConnectMode,
    ) -> Result<(), PluginSystemError>;
}

/// A library located by an [`AssemblyResolver`].
#[derive(Debug, Clone)]
pub struct ResolvedLibrary {
    pub path: PathBuf,
    pub library: LibraryHandle,
}

/// Locates libraries by strong identity.
pub trait AssemblyResolver: Send + Sync {
    /// `Ok(None)` when nothing matched, here or in any fallback.
    fn resolve(&self, library_name: &str) -> Result<Option<ResolvedLibrary>, PluginSystemError>;
}

/// Lifecycle a host drives on a plugin provider.
pub trait PluginProvider: AssemblyResolver {
    fn name(&self) -> &'static str;

    /// Prepare the provider; called once before [`PluginProvider::load_plugins`].
    fn attach(&mut self, mode: ConnectMode) -> Result<(), PluginSystemError>;

    /// Release every resource acquired since attach. Safe to call repeatedly.
    fn detach(&mut self, mode: DisconnectMode) -> Result<(), PluginSystemError>;

    /// Load the plugins listed in every configured directory.
    fn load_plugins(&mut self) -> LoadReport;

    /// Resolver consulted when this provider finds nothing.
    fn parent(&self) -> Option<&Arc<dyn AssemblyResolver>>;
}
