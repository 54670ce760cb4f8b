//! Manifest driven plugin discovery.
//!
//! Plugin directories carry a `list.xml` manifest naming the libraries to
//! load and the types to instantiate from each. [`FileListProvider`] reads
//! those manifests into a host's plugin registry, resolves libraries by
//! identity across the same directories, writes manifests back from what
//! the host has loaded and watches the manifests it read.
pub mod kernel;
pub mod manifest;
pub mod plugin_system;
pub mod storage;
pub mod utils;
pub mod watch;

pub use kernel::error::Error as KernelError;
pub use kernel::trace::Trace;
pub use manifest::{Manifest, ManifestFile, PluginDescriptor};
pub use plugin_system::{
    AssemblyResolver, ConnectMode, DisconnectMode, FileListProvider, PluginHost, PluginProvider,
    PluginRegistry,
};
pub use storage::ProviderConfig;
