//! # Filelist Plugin System
//!
//! Everything between a plugin directory and the host's plugin registry:
//! reading the manifest of each configured directory, loading what it lists,
//! finding libraries by identity and writing manifests back from the host's
//! live state.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`traits`]**: the collaborator interfaces ([`PluginHost`],
//!   [`LibraryInspector`], [`LoadedLibrary`], [`AssemblyResolver`]) and the
//!   [`PluginProvider`] lifecycle.
//! - **[`resolver`]**: [`DirectoryResolver`], first-match identity search
//!   with optional parent fallback.
//! - **[`reconciler`]**: [`ManifestLoader`], loads a manifest's descriptors
//!   that the host does not already have, isolating failures per descriptor.
//! - **[`rebuilder`]**: [`ManifestRebuilder`], writes a manifest from the
//!   host's registered plugins without clobbering existing files.
//! - **[`provider`]**: [`FileListProvider`], the facade tying the above to a
//!   configuration and to manifest watches.
//! - **[`loader`]**: [`DynamicLibraryInspector`], the `libloading` backed
//!   default inspector.
//! - **[`registry`]**: [`PluginRegistry`], an in-memory host.
//! - **[`error`]**: [`PluginSystemError`].
pub mod error;
pub mod loader;
pub mod provider;
pub mod rebuilder;
pub mod reconciler;
pub mod registry;
pub mod resolver;
pub mod traits;

pub use error::{PluginSystemError, PluginSystemErrorSource};
pub use loader::DynamicLibraryInspector;
pub use provider::{FileListProvider, FileListProviderBuilder};
pub use rebuilder::ManifestRebuilder;
pub use reconciler::{LoadFailure, LoadReport, LoadedPlugin, ManifestLoader};
pub use registry::{PluginEntry, PluginRegistry};
pub use resolver::DirectoryResolver;
pub use traits::{
    AssemblyResolver, ConnectMode, DisconnectMode, LibraryHandle, LibraryInspector, LoadedLibrary,
    PluginHost, PluginInstance, PluginProvider, RegisteredPlugin, ResolvedLibrary,
};
