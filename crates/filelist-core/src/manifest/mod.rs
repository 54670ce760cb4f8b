//! # Plugin List Manifest
//!
//! A manifest is the `list.xml` file sitting in a plugin directory. It names
//! the libraries to load from that directory and, for each library, the types
//! to instantiate:
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8" standalone="no"?>
//! <Plugins>
//! 	<Plugin Assembly="ExampleLib.dll">
//! 		<Instance>Namespace.TypeA</Instance>
//! 	</Plugin>
//! </Plugins>
//! ```
//!
//! - **[`descriptor`]**: [`PluginDescriptor`] (one `Plugin` element) and
//!   [`Manifest`] (the descriptors of one directory).
//! - **[`codec`]**: schema-checked reader and writer ([`ManifestFile`]).
//! - **[`error`]**: [`ManifestError`] and [`DescriptorError`].
pub mod codec;
pub mod descriptor;
pub mod error;

pub use codec::{ManifestFile, parse_manifest, render_manifest};
pub use descriptor::{Manifest, PluginDescriptor};
pub use error::{DescriptorError, ManifestError};
