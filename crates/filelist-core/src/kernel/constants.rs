/// File name of the per-directory plugin manifest
pub const MANIFEST_FILE_NAME: &str = "list.xml";

/// Extensions probed when searching for libraries by identity
pub const LIBRARY_EXTENSIONS: &[&str] = &["so", "dylib", "dll"];

/// Log target used by the provider's trace output
pub const TRACE_TARGET: &str = "filelist_core::provider";

/// Exported symbol returning the library's strong identity (`*const c_char`)
pub const IDENTITY_SYMBOL: &[u8] = b"_plugin_identity\0";

/// Exported symbol creating an instance of a named type
pub const CREATE_SYMBOL: &[u8] = b"_plugin_create\0";

/// Exported symbol releasing an instance created by [`CREATE_SYMBOL`]
pub const DESTROY_SYMBOL: &[u8] = b"_plugin_destroy\0";
