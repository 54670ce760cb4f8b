//! Native library inspection through `libloading`.
//!
//! A plugin library exports three C-ABI symbols:
//!
//! - `_plugin_identity() -> *const c_char`: the library's strong identity,
//!   a static NUL-terminated string.
//! - `_plugin_create(type_name: *const c_char) -> *mut c_void`: creates an
//!   instance of the named type, or returns null when the type is unknown.
//! - `_plugin_destroy(instance: *mut c_void)`: releases an instance.
//!
//! Files are checked for an ELF, PE or Mach-O header before anything is
//! mapped, so stray files in a plugin directory are rejected cheaply.
use std::any::Any;
use std::ffi::{CStr, CString, c_void};
use std::fs::File;
use std::io::Read;
use std::os::raw::c_char;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::{Library, Symbol};

use crate::kernel::{Trace, constants};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::{LibraryHandle, LibraryInspector, LoadedLibrary, PluginInstance};

type IdentityFn = unsafe extern "C-unwind" fn() -> *const c_char;
type CreateFn = unsafe extern "C-unwind" fn(type_name: *const c_char) -> *mut c_void;
type DestroyFn = unsafe extern "C-unwind" fn(instance: *mut c_void);

/// Container format recognised from a file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Elf,
    Pe,
    MachO,
}

const MACH_O_MAGICS: [u32; 5] = [0xfeed_face, 0xfeed_facf, 0xcefa_edfe, 0xcffa_edfe, 0xcafe_babe];

/// Classify a file by its first bytes.
pub fn check_image_header(path: &Path) -> Result<ImageFormat, PluginSystemError> {
    let mut file = File::open(path).map_err(|e| PluginSystemError::loading(path, e))?;
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        match file.read(&mut header[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PluginSystemError::loading(path, e)),
        }
    }

    if filled >= 2 && header[..2] == *b"MZ" {
        return Ok(ImageFormat::Pe);
    }
    if filled < header.len() {
        return Err(invalid_image(path, "file is too short to be a library"));
    }
    if header == [0x7f, b'E', b'L', b'F'] {
        return Ok(ImageFormat::Elf);
    }
    let magic = u32::from_be_bytes(header);
    if MACH_O_MAGICS.contains(&magic) {
        return Ok(ImageFormat::MachO);
    }
    Err(invalid_image(path, "unrecognised file header"))
}

fn invalid_image(path: &Path, message: impl Into<String>) -> PluginSystemError {
    PluginSystemError::InvalidImage {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic reason".to_string()
    }
}

fn open_library(path: &Path) -> Result<Library, PluginSystemError> {
    check_image_header(path)?;
    // SAFETY: loading a library runs its initialisers. Plugin directories are
    // trusted locations chosen by the host.
    unsafe { Library::new(path) }.map_err(|e| PluginSystemError::loading(path, e))
}

fn call_identity(library: &Library, path: &Path) -> Result<String, PluginSystemError> {
    let symbol: Symbol<IdentityFn> = unsafe { library.get(constants::IDENTITY_SYMBOL) }
        .map_err(|e| invalid_image(path, format!("no identity export: {}", e)))?;
    let identity_fn: IdentityFn = *symbol;

    let raw = panic::catch_unwind(panic::AssertUnwindSafe(|| unsafe { identity_fn() }))
        .map_err(|payload| {
            invalid_image(path, format!("identity export panicked: {}", panic_message(payload)))
        })?;
    if raw.is_null() {
        return Err(invalid_image(path, "identity export returned null"));
    }
    unsafe { CStr::from_ptr(raw) }
        .to_str()
        .map(str::to_owned)
        .map_err(|_| invalid_image(path, "identity is not valid UTF-8"))
}

/// [`LibraryInspector`] backed by the platform dynamic loader.
#[derive(Debug, Default, Clone)]
pub struct DynamicLibraryInspector {
    trace: Trace,
}

impl DynamicLibraryInspector {
    pub fn new(trace: Trace) -> Self {
        Self { trace }
    }
}

impl LibraryInspector for DynamicLibraryInspector {
    fn read_identity(&self, path: &Path) -> Result<String, PluginSystemError> {
        let library = open_library(path)?;
        call_identity(&library, path)
    }

    fn load_library(&self, path: &Path) -> Result<LibraryHandle, PluginSystemError> {
        let library = open_library(path)?;
        Ok(Arc::new(DynamicLibrary {
            path: path.to_path_buf(),
            library: Arc::new(library),
            trace: self.trace.clone(),
        }))
    }
}

/// A library mapped into the process.
#[derive(Debug)]
pub struct DynamicLibrary {
    path: PathBuf,
    library: Arc<Library>,
    trace: Trace,
}

impl DynamicLibrary {
    fn instantiation_error(&self, type_name: &str, message: impl Into<String>) -> PluginSystemError {
        PluginSystemError::InstantiationError {
            path: self.path.clone(),
            type_name: type_name.to_string(),
            message: message.into(),
        }
    }
}

impl LoadedLibrary for DynamicLibrary {
    fn path(&self) -> &Path {
        &self.path
    }

    fn instantiate(&self, type_name: &str) -> Result<Box<dyn PluginInstance>, PluginSystemError> {
        let c_name = CString::new(type_name)
            .map_err(|_| self.instantiation_error(type_name, "type name contains a NUL byte"))?;

        let create: Symbol<CreateFn> = unsafe { self.library.get(constants::CREATE_SYMBOL) }
            .map_err(|e| self.instantiation_error(type_name, format!("no create export: {}", e)))?;
        let destroy: Symbol<DestroyFn> = unsafe { self.library.get(constants::DESTROY_SYMBOL) }
            .map_err(|e| self.instantiation_error(type_name, format!("no destroy export: {}", e)))?;
        let create_fn: CreateFn = *create;
        let destroy_fn: DestroyFn = *destroy;

        let name_ptr = c_name.as_ptr();
        let raw = panic::catch_unwind(panic::AssertUnwindSafe(move || unsafe { create_fn(name_ptr) }))
            .map_err(|payload| {
                self.instantiation_error(type_name, format!("create panicked: {}", panic_message(payload)))
            })?;
        if raw.is_null() {
            return Err(self.instantiation_error(type_name, "type is not exported by the library"));
        }

        Ok(Box::new(FfiInstance {
            instance: UnsafeInstancePtr(raw),
            destroy: destroy_fn,
            type_name: type_name.to_string(),
            trace: self.trace.clone(),
            _library: Arc::clone(&self.library),
        }))
    }
}

#[derive(Debug, Clone, Copy)]
struct UnsafeInstancePtr(*mut c_void);
unsafe impl Send for UnsafeInstancePtr {}
unsafe impl Sync for UnsafeInstancePtr {}

/// Instance owned by a native library; destroyed through the library's own
/// export before the library can be unmapped.
#[derive(Debug)]
struct FfiInstance {
    instance: UnsafeInstancePtr,
    destroy: DestroyFn,
    type_name: String,
    trace: Trace,
    _library: Arc<Library>,
}

impl PluginInstance for FfiInstance {
    fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl Drop for FfiInstance {
    fn drop(&mut self) {
        let destroy_fn = self.destroy;
        let ptr = self.instance.0;
        let result = panic::catch_unwind(panic::AssertUnwindSafe(move || unsafe { destroy_fn(ptr) }));
        if let Err(payload) = result {
            self.trace.error(format_args!(
                "Destroying plugin instance '{}' panicked: {}",
                self.type_name,
                panic_message(payload)
            ));
        }
    }
}
