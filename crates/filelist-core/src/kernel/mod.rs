//! # Filelist Core Kernel
//!
//! Crate-wide plumbing shared by every subsystem of the provider.
//!
//! ## Key Components:
//!
//! - **Constants**: default manifest file name, library extensions and the
//!   log target, found in the `constants` submodule.
//! - **Error Handling**: the aggregated [`Error`](error::Error) type and a
//!   `Result` alias in the `error` submodule.
//! - **Tracing**: [`Trace`](trace::Trace), the injected logging handle every
//!   component receives at construction instead of reaching for global state.
pub mod constants;
pub mod error;
pub mod trace;

pub use error::{Error, Result};
pub use trace::Trace;
