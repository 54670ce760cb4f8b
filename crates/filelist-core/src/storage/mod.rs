//! # Provider Configuration Storage
//!
//! Loads the provider's settings ([`ProviderConfig`]) from JSON, TOML or YAML
//! files. The format is picked from the file extension ([`ConfigFormat`]);
//! TOML and YAML support sit behind the `toml-config` and `yaml-config`
//! features.
pub mod config;
pub mod error;

pub use config::{ConfigFormat, ProviderConfig};
pub use error::StorageSystemError;
