//! # Manifest Watching
//!
//! Directory watches that report changes to a plugin directory's manifest.
//! The provider owns the [`Subscription`]s it creates and cancels them on
//! detach; events reach it through a [`ChangeHandler`] called on whatever
//! thread the watch backend uses.
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::plugin_system::error::PluginSystemError;

pub mod notify;

pub use self::notify::NotifyWatchService;

/// What happened to a watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Changed,
    Deleted,
    Renamed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ChangeKind::Created => "Created",
            ChangeKind::Changed => "Changed",
            ChangeKind::Deleted => "Deleted",
            ChangeKind::Renamed => "Renamed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Callback receiving manifest changes; may run on any thread.
pub type ChangeHandler = Arc<dyn Fn(ManifestChange) + Send + Sync>;

/// An active directory watch.
pub trait Subscription: Send {
    fn directory(&self) -> &Path;

    /// Stop watching. Consumes the handle so it can only happen once.
    fn cancel(self: Box<Self>);
}

/// Directory watch primitive.
pub trait WatchService: Send + Sync {
    /// Watch `directory` (not its subdirectories) for changes to `file_name`.
    fn watch(
        &self,
        directory: &Path,
        file_name: &str,
        on_change: ChangeHandler,
    ) -> Result<Box<dyn Subscription>, PluginSystemError>;
}
