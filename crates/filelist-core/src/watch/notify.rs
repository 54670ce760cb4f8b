use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::kernel::Trace;
use crate::plugin_system::error::PluginSystemError;
use crate::watch::{ChangeHandler, ChangeKind, ManifestChange, Subscription, WatchService};

impl ChangeKind {
    /// Map a backend event; access events are not changes.
    pub fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
            EventKind::Modify(_) => Some(ChangeKind::Changed),
            EventKind::Remove(_) => Some(ChangeKind::Deleted),
            EventKind::Access(_) => None,
            EventKind::Any | EventKind::Other => Some(ChangeKind::Changed),
        }
    }
}

/// [`WatchService`] on top of the platform's recommended `notify` backend.
#[derive(Debug, Clone, Default)]
pub struct NotifyWatchService {
    trace: Trace,
}

impl NotifyWatchService {
    pub fn new(trace: Trace) -> Self {
        Self { trace }
    }
}

impl WatchService for NotifyWatchService {
    fn watch(
        &self,
        directory: &Path,
        file_name: &str,
        on_change: ChangeHandler,
    ) -> Result<Box<dyn Subscription>, PluginSystemError> {
        let watch_error = |source: notify::Error| PluginSystemError::WatchError {
            path: directory.to_path_buf(),
            source,
        };

        let wanted = OsString::from(file_name);
        let trace = self.trace.clone();
        let watched = directory.to_path_buf();
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| match result {
            Ok(event) => {
                let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
                    return;
                };
                for path in event
                    .paths
                    .into_iter()
                    .filter(|path| path.file_name() == Some(wanted.as_os_str()))
                {
                    on_change(ManifestChange { path, kind });
                }
            }
            Err(e) => trace.warn(format_args!("Watch error on {}: {}", watched.display(), e)),
        })
        .map_err(watch_error)?;

        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;
        self.trace.debug(format_args!(
            "Watching {} for changes to {}",
            directory.display(),
            file_name
        ));

        Ok(Box::new(NotifySubscription {
            directory: directory.to_path_buf(),
            watcher,
            trace: self.trace.clone(),
        }))
    }
}

struct NotifySubscription {
    directory: PathBuf,
    watcher: RecommendedWatcher,
    trace: Trace,
}

impl Subscription for NotifySubscription {
    fn directory(&self) -> &Path {
        &self.directory
    }

    fn cancel(self: Box<Self>) {
        let NotifySubscription {
            directory,
            mut watcher,
            trace,
        } = *self;
        if let Err(e) = watcher.unwatch(&directory) {
            trace.debug(format_args!("Unwatching {} failed: {}", directory.display(), e));
        }
    }
}
