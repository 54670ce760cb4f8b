//! Injected logging handle.
//!
//! Components never call the global `log` macros. They hold a [`Trace`],
//! built around whatever [`log::Log`] implementation the host passes in, and
//! emit records through it. [`Trace::global`] forwards to the logger the host
//! installed with `log::set_logger` (e.g. `env_logger`).
use std::fmt;
use std::sync::Arc;

use log::{Level, Log, Metadata, Record};

use crate::kernel::constants;

/// Cloneable logging handle with a fixed target.
#[derive(Clone)]
pub struct Trace {
    logger: Arc<dyn Log>,
    target: &'static str,
}

impl Trace {
    /// Wrap an injected logger.
    pub fn new(logger: Arc<dyn Log>) -> Self {
        Self {
            logger,
            target: constants::TRACE_TARGET,
        }
    }

    /// Trace that forwards to the process-wide logger.
    pub fn global() -> Self {
        Self::new(Arc::new(GlobalLogger))
    }

    /// Override the target attached to every record.
    pub fn with_target(mut self, target: &'static str) -> Self {
        self.target = target;
        self
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Emit a record at `level` if the logger accepts it.
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(self.target).build();
        if !self.logger.enabled(&metadata) {
            return;
        }
        self.logger.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path(Some(module_path!()))
                .build(),
        );
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Forwards to `log::logger()`, resolved at call time so a logger installed
/// after the provider was built is still picked up.
struct GlobalLogger;

impl Log for GlobalLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        log::logger().log(record);
    }

    fn flush(&self) {
        log::logger().flush();
    }
}
