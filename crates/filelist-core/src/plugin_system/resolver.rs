use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::kernel::Trace;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::{AssemblyResolver, LibraryInspector, ResolvedLibrary};
use crate::utils::fs::find_library_files;

/// Resolves libraries by strong identity across ordered search directories.
///
/// Directories are probed in order and files within a directory tree in
/// file-name order; the first file whose identity equals the requested name
/// wins. On a miss the parent resolver, if any, gets the request.
pub struct DirectoryResolver {
    search_paths: Vec<PathBuf>,
    extensions: Vec<String>,
    inspector: Arc<dyn LibraryInspector>,
    parent: Option<Arc<dyn AssemblyResolver>>,
    trace: Trace,
}

impl DirectoryResolver {
    pub fn new(
        search_paths: Vec<PathBuf>,
        extensions: Vec<String>,
        inspector: Arc<dyn LibraryInspector>,
        trace: Trace,
    ) -> Self {
        Self {
            search_paths,
            extensions,
            inspector,
            parent: None,
            trace,
        }
    }

    pub fn with_parent(mut self, parent: Option<Arc<dyn AssemblyResolver>>) -> Self {
        self.parent = parent;
        self
    }

    pub fn parent(&self) -> Option<&Arc<dyn AssemblyResolver>> {
        self.parent.as_ref()
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn search(&self, library_name: &str) -> Option<ResolvedLibrary> {
        for directory in self.search_paths.iter().filter(|dir| dir.is_dir()) {
            for candidate in find_library_files(directory, &self.extensions) {
                match self.inspector.read_identity(&candidate) {
                    Ok(identity) if identity == library_name => {}
                    Ok(_) => continue,
                    Err(e) => {
                        self.skip_candidate(&candidate, &e);
                        continue;
                    }
                }

                match self.inspector.load_library(&candidate) {
                    Ok(library) => {
                        self.trace.debug(format_args!(
                            "Resolved {} to {}",
                            library_name,
                            candidate.display()
                        ));
                        return Some(ResolvedLibrary {
                            path: candidate,
                            library,
                        });
                    }
                    Err(e) => self.skip_candidate(&candidate, &e),
                }
            }
        }
        None
    }

    fn skip_candidate(&self, candidate: &Path, error: &PluginSystemError) {
        match error {
            PluginSystemError::InvalidImage { .. } | PluginSystemError::LoadingError { .. } => {}
            _ => self.trace.error(format_args!(
                "Failed to inspect {}: {}",
                candidate.display(),
                error
            )),
        }
    }

    fn describe_search_paths(&self) -> String {
        self.search_paths
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl AssemblyResolver for DirectoryResolver {
    fn resolve(&self, library_name: &str) -> Result<Option<ResolvedLibrary>, PluginSystemError> {
        if library_name.is_empty() {
            return Err(PluginSystemError::InvalidArgument {
                argument: "library_name",
                message: "library name must not be empty".to_string(),
            });
        }

        if let Some(found) = self.search(library_name) {
            return Ok(Some(found));
        }

        self.trace.warn(format_args!(
            "Unable to locate library {} in the path {}",
            library_name,
            self.describe_search_paths()
        ));
        match &self.parent {
            Some(parent) => parent.resolve(library_name),
            None => Ok(None),
        }
    }
}
