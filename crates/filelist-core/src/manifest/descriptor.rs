use std::path::{Path, PathBuf};

use crate::manifest::codec::ManifestFile;
use crate::manifest::error::{DescriptorError, ManifestError};

/// One `Plugin` entry of a manifest: a library and the types to create from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    library_id: String,
    type_names: Vec<String>,
}

impl PluginDescriptor {
    /// Build a descriptor, enforcing a non-empty library id and at least one
    /// non-empty type name. Type order is kept as given.
    pub fn new<S, I, T>(library_id: S, type_names: I) -> Result<Self, DescriptorError>
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let library_id = library_id.into();
        if library_id.is_empty() {
            return Err(DescriptorError::EmptyLibraryId);
        }

        let type_names: Vec<String> = type_names.into_iter().map(Into::into).collect();
        if type_names.is_empty() {
            return Err(DescriptorError::NoTypeNames { library_id });
        }
        if let Some(index) = type_names.iter().position(|name| name.is_empty()) {
            return Err(DescriptorError::EmptyTypeName { library_id, index });
        }

        Ok(Self {
            library_id,
            type_names,
        })
    }

    /// Descriptor for a single type, the shape produced by manifest rebuilds.
    pub fn single(
        library_id: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Result<Self, DescriptorError> {
        Self::new(library_id, [type_name.into()])
    }

    pub fn library_id(&self) -> &str {
        &self.library_id
    }

    pub fn type_names(&self) -> &[String] {
        &self.type_names
    }
}

/// The descriptors declared for one plugin directory.
///
/// Library ids are resolved relative to `directory`. Duplicated ids are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    directory: PathBuf,
    file_name: String,
    descriptors: Vec<PluginDescriptor>,
}

impl Manifest {
    pub fn new(
        directory: impl Into<PathBuf>,
        file_name: impl Into<String>,
        descriptors: Vec<PluginDescriptor>,
    ) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
            descriptors,
        }
    }

    /// Read `directory/file_name`.
    pub fn load(directory: &Path, file_name: &str) -> Result<Self, ManifestError> {
        let file = ManifestFile::new(directory.join(file_name))?;
        let descriptors = file.read()?;
        Ok(Self::new(directory, file_name, descriptors))
    }

    /// Write the descriptors back to [`Manifest::path`], replacing the file.
    pub fn save(&self) -> Result<PathBuf, ManifestError> {
        let file = ManifestFile::new(self.path())?;
        file.write(&self.descriptors)?;
        Ok(file.path().to_path_buf())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    pub fn descriptors(&self) -> &[PluginDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Absolute location of a descriptor's library inside this directory.
    pub fn library_path(&self, descriptor: &PluginDescriptor) -> PathBuf {
        self.directory.join(descriptor.library_id())
    }
}
