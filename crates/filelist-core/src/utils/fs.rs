use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Find files under `root` (recursively) whose extension is in `extensions`.
///
/// Entries are visited in file-name order inside each directory so repeated
/// searches see candidates in the same order. Unreadable entries are skipped.
/// A missing `root` yields no files.
pub fn find_library_files<S: AsRef<str>>(root: &Path, extensions: &[S]) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_library_extension(path, extensions))
        .collect()
}

/// Case-insensitive extension check against an allow-list.
pub fn has_library_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy();
            extensions
                .iter()
                .any(|allowed| allowed.as_ref().eq_ignore_ascii_case(&ext))
        }
        None => false,
    }
}

/// First name in `file_name`, `stem(1).ext`, `stem(2).ext`, ... that does not
/// exist in `directory`.
pub fn unique_file_name(directory: &Path, file_name: &str) -> String {
    let candidate_path = Path::new(file_name);
    let stem = candidate_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = candidate_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut index: usize = 0;
    loop {
        let candidate = if index == 0 {
            file_name.to_string()
        } else {
            format!("{}({}){}", stem, index, extension)
        };
        if !directory.join(&candidate).exists() {
            return candidate;
        }
        index += 1;
    }
}

/// Compare two paths as strings, ignoring case.
pub fn paths_equal_ignore_case(left: &Path, right: &Path) -> bool {
    left.to_string_lossy().to_lowercase() == right.to_string_lossy().to_lowercase()
}

/// String prefix test on paths, ignoring case.
pub fn path_starts_with_ignore_case(path: &Path, prefix: &Path) -> bool {
    path.to_string_lossy()
        .to_lowercase()
        .starts_with(&prefix.to_string_lossy().to_lowercase())
}
