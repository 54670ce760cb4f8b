pub mod fs;

pub use fs::{find_library_files, has_library_extension, unique_file_name};
