//! Path utilities

use std::path::{Component, Path, PathBuf};

/// Normalize path separators to forward slashes (for archive paths)
pub fn normalize_path<P: AsRef<Path>>(path: P) -> String {
    path.as_ref().to_string_lossy().replace('\\', "/")
}

/// Get relative path and normalize separators
pub fn relative_path<P: AsRef<Path>>(path: P, base: P) -> Option<String> {
    path.as_ref()
        .strip_prefix(base.as_ref())
        .ok()
        .map(normalize_path)
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// Unlike `Path::canonicalize` this does not require the path to exist and
/// never follows symlinks, so two spellings of the same location compare
/// equal while temp-dir paths stay untouched.
pub fn clean_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(Component::ParentDir);
                }
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}
