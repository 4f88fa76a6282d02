//! File collection for archive builds
//!
//! Turns either an explicit source list or a metadata store into the
//! ordered, deduplicated list of files that feeds hashing and packing.
//! Source-list collection walks directories recursively, sorts by archive
//! path, drops exact duplicates, and fails on archive-path collisions
//! (which would silently overwrite on unpack). Store-driven collection
//! takes membership and order exactly from the store.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::meta::MetaStore;
use crate::utils::{clean_path, relative_path};

/// One file selected for packing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedFile {
    /// Absolute path on disk. Empty for placeholder entries that carry an
    /// archive path but no local content.
    pub absolute_path: PathBuf,
    /// Forward-slash path of the file within the archive.
    pub archive_path: String,
}

impl CollectedFile {
    /// Returns `true` if the entry refers to a real file on disk.
    #[must_use]
    pub fn is_real(&self) -> bool {
        !self.absolute_path.as_os_str().is_empty()
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Build a collected entry for one file under (or outside) the base dir.
///
/// Files outside the base directory land at the archive root under their
/// final path component, with a warning.
fn make_collected(base_dir: &Path, path: PathBuf) -> Result<CollectedFile> {
    let archive_path = match relative_path(&path, &base_dir.to_path_buf()) {
        Some(rel) => rel,
        None => {
            let name = path
                .file_name()
                .ok_or_else(|| Error::InvalidPath(path.display().to_string()))?
                .to_string_lossy()
                .to_string();
            warn!(
                "source {} is outside the base directory, packing as '{}'",
                path.display(),
                name
            );
            name
        }
    };

    Ok(CollectedFile {
        absolute_path: path,
        archive_path,
    })
}

/// Collect files from an explicit source list.
///
/// Each entry resolves against `base_dir` when relative. Directories are
/// walked recursively; hidden entries (dot-files) are skipped at every
/// level unless `include_hidden` is set. The result is sorted by archive
/// path with exact duplicates removed.
///
/// # Errors
/// Fails if a source is missing, resolves to the base directory itself,
/// or two distinct files map to one archive path.
pub fn collect_from_sources(
    base_dir: &Path,
    sources: &[PathBuf],
    include_hidden: bool,
) -> Result<Vec<CollectedFile>> {
    let base_dir = clean_path(base_dir);
    let mut collected = Vec::new();

    for source in sources {
        let resolved = if source.is_absolute() {
            clean_path(source)
        } else {
            clean_path(base_dir.join(source))
        };

        if resolved == base_dir {
            return Err(Error::SourceIsBaseDir { path: resolved });
        }

        if let Some(name) = resolved.file_name() {
            if is_hidden(name) && !include_hidden {
                continue;
            }
        }

        if resolved.is_dir() {
            let walker = WalkDir::new(&resolved)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || include_hidden || !is_hidden(e.file_name()));
            for entry in walker {
                let entry = entry?;
                if entry.file_type().is_file() {
                    collected.push(make_collected(&base_dir, entry.into_path())?);
                }
            }
        } else if resolved.is_file() {
            collected.push(make_collected(&base_dir, resolved)?);
        } else {
            return Err(Error::SourceNotFound { path: resolved });
        }
    }

    finalize(collected)
}

/// Collect files as listed by a metadata store.
///
/// No recursion and no dedup: membership and order are exactly what the
/// store lists. Every listed file must exist under `base_dir`.
pub fn collect_from_store(base_dir: &Path, store: &MetaStore) -> Result<Vec<CollectedFile>> {
    let base_dir = clean_path(base_dir);
    let mut collected = Vec::with_capacity(store.files.len());

    for row in &store.files {
        let absolute_path = base_dir.join(&row.path);
        if !absolute_path.is_file() {
            return Err(Error::MetaFileMissing {
                path: absolute_path,
            });
        }
        collected.push(CollectedFile {
            absolute_path,
            archive_path: row.path.clone(),
        });
    }

    Ok(collected)
}

/// Sort by archive path, drop exact duplicates, reject collisions.
fn finalize(mut collected: Vec<CollectedFile>) -> Result<Vec<CollectedFile>> {
    collected.sort_by(|a, b| a.archive_path.cmp(&b.archive_path));

    let mut result: Vec<CollectedFile> = Vec::with_capacity(collected.len());
    for file in collected {
        match result.last() {
            Some(prev) if prev.archive_path == file.archive_path => {
                if prev.absolute_path == file.absolute_path {
                    warn!(
                        "duplicate source entry for {}, keeping one",
                        file.absolute_path.display()
                    );
                } else {
                    return Err(Error::ArchivePathCollision {
                        archive_path: file.archive_path,
                        first: prev.absolute_path.clone(),
                        second: file.absolute_path,
                    });
                }
            }
            _ => result.push(file),
        }
    }

    Ok(result)
}
