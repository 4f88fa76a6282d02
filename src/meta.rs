//! Metadata store for multi-pack builds
//!
//! The store is a JSON document assigning each file to a pack group:
//!
//! ```json
//! { "files": [ { "path": "maps/level0.bin", "pack_index": 1 } ] }
//! ```
//!
//! Store-driven builds take their membership exactly from this list, and
//! the canonical JSON bytes are embedded in the archive as the metadata
//! block. Parse failures stay contained here and surface as a single
//! [`Error::MetaStoreInvalid`] at the boundary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One file row in the metadata store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    /// Archive-relative path (separators are normalized on load).
    pub path: String,
    /// Pack group the file belongs to.
    pub pack_index: u32,
}

/// Parsed metadata store document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaStore {
    /// File rows in the store's explicit order.
    pub files: Vec<MetaFile>,
}

impl MetaStore {
    /// Load and parse a metadata store document.
    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |message: String| Error::MetaStoreInvalid {
            path: path.to_path_buf(),
            message,
        };

        let bytes = std::fs::read(path).map_err(|e| invalid(e.to_string()))?;
        let mut store: MetaStore =
            serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;

        for file in &mut store.files {
            file.path = file.path.replace('\\', "/");
        }
        Ok(store)
    }

    /// Pack-group index for an archive path, 0 when the path is not listed.
    ///
    /// Linear scan; per-file lookups during packing go through
    /// [`MetaStore::index_map`] built once instead.
    #[must_use]
    pub fn pack_index_of(&self, archive_path: &str) -> u32 {
        self.files
            .iter()
            .find(|f| f.path == archive_path)
            .map_or(0, |f| f.pack_index)
    }

    /// Path-to-group lookup table over all rows.
    #[must_use]
    pub fn index_map(&self) -> HashMap<&str, u32> {
        self.files
            .iter()
            .map(|f| (f.path.as_str(), f.pack_index))
            .collect()
    }

    /// Canonical JSON bytes of the document, as embedded in the archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::MetaStoreInvalid {
            path: PathBuf::new(),
            message: e.to_string(),
        })
    }
}
