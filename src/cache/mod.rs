//! Remote build-cache client interface
//!
//! The cache stores previously-built artifacts under a two-part digest
//! key ([`CacheItemKey`]). It is purely an accelerator: every cache
//! failure is soft and the build proceeds without it.

pub mod key;

pub use key::{CacheItemKey, archive_key, content_digest, log_key};

use std::collections::HashMap;

/// Provenance attached to a cached artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedItemDescription {
    /// Host the artifact was built on.
    pub machine_name: String,
    /// Localized date/time of the build.
    pub creation_date: String,
    /// Free-form comment, typically naming the output path.
    pub comment: String,
}

/// Artifact exchanged with the remote cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedItemValue {
    /// Raw artifact bytes.
    pub data: Vec<u8>,
    /// Provenance description.
    pub description: CachedItemDescription,
    /// CRC32 of `data`, checked before a hit is trusted.
    pub validation_crc32: u32,
}

impl CachedItemValue {
    /// Build a value for freshly-produced artifact bytes.
    pub fn new(data: Vec<u8>, comment: impl Into<String>) -> Self {
        let validation_crc32 = crc32fast::hash(&data);
        Self {
            data,
            description: CachedItemDescription {
                machine_name: machine_name(),
                creation_date: chrono::Local::now()
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                comment: comment.into(),
            },
            validation_crc32,
        }
    }

    /// Returns `true` if the data matches its validation checksum.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        crc32fast::hash(&self.data) == self.validation_crc32
    }
}

fn machine_name() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Synchronous client for the remote build cache.
///
/// Both operations block the caller; timeouts are the implementation's
/// responsibility. `request` returns `None` on a miss or any transport
/// failure, `add` returns `false` on failure. Neither outcome may fail a
/// build.
pub trait CacheClient {
    /// Retrieve an artifact by key.
    fn request(&mut self, key: &CacheItemKey) -> Option<CachedItemValue>;

    /// Store an artifact under a key.
    fn add(&mut self, key: &CacheItemKey, value: CachedItemValue) -> bool;
}

/// In-memory cache client, for tests and embedders without a remote cache.
#[derive(Debug, Default)]
pub struct MemoryCacheClient {
    items: HashMap<CacheItemKey, CachedItemValue>,
}

impl MemoryCacheClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no artifacts are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CacheClient for MemoryCacheClient {
    fn request(&mut self, key: &CacheItemKey) -> Option<CachedItemValue> {
        self.items.get(key).cloned()
    }

    fn add(&mut self, key: &CacheItemKey, value: CachedItemValue) -> bool {
        self.items.insert(*key, value);
        true
    }
}
