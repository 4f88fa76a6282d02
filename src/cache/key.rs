//! Build-cache key construction
//!
//! A cache key is a pair of MD5 digests: a primary digest over the
//! collected file set (archive paths and file contents, in final order)
//! and a secondary digest over the build parameters. The parameters digest
//! is salted per artifact kind so the archive and its companion log never
//! share a key, even under identical settings.

use std::fmt;

use crate::collector::CollectedFile;
use crate::compression::CompressionKind;
use crate::error::Result;

/// Salt mixed into the parameters digest for the archive artifact.
const ARCHIVE_KEY_SALT: &str = "key for archive file";

/// Salt mixed into the parameters digest for the log artifact.
const LOG_KEY_SALT: &str = "this one is for log file";

/// Two-part digest identifying a buildable artifact in the remote cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheItemKey {
    /// Content digest of the collected file set.
    pub primary: [u8; 16],
    /// Digest of the build parameters, distinct per artifact kind.
    pub secondary: [u8; 16],
}

impl fmt::Display for CacheItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.primary.iter().chain(self.secondary.iter()) {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Compute the content digest over the ordered file list.
///
/// For each file, the archive-path bytes are fed into the running digest,
/// followed by the MD5 of the file contents for real files. Placeholder
/// entries contribute their path only. The list must already be in final
/// (sorted or store-explicit) order.
///
/// # Errors
/// Fails if a file cannot be read.
pub fn content_digest(files: &[CollectedFile]) -> Result<[u8; 16]> {
    let mut outer = md5::Context::new();
    for file in files {
        outer.consume(file.archive_path.as_bytes());
        if file.is_real() {
            let contents = std::fs::read(&file.absolute_path)?;
            outer.consume(md5::compute(&contents).0);
        }
    }
    Ok(outer.compute().0)
}

fn params_digest(kind: CompressionKind, salt: &str) -> [u8; 16] {
    let mut context = md5::Context::new();
    // The canonical name, not the enum value, keeps keys stable across
    // future reordering of the kind enum.
    context.consume(kind.as_str().as_bytes());
    context.consume(salt.as_bytes());
    context.compute().0
}

/// Cache key for the pack-archive artifact.
pub fn archive_key(files: &[CollectedFile], kind: CompressionKind) -> Result<CacheItemKey> {
    Ok(CacheItemKey {
        primary: content_digest(files)?,
        secondary: params_digest(kind, ARCHIVE_KEY_SALT),
    })
}

/// Cache key for the companion build-log artifact.
pub fn log_key(files: &[CollectedFile], kind: CompressionKind) -> Result<CacheItemKey> {
    Ok(CacheItemKey {
        primary: content_digest(files)?,
        secondary: params_digest(kind, LOG_KEY_SALT),
    })
}
