//! Build orchestration
//!
//! [`create_archive`] runs one build as a linear pass: validate the base
//! directory, collect files, consult the build cache, pack, then offer the
//! fresh artifact back to the cache. Cache traffic never changes the
//! build outcome.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::archive::{write_archive, write_lite_packs};
use crate::cache::{self, CacheClient, CachedItemValue};
use crate::collector::{self, CollectedFile};
use crate::compression::CompressionKind;
use crate::error::{Error, Result};
use crate::meta::MetaStore;

/// Where the file set for a build comes from. The two modes are mutually
/// exclusive.
#[derive(Debug, Clone)]
pub enum Sources {
    /// Explicit files and directories, resolved against the base dir.
    List(Vec<PathBuf>),
    /// Path to a metadata store document listing the files.
    MetaStore(PathBuf),
}

/// Parameters for one archive build.
#[derive(Debug, Clone)]
pub struct ArchiveParams {
    /// Directory archive paths are relative to.
    pub base_dir: PathBuf,
    /// File-set source.
    pub sources: Sources,
    /// Include hidden (dot-file) entries when walking directories.
    pub include_hidden: bool,
    /// Archive-wide compression request.
    pub compression: CompressionKind,
    /// Output file for a single archive, or an existing directory (or a
    /// path with a trailing separator) for lite-pack mode.
    pub output_path: PathBuf,
    /// Optional path for the build log artifact.
    pub log_path: Option<PathBuf>,
}

/// Lines emitted during one build, kept for the log artifact.
struct BuildLog {
    lines: Vec<String>,
}

impl BuildLog {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn line(&mut self, message: String) {
        info!("{message}");
        self.lines.push(message);
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.lines.join("\n").into_bytes();
        bytes.push(b'\n');
        bytes
    }

    /// Best-effort write of the log file; never fails the build.
    fn flush_to(&self, path: Option<&Path>) {
        if let Some(path) = path {
            if let Err(e) = std::fs::write(path, self.to_bytes()) {
                warn!("could not write build log {}: {e}", path.display());
            }
        }
    }
}

fn is_lite_destination(path: &Path) -> bool {
    if path.is_dir() {
        return true;
    }
    let raw = path.to_string_lossy();
    raw.ends_with('/') || raw.ends_with('\\')
}

/// Run one archive build.
///
/// Single-archive mode produces a DVPK file at `output_path`; when
/// `output_path` is a directory the build writes one `.dvpl` lite pack
/// per file instead. A configured cache client is consulted before
/// packing and offered the fresh artifact afterwards; the cache only ever
/// accelerates, its failures are logged and swallowed.
///
/// # Errors
/// Fails on configuration errors, collection errors, or packing I/O
/// errors. Cache errors never surface here.
pub fn create_archive(
    params: &ArchiveParams,
    mut cache_client: Option<&mut dyn CacheClient>,
) -> Result<()> {
    if !params.base_dir.is_dir() {
        return Err(Error::InvalidBaseDir {
            path: params.base_dir.clone(),
        });
    }

    let mut log = BuildLog::new();

    // Collect the file set.
    let mut meta = None;
    let files = match &params.sources {
        Sources::List(sources) => {
            collector::collect_from_sources(&params.base_dir, sources, params.include_hidden)?
        }
        Sources::MetaStore(store_path) => {
            let store = MetaStore::load(store_path)?;
            let files = collector::collect_from_store(&params.base_dir, &store)?;
            meta = Some(store);
            files
        }
    };
    log.line(format!("collected {} files", files.len()));

    if params.output_path.as_os_str().is_empty() {
        return Err(Error::EmptyOutputPath);
    }
    let lite_mode = is_lite_destination(&params.output_path);

    // Cache lookup; a hit short-circuits packing. The cache holds single
    // artifacts, so lite-pack builds skip it.
    if !lite_mode {
        if let Some(client) = cache_client.as_mut() {
            if try_restore_from_cache(&mut **client, &files, params, &mut log) {
                return Ok(());
            }
        }
    }

    // Pack.
    if lite_mode {
        std::fs::create_dir_all(&params.output_path)?;
        write_lite_packs(&files, &params.output_path)?;
    } else {
        write_archive(&files, params.compression, meta.as_ref(), &params.output_path)?;
    }
    log.line(format!(
        "archive created successfully: {}",
        params.output_path.display()
    ));
    log.flush_to(params.log_path.as_deref());

    if !lite_mode {
        if let Some(client) = cache_client.as_mut() {
            store_in_cache(&mut **client, &files, params, &log);
        }
    }

    Ok(())
}

/// Try to satisfy the build from the cache. Returns `true` on a hit.
fn try_restore_from_cache(
    client: &mut dyn CacheClient,
    files: &[CollectedFile],
    params: &ArchiveParams,
    log: &mut BuildLog,
) -> bool {
    let archive_key = match cache::archive_key(files, params.compression) {
        Ok(key) => key,
        Err(e) => {
            warn!("cache key construction failed: {e}");
            return false;
        }
    };

    let Some(value) = client.request(&archive_key) else {
        return false;
    };
    if !value.is_valid() {
        warn!("cached artifact for {archive_key} failed validation, ignoring");
        return false;
    }

    if let Some(parent) = params.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("could not prepare output directory: {e}");
                return false;
            }
        }
    }
    if let Err(e) = std::fs::write(&params.output_path, &value.data) {
        warn!("could not export cached artifact: {e}");
        return false;
    }

    log.line(format!(
        "restored archive from build cache (key {archive_key}, built on {} at {})",
        value.description.machine_name, value.description.creation_date
    ));

    // Companion log is best-effort; its absence does not negate the hit.
    if let Some(log_path) = &params.log_path {
        let cached_log = cache::log_key(files, params.compression)
            .ok()
            .and_then(|key| client.request(&key))
            .filter(CachedItemValue::is_valid);
        match cached_log {
            Some(cached_log) => {
                if let Err(e) = std::fs::write(log_path, &cached_log.data) {
                    warn!("could not export cached log: {e}");
                }
            }
            None => {
                warn!("no cached log for this build, writing a fresh one");
                log.flush_to(Some(log_path.as_path()));
            }
        }
    }

    true
}

/// Offer the freshly-built artifact (and its log) to the cache.
/// All failures here are soft.
fn store_in_cache(
    client: &mut dyn CacheClient,
    files: &[CollectedFile],
    params: &ArchiveParams,
    log: &BuildLog,
) {
    let keys = cache::archive_key(files, params.compression)
        .and_then(|a| cache::log_key(files, params.compression).map(|l| (a, l)));
    let (archive_key, log_key) = match keys {
        Ok(keys) => keys,
        Err(e) => {
            warn!("cache key construction failed: {e}");
            return;
        }
    };

    let data = match std::fs::read(&params.output_path) {
        Ok(data) => data,
        Err(e) => {
            warn!("could not read fresh archive for caching: {e}");
            return;
        }
    };

    let comment = format!("packed archive {}", params.output_path.display());
    if !client.add(&archive_key, CachedItemValue::new(data, comment)) {
        warn!("build cache rejected archive {archive_key}");
    }

    let log_comment = format!("build log for {}", params.output_path.display());
    if !client.add(&log_key, CachedItemValue::new(log.to_bytes(), log_comment)) {
        warn!("build cache rejected log {log_key}");
    }
}
