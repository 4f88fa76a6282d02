//! # dvpack
//!
//! A build-time content packaging library: assembles source files into a
//! single content-addressable DVPK archive for runtime loading, with an
//! alternate per-file DVPL "lite pack" format and optional build-cache
//! integration to skip re-packing identical inputs.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dvpack::archiver::{ArchiveParams, Sources, create_archive};
//! use dvpack::compression::CompressionKind;
//!
//! let params = ArchiveParams {
//!     base_dir: "assets".into(),
//!     sources: Sources::List(vec!["assets/maps".into(), "assets/ui".into()]),
//!     include_hidden: false,
//!     compression: CompressionKind::Lz4,
//!     output_path: "out/assets.dvpk".into(),
//!     log_path: None,
//! };
//! create_archive(&params, None)?;
//! # Ok::<(), dvpack::Error>(())
//! ```
//!
//! Pointing `output_path` at a directory switches the build to lite-pack
//! mode, writing one `.dvpl` file per source file instead of a single
//! archive.
//!
//! ## Build cache
//!
//! Passing a [`cache::CacheClient`] to `create_archive` keys the build by
//! a content digest of the file set plus a parameters digest; identical
//! inputs are restored from the cache without packing.
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `dvpack` command-line binary

pub mod archive;
pub mod archiver;
pub mod cache;
pub mod collector;
pub mod compression;
pub mod error;
pub mod meta;
pub mod utils;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::archive::{FileTableEntry, Footer, LiteFooter};
    pub use crate::archiver::{ArchiveParams, Sources, create_archive};
    pub use crate::cache::{CacheClient, CacheItemKey, CachedItemValue, MemoryCacheClient};
    pub use crate::collector::CollectedFile;
    pub use crate::compression::CompressionKind;
    pub use crate::error::{Error, Result};
    pub use crate::meta::{MetaFile, MetaStore};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
