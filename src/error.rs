//! Error types for `dvpack`

use std::path::PathBuf;

use thiserror::Error;

/// The error type for `dvpack` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Configuration Errors ====================
    /// The base directory does not exist or is not a directory.
    #[error("invalid base directory: {path}")]
    InvalidBaseDir {
        /// The path that was supplied as base directory.
        path: PathBuf,
    },

    /// No output path was supplied.
    #[error("output path is empty")]
    EmptyOutputPath,

    /// A source entry resolved to the base directory itself.
    #[error("source resolves to the base directory: {path}")]
    SourceIsBaseDir {
        /// The offending source path.
        path: PathBuf,
    },

    // ==================== Collection Errors ====================
    /// A listed source file or directory does not exist.
    #[error("source not found: {path}")]
    SourceNotFound {
        /// The missing source path.
        path: PathBuf,
    },

    /// Two distinct source files map to the same archive path.
    #[error("archive path collision on '{archive_path}': {first} vs {second}")]
    ArchivePathCollision {
        /// The contested archive-relative path.
        archive_path: String,
        /// The first source file claiming the path.
        first: PathBuf,
        /// The second source file claiming the path.
        second: PathBuf,
    },

    /// A file listed in the metadata store is missing under the base directory.
    #[error("metadata store references missing file: {path}")]
    MetaFileMissing {
        /// The missing file path.
        path: PathBuf,
    },

    /// The metadata store document could not be loaded or parsed.
    #[error("invalid metadata store {path}: {message}")]
    MetaStoreInvalid {
        /// Path to the store document.
        path: PathBuf,
        /// The underlying parse or read error.
        message: String,
    },

    // ==================== Packing Errors ====================
    /// A file exceeds the size the archive format can describe.
    #[error("file too large for archive: {path} ({size} bytes)")]
    FileTooLarge {
        /// The oversized file.
        path: PathBuf,
        /// Its size in bytes.
        size: u64,
    },

    /// The archive would contain more files than the format allows.
    #[error("too many files for archive: {count}")]
    TooManyFiles {
        /// The number of collected files.
        count: usize,
    },

    /// Some lite-pack files could not be written.
    #[error("lite pack failed for {failed} of {total} files: {first_error}")]
    LitePackPartialFailure {
        /// Total number of files attempted.
        total: usize,
        /// Number of failed files.
        failed: usize,
        /// The first error message encountered.
        first_error: String,
    },

    // ==================== Format Errors ====================
    /// The file does not end in a valid pack footer (missing DVPK magic).
    #[error("invalid pack magic: expected DVPK")]
    InvalidPackMagic,

    /// The lite-pack file does not end in a valid footer (missing DVPL magic).
    #[error("invalid lite pack magic: expected DVPL")]
    InvalidLiteMagic,

    /// The footer checksum does not match its contents.
    #[error("footer CRC32 mismatch: expected {expected:#010x}, found {actual:#010x}")]
    FooterCrcMismatch {
        /// CRC32 recorded in the footer.
        expected: u32,
        /// CRC32 computed over the footer contents.
        actual: u32,
    },

    /// An unknown compression kind value was read from a footer or entry.
    #[error("unsupported compression kind: {kind}")]
    UnsupportedCompressionKind {
        /// The raw kind value.
        kind: u32,
    },

    // ==================== Compression Errors ====================
    /// Compression failed.
    #[error("compression failed: {0}")]
    CompressionError(String),

    /// Decompression failed.
    #[error("decompression failed: {0}")]
    DecompressionError(String),

    // ==================== File System Errors ====================
    /// Invalid file path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Directory traversal error.
    #[error("directory walk error: {0}")]
    WalkDirError(String),

    /// Unexpected end of file.
    #[error("unexpected end of file")]
    UnexpectedEof,
}

// Add conversion from walkdir::Error
impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        Error::WalkDirError(err.to_string())
    }
}

/// A specialized Result type for `dvpack` operations.
pub type Result<T> = std::result::Result<T, Error>;
