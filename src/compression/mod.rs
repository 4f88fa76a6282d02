//! Compression codec registry
//!
//! Each archive entry records which codec produced its payload. LZ4 and
//! LZ4HC both emit standard LZ4 block streams (HC is an encoder-side
//! variant), so a single block decoder serves both kinds.

use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Compression kind recorded per archive entry and in lite-pack footers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    None,
    Lz4,
    Lz4hc,
    Rfc1951,
}

impl CompressionKind {
    /// Parse a compression kind from its on-disk value.
    pub fn from_flags(flags: u32) -> Result<Self> {
        match flags {
            0 => Ok(CompressionKind::None),
            1 => Ok(CompressionKind::Lz4),
            2 => Ok(CompressionKind::Lz4hc),
            3 => Ok(CompressionKind::Rfc1951),
            kind => Err(Error::UnsupportedCompressionKind { kind }),
        }
    }

    /// Convert the kind to its on-disk value.
    #[must_use]
    pub fn to_flags(self) -> u32 {
        match self {
            CompressionKind::None => 0,
            CompressionKind::Lz4 => 1,
            CompressionKind::Lz4hc => 2,
            CompressionKind::Rfc1951 => 3,
        }
    }

    /// Canonical name for this kind.
    ///
    /// This string feeds the build-cache parameters digest, so it must stay
    /// stable even if the enum is ever reordered.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionKind::None => "none",
            CompressionKind::Lz4 => "lz4",
            CompressionKind::Lz4hc => "lz4hc",
            CompressionKind::Rfc1951 => "rfc1951",
        }
    }

    /// Parse a kind from its canonical name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(CompressionKind::None),
            "lz4" => Some(CompressionKind::Lz4),
            "lz4hc" => Some(CompressionKind::Lz4hc),
            "rfc1951" => Some(CompressionKind::Rfc1951),
            _ => None,
        }
    }
}

/// Compress data with the given codec.
///
/// `CompressionKind::None` returns the input unchanged.
///
/// # Errors
/// Returns an error if the codec fails.
pub fn compress(kind: CompressionKind, data: &[u8]) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::None => Ok(data.to_vec()),
        CompressionKind::Lz4 | CompressionKind::Lz4hc => Ok(lz4_flex::compress(data)),
        CompressionKind::Rfc1951 => {
            let mut encoder =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(data)
                .map_err(|e| Error::CompressionError(format!("deflate: {e}")))?;
            encoder
                .finish()
                .map_err(|e| Error::CompressionError(format!("deflate: {e}")))
        }
    }
}

/// Decompress data produced by [`compress`].
///
/// `original_size` is the expected decompressed size recorded in the
/// archive entry.
///
/// # Errors
/// Returns an error if the codec fails or the output size does not match.
pub fn decompress(kind: CompressionKind, data: &[u8], original_size: usize) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::None => Ok(data.to_vec()),
        CompressionKind::Lz4 | CompressionKind::Lz4hc => lz4_flex::decompress(data, original_size)
            .map_err(|e| Error::DecompressionError(format!("LZ4: {e}"))),
        CompressionKind::Rfc1951 => {
            let mut decoder = flate2::read::DeflateDecoder::new(data);
            let mut out = Vec::with_capacity(original_size);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| Error::DecompressionError(format!("deflate: {e}")))?;
            if out.len() != original_size {
                return Err(Error::DecompressionError(format!(
                    "deflate: expected {original_size} bytes, got {}",
                    out.len()
                )));
            }
            Ok(out)
        }
    }
}
