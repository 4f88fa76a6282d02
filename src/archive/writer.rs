//! Archive packing
//!
//! Two output modes share one per-file policy: a requested codec is kept
//! only when it strictly shrinks the file, otherwise the payload is stored
//! raw with kind `None`. Single-archive mode is all-or-nothing and removes
//! a partial output file on failure; lite-pack mode writes one `.dvpl`
//! per file and treats each file independently.

use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::{debug, info, warn};

use crate::collector::CollectedFile;
use crate::compression::{self, CompressionKind};
use crate::error::{Error, Result};
use crate::meta::MetaStore;

use super::format::{FILE_ENTRY_SIZE, FileTableEntry, Footer, LiteFooter};

/// Extension appended to archive paths in lite-pack mode.
pub const LITE_EXTENSION: &str = "dvpl";

/// Pick the payload to write for one file.
///
/// Returns the bytes and the kind actually used; the requested kind is
/// dropped whenever it does not strictly shrink the data, and empty files
/// are never compressed.
fn choose_payload<'a>(
    requested: CompressionKind,
    data: &'a [u8],
) -> Result<(Cow<'a, [u8]>, CompressionKind)> {
    if requested == CompressionKind::None || data.is_empty() {
        return Ok((Cow::Borrowed(data), CompressionKind::None));
    }
    let packed = compression::compress(requested, data)?;
    if packed.len() < data.len() {
        Ok((Cow::Owned(packed), requested))
    } else {
        Ok((Cow::Borrowed(data), CompressionKind::None))
    }
}

fn size_as_u32(path: &Path, size: usize) -> Result<u32> {
    size.try_into().map_err(|_| Error::FileTooLarge {
        path: path.to_path_buf(),
        size: size as u64,
    })
}

/// Write a single DVPK archive containing the collected files, in order.
///
/// Any failure aborts the whole pack and removes the partial output file.
///
/// # Errors
/// Fails on unreadable sources, oversized files, codec failures, or any
/// write error.
pub fn write_archive(
    files: &[CollectedFile],
    kind: CompressionKind,
    meta: Option<&MetaStore>,
    output_path: &Path,
) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let result = write_archive_contents(files, kind, meta, output_path);
    if result.is_err() {
        // Never leave a half-written archive behind.
        let _ = std::fs::remove_file(output_path);
    }
    result
}

fn write_archive_contents(
    files: &[CollectedFile],
    kind: CompressionKind,
    meta: Option<&MetaStore>,
    output_path: &Path,
) -> Result<()> {
    let num_files: u32 = files
        .len()
        .try_into()
        .map_err(|_| Error::TooManyFiles { count: files.len() })?;

    let output = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(output_path)?;
    let mut writer = BufWriter::new(output);

    // Payload stream: contiguous, offsets strictly increasing.
    let mut offset: u64 = 0;
    let mut entries = Vec::with_capacity(files.len());
    let meta_indices = meta.map(MetaStore::index_map);

    for file in files {
        let data = std::fs::read(&file.absolute_path)?;
        let original_size = size_as_u32(&file.absolute_path, data.len())?;
        let original_crc32 = crc32fast::hash(&data);

        let (payload, used_kind) = choose_payload(kind, &data)?;
        let compressed_size = size_as_u32(&file.absolute_path, payload.len())?;
        let compressed_crc32 = crc32fast::hash(&payload);

        debug!(
            "packing {} ({} -> {} bytes, {})",
            file.archive_path,
            original_size,
            compressed_size,
            used_kind.as_str()
        );

        writer.write_all(&payload)?;
        entries.push(FileTableEntry {
            start_position: offset,
            original_size,
            compressed_size,
            kind: used_kind,
            original_crc32,
            compressed_crc32,
            meta_index: meta_indices.as_ref().map_or(0, |indices| {
                indices
                    .get(file.archive_path.as_str())
                    .copied()
                    .unwrap_or(0)
            }),
        });
        offset += u64::from(compressed_size);
    }

    // Optional metadata block, straight after the payloads.
    let mut footer = Footer {
        num_files,
        ..Footer::default()
    };
    if let Some(store) = meta {
        let bytes = store.to_bytes()?;
        footer.meta_data_size = size_as_u32(output_path, bytes.len())?;
        footer.meta_data_crc32 = crc32fast::hash(&bytes);
        writer.write_all(&bytes)?;
    }

    // File-table region: entries, compressed names, names CRC32. The
    // region collapses to zero bytes for an empty archive.
    if !files.is_empty() {
        let mut region = Vec::with_capacity(FILE_ENTRY_SIZE * entries.len());
        for entry in &entries {
            entry.write_to(&mut region)?;
        }

        let names = names_block(files);
        // Names are always LZ4HC, independent of the archive-wide choice.
        let packed_names = compression::compress(CompressionKind::Lz4hc, &names)?;
        footer.names_size_original = size_as_u32(output_path, names.len())?;
        footer.names_size_compressed = size_as_u32(output_path, packed_names.len())?;

        region.extend_from_slice(&packed_names);
        region.write_u32::<LittleEndian>(crc32fast::hash(&packed_names))?;

        footer.files_table_size = size_as_u32(output_path, region.len())?;
        footer.files_table_crc32 = crc32fast::hash(&region);
        writer.write_all(&region)?;
    }

    footer.write_to(&mut writer)?;
    writer.flush()?;

    info!(
        "packed {} files into {}",
        files.len(),
        output_path.display()
    );
    Ok(())
}

/// NUL-separated concatenation of the archive paths, in file order.
fn names_block(files: &[CollectedFile]) -> Vec<u8> {
    let mut names = Vec::new();
    for (i, file) in files.iter().enumerate() {
        if i > 0 {
            names.push(0);
        }
        names.extend_from_slice(file.archive_path.as_bytes());
    }
    names
}

/// Write one `.dvpl` lite pack per collected file under `output_dir`.
///
/// Lite packs always use LZ4HC (still subject to the keep-only-if-smaller
/// rule). Files succeed or fail independently; after the pass the build
/// fails if any file failed, but every writable file has been written.
pub fn write_lite_packs(files: &[CollectedFile], output_dir: &Path) -> Result<()> {
    let mut failed = 0usize;
    let mut first_error = String::new();

    for file in files {
        if let Err(e) = write_lite_pack(file, output_dir) {
            warn!("lite pack failed for {}: {e}", file.archive_path);
            if failed == 0 {
                first_error = e.to_string();
            }
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(Error::LitePackPartialFailure {
            total: files.len(),
            failed,
            first_error,
        });
    }

    info!(
        "wrote {} lite packs under {}",
        files.len(),
        output_dir.display()
    );
    Ok(())
}

fn write_lite_pack(file: &CollectedFile, output_dir: &Path) -> Result<()> {
    let data = std::fs::read(&file.absolute_path)?;
    let (payload, kind) = choose_payload(CompressionKind::Lz4hc, &data)?;

    let footer = LiteFooter {
        size_uncompressed: size_as_u32(&file.absolute_path, data.len())?,
        size_compressed: size_as_u32(&file.absolute_path, payload.len())?,
        crc32_compressed: crc32fast::hash(&payload),
        kind,
    };

    let mut dest = output_dir.join(&file.archive_path);
    let mut name = dest
        .file_name()
        .ok_or_else(|| Error::InvalidPath(file.archive_path.clone()))?
        .to_os_string();
    name.push(".");
    name.push(LITE_EXTENSION);
    dest.set_file_name(name);

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(
        OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&dest)?,
    );
    writer.write_all(&payload)?;
    footer.write_to(&mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incompressible_data_stays_raw() {
        // One byte cannot shrink under any codec.
        let (payload, kind) = choose_payload(CompressionKind::Lz4, &[42]).unwrap();
        assert_eq!(kind, CompressionKind::None);
        assert_eq!(payload.as_ref(), &[42]);
    }

    #[test]
    fn empty_data_is_never_compressed() {
        let (payload, kind) = choose_payload(CompressionKind::Rfc1951, &[]).unwrap();
        assert_eq!(kind, CompressionKind::None);
        assert!(payload.is_empty());
    }

    #[test]
    fn compressible_data_keeps_requested_kind() {
        let data = vec![7u8; 4096];
        let (payload, kind) = choose_payload(CompressionKind::Lz4hc, &data).unwrap();
        assert_eq!(kind, CompressionKind::Lz4hc);
        assert!(payload.len() < data.len());
    }

    #[test]
    fn names_block_is_nul_separated() {
        let files = vec![
            CollectedFile {
                absolute_path: "/x/a".into(),
                archive_path: "a".to_string(),
            },
            CollectedFile {
                absolute_path: "/x/b".into(),
                archive_path: "sub/b".to_string(),
            },
        ];
        assert_eq!(names_block(&files), b"a\0sub/b");
    }
}
