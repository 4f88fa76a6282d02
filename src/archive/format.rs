//! On-disk types for the DVPK pack format and DVPL lite packs
//!
//! Single-archive layout, offset 0 to EOF:
//!
//! ```text
//! [payload file0][payload file1]...[optional metadata]
//! [FileTableEntry x num_files][compressed names][u32 names CRC32][Footer]
//! ```
//!
//! The footer is fixed-size and always the final bytes of the archive; a
//! reader seeks to `file_size - FOOTER_SIZE`, validates magic and
//! `info_crc32`, then uses `files_table_size` to locate the table region.
//!
//! Lite-pack layout: `[compressed payload][LiteFooter]`.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::compression::CompressionKind;
use crate::error::{Error, Result};

/// Magic marker closing a DVPK archive footer.
pub const PACK_MAGIC: [u8; 4] = *b"DVPK";

/// Magic marker closing a DVPL lite-pack file.
pub const LITE_MAGIC: [u8; 4] = *b"DVPL";

/// Serialized size of one [`FileTableEntry`].
pub const FILE_ENTRY_SIZE: usize = 32;

/// Serialized size of the [`Footer`], including its trailing CRC32.
pub const FOOTER_SIZE: usize = 36;

/// Serialized size of the [`LiteFooter`].
pub const LITE_FOOTER_SIZE: usize = 20;

/// Entry in the file table describing one packed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTableEntry {
    /// Offset of the payload from the start of the archive.
    pub start_position: u64,
    /// Size of the original (decompressed) data.
    pub original_size: u32,
    /// Size of the payload as written.
    pub compressed_size: u32,
    /// Codec that produced the payload.
    pub kind: CompressionKind,
    /// CRC32 of the original data.
    pub original_crc32: u32,
    /// CRC32 of the payload as written.
    pub compressed_crc32: u32,
    /// Pack-group index from the metadata store (0 without a store).
    pub meta_index: u32,
}

impl FileTableEntry {
    /// Serialize the entry in little-endian layout.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u64::<LittleEndian>(self.start_position)?;
        writer.write_u32::<LittleEndian>(self.original_size)?;
        writer.write_u32::<LittleEndian>(self.compressed_size)?;
        writer.write_u32::<LittleEndian>(self.kind.to_flags())?;
        writer.write_u32::<LittleEndian>(self.original_crc32)?;
        writer.write_u32::<LittleEndian>(self.compressed_crc32)?;
        writer.write_u32::<LittleEndian>(self.meta_index)?;
        Ok(())
    }

    /// Deserialize one entry.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let start_position = reader.read_u64::<LittleEndian>()?;
        let original_size = reader.read_u32::<LittleEndian>()?;
        let compressed_size = reader.read_u32::<LittleEndian>()?;
        let kind = CompressionKind::from_flags(reader.read_u32::<LittleEndian>()?)?;
        let original_crc32 = reader.read_u32::<LittleEndian>()?;
        let compressed_crc32 = reader.read_u32::<LittleEndian>()?;
        let meta_index = reader.read_u32::<LittleEndian>()?;
        Ok(Self {
            start_position,
            original_size,
            compressed_size,
            kind,
            original_crc32,
            compressed_crc32,
            meta_index,
        })
    }
}

/// Fixed-size trailer of a DVPK archive.
///
/// The info part (magic plus seven `u32` fields) is covered by the
/// trailing `info_crc32`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Footer {
    /// Number of files in the archive.
    pub num_files: u32,
    /// Size of the LZ4HC-compressed names block.
    pub names_size_compressed: u32,
    /// Size of the names block before compression.
    pub names_size_original: u32,
    /// Size of the whole file-table region (entries + names + names CRC32).
    pub files_table_size: u32,
    /// CRC32 of the whole file-table region.
    pub files_table_crc32: u32,
    /// CRC32 of the embedded metadata block (0 when absent).
    pub meta_data_crc32: u32,
    /// Size of the embedded metadata block (0 when absent).
    pub meta_data_size: u32,
}

impl Footer {
    fn info_bytes(&self) -> Vec<u8> {
        let mut info = Vec::with_capacity(FOOTER_SIZE - 4);
        info.extend_from_slice(&PACK_MAGIC);
        for field in [
            self.num_files,
            self.names_size_compressed,
            self.names_size_original,
            self.files_table_size,
            self.files_table_crc32,
            self.meta_data_crc32,
            self.meta_data_size,
        ] {
            info.extend_from_slice(&field.to_le_bytes());
        }
        info
    }

    /// Serialize the footer, appending the CRC32 of its info part.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let info = self.info_bytes();
        writer.write_all(&info)?;
        writer.write_u32::<LittleEndian>(crc32fast::hash(&info))?;
        Ok(())
    }

    /// Parse and validate a footer from its serialized bytes.
    ///
    /// # Errors
    /// Returns an error on short input, bad magic, or CRC mismatch.
    pub fn read_from(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FOOTER_SIZE {
            return Err(Error::UnexpectedEof);
        }
        let (info, mut crc_bytes) = bytes.split_at(FOOTER_SIZE - 4);
        if info[..4] != PACK_MAGIC {
            return Err(Error::InvalidPackMagic);
        }
        let expected = crc_bytes.read_u32::<LittleEndian>()?;
        let actual = crc32fast::hash(info);
        if expected != actual {
            return Err(Error::FooterCrcMismatch { expected, actual });
        }

        let mut fields = &info[4..];
        Ok(Self {
            num_files: fields.read_u32::<LittleEndian>()?,
            names_size_compressed: fields.read_u32::<LittleEndian>()?,
            names_size_original: fields.read_u32::<LittleEndian>()?,
            files_table_size: fields.read_u32::<LittleEndian>()?,
            files_table_crc32: fields.read_u32::<LittleEndian>()?,
            meta_data_crc32: fields.read_u32::<LittleEndian>()?,
            meta_data_size: fields.read_u32::<LittleEndian>()?,
        })
    }
}

/// Fixed-size trailer of a DVPL lite-pack file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteFooter {
    /// Size of the original data.
    pub size_uncompressed: u32,
    /// Size of the payload as written.
    pub size_compressed: u32,
    /// CRC32 of the payload as written.
    pub crc32_compressed: u32,
    /// Codec that produced the payload.
    pub kind: CompressionKind,
}

impl LiteFooter {
    /// Serialize the footer, closing with the DVPL magic.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.size_uncompressed)?;
        writer.write_u32::<LittleEndian>(self.size_compressed)?;
        writer.write_u32::<LittleEndian>(self.crc32_compressed)?;
        writer.write_u32::<LittleEndian>(self.kind.to_flags())?;
        writer.write_all(&LITE_MAGIC)?;
        Ok(())
    }

    /// Parse and validate a lite footer from its serialized bytes.
    pub fn read_from(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < LITE_FOOTER_SIZE {
            return Err(Error::UnexpectedEof);
        }
        if bytes[16..20] != LITE_MAGIC {
            return Err(Error::InvalidLiteMagic);
        }
        let mut fields = bytes;
        Ok(Self {
            size_uncompressed: fields.read_u32::<LittleEndian>()?,
            size_compressed: fields.read_u32::<LittleEndian>()?,
            crc32_compressed: fields.read_u32::<LittleEndian>()?,
            kind: CompressionKind::from_flags(fields.read_u32::<LittleEndian>()?)?,
        })
    }
}
