//! DVPK archive format and writers

pub mod format;
pub mod writer;

pub use format::{
    FILE_ENTRY_SIZE, FOOTER_SIZE, FileTableEntry, Footer, LITE_FOOTER_SIZE, LITE_MAGIC,
    LiteFooter, PACK_MAGIC,
};
pub use writer::{write_archive, write_lite_packs};
