//! End-to-end packing tests: build archives into temp dirs, then parse
//! them back through the public format types and verify payloads.

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use dvpack::archive::{FILE_ENTRY_SIZE, FOOTER_SIZE, LITE_FOOTER_SIZE};
use dvpack::prelude::*;
use dvpack::{cache, compression};

fn touch(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

fn params(base: &Path, sources: Vec<PathBuf>, output: PathBuf) -> ArchiveParams {
    ArchiveParams {
        base_dir: base.to_path_buf(),
        sources: Sources::List(sources),
        include_hidden: false,
        compression: CompressionKind::Lz4,
        output_path: output,
        log_path: None,
    }
}

/// A parsed archive: footer, table entries, names, and the raw bytes.
struct ParsedArchive {
    bytes: Vec<u8>,
    footer: Footer,
    entries: Vec<FileTableEntry>,
    names: Vec<String>,
}

impl ParsedArchive {
    fn read(path: &Path) -> Self {
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.len() >= FOOTER_SIZE);
        let footer = Footer::read_from(&bytes[bytes.len() - FOOTER_SIZE..]).unwrap();

        let table_size = footer.files_table_size as usize;
        let table_start = bytes.len() - FOOTER_SIZE - table_size;
        let region = &bytes[table_start..bytes.len() - FOOTER_SIZE];
        assert_eq!(crc32fast::hash(region), footer.files_table_crc32);

        let mut entries = Vec::new();
        let mut cursor = region;
        for _ in 0..footer.num_files {
            entries.push(FileTableEntry::read_from(&mut cursor).unwrap());
        }

        let names = if footer.num_files > 0 {
            let entries_size = footer.num_files as usize * FILE_ENTRY_SIZE;
            let packed = &region[entries_size..entries_size + footer.names_size_compressed as usize];
            let names_crc =
                u32::from_le_bytes(region[table_size - 4..table_size].try_into().unwrap());
            assert_eq!(crc32fast::hash(packed), names_crc);

            let raw = compression::decompress(
                CompressionKind::Lz4hc,
                packed,
                footer.names_size_original as usize,
            )
            .unwrap();
            String::from_utf8(raw)
                .unwrap()
                .split('\0')
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };

        Self {
            bytes,
            footer,
            entries,
            names,
        }
    }

    fn payload(&self, entry: &FileTableEntry) -> Vec<u8> {
        let start = entry.start_position as usize;
        let packed = &self.bytes[start..start + entry.compressed_size as usize];
        assert_eq!(crc32fast::hash(packed), entry.compressed_crc32);
        let data =
            compression::decompress(entry.kind, packed, entry.original_size as usize).unwrap();
        assert_eq!(crc32fast::hash(&data), entry.original_crc32);
        data
    }
}

#[test]
fn single_archive_round_trip() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("assets");
    let text = "repetition repetition repetition repetition repetition".repeat(20);
    touch(&base.join("ui/menu.txt"), text.as_bytes());
    touch(&base.join("maps/level0.bin"), &[1, 2, 3, 4, 5]);
    touch(&base.join("readme.txt"), b"hello");

    let output = dir.path().join("out/assets.dvpk");
    let sources = vec![base.join("ui"), base.join("maps"), base.join("readme.txt")];
    let p = params(&base, sources, output.clone());
    create_archive(&p, None).unwrap();

    let archive = ParsedArchive::read(&output);
    assert_eq!(archive.footer.num_files, 3);
    assert_eq!(
        archive.names,
        vec!["maps/level0.bin", "readme.txt", "ui/menu.txt"]
    );

    // Offsets are contiguous and strictly increasing; with no metadata
    // store every entry lands in pack group 0.
    let mut expected_offset = 0u64;
    for entry in &archive.entries {
        assert_eq!(entry.start_position, expected_offset);
        assert_eq!(entry.meta_index, 0);
        expected_offset += u64::from(entry.compressed_size);
    }

    // Payloads decode back to the originals, per recorded kind.
    assert_eq!(archive.payload(&archive.entries[0]), &[1, 2, 3, 4, 5]);
    assert_eq!(archive.payload(&archive.entries[1]), b"hello");
    assert_eq!(archive.payload(&archive.entries[2]), text.as_bytes());

    // The long repetitive file actually compressed.
    assert_eq!(archive.entries[2].kind, CompressionKind::Lz4);
    assert!(archive.entries[2].compressed_size < archive.entries[2].original_size);
}

#[test]
fn duplicate_source_entries_dedup() {
    // Scenario: two source-list entries resolving to the same a.txt.
    let dir = TempDir::new().unwrap();
    let base = dir.path();
    touch(&base.join("a.txt"), b"same file");

    let output = base.join("out.dvpk");
    let p = params(
        base,
        vec![base.join("a.txt"), base.join("a.txt")],
        output.clone(),
    );
    create_archive(&p, None).unwrap();

    let archive = ParsedArchive::read(&output);
    assert_eq!(archive.footer.num_files, 1);
    assert_eq!(archive.names, vec!["a.txt"]);
}

#[test]
fn archive_path_collision_leaves_no_output() {
    // Scenario: two different files both mapping to archive path y.txt.
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    let outside = dir.path().join("elsewhere");
    touch(&base.join("y.txt"), b"inside");
    touch(&outside.join("y.txt"), b"outside");

    let output = dir.path().join("out.dvpk");
    let p = params(
        &base,
        vec![base.join("y.txt"), outside.join("y.txt")],
        output.clone(),
    );
    let err = create_archive(&p, None).unwrap_err();
    assert!(matches!(err, Error::ArchivePathCollision { .. }));
    assert!(!output.exists());
}

#[test]
fn zero_byte_file_under_rfc1951() {
    // Scenario: RFC1951 requested for a 0-byte input file.
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    touch(&base.join("empty.bin"), b"");

    let output = dir.path().join("out.dvpk");
    let mut p = params(&base, vec![base.join("empty.bin")], output.clone());
    p.compression = CompressionKind::Rfc1951;
    create_archive(&p, None).unwrap();

    let archive = ParsedArchive::read(&output);
    let entry = &archive.entries[0];
    assert_eq!(entry.original_size, 0);
    assert_eq!(entry.compressed_size, 0);
    assert_eq!(entry.kind, CompressionKind::None);
    assert!(archive.payload(entry).is_empty());
}

#[test]
fn incompressible_file_stored_raw() {
    // Short data never shrinks under LZ4, so the per-file override kicks
    // in even with an archive-wide LZ4 setting.
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    touch(&base.join("tiny.bin"), &[0xA7, 0x01, 0xFE]);

    let output = dir.path().join("out.dvpk");
    let p = params(&base, vec![base.join("tiny.bin")], output.clone());
    create_archive(&p, None).unwrap();

    let archive = ParsedArchive::read(&output);
    let entry = &archive.entries[0];
    assert_eq!(entry.kind, CompressionKind::None);
    assert_eq!(entry.compressed_size, entry.original_size);
    assert_eq!(archive.payload(entry), &[0xA7, 0x01, 0xFE]);
}

#[test]
fn empty_file_set_produces_footer_only_archive() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    std::fs::create_dir_all(&base).unwrap();

    let output = dir.path().join("out.dvpk");
    let p = params(&base, vec![], output.clone());
    create_archive(&p, None).unwrap();

    let archive = ParsedArchive::read(&output);
    assert_eq!(archive.bytes.len(), FOOTER_SIZE);
    assert_eq!(archive.footer.num_files, 0);
    assert_eq!(archive.footer.files_table_size, 0);
    assert_eq!(archive.footer.names_size_original, 0);
}

#[test]
fn lite_pack_failure_is_reported_but_others_still_write() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    touch(&base.join("ui/menu.txt"), b"menu contents");
    touch(&base.join("blob.bin"), b"blob contents");

    // Block one destination: a directory squatting on blob.bin.dvpl makes
    // that single lite pack unwritable.
    let output = dir.path().join("packs");
    std::fs::create_dir_all(output.join("blob.bin.dvpl")).unwrap();

    let p = params(
        &base,
        vec![base.join("ui"), base.join("blob.bin")],
        output.clone(),
    );
    let err = create_archive(&p, None).unwrap_err();
    match err {
        Error::LitePackPartialFailure { total, failed, .. } => {
            assert_eq!(total, 2);
            assert_eq!(failed, 1);
        }
        other => panic!("expected LitePackPartialFailure, got {other}"),
    }

    // The unaffected file was still written and parses.
    let lite = std::fs::read(output.join("ui/menu.txt.dvpl")).unwrap();
    let footer = LiteFooter::read_from(&lite[lite.len() - LITE_FOOTER_SIZE..]).unwrap();
    assert_eq!(footer.size_uncompressed as usize, b"menu contents".len());
}

#[test]
fn cache_hit_short_circuits_packing() {
    // Scenario: identical content+params as a prior successful build.
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    touch(&base.join("a.txt"), b"cached content");

    let output = dir.path().join("out.dvpk");
    let p = params(&base, vec![base.join("a.txt")], output.clone());

    let mut client = MemoryCacheClient::new();
    create_archive(&p, Some(&mut client)).unwrap();
    assert_eq!(client.len(), 2); // archive + log artifacts

    // Replace the cached archive with sentinel bytes; a second identical
    // build must export those bytes instead of packing.
    let files = vec![CollectedFile {
        absolute_path: base.join("a.txt"),
        archive_path: "a.txt".to_string(),
    }];
    let key = cache::archive_key(&files, CompressionKind::Lz4).unwrap();
    let sentinel = b"sentinel artifact bytes".to_vec();
    assert!(client.add(&key, CachedItemValue::new(sentinel.clone(), "sentinel")));

    std::fs::remove_file(&output).unwrap();
    create_archive(&p, Some(&mut client)).unwrap();
    assert_eq!(std::fs::read(&output).unwrap(), sentinel);
}

#[test]
fn content_change_misses_cache() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    touch(&base.join("a.txt"), b"version one");

    let output = dir.path().join("out.dvpk");
    let p = params(&base, vec![base.join("a.txt")], output.clone());

    let mut client = MemoryCacheClient::new();
    create_archive(&p, Some(&mut client)).unwrap();
    let first = std::fs::read(&output).unwrap();

    touch(&base.join("a.txt"), b"version two");
    create_archive(&p, Some(&mut client)).unwrap();
    let second = std::fs::read(&output).unwrap();

    // The second build packed fresh bytes and stored them under a new key.
    assert_ne!(first, second);
    assert_eq!(client.len(), 4);
}

/// Cache client that always misses and refuses every store.
struct RejectingCacheClient {
    adds: usize,
}

impl CacheClient for RejectingCacheClient {
    fn request(&mut self, _key: &CacheItemKey) -> Option<CachedItemValue> {
        None
    }

    fn add(&mut self, _key: &CacheItemKey, _value: CachedItemValue) -> bool {
        self.adds += 1;
        false
    }
}

#[test]
fn rejected_cache_store_does_not_fail_build() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    touch(&base.join("a.txt"), b"content");

    let output = dir.path().join("out.dvpk");
    let p = params(&base, vec![base.join("a.txt")], output.clone());

    let mut client = RejectingCacheClient { adds: 0 };
    create_archive(&p, Some(&mut client)).unwrap();

    // Both the archive and log stores were offered and refused, yet the
    // build succeeded and the archive is intact on disk.
    assert_eq!(client.adds, 2);
    let archive = ParsedArchive::read(&output);
    assert_eq!(archive.payload(&archive.entries[0]), b"content");
}

#[test]
fn corrupted_cache_entry_is_ignored() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    touch(&base.join("a.txt"), b"content");

    let output = dir.path().join("out.dvpk");
    let p = params(&base, vec![base.join("a.txt")], output.clone());

    let files = vec![CollectedFile {
        absolute_path: base.join("a.txt"),
        archive_path: "a.txt".to_string(),
    }];
    let key = cache::archive_key(&files, CompressionKind::Lz4).unwrap();
    let mut poisoned = CachedItemValue::new(b"bad artifact".to_vec(), "poisoned");
    poisoned.validation_crc32 ^= 0xFFFF;

    let mut client = MemoryCacheClient::new();
    client.add(&key, poisoned);

    // The invalid entry must be treated as a miss and repacked fresh.
    create_archive(&p, Some(&mut client)).unwrap();
    let archive = ParsedArchive::read(&output);
    assert_eq!(archive.payload(&archive.entries[0]), b"content");
}

#[test]
fn build_log_is_written_and_cached() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    touch(&base.join("a.txt"), b"content");

    let output = dir.path().join("out.dvpk");
    let log_path = dir.path().join("build.log");
    let mut p = params(&base, vec![base.join("a.txt")], output.clone());
    p.log_path = Some(log_path.clone());

    let mut client = MemoryCacheClient::new();
    create_archive(&p, Some(&mut client)).unwrap();

    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("archive created successfully"));

    // A warm rebuild restores the cached log alongside the archive.
    std::fs::remove_file(&log_path).unwrap();
    create_archive(&p, Some(&mut client)).unwrap();
    let restored = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(restored, log);
}

#[test]
fn meta_store_build_embeds_metadata() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    touch(&base.join("maps/level0.bin"), b"level zero");
    touch(&base.join("common.bin"), b"shared");

    let store_path = dir.path().join("store.json");
    std::fs::write(
        &store_path,
        r#"{ "files": [
            { "path": "maps/level0.bin", "pack_index": 1 },
            { "path": "common.bin", "pack_index": 0 }
        ] }"#,
    )
    .unwrap();

    let output = dir.path().join("out.dvpk");
    let p = ArchiveParams {
        base_dir: base.clone(),
        sources: Sources::MetaStore(store_path.clone()),
        include_hidden: false,
        compression: CompressionKind::Lz4,
        output_path: output.clone(),
        log_path: None,
    };
    create_archive(&p, None).unwrap();

    let archive = ParsedArchive::read(&output);
    // Store order is preserved, with pack-group indices per row.
    assert_eq!(archive.names, vec!["maps/level0.bin", "common.bin"]);
    assert_eq!(archive.entries[0].meta_index, 1);
    assert_eq!(archive.entries[1].meta_index, 0);

    // The embedded metadata block is the canonical store JSON.
    let store = MetaStore::load(&store_path).unwrap();
    let expected = store.to_bytes().unwrap();
    assert_eq!(archive.footer.meta_data_size as usize, expected.len());
    let payload_end: u64 = archive
        .entries
        .iter()
        .map(|e| u64::from(e.compressed_size))
        .sum();
    let block = &archive.bytes
        [payload_end as usize..payload_end as usize + expected.len()];
    assert_eq!(block, expected.as_slice());
    assert_eq!(crc32fast::hash(block), archive.footer.meta_data_crc32);
}

#[test]
fn meta_store_missing_file_fails_build() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    std::fs::create_dir_all(&base).unwrap();

    let store_path = dir.path().join("store.json");
    std::fs::write(
        &store_path,
        r#"{ "files": [ { "path": "gone.bin", "pack_index": 0 } ] }"#,
    )
    .unwrap();

    let output = dir.path().join("out.dvpk");
    let p = ArchiveParams {
        base_dir: base,
        sources: Sources::MetaStore(store_path),
        include_hidden: false,
        compression: CompressionKind::Lz4,
        output_path: output.clone(),
        log_path: None,
    };
    assert!(matches!(
        create_archive(&p, None),
        Err(Error::MetaFileMissing { .. })
    ));
    assert!(!output.exists());
}

#[test]
fn lite_pack_mode_writes_dvpl_per_file() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base");
    let text = "compressible compressible compressible compressible".repeat(10);
    touch(&base.join("ui/menu.txt"), text.as_bytes());
    touch(&base.join("empty.bin"), b"");

    let output = dir.path().join("packs");
    std::fs::create_dir_all(&output).unwrap();
    let p = params(&base, vec![base.join("ui"), base.join("empty.bin")], output.clone());
    create_archive(&p, None).unwrap();

    // Compressible file: LZ4HC payload plus footer.
    let lite = std::fs::read(output.join("ui/menu.txt.dvpl")).unwrap();
    let footer = LiteFooter::read_from(&lite[lite.len() - LITE_FOOTER_SIZE..]).unwrap();
    assert_eq!(footer.kind, CompressionKind::Lz4hc);
    assert_eq!(footer.size_uncompressed as usize, text.len());
    let payload = &lite[..lite.len() - LITE_FOOTER_SIZE];
    assert_eq!(payload.len(), footer.size_compressed as usize);
    assert_eq!(crc32fast::hash(payload), footer.crc32_compressed);
    let data = compression::decompress(
        footer.kind,
        payload,
        footer.size_uncompressed as usize,
    )
    .unwrap();
    assert_eq!(data, text.as_bytes());

    // Empty file: stored raw, footer only.
    let empty = std::fs::read(output.join("empty.bin.dvpl")).unwrap();
    assert_eq!(empty.len(), LITE_FOOTER_SIZE);
    let footer = LiteFooter::read_from(&empty).unwrap();
    assert_eq!(footer.kind, CompressionKind::None);
    assert_eq!(footer.size_uncompressed, 0);
    assert_eq!(footer.size_compressed, 0);
}
