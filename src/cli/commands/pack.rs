use std::path::{Path, PathBuf};

use crate::archiver::{ArchiveParams, Sources, create_archive};
use crate::compression::CompressionKind;

pub fn execute(
    base_dir: &Path,
    destination: &Path,
    source: Vec<PathBuf>,
    meta_store: Option<PathBuf>,
    compression: &str,
    include_hidden: bool,
    log: Option<PathBuf>,
) -> anyhow::Result<()> {
    let kind = CompressionKind::from_name(&compression.to_lowercase()).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown compression method: '{}'. Valid options: none, lz4, lz4hc, rfc1951",
            compression
        )
    })?;

    let sources = match meta_store {
        Some(store) => Sources::MetaStore(store),
        None => {
            if source.is_empty() {
                anyhow::bail!("either --source or --meta-store is required");
            }
            Sources::List(source)
        }
    };

    println!(
        "Packing {} into {} (compression: {})",
        base_dir.display(),
        destination.display(),
        kind.as_str()
    );

    let params = ArchiveParams {
        base_dir: base_dir.to_path_buf(),
        sources,
        include_hidden,
        compression: kind,
        output_path: destination.to_path_buf(),
        log_path: log,
    };
    create_archive(&params, None)?;
    println!("Archive created successfully");
    Ok(())
}
