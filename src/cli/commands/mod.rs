use std::path::PathBuf;

use clap::Subcommand;

pub mod pack;

#[derive(Subcommand)]
pub enum Commands {
    /// Pack files into a DVPK archive (or DVPL lite packs)
    Pack {
        /// Base directory archive paths are relative to
        #[arg(short, long)]
        base_dir: PathBuf,

        /// Output archive file, or a directory for lite-pack mode
        #[arg(short, long)]
        destination: PathBuf,

        /// Source files or directories (repeatable)
        #[arg(short, long, conflicts_with = "meta_store")]
        source: Vec<PathBuf>,

        /// Metadata store document listing the files to pack
        #[arg(long, conflicts_with = "source")]
        meta_store: Option<PathBuf>,

        /// Compression: none, lz4, lz4hc, rfc1951
        #[arg(short, long, default_value = "lz4")]
        compression: String,

        /// Include hidden (dot-file) entries
        #[arg(long)]
        include_hidden: bool,

        /// Write the build log to this file
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

impl Commands {
    pub fn execute(self) -> anyhow::Result<()> {
        match self {
            Commands::Pack {
                base_dir,
                destination,
                source,
                meta_store,
                compression,
                include_hidden,
                log,
            } => pack::execute(
                &base_dir,
                &destination,
                source,
                meta_store,
                &compression,
                include_hidden,
                log,
            ),
        }
    }
}
