//! dvpack command-line binary

fn main() -> anyhow::Result<()> {
    dvpack::cli::run_cli()
}
