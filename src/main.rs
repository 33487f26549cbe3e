use anyhow::Context;
use clap::Parser;
use pfas_cleaner::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).context("pfas-cleaner failed")
}
