mod cli;
mod config;
mod logging;
mod pipeline;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log_file.as_deref(), cli.verbose);
    pipeline::run(cli).await
}
