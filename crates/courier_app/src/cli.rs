use std::path::PathBuf;

use clap::Parser;

/// Reveal a lazily loaded document listing, download every document and deliver it to object storage.
#[derive(Debug, Parser)]
#[command(name = "courier", version)]
pub struct Cli {
    /// RON configuration file.
    #[arg(short, long, default_value = "courier.ron")]
    pub config: PathBuf,

    /// Also write log lines to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Reveal and list the documents without downloading or uploading anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,
}
