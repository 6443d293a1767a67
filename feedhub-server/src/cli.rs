use std::path::PathBuf;

use clap::Parser;

/// Feed cache server with pull and push endpoints
#[derive(Parser, Debug)]
#[command(name = "feedhub", version, about)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,
}
