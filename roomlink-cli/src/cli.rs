use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "roomlink",
    version,
    about = "Resolve a playable stream URL from a live-room page, recovering from anti-bot challenges"
)]
pub struct Args {
    /// Room URL or bare room id.
    pub url: String,

    /// Initial session cookies, "name1=value1; name2=value2".
    #[arg(long)]
    pub cookies: Option<String>,

    /// Budget for the interactive challenge solve, in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Path to a JSON configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Debug logging.
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only.
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}
