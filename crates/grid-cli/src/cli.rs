use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "gridinv",
    about = "Inspect grid inventory manifests and record blocks",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log store activity at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Sync settings (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a manifest and print the folder tree
    Tree(TreeArgs),
    /// Resolve a `/`-separated name path against a manifest
    Find(FindArgs),
    /// Parse inv_item / inv_category text blocks
    Parse(ParseArgs),
    /// Feed a list of updates through the sync client and report the changes
    Replay(ReplayArgs),
}

#[derive(Args)]
pub struct TreeArgs {
    /// Manifest file (JSON)
    pub manifest: PathBuf,
    /// Show short identifiers next to names
    #[arg(long)]
    pub ids: bool,
}

#[derive(Args)]
pub struct FindArgs {
    pub manifest: PathBuf,
    /// Path such as `Objects/Trees/Maple`; empty for the root
    pub path: String,
}

#[derive(Args)]
pub struct ParseArgs {
    /// File holding one or more text blocks
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ReplayArgs {
    pub manifest: PathBuf,
    /// JSON array of updates (`{"Item": {...}}` or `{"Folder": {...}}`)
    pub updates: PathBuf,
}
