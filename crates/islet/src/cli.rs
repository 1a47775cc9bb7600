//! Clap derive structures for the `islet` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// islet -- read the island forum from the command line
#[derive(Debug, Parser)]
#[command(
    name = "islet",
    version,
    about = "Browse the island forum from the command line",
    long_about = "Browse the island forum from the command line.\n\n\
        Board lists, timelines, the site notice, and feeds are served from a\n\
        local cache first and reconciled against the server in the same run.\n\
        The cache lives in the platform cache directory (set ISLET_CACHE_DIR\n\
        or cache_dir in the config file to move it).",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Site root (overrides the config file)
    #[arg(long = "base-url", short = 'c', env = "ISLET_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Output format (defaults to the config file's, then plain)
    #[arg(long, short = 'o', env = "ISLET_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "ISLET_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "ISLET_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Plain,
    /// One JSON document per line
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List boards, grouped by community
    #[command(alias = "boards")]
    Communities(RefreshArgs),

    /// List timelines
    Timelines(RefreshArgs),

    /// Show the site notice
    Notice(RefreshArgs),

    /// Show the first page of a subscription feed
    Feeds(FeedsArgs),

    /// Full-text search
    Search(SearchArgs),

    /// Show one page of a thread
    Thread(ThreadArgs),

    /// Show the latest client release
    Release,

    /// Classify a saved server reply without touching the network
    Classify(ClassifyArgs),

    /// Manage the configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Write the server's answer to the cache even if nothing changed
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Debug, Args)]
pub struct FeedsArgs {
    /// Feed id (defaults to `feed_uuid` from the config file)
    #[arg(long)]
    pub uuid: Option<String>,

    #[command(flatten)]
    pub refresh: RefreshArgs,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long, default_value_t = 1)]
    pub page: u32,
}

#[derive(Debug, Args)]
pub struct ThreadArgs {
    /// Thread number
    pub id: String,

    #[arg(long, default_value_t = 1)]
    pub page: u32,
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// File holding the reply body (`-` for stdin)
    pub file: PathBuf,

    /// HTTP status the reply came with
    #[arg(long, default_value_t = 200)]
    pub status: u16,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    pub shell: clap_complete::Shell,
}
