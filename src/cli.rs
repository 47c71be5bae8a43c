use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "wikisearch",
    about = "Partitioned full-text search for wiki content"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage index partitions
    Partition {
        #[command(subcommand)]
        action: PartitionAction,
    },
    /// Search across partitions
    Search(SearchArgs),
    /// Rebuild all partition indexes (requires an admin token)
    Rebuild(RebuildArgs),
    /// Manage admin tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Show system status and statistics
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Partition subcommands --

#[derive(Debug, Subcommand)]
pub enum PartitionAction {
    /// Register a source directory as a named partition
    Add {
        /// Path to the source directory of page files
        path: PathBuf,
        /// Partition name (e.g. wiki-en)
        #[arg(long)]
        name: String,
    },
    /// Remove a partition definition and its index
    Remove {
        /// Name of the partition to remove
        name: String,
    },
    /// List all registered partitions
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

// -- Token subcommands --

#[derive(Debug, Subcommand)]
pub enum TokenAction {
    /// Register an admin token
    Add {
        /// The token value
        token: String,
        /// Human-readable label for the token holder
        #[arg(long, default_value = "")]
        label: String,
    },
    /// Revoke an admin token
    Remove {
        /// The token value
        token: String,
    },
    /// List registered tokens by label
    List,
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query (tantivy query syntax)
    pub query: String,

    /// Restrict the search to these partitions (repeatable)
    #[arg(short = 'p', long = "partition")]
    pub partitions: Vec<String>,

    /// Restrict the search to these language codes (repeatable;
    /// "default" selects pages without language metadata)
    #[arg(short = 'l', long = "lang")]
    pub languages: Vec<String>,

    /// Number of results to return
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Per-partition timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Rebuild --

#[derive(Debug, Parser)]
pub struct RebuildArgs {
    /// Admin token authorizing the rebuild
    #[arg(long, default_value = "")]
    pub token: String,

    /// Output the status as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "wikisearch",
            &mut std::io::stdout(),
        );
    }
}
