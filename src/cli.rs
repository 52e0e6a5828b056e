//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// Shortener - URL shortener with asynchronous soft deletion
#[derive(Parser)]
#[command(name = "shortener")]
#[command(version)]
#[command(about = "URL shortener with asynchronous soft deletion", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Shorten a URL on behalf of a user
    Shorten {
        /// Owner of the new link
        #[arg(long, short = 'u')]
        user: String,

        /// URL to shorten (http or https)
        url: String,
    },

    /// Shorten several URLs in one batch
    Batch {
        #[arg(long, short = 'u')]
        user: String,

        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Resolve a short code to its original URL
    Get {
        short_code: String,
    },

    /// List the live links of a user
    List {
        #[arg(long, short = 'u')]
        user: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Soft-delete short codes owned by a user
    ///
    /// The request goes through the deletion pipeline, which is drained
    /// before the command returns.
    Delete {
        #[arg(long, short = 'u')]
        user: String,

        #[arg(required = true)]
        short_codes: Vec<String>,
    },

    /// Read deletion requests as JSON lines from stdin until EOF or Ctrl+C
    ///
    /// Line format: {"owner_id": "...", "short_codes": ["...", ...]}
    Worker,

    /// Check that the configured storage backend is reachable
    Ping,

    /// Generate example configuration file
    ConfigGen {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
