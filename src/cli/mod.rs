//! CLI module for Decksmith
//!
//! Provides command-line interface parsing for the decksmith-server binary.

pub mod init;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Decksmith - streaming presentation outlines with research enrichment
#[derive(Parser, Debug)]
#[command(
    name = "decksmith-server",
    version,
    about = "Decksmith - streaming presentation outlines with research enrichment",
    after_help = "EXAMPLES:\n    \
                  decksmith-server init                 # Write decksmith.toml and .env.example\n    \
                  decksmith-server                      # Start the server (requires decksmith.toml)\n    \
                  decksmith-server --config my.toml     # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "decksmith.toml", global = true)]
    pub config: PathBuf,

    /// Enable debug logging (overrides server.log_level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold decksmith.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// LLM provider to configure (ollama or openai)
        #[arg(long, default_value = "ollama")]
        provider: String,
    },

    /// Load and validate the configuration file, then exit
    Check,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
