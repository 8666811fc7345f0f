//! CLI module for Tolk.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{mask_secret, Output};

use clap::{Parser, Subcommand};

/// Tolk - a chat assistant that can search the web, read pages and watch videos
///
/// Runs an LLM tool-calling loop over Anthropic, OpenAI or any
/// OpenAI-compatible endpoint. The name "Tolk" is Scandinavian for "interpreter."
#[derive(Parser, Debug)]
#[command(name = "tolk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Conversation id to continue (default: a fresh local session)
        #[arg(long, allow_hyphen_values = true)]
        conversation: Option<String>,
    },

    /// Send a single message and print the reply
    Ask {
        /// The message to send
        message: String,
    },

    /// Start HTTP API server for integration with other systems
    Serve {
        /// Host to bind to (default: server.host from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default: server.port from config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration (secrets masked)
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
