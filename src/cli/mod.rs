//! CLI module for llmos.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// llmos - an LLM assistant that uses tools, delegates and remembers
///
/// Chat with an assistant that can calculate, search the web, read and write
/// files, look up stock data, hand work to a research or Python assistant and
/// answer from your own knowledge base.
#[derive(Parser, Debug)]
#[command(name = "llmos")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
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
    /// Initialize llmos and verify system requirements
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Start an interactive chat session
    Chat {
        /// User name the runs are stored under
        #[arg(short, long, env = "LLMOS_USER")]
        user: Option<String>,

        /// Resume a stored run
        #[arg(short, long)]
        run: Option<String>,
    },

    /// Ask a single question
    Ask {
        /// The question to ask
        question: String,

        /// User name the run is stored under
        #[arg(short, long, env = "LLMOS_USER")]
        user: Option<String>,

        /// Continue a stored run
        #[arg(short, long)]
        run: Option<String>,
    },

    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage the knowledge base
    Knowledge {
        #[command(subcommand)]
        action: KnowledgeAction,
    },

    /// List stored runs
    Runs {
        /// Only show runs of this user
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Read a website and add it to the knowledge base
    AddUrl {
        url: String,
    },

    /// Add a PDF to the knowledge base
    AddPdf {
        path: PathBuf,
    },

    /// Search the knowledge base
    Search {
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List the sources in the knowledge base
    List,

    /// Remove every document from the knowledge base
    Clear,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_knowledge_add_url() {
        let cli = Cli::parse_from(["llmos", "-vv", "knowledge", "add-url", "https://example.com"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Knowledge {
                action: KnowledgeAction::AddUrl { url },
            } => assert_eq!(url, "https://example.com"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_chat_with_user() {
        let cli = Cli::parse_from(["llmos", "chat", "--user", "ada", "-c", "/tmp/llmos.toml"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/llmos.toml"));
        match cli.command {
            Commands::Chat { user, run } => {
                assert_eq!(user.as_deref(), Some("ada"));
                assert!(run.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
