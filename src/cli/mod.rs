//! Command-line interface: argument parsing and command dispatch.

mod chat;
mod key;
mod mcp;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Portuguese accounting assistant with a local MCP knowledge cache.
#[derive(Parser)]
#[command(name = "cbot", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the interactive chat (the default when no command is given)
    Chat {
        /// Model variant to start with: flash or pro
        #[arg(long)]
        model: Option<String>,
    },
    /// Inspect and edit the MCP knowledge cache
    Mcp {
        #[command(subcommand)]
        action: McpAction,
    },
    /// Manage the stored API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum McpAction {
    /// List all cached entries
    List,
    /// Add a question/answer pair
    Add {
        /// The user question, matched exactly (case/whitespace-insensitive)
        #[arg(short, long)]
        question: String,
        /// The assistant answer returned on a hit
        #[arg(short, long)]
        answer: String,
    },
    /// Edit an entry by its list number
    Edit {
        /// Entry number as shown by `mcp list`
        index: usize,
        /// Replacement question
        #[arg(short, long)]
        question: Option<String>,
        /// Replacement answer
        #[arg(short, long)]
        answer: Option<String>,
    },
    /// Delete an entry by its list number
    Delete {
        /// Entry number as shown by `mcp list`
        index: usize,
    },
}

#[derive(Subcommand)]
pub(crate) enum KeyAction {
    /// Prompt for a key (hidden input) and store it
    Set,
    /// Show whether a key is stored, partially masked
    Show,
    /// Remove the stored key
    Clear,
}

/// Parse arguments and run the selected command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        None => chat::cmd_chat(None).await,
        Some(Command::Chat { model }) => chat::cmd_chat(model).await,
        Some(Command::Mcp { action }) => mcp::cmd_mcp(action),
        Some(Command::Key { action }) => key::cmd_key(action),
    }
}
