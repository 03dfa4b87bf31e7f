// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "parley",
    about = "A local chat client with persistent sessions",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file (overrides auto-discovery)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a message and print the assistant's reply.
    /// Reads the message from stdin when TEXT is omitted.
    Send {
        #[arg(value_name = "TEXT")]
        text: Option<String>,
        /// Session to talk in (ID or unique prefix); defaults to the current one
        #[arg(long, short = 's', value_name = "ID")]
        session: Option<String>,
    },
    /// Start a new session and make it current
    New {
        #[arg(value_name = "TITLE")]
        title: Option<String>,
    },
    /// List sessions, most recently active first
    List {
        /// Maximum number of sessions to show (default: 20)
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },
    /// Find sessions by title or message text.
    /// A single hit becomes the current session.
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
    },
    /// Make a session current
    Select {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Change a session's title
    Rename {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(value_name = "TITLE")]
        title: String,
    },
    /// Delete a session
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// Print a session's conversation (defaults to the current session)
    Show {
        #[arg(value_name = "ID")]
        id: Option<String>,
        /// Dump the session with assistant replies split into segments, as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update the persisted chat settings
    Set {
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        /// Output token limit; 0 clears it
        #[arg(long)]
        max_tokens: Option<u32>,
        #[arg(long)]
        system_prompt: Option<String>,
    },
    /// Print the effective configuration and chat settings, then exit
    ShowConfig,
    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "parley", &mut std::io::stdout());
}
