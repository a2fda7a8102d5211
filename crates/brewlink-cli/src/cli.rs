//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Serial link monitor for the espresso machine controller.
#[derive(Debug, Parser)]
#[command(name = "brewlink", version, about)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List serial ports, USB devices first.
    Ports {
        /// Print one JSON object per port.
        #[arg(long)]
        json: bool,
    },

    /// Connect to a controller and print what it sends.
    ///
    /// Lines typed on stdin are sent as raw commands, except:
    /// `/start`, `/stop`, `/poll on`, `/poll off`, `/quit`.
    Monitor {
        /// Serial port; overrides the configuration file.
        #[arg(long, short)]
        port: Option<String>,

        /// Baud rate; overrides the configuration file.
        #[arg(long, short)]
        baud: Option<u32>,

        /// Start without periodic status polling.
        #[arg(long)]
        no_auto_poll: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run a session against the built-in emulator.
    Demo {
        /// How long to run before disconnecting.
        #[arg(long, default_value_t = 40)]
        seconds: u64,

        /// Seconds into the session at which a shot is started.
        #[arg(long, default_value_t = 2)]
        start_after: u64,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Clone, Copy, clap::Args)]
pub struct OutputArgs {
    /// Print statuses as JSON lines instead of a summary.
    #[arg(long)]
    pub json: bool,

    /// Also print every raw chunk received.
    #[arg(long)]
    pub raw: bool,
}

/// An operator line read from stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Start,
    Stop,
    Poll(bool),
    Quit,
    Raw(String),
    Empty,
    Unknown(String),
}

impl ConsoleInput {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ConsoleInput::Empty;
        }
        let Some(directive) = trimmed.strip_prefix('/') else {
            return ConsoleInput::Raw(trimmed.to_string());
        };

        let mut words = directive.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("start"), None, None) => ConsoleInput::Start,
            (Some("stop"), None, None) => ConsoleInput::Stop,
            (Some("poll"), Some("on"), None) => ConsoleInput::Poll(true),
            (Some("poll"), Some("off"), None) => ConsoleInput::Poll(false),
            (Some("quit" | "exit"), None, None) => ConsoleInput::Quit,
            _ => ConsoleInput::Unknown(trimmed.to_string()),
        }
    }
}
