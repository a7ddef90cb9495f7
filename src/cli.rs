//! Command-line interface definition for Kavira
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for chat, session management, and one-shot media
//! operations.

use clap::{Parser, Subcommand};

/// Kavira - Voice-capable AI chat CLI
///
/// Talk to Gemini models from the terminal: streamed chat with multiple
/// modes, saved sessions, image generation, spoken replies, and live
/// voice transcription.
#[derive(Parser, Debug, Clone)]
#[command(name = "kavira")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Kavira
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start interactive chat mode
    Chat {
        /// Chat mode: fast, reasoning, search, or vision
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Manage saved chat sessions
    Sessions {
        /// Sessions subcommand
        #[command(subcommand)]
        command: SessionsCommand,
    },

    /// Generate an image from a prompt
    Imagine {
        /// Image prompt
        prompt: String,

        /// Output path (defaults to a timestamped jpg)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Speak text aloud
    Speak {
        /// Text to speak
        text: String,
    },

    /// Transcribe the microphone until Enter is pressed
    Listen {
        /// Also save the recording as a WAV file
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Session management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionsCommand {
    /// List saved sessions
    List,

    /// Delete a session by id (a unique prefix is enough)
    Delete {
        /// Session id or prefix
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
