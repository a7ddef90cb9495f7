//! Special commands parser for interactive chat mode
//!
//! This module parses the slash commands available during interactive chat
//! sessions. Special commands allow users to:
//! - Switch between chat modes (fast, reasoning, search, vision)
//! - Manage saved sessions (new, list, load, delete)
//! - Attach a file to the next message
//! - Generate images, speak text, and control speech output
//! - Toggle live voice transcription
//! - Display help information and exit the session
//!
//! Commands are prefixed with `/` and are case-insensitive (arguments that
//! carry free text, like an image prompt, keep their original case).

use crate::chat_mode::ChatMode;
use crate::session::TtsEngine;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Subcommands of `/tts`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtsCommand {
    /// Show the current speech settings
    Show,
    /// Enable spoken replies
    Enable,
    /// Disable spoken replies
    Disable,
    /// Select the speech engine
    Engine(TtsEngine),
    /// Select the Gemini voice
    Voice(String),
}

/// Special commands that can be executed during interactive chat
///
/// These commands modify the session state or drive a side channel,
/// rather than being sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Switch to a different chat mode
    ///
    /// Switching with messages in the conversation asks for confirmation
    /// and starts a fresh conversation.
    SwitchMode(ChatMode),

    /// Start a new conversation, saving the current one first
    NewSession,

    /// List saved sessions
    ListSessions,

    /// Load a saved session by id (a unique prefix is enough)
    LoadSession(String),

    /// Delete a saved session by id
    DeleteSession(String),

    /// Attach a file to the next message
    ///
    /// Text files are inlined into the prompt; images switch the next
    /// message to Vision mode.
    Attach(String),

    /// Generate an image from a prompt
    Imagine(String),

    /// Speak text aloud without sending it to the model
    Speak(String),

    /// Toggle live voice transcription
    Listen,

    /// Inspect or change speech output settings
    Tts(TtsCommand),

    /// Display current mode and speech settings
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent to the model as a regular message.
    None,
}

/// Parse a user input string into a special command
///
/// Commands are case-insensitive and may have aliases. Free-text arguments
/// (`/imagine`, `/speak`) keep the original casing.
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is
/// not a valid command, `CommandError::UnsupportedArgument` for invalid
/// arguments, and `CommandError::MissingArgument` when a required argument
/// is absent.
///
/// # Examples
///
/// ```
/// use kavira::commands::special::{parse_special_command, SpecialCommand};
/// use kavira::chat_mode::ChatMode;
///
/// let cmd = parse_special_command("/mode search").unwrap();
/// assert_eq!(cmd, SpecialCommand::SwitchMode(ChatMode::Search));
///
/// let cmd = parse_special_command("hello there").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    // If input doesn't start with "/", it's not a command (except exit/quit)
    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    match lower.as_str() {
        // Chat mode switching
        "/mode" => Err(CommandError::MissingArgument {
            command: "/mode".to_string(),
            usage: "/mode <fast|reasoning|search|vision>".to_string(),
        }),
        input if input.starts_with("/mode ") => {
            let arg = input[6..].trim();
            match ChatMode::parse_str(arg) {
                Ok(mode) => Ok(SpecialCommand::SwitchMode(mode)),
                Err(_) => Err(CommandError::UnsupportedArgument {
                    command: "/mode".to_string(),
                    arg: arg.to_string(),
                }),
            }
        }
        "/fast" => Ok(SpecialCommand::SwitchMode(ChatMode::Fast)),
        "/reasoning" => Ok(SpecialCommand::SwitchMode(ChatMode::Reasoning)),
        "/search" => Ok(SpecialCommand::SwitchMode(ChatMode::Search)),
        "/vision" => Ok(SpecialCommand::SwitchMode(ChatMode::Vision)),

        // Session management
        "/new" => Ok(SpecialCommand::NewSession),
        "/sessions" | "/list" => Ok(SpecialCommand::ListSessions),
        "/load" => Err(CommandError::MissingArgument {
            command: "/load".to_string(),
            usage: "/load <session_id>".to_string(),
        }),
        input if input.starts_with("/load ") => {
            let id = input[6..].trim();
            if id.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/load".to_string(),
                    usage: "/load <session_id>".to_string(),
                })
            } else {
                Ok(SpecialCommand::LoadSession(id.to_string()))
            }
        }
        "/delete" => Err(CommandError::MissingArgument {
            command: "/delete".to_string(),
            usage: "/delete <session_id>".to_string(),
        }),
        input if input.starts_with("/delete ") => {
            let id = input[8..].trim();
            if id.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/delete".to_string(),
                    usage: "/delete <session_id>".to_string(),
                })
            } else {
                Ok(SpecialCommand::DeleteSession(id.to_string()))
            }
        }

        // File attachment
        "/attach" => Err(CommandError::MissingArgument {
            command: "/attach".to_string(),
            usage: "/attach <path>".to_string(),
        }),
        input if input.starts_with("/attach ") => {
            // Preserve case in the path
            let path = trimmed[8..].trim();
            if path.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/attach".to_string(),
                    usage: "/attach <path>".to_string(),
                })
            } else {
                Ok(SpecialCommand::Attach(path.to_string()))
            }
        }

        // Image generation
        "/imagine" => Err(CommandError::MissingArgument {
            command: "/imagine".to_string(),
            usage: "/imagine <prompt>".to_string(),
        }),
        input if input.starts_with("/imagine ") => {
            let prompt = trimmed[9..].trim();
            if prompt.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/imagine".to_string(),
                    usage: "/imagine <prompt>".to_string(),
                })
            } else {
                Ok(SpecialCommand::Imagine(prompt.to_string()))
            }
        }

        // Speech output
        "/speak" => Err(CommandError::MissingArgument {
            command: "/speak".to_string(),
            usage: "/speak <text>".to_string(),
        }),
        input if input.starts_with("/speak ") => {
            let text = trimmed[7..].trim();
            if text.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/speak".to_string(),
                    usage: "/speak <text>".to_string(),
                })
            } else {
                Ok(SpecialCommand::Speak(text.to_string()))
            }
        }

        // Live transcription toggle
        "/listen" => Ok(SpecialCommand::Listen),

        // Speech settings
        "/tts" => Ok(SpecialCommand::Tts(TtsCommand::Show)),
        "/tts on" => Ok(SpecialCommand::Tts(TtsCommand::Enable)),
        "/tts off" => Ok(SpecialCommand::Tts(TtsCommand::Disable)),
        "/tts engine" => Err(CommandError::MissingArgument {
            command: "/tts engine".to_string(),
            usage: "/tts engine <native|gemini>".to_string(),
        }),
        input if input.starts_with("/tts engine ") => {
            let arg = input[12..].trim();
            match TtsEngine::parse_str(arg) {
                Ok(engine) => Ok(SpecialCommand::Tts(TtsCommand::Engine(engine))),
                Err(_) => Err(CommandError::UnsupportedArgument {
                    command: "/tts engine".to_string(),
                    arg: arg.to_string(),
                }),
            }
        }
        "/tts voice" => Err(CommandError::MissingArgument {
            command: "/tts voice".to_string(),
            usage: "/tts voice <name>".to_string(),
        }),
        input if input.starts_with("/tts voice ") => {
            let voice = trimmed[11..].trim();
            if voice.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/tts voice".to_string(),
                    usage: "/tts voice <name>".to_string(),
                })
            } else {
                Ok(SpecialCommand::Tts(TtsCommand::Voice(voice.to_string())))
            }
        }
        input if input.starts_with("/tts ") => {
            let arg = input[5..].trim();
            Err(CommandError::UnsupportedArgument {
                command: "/tts".to_string(),
                arg: arg.to_string(),
            })
        }

        // Status and help
        "/status" => Ok(SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),

        // Exit commands
        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),

        // Unknown command starting with "/"
        input if input.starts_with('/') => {
            let cmd = input.split_whitespace().next().unwrap_or(input);
            Err(CommandError::UnknownCommand(cmd.to_string()))
        }

        // Not a special command
        _ => Ok(SpecialCommand::None),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

CHAT MODE SWITCHING:
  /mode <name>    - Switch mode (fast, reasoning, search, vision)
  /fast           - Shorthand for /mode fast
  /reasoning      - Shorthand for /mode reasoning
  /search         - Shorthand for /mode search
  /vision         - Shorthand for /mode vision

SESSIONS:
  /new            - Save the current conversation and start a new one
  /sessions       - List saved sessions
  /load <id>      - Load a saved session (a unique id prefix works)
  /delete <id>    - Delete a saved session

ATTACHMENTS AND IMAGES:
  /attach <path>  - Attach a file to your next message
  /imagine <text> - Generate an image from a prompt

VOICE:
  /listen         - Toggle live voice transcription (speak your messages)
  /speak <text>   - Speak text aloud without sending it
  /tts            - Show speech output settings
  /tts on|off     - Enable or disable spoken replies
  /tts engine <native|gemini> - Select the speech engine
  /tts voice <name>           - Select the Gemini voice

SESSION INFORMATION:
  /status         - Show current mode and speech settings
  /help           - Show this help message
  /?              - Same as /help

SESSION CONTROL:
  exit            - Exit interactive mode
  quit            - Same as exit

NOTES:
  - Commands are case-insensitive
  - Regular text (not starting with /) is sent to the model
  - Switching mode mid-conversation starts a fresh conversation
  - In Search mode, replies cite their web sources
  - Attaching an image sends your next message in Vision mode
"#
    );
}
