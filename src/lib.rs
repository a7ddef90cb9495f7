//! Kavira - Voice-capable AI chat CLI library
//!
//! This library provides the core functionality for the Kavira chat client,
//! including the Gemini API client, session persistence, markdown rendering,
//! and the audio capture/playback pipeline.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `gemini`: Gemini API client (streamed chat, search grounding,
//!   suggestions, image generation, speech synthesis, live transcription)
//! - `session`: Chat session data model and sled-backed persistence
//! - `audio`: Microphone capture and speech playback
//! - `chat_mode`: Chat modes and the mid-conversation switch guard
//! - `markdown`: Terminal rendering and speech-friendly stripping
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use kavira::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     config.validate()?;
//!
//!     // Client usage would go here
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod chat_mode;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gemini;
pub mod markdown;
pub mod session;

// Re-export commonly used types
pub use chat_mode::{ChatMode, ModeSwitch, SwitchOutcome};
pub use config::Config;
pub use error::{KaviraError, Result};
pub use gemini::{GeminiClient, ResponseFragment, ResponseStream};
pub use session::{ChatSession, Message, Role, SessionStore, TtsConfig};
