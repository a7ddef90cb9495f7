//! Chat session data model
//!
//! Defines messages, sessions, and the pure functions that govern how a
//! conversation evolves: title derivation, timestamp-ordered merging of
//! saved sessions, and in-place replacement of a streaming placeholder
//! message. The persistence layer lives in [`store`].

pub mod store;

pub use store::SessionStore;

use crate::chat_mode::ChatMode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum title length before truncation
const TITLE_MAX_CHARS: usize = 40;

/// Voices available from the speech model
pub const GEMINI_VOICES: &[&str] = &["Kore", "Puck", "Charon", "Fenrir", "Zephyr"];

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The human participant
    User,
    /// The model's reply
    Model,
}

/// A grounding citation attached to a search-mode response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Where the grounded content came from
    pub uri: String,
    /// Human-readable title of the source
    pub title: String,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stable identifier; streaming fragments target a message by id
    pub id: String,

    /// Message author
    pub role: Role,

    /// Message text (empty for a freshly appended placeholder)
    pub text: String,

    /// Attached or generated image as a data URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Grounding sources (search mode only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRef>,

    /// Synthesized speech for this message, base64 PCM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            text: text.into(),
            image: None,
            sources: Vec::new(),
            audio: None,
        }
    }

    /// Create a model message
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Model,
            text: text.into(),
            image: None,
            sources: Vec::new(),
            audio: None,
        }
    }

    /// Create the empty model message appended before a response streams in
    pub fn placeholder() -> Self {
        Self::model("")
    }

    /// Attach an image data URI to this message
    pub fn with_image(mut self, data_uri: impl Into<String>) -> Self {
        self.image = Some(data_uri.into());
        self
    }
}

/// A persisted conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique session identifier
    pub id: String,

    /// Display title, derived once from the first user message
    pub title: String,

    /// Conversation messages in order
    pub messages: Vec<Message>,

    /// Last-saved time, milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Mode the conversation was held in
    #[serde(default)]
    pub mode: ChatMode,
}

impl ChatSession {
    /// Create a session from the current conversation
    ///
    /// The title is computed here, once, and kept verbatim on later saves.
    pub fn new(mode: ChatMode, messages: Vec<Message>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: derive_title(&messages),
            messages,
            timestamp: chrono::Utc::now().timestamp_millis(),
            mode,
        }
    }

    /// Text of the final message, if any
    pub fn last_message_text(&self) -> Option<&str> {
        self.messages.last().map(|m| m.text.as_str())
    }

    /// Short id for terminal listings
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(8)]
    }
}

/// Derive a session title from its messages
///
/// Uses the first user message, truncated to 40 characters with a `...`
/// suffix when longer. Falls back to "New Chat" when no user message
/// exists yet.
///
/// # Examples
///
/// ```
/// use kavira::session::{derive_title, Message};
///
/// let messages = vec![Message::user("hello there")];
/// assert_eq!(derive_title(&messages), "hello there");
/// ```
pub fn derive_title(messages: &[Message]) -> String {
    let first_user = messages.iter().find(|m| m.role == Role::User);
    match first_user {
        Some(m) => {
            let text = m.text.trim();
            if text.chars().count() > TITLE_MAX_CHARS {
                let truncated: String = text.chars().take(TITLE_MAX_CHARS).collect();
                format!("{}...", truncated)
            } else if text.is_empty() {
                "New Chat".to_string()
            } else {
                text.to_string()
            }
        }
        None => "New Chat".to_string(),
    }
}

/// Sort sessions newest-first
pub fn sort_newest_first(sessions: &mut [ChatSession]) {
    sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Merge a session into a saved collection
///
/// Replacement rules, in order:
/// 1. A stored session with the same id, the same message count, and the
///    same final message text is left untouched. Re-saving an unchanged
///    conversation is a no-op, which keeps redundant writes during
///    streaming from bumping the stored timestamp.
/// 2. Any other save under a known id replaces that session.
/// 3. Unknown ids are inserted unconditionally; last-message text is never
///    compared across different sessions.
///
/// The result is sorted newest-first.
pub fn upsert(mut sessions: Vec<ChatSession>, session: ChatSession) -> Vec<ChatSession> {
    if let Some(existing) = sessions.iter_mut().find(|s| s.id == session.id) {
        let unchanged = existing.messages.len() == session.messages.len()
            && existing.last_message_text() == session.last_message_text();
        if !unchanged {
            *existing = session;
        }
    } else {
        sessions.push(session);
    }

    sort_newest_first(&mut sessions);
    sessions
}

/// Replace a streaming placeholder's content by message id
///
/// Returns a new message list; messages other than the target are
/// untouched. Unknown ids leave the list unchanged, which makes late
/// fragments after a reset harmless.
pub fn apply_fragment(
    messages: &[Message],
    id: &str,
    text: &str,
    sources: &[SourceRef],
) -> Vec<Message> {
    messages
        .iter()
        .map(|m| {
            if m.id == id {
                let mut updated = m.clone();
                updated.text = text.to_string();
                updated.sources = sources.to_vec();
                updated
            } else {
                m.clone()
            }
        })
        .collect()
}

/// User-selected speech engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TtsEngine {
    /// Platform speech synthesizer
    #[default]
    Native,
    /// Gemini speech model
    Gemini,
}

impl TtsEngine {
    /// Parse an engine name
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "native" | "system" => Ok(Self::Native),
            "gemini" | "ai" => Ok(Self::Gemini),
            other => Err(format!("Unknown TTS engine: {}", other)),
        }
    }
}

/// Persisted text-to-speech settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Speak model responses aloud
    #[serde(default)]
    pub enabled: bool,

    /// Which engine produces the speech
    #[serde(default)]
    pub engine: TtsEngine,

    /// Voice for the gemini engine
    #[serde(default = "default_voice")]
    pub voice: String,
}

fn default_voice() -> String {
    "Kore".to_string()
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            engine: TtsEngine::Native,
            voice: default_voice(),
        }
    }
}

impl TtsConfig {
    /// Build from the config-file defaults
    pub fn from_defaults(defaults: &crate::config::TtsDefaults) -> Self {
        Self {
            enabled: defaults.enabled,
            engine: TtsEngine::parse_str(&defaults.engine).unwrap_or_default(),
            voice: defaults.voice.clone(),
        }
    }
}
