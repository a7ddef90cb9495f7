//! Chat mode types and utilities
//!
//! This module defines the different modes for a conversation:
//! - Fast mode: low-latency streaming chat
//! - Reasoning mode: deep reasoning with an elevated thinking budget
//! - Search mode: search-grounded answers with source citations
//! - Vision mode: image understanding and generation
//!
//! It also defines the guard used when switching modes mid-conversation,
//! since a switch discards the current exchange and must be confirmed.

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat mode for a conversation
///
/// Determines which model is used and how responses are produced
/// (streamed, grounded with sources, or image-capable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    /// Fast mode: low-latency streaming chat
    ///
    /// The default mode. Responses stream token by token from the
    /// flash model with no extra tooling.
    #[default]
    Fast,

    /// Reasoning mode: deep reasoning with an elevated thinking budget
    ///
    /// Uses the pro model with a large thinking budget. Responses still
    /// stream but first tokens arrive later.
    Reasoning,

    /// Search mode: answers grounded in web search results
    ///
    /// A single non-streaming call that returns the full answer along
    /// with the sources it was grounded on.
    Search,

    /// Vision mode: image understanding and generation
    ///
    /// Activated automatically when an image is attached. Sends the
    /// image alongside the text and streams the response.
    Vision,
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "FAST"),
            Self::Reasoning => write!(f, "REASONING"),
            Self::Search => write!(f, "SEARCH"),
            Self::Vision => write!(f, "VISION"),
        }
    }
}

impl ChatMode {
    /// Parse a chat mode from a string
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of the mode; short aliases are accepted
    ///
    /// # Returns
    ///
    /// Returns the parsed ChatMode or an error if the string is invalid
    ///
    /// # Examples
    ///
    /// ```
    /// use kavira::chat_mode::ChatMode;
    ///
    /// let mode = ChatMode::parse_str("search").unwrap();
    /// assert_eq!(mode, ChatMode::Search);
    /// ```
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "fast" | "flash" | "chat" => Ok(Self::Fast),
            "reasoning" | "reason" | "pro" | "deep" => Ok(Self::Reasoning),
            "search" | "grounded" | "web" => Ok(Self::Search),
            "vision" | "image" => Ok(Self::Vision),
            other => Err(format!("Unknown chat mode: {}", other)),
        }
    }

    /// Get a user-friendly description of this mode
    pub fn description(&self) -> &'static str {
        match self {
            Self::Fast => "Low-latency streaming chat",
            Self::Reasoning => "Deep reasoning with a large thinking budget",
            Self::Search => "Answers grounded in web search with citations",
            Self::Vision => "Image understanding and generation",
        }
    }

    /// Get a colored tag representation of this mode
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use kavira::chat_mode::ChatMode;
    ///
    /// let tag = ChatMode::Search.colored_tag();
    /// println!("{}", tag);  // Displays "[SEARCH]" in blue
    /// ```
    pub fn colored_tag(&self) -> String {
        match self {
            Self::Fast => format!("[{}]", "FAST".green()),
            Self::Reasoning => format!("[{}]", "REASONING".purple()),
            Self::Search => format!("[{}]", "SEARCH".blue()),
            Self::Vision => format!("[{}]", "VISION".yellow()),
        }
    }

    /// Format the interactive prompt for this mode
    ///
    /// # Examples
    ///
    /// ```
    /// use kavira::chat_mode::ChatMode;
    ///
    /// assert_eq!(ChatMode::Fast.format_prompt(), "[FAST] >> ");
    /// ```
    pub fn format_prompt(&self) -> String {
        format!("[{}] >> ", self)
    }

    /// Format the interactive prompt with a colored mode tag
    pub fn format_colored_prompt(&self) -> String {
        format!("{} >> ", self.colored_tag())
    }
}

/// Outcome of requesting a mode switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The switch happened immediately (empty conversation or same mode target)
    Switched,

    /// The conversation has messages; the switch is held until confirmed
    NeedsConfirmation,

    /// Target mode equals the current mode; nothing changed
    Unchanged,
}

/// Guard for switching modes mid-conversation
///
/// Switching modes discards the current exchange, so a switch requested
/// while the conversation holds messages is parked until the user confirms.
/// Confirming yields the target mode (the caller resets the conversation);
/// cancelling drops the request and leaves everything untouched.
#[derive(Debug, Clone, Default)]
pub struct ModeSwitch {
    pending: Option<ChatMode>,
}

impl ModeSwitch {
    /// Create a new guard with no pending switch
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a switch from `current` to `target`
    ///
    /// # Arguments
    ///
    /// * `current` - The active chat mode
    /// * `target` - The requested chat mode
    /// * `message_count` - Number of messages in the current conversation
    ///
    /// # Returns
    ///
    /// `Switched` when the conversation is empty (safe to switch now),
    /// `NeedsConfirmation` when messages would be discarded, and
    /// `Unchanged` when the target equals the current mode.
    pub fn request(
        &mut self,
        current: ChatMode,
        target: ChatMode,
        message_count: usize,
    ) -> SwitchOutcome {
        if target == current {
            self.pending = None;
            return SwitchOutcome::Unchanged;
        }
        if message_count == 0 {
            self.pending = None;
            return SwitchOutcome::Switched;
        }
        self.pending = Some(target);
        SwitchOutcome::NeedsConfirmation
    }

    /// Confirm a pending switch
    ///
    /// Returns the target mode when a switch was pending; the caller is
    /// responsible for resetting the conversation. Clears the guard.
    pub fn confirm(&mut self) -> Option<ChatMode> {
        self.pending.take()
    }

    /// Cancel a pending switch, leaving the conversation untouched
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// The mode waiting on confirmation, if any
    pub fn pending(&self) -> Option<ChatMode> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_mode_display() {
        assert_eq!(ChatMode::Fast.to_string(), "FAST");
        assert_eq!(ChatMode::Reasoning.to_string(), "REASONING");
        assert_eq!(ChatMode::Search.to_string(), "SEARCH");
        assert_eq!(ChatMode::Vision.to_string(), "VISION");
    }

    #[test]
    fn test_chat_mode_default_is_fast() {
        assert_eq!(ChatMode::default(), ChatMode::Fast);
    }

    #[test]
    fn test_chat_mode_parse_canonical_names() {
        assert_eq!(ChatMode::parse_str("fast").unwrap(), ChatMode::Fast);
        assert_eq!(
            ChatMode::parse_str("reasoning").unwrap(),
            ChatMode::Reasoning
        );
        assert_eq!(ChatMode::parse_str("search").unwrap(), ChatMode::Search);
        assert_eq!(ChatMode::parse_str("vision").unwrap(), ChatMode::Vision);
    }

    #[test]
    fn test_chat_mode_parse_aliases() {
        assert_eq!(ChatMode::parse_str("flash").unwrap(), ChatMode::Fast);
        assert_eq!(ChatMode::parse_str("pro").unwrap(), ChatMode::Reasoning);
        assert_eq!(ChatMode::parse_str("deep").unwrap(), ChatMode::Reasoning);
        assert_eq!(ChatMode::parse_str("web").unwrap(), ChatMode::Search);
        assert_eq!(ChatMode::parse_str("image").unwrap(), ChatMode::Vision);
    }

    #[test]
    fn test_chat_mode_parse_case_insensitive() {
        assert_eq!(ChatMode::parse_str("FAST").unwrap(), ChatMode::Fast);
        assert_eq!(ChatMode::parse_str("Search").unwrap(), ChatMode::Search);
    }

    #[test]
    fn test_chat_mode_parse_invalid() {
        assert!(ChatMode::parse_str("turbo").is_err());
        assert!(ChatMode::parse_str("").is_err());
    }

    #[test]
    fn test_chat_mode_serde_snake_case() {
        let json = serde_json::to_string(&ChatMode::Reasoning).unwrap();
        assert_eq!(json, "\"reasoning\"");
        let mode: ChatMode = serde_json::from_str("\"vision\"").unwrap();
        assert_eq!(mode, ChatMode::Vision);
    }

    #[test]
    fn test_chat_mode_description() {
        assert!(!ChatMode::Fast.description().is_empty());
        assert!(ChatMode::Search.description().contains("grounded"));
        assert!(ChatMode::Reasoning.description().contains("thinking"));
    }

    #[test]
    fn test_chat_mode_format_prompt() {
        assert_eq!(ChatMode::Fast.format_prompt(), "[FAST] >> ");
        assert_eq!(ChatMode::Vision.format_prompt(), "[VISION] >> ");
    }

    #[test]
    fn test_chat_mode_colored_tag_contains_name() {
        assert!(ChatMode::Fast.colored_tag().contains("FAST"));
        assert!(ChatMode::Search.colored_tag().contains("SEARCH"));
    }

    #[test]
    fn test_chat_mode_format_colored_prompt_ends_with_arrow() {
        for mode in [
            ChatMode::Fast,
            ChatMode::Reasoning,
            ChatMode::Search,
            ChatMode::Vision,
        ] {
            assert!(mode.format_colored_prompt().ends_with(" >> "));
        }
    }

    #[test]
    fn test_mode_switch_same_mode_is_unchanged() {
        let mut guard = ModeSwitch::new();
        let outcome = guard.request(ChatMode::Fast, ChatMode::Fast, 5);
        assert_eq!(outcome, SwitchOutcome::Unchanged);
        assert!(guard.pending().is_none());
    }

    #[test]
    fn test_mode_switch_empty_conversation_switches_immediately() {
        let mut guard = ModeSwitch::new();
        let outcome = guard.request(ChatMode::Fast, ChatMode::Search, 0);
        assert_eq!(outcome, SwitchOutcome::Switched);
        assert!(guard.pending().is_none());
    }

    #[test]
    fn test_mode_switch_with_messages_needs_confirmation() {
        let mut guard = ModeSwitch::new();
        let outcome = guard.request(ChatMode::Fast, ChatMode::Reasoning, 2);
        assert_eq!(outcome, SwitchOutcome::NeedsConfirmation);
        assert_eq!(guard.pending(), Some(ChatMode::Reasoning));
    }

    #[test]
    fn test_mode_switch_confirm_yields_target_and_clears() {
        let mut guard = ModeSwitch::new();
        guard.request(ChatMode::Fast, ChatMode::Vision, 1);
        assert_eq!(guard.confirm(), Some(ChatMode::Vision));
        assert!(guard.pending().is_none());
        // A second confirm is a no-op
        assert_eq!(guard.confirm(), None);
    }

    #[test]
    fn test_mode_switch_cancel_clears_pending() {
        let mut guard = ModeSwitch::new();
        guard.request(ChatMode::Fast, ChatMode::Search, 3);
        guard.cancel();
        assert!(guard.pending().is_none());
        assert_eq!(guard.confirm(), None);
    }

    #[test]
    fn test_mode_switch_new_request_replaces_pending() {
        let mut guard = ModeSwitch::new();
        guard.request(ChatMode::Fast, ChatMode::Search, 3);
        guard.request(ChatMode::Fast, ChatMode::Vision, 3);
        assert_eq!(guard.pending(), Some(ChatMode::Vision));
    }
}
