//! Markdown rendering for terminal output and speech
//!
//! Rendering runs in stages: fenced code blocks are lifted out first and
//! replaced with placeholders so the inline transforms can't touch their
//! contents, then headers, lists, and inline formatting are converted to
//! colored terminal text, and finally the code blocks are restored.
//!
//! `strip_for_speech` produces plain text suitable as TTS input.

use colored::Colorize;
use regex::Regex;

/// Render markdown as colored terminal text
///
/// # Examples
///
/// ```
/// use kavira::markdown::render;
///
/// let out = render("# Title\nplain text");
/// assert!(out.contains("Title"));
/// assert!(out.contains("plain text"));
/// ```
pub fn render(text: &str) -> String {
    let (mut result, code_blocks) = extract_code_blocks(text);

    // Stage 2: block-level transforms
    result = Regex::new(r"(?m)^### (.*)$")
        .unwrap()
        .replace_all(&result, |caps: &regex::Captures| {
            caps[1].bold().to_string()
        })
        .to_string();
    result = Regex::new(r"(?m)^## (.*)$")
        .unwrap()
        .replace_all(&result, |caps: &regex::Captures| {
            caps[1].bold().underline().to_string()
        })
        .to_string();
    result = Regex::new(r"(?m)^# (.*)$")
        .unwrap()
        .replace_all(&result, |caps: &regex::Captures| {
            caps[1].bold().underline().cyan().to_string()
        })
        .to_string();
    result = Regex::new(r"(?m)^[-*] (.*)$")
        .unwrap()
        .replace_all(&result, "  • $1")
        .to_string();
    result = Regex::new(r"(?m)^(\d+)\. (.*)$")
        .unwrap()
        .replace_all(&result, "  $1. $2")
        .to_string();

    // Stage 3: inline transforms
    result = Regex::new(r"\*\*([^*]+)\*\*")
        .unwrap()
        .replace_all(&result, |caps: &regex::Captures| {
            caps[1].bold().to_string()
        })
        .to_string();
    result = Regex::new(r"\*([^*]+)\*")
        .unwrap()
        .replace_all(&result, |caps: &regex::Captures| {
            caps[1].italic().to_string()
        })
        .to_string();
    result = Regex::new(r"`([^`]+)`")
        .unwrap()
        .replace_all(&result, |caps: &regex::Captures| {
            caps[1].yellow().to_string()
        })
        .to_string();
    result = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)")
        .unwrap()
        .replace_all(&result, |caps: &regex::Captures| {
            format!("{} ({})", caps[1].blue().underline(), caps[2].dimmed())
        })
        .to_string();

    restore_code_blocks(&result, &code_blocks)
}

/// Lift fenced code blocks out of the text
///
/// Each block is replaced with `__CODE_BLOCK_N__` so later transforms
/// leave code untouched. Returns the rewritten text and the blocks in
/// placeholder order.
fn extract_code_blocks(text: &str) -> (String, Vec<String>) {
    let fence = Regex::new(r"(?s)```(\w*)\n?(.*?)```").unwrap();
    let mut blocks = Vec::new();
    let result = fence
        .replace_all(text, |caps: &regex::Captures| {
            let placeholder = format!("__CODE_BLOCK_{}__", blocks.len());
            blocks.push(caps[2].trim_end().to_string());
            placeholder
        })
        .to_string();
    (result, blocks)
}

/// Substitute placeholders back with their (colored) code blocks
fn restore_code_blocks(text: &str, blocks: &[String]) -> String {
    let mut result = text.to_string();
    for (i, block) in blocks.iter().enumerate() {
        let placeholder = format!("__CODE_BLOCK_{}__", i);
        let rendered = block
            .lines()
            .map(|line| format!("    {}", line.green()))
            .collect::<Vec<_>>()
            .join("\n");
        result = result.replace(&placeholder, &rendered);
    }
    result
}

/// Reduce markdown to plain text for speech synthesis
///
/// Removes headers markers, bold/italic markers, backticks, fenced code
/// blocks, and collapses links to their label.
///
/// # Examples
///
/// ```
/// use kavira::markdown::strip_for_speech;
///
/// let spoken = strip_for_speech("See **[the docs](https://example.com)**.");
/// assert_eq!(spoken, "See the docs.");
/// ```
pub fn strip_for_speech(text: &str) -> String {
    let mut result = text.to_string();

    // Code blocks read terribly aloud; drop them entirely.
    result = Regex::new(r"(?s)```.*?```")
        .unwrap()
        .replace_all(&result, "")
        .to_string();
    result = Regex::new(r"(?m)^#{1,6}\s*")
        .unwrap()
        .replace_all(&result, "")
        .to_string();
    result = Regex::new(r"\[([^\]]+)\]\([^)]+\)")
        .unwrap()
        .replace_all(&result, "$1")
        .to_string();
    result = Regex::new(r"\*\*([^*]+)\*\*")
        .unwrap()
        .replace_all(&result, "$1")
        .to_string();
    result = Regex::new(r"\*([^*]+)\*")
        .unwrap()
        .replace_all(&result, "$1")
        .to_string();
    result = result.replace('`', "");

    result.trim().to_string()
}
