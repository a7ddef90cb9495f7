//! Configuration management for Kavira
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{KaviraError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Kavira
///
/// Holds everything needed to talk to the API, capture and play audio,
/// and pick speech defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Gemini API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Audio capture and playback configuration
    #[serde(default)]
    pub audio: AudioConfig,

    /// Text-to-speech defaults (the persisted per-user settings override these)
    #[serde(default)]
    pub tts: TtsDefaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL for the generative language API
    ///
    /// Overridable so tests can point the client at a mock server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; when absent the `KAVIRA_API_KEY` / `GEMINI_API_KEY`
    /// environment variables are consulted at load time
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model for fast, search and vision modes
    #[serde(default = "default_flash_model")]
    pub flash_model: String,

    /// Model for reasoning mode
    #[serde(default = "default_pro_model")]
    pub pro_model: String,

    /// Lightweight model used for follow-up suggestions
    #[serde(default = "default_lite_model")]
    pub lite_model: String,

    /// Image generation model
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Text-to-speech model
    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    /// Live (bidirectional audio) model
    #[serde(default = "default_live_model")]
    pub live_model: String,

    /// Thinking budget (tokens) applied in reasoning mode
    #[serde(default = "default_thinking_budget")]
    pub thinking_budget: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_flash_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_pro_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_lite_model() -> String {
    "gemini-flash-lite-latest".to_string()
}

fn default_image_model() -> String {
    "imagen-4.0-generate-001".to_string()
}

fn default_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_live_model() -> String {
    "gemini-2.5-flash-native-audio-preview-09-2025".to_string()
}

fn default_thinking_budget() -> u32 {
    32_768
}

fn default_timeout_seconds() -> u64 {
    120
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            flash_model: default_flash_model(),
            pro_model: default_pro_model(),
            lite_model: default_lite_model(),
            image_model: default_image_model(),
            tts_model: default_tts_model(),
            live_model: default_live_model(),
            thinking_budget: default_thinking_budget(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Audio capture and playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Microphone capture sample rate (Hz)
    #[serde(default = "default_capture_sample_rate")]
    pub capture_sample_rate: u32,

    /// Number of samples accumulated before a frame is sent
    #[serde(default = "default_frame_samples")]
    pub frame_samples: usize,

    /// Sample rate of synthesized speech PCM (Hz)
    #[serde(default = "default_playback_sample_rate")]
    pub playback_sample_rate: u32,
}

fn default_capture_sample_rate() -> u32 {
    16_000
}

fn default_frame_samples() -> usize {
    4096
}

fn default_playback_sample_rate() -> u32 {
    24_000
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capture_sample_rate: default_capture_sample_rate(),
            frame_samples: default_frame_samples(),
            playback_sample_rate: default_playback_sample_rate(),
        }
    }
}

/// Text-to-speech defaults applied when no persisted settings exist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsDefaults {
    /// Speak model responses aloud
    #[serde(default)]
    pub enabled: bool,

    /// Engine: "native" (platform synthesizer) or "gemini"
    #[serde(default = "default_tts_engine")]
    pub engine: String,

    /// Voice name for the gemini engine
    #[serde(default = "default_tts_voice")]
    pub voice: String,
}

fn default_tts_engine() -> String {
    "native".to_string()
}

fn default_tts_voice() -> String {
    "Kore".to_string()
}

impl Default for TtsDefaults {
    fn default() -> Self {
        Self {
            enabled: false,
            engine: default_tts_engine(),
            voice: default_tts_voice(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "kavira=info".to_string()
}

impl LoggingConfig {
    /// Effective filter directive; `--verbose` wins over the configured value
    pub fn directive(&self, verbose: bool) -> String {
        if verbose {
            "kavira=debug".to_string()
        } else {
            self.filter.clone()
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Optional explicit config path; when `None` the platform
    ///   config directory is searched, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file cannot be read or parsed
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p.to_string_lossy())?,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_vars();
        Ok(config)
    }

    /// Platform config file location (`<config dir>/kavira/config.yaml`)
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("ai", "kavira", "kavira")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| KaviraError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| KaviraError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if self.api.api_key.is_none() {
            if let Ok(key) = std::env::var("KAVIRA_API_KEY") {
                self.api.api_key = Some(key);
            } else if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                self.api.api_key = Some(key);
            }
        }
        if let Ok(base) = std::env::var("KAVIRA_API_BASE") {
            self.api.base_url = base;
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::Config` on out-of-range or malformed values
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(KaviraError::Config("api.base_url cannot be empty".to_string()).into());
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(KaviraError::Config(format!(
                "api.base_url must be an http(s) URL, got: {}",
                self.api.base_url
            ))
            .into());
        }

        if self.audio.frame_samples == 0 {
            return Err(
                KaviraError::Config("audio.frame_samples must be greater than 0".to_string())
                    .into(),
            );
        }

        if self.audio.capture_sample_rate == 0 || self.audio.playback_sample_rate == 0 {
            return Err(
                KaviraError::Config("audio sample rates must be greater than 0".to_string()).into(),
            );
        }

        let valid_engines = ["native", "gemini"];
        if !valid_engines.contains(&self.tts.engine.as_str()) {
            return Err(KaviraError::Config(format!(
                "Invalid tts.engine: {}. Must be one of: {}",
                self.tts.engine,
                valid_engines.join(", ")
            ))
            .into());
        }

        Ok(())
    }

    /// Resolve the API key, erroring when none is configured
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::MissingApiKey` when neither the config file
    /// nor the environment provides a key
    pub fn require_api_key(&self) -> Result<String> {
        self.api
            .api_key
            .clone()
            .ok_or_else(|| KaviraError::MissingApiKey("KAVIRA_API_KEY".to_string()).into())
    }

    /// Resolve the sessions database path
    ///
    /// `KAVIRA_SESSIONS_DB` overrides the platform data directory.
    pub fn sessions_db_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("KAVIRA_SESSIONS_DB") {
            return Ok(PathBuf::from(path));
        }

        let dirs = directories::ProjectDirs::from("ai", "kavira", "kavira").ok_or_else(|| {
            KaviraError::Storage("Could not determine data directory".to_string())
        })?;

        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .map_err(|e| KaviraError::Storage(format!("Failed to create data dir: {}", e)))?;

        Ok(data_dir.join("sessions.db"))
    }
}

/// Check whether a path exists (helper kept for config path probing)
pub fn config_file_exists(path: &str) -> bool {
    Path::new(path).exists()
}
