//! Error types for Kavira
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Kavira operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, API interaction, session persistence, and
/// audio capture/playback.
#[derive(Error, Debug)]
pub enum KaviraError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// API errors (request construction, HTTP status, response decoding)
    #[error("API error: {0}")]
    Api(String),

    /// Missing API key for the configured service
    #[error("Missing API key: set {0}")]
    MissingApiKey(String),

    /// Session storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Audio device and stream errors
    #[error("Audio error: {0}")]
    Audio(String),

    /// Live transcription transport errors
    #[error("Live session error: {0}")]
    Live(String),

    /// Invalid user input (unknown mode, bad session id, bad attachment)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Kavira operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = KaviraError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_api_error_display() {
        let error = KaviraError::Api("HTTP 500".to_string());
        assert_eq!(error.to_string(), "API error: HTTP 500");
    }

    #[test]
    fn test_missing_api_key_display() {
        let error = KaviraError::MissingApiKey("KAVIRA_API_KEY".to_string());
        assert_eq!(error.to_string(), "Missing API key: set KAVIRA_API_KEY");
    }

    #[test]
    fn test_storage_error_display() {
        let error = KaviraError::Storage("database connection failed".to_string());
        assert_eq!(
            error.to_string(),
            "Storage error: database connection failed"
        );
    }

    #[test]
    fn test_audio_error_display() {
        let error = KaviraError::Audio("no input device".to_string());
        assert_eq!(error.to_string(), "Audio error: no input device");
    }

    #[test]
    fn test_live_error_display() {
        let error = KaviraError::Live("socket closed".to_string());
        assert_eq!(error.to_string(), "Live session error: socket closed");
    }

    #[test]
    fn test_invalid_input_error_display() {
        let error = KaviraError::InvalidInput("unknown mode: turbo".to_string());
        assert_eq!(error.to_string(), "Invalid input: unknown mode: turbo");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: KaviraError = io_error.into();
        assert!(matches!(error, KaviraError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_str = "{invalid json}";
        let json_error = serde_json::from_str::<serde_json::Value>(json_str).unwrap_err();
        let error: KaviraError = json_error.into();
        assert!(matches!(error, KaviraError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_str = "invalid: : yaml";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: KaviraError = yaml_error.into();
        assert!(matches!(error, KaviraError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<KaviraError>();
    }
}
