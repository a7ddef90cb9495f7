//! Gemini API client
//!
//! One client covers every way the app talks to the model: streamed chat
//! (fast, reasoning, and vision), search-grounded one-shot answers,
//! follow-up suggestions, image generation, and speech synthesis. The live
//! transcription transport lives in [`live`].
//!
//! The response path is deliberately failure-proof: `send` hands back a
//! fragment stream that never errors. Whatever goes wrong -- connection,
//! status, decode, mid-stream -- the stream degrades to a single fallback
//! fragment and ends.

pub mod live;
pub mod types;

use crate::chat_mode::ChatMode;
use crate::config::{ApiConfig, Config};
use crate::error::{KaviraError, Result};
use crate::session::{Message, Role, SourceRef};
use base64::Engine;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
    PredictRequest, PredictResponse, SpeechConfig, ThinkingConfig, Tool,
};

/// Text of the fragment emitted when a response fails for any reason
pub const FALLBACK_TEXT: &str = "An error occurred while processing your request.";

/// How many trailing messages feed the suggestion prompt
const SUGGESTION_CONTEXT_TURNS: usize = 6;

/// Maximum number of follow-up suggestions returned
const MAX_SUGGESTIONS: usize = 3;

const SUGGESTION_TEMPERATURE: f32 = 0.7;

/// One piece of a model response
///
/// Streamed modes emit many fragments carrying text deltas; search mode
/// emits exactly one carrying the full text and its sources.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFragment {
    /// Text delta (or full text for single-fragment responses)
    pub text: String,

    /// Grounding sources (search mode only)
    pub sources: Vec<SourceRef>,
}

impl ResponseFragment {
    /// A text-only fragment
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: Vec::new(),
        }
    }

    /// The fragment emitted when the response failed
    pub fn fallback() -> Self {
        Self::text(FALLBACK_TEXT)
    }

    /// Whether this is the failure fallback
    pub fn is_fallback(&self) -> bool {
        self.text == FALLBACK_TEXT && self.sources.is_empty()
    }
}

/// Stream of response fragments; ends after the final fragment
pub type ResponseStream = ReceiverStream<ResponseFragment>;

/// Client for the generative language API
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api: ApiConfig,
    api_key: String,
}

impl GeminiClient {
    /// Build a client from configuration
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::MissingApiKey` when no key is configured and
    /// an error when the HTTP client cannot be constructed
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.api.timeout_seconds))
            .build()
            .map_err(|e| KaviraError::Api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api: config.api.clone(),
            api_key,
        })
    }

    /// Model id serving the given mode
    pub fn model_for(&self, mode: ChatMode) -> &str {
        match mode {
            ChatMode::Fast | ChatMode::Search | ChatMode::Vision => &self.api.flash_model,
            ChatMode::Reasoning => &self.api.pro_model,
        }
    }

    fn endpoint(&self, model: &str, verb: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.api.base_url, model, verb)
    }

    /// Send a message and receive the response as a fragment stream
    ///
    /// Dispatches by mode and attachment:
    /// - a message carrying an image streams against the vision-capable
    ///   flash model with the image inlined
    /// - search mode makes one grounded call and emits a single fragment
    ///   with sources
    /// - reasoning mode streams with the configured thinking budget
    /// - everything else is plain streamed chat over the full history
    ///
    /// The returned stream never yields an error; failures surface as a
    /// single [`FALLBACK_TEXT`] fragment.
    pub fn send(&self, history: &[Message], message: &Message, mode: ChatMode) -> ResponseStream {
        let (tx, rx) = mpsc::channel(32);
        let client = self.clone();
        let history = history.to_vec();
        let message = message.clone();

        tokio::spawn(async move {
            if let Err(e) = client.dispatch(&history, &message, mode, &tx).await {
                tracing::warn!("Response degraded to fallback: {}", e);
                let _ = tx.send(ResponseFragment::fallback()).await;
            }
        });

        ReceiverStream::new(rx)
    }

    async fn dispatch(
        &self,
        history: &[Message],
        message: &Message,
        mode: ChatMode,
        tx: &mpsc::Sender<ResponseFragment>,
    ) -> Result<()> {
        if let Some(image) = &message.image {
            let mut contents = history_contents(history);
            contents.push(Content {
                role: "user".to_string(),
                parts: vec![
                    Part::inline(data_uri_mime(image), data_uri_payload(image)),
                    Part::text(&message.text),
                ],
            });
            let request = GenerateContentRequest::new(contents);
            return self
                .stream_generate(&self.api.flash_model, &request, tx)
                .await;
        }

        match mode {
            ChatMode::Search => self.search_grounded(&message.text, tx).await,
            ChatMode::Reasoning => {
                let mut contents = history_contents(history);
                contents.push(Content::user_text(&message.text));
                let request = GenerateContentRequest {
                    contents,
                    tools: None,
                    generation_config: Some(GenerationConfig {
                        thinking_config: Some(ThinkingConfig {
                            thinking_budget: self.api.thinking_budget,
                        }),
                        ..Default::default()
                    }),
                };
                self.stream_generate(&self.api.pro_model, &request, tx)
                    .await
            }
            _ => {
                let mut contents = history_contents(history);
                contents.push(Content::user_text(&message.text));
                let request = GenerateContentRequest::new(contents);
                self.stream_generate(self.model_for(mode), &request, tx)
                    .await
            }
        }
    }

    /// Stream an SSE response, forwarding each chunk's text as a fragment
    async fn stream_generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
        tx: &mpsc::Sender<ResponseFragment>,
    ) -> Result<()> {
        let url = self.endpoint(model, "streamGenerateContent");
        let response = self
            .http
            .post(&url)
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| KaviraError::Api(format!("Stream request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(KaviraError::Api(format!("HTTP {}: {}", status, body)).into());
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| KaviraError::Api(format!("Stream error: {}", e)))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            // Process complete SSE lines
            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].trim().to_string();
                buffer = buffer[pos + 1..].to_string();

                if line.is_empty() || !line.starts_with("data: ") {
                    continue;
                }

                let data = &line[6..];
                if data == "[DONE]" {
                    return Ok(());
                }

                if let Ok(parsed) = serde_json::from_str::<GenerateContentResponse>(data) {
                    let text = parsed.text();
                    if !text.is_empty()
                        && tx.send(ResponseFragment::text(text)).await.is_err()
                    {
                        // Receiver dropped; stop reading.
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }

    /// One grounded call; yields a single fragment with text and sources
    async fn search_grounded(
        &self,
        text: &str,
        tx: &mpsc::Sender<ResponseFragment>,
    ) -> Result<()> {
        let request = GenerateContentRequest {
            contents: vec![Content::user_text(text)],
            tools: Some(vec![Tool::google_search()]),
            generation_config: None,
        };

        let response = self.generate(&self.api.flash_model, &request).await?;
        let fragment = ResponseFragment {
            text: response.text(),
            sources: response.sources(),
        };
        let _ = tx.send(fragment).await;
        Ok(())
    }

    /// Non-streaming `generateContent` call
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model, "generateContent");
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| KaviraError::Api(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(KaviraError::Api(format!("HTTP {}: {}", status, body)).into());
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| KaviraError::Api(format!("Failed to decode response: {}", e)).into())
    }

    /// Up to three follow-up suggestions for the user
    ///
    /// Best-effort: returns an empty list when the last turn isn't the
    /// model's, or when anything fails.
    pub async fn suggest_replies(&self, history: &[Message]) -> Vec<String> {
        if history.last().map(|m| m.role) != Some(Role::Model) {
            return Vec::new();
        }

        match self.suggest_replies_inner(history).await {
            Ok(replies) => replies,
            Err(e) => {
                tracing::debug!("Suggestion request failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn suggest_replies_inner(&self, history: &[Message]) -> Result<Vec<String>> {
        let prompt = build_suggestion_prompt(history);

        let request = GenerateContentRequest {
            contents: vec![Content::user_text(prompt)],
            tools: None,
            generation_config: Some(GenerationConfig {
                temperature: Some(SUGGESTION_TEMPERATURE),
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(serde_json::json!({
                    "type": "OBJECT",
                    "properties": {
                        "replies": {
                            "type": "ARRAY",
                            "items": {"type": "STRING"},
                            "description": "A list of 3 suggested replies for the user."
                        }
                    },
                    "required": ["replies"]
                })),
                ..Default::default()
            }),
        };

        let response = self.generate(&self.api.lite_model, &request).await?;
        let parsed: serde_json::Value = serde_json::from_str(response.text().trim())
            .map_err(|e| KaviraError::Api(format!("Malformed suggestions payload: {}", e)))?;

        let replies = parsed["replies"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .take(MAX_SUGGESTIONS)
                    .collect()
            })
            .unwrap_or_default();

        Ok(replies)
    }

    /// Generate one square JPEG, returned as base64
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::Api` on request failure or an empty result
    pub async fn generate_image(&self, prompt: &str) -> Result<String> {
        let url = self.endpoint(&self.api.image_model, "predict");
        let request = PredictRequest::single_image(prompt);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| KaviraError::Api(format!("Image request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(KaviraError::Api(format!("HTTP {}: {}", status, body)).into());
        }

        let parsed = response
            .json::<PredictResponse>()
            .await
            .map_err(|e| KaviraError::Api(format!("Failed to decode image response: {}", e)))?;

        parsed
            .predictions
            .into_iter()
            .filter_map(|p| p.bytes_base64_encoded)
            .next()
            .ok_or_else(|| KaviraError::Api("No image data returned".to_string()).into())
    }

    /// Synthesize speech, returning raw 24 kHz mono s16le PCM
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::Api` when the request fails or the response
    /// carries no audio
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part::text(text)],
            }],
            tools: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::voice(voice)),
                ..Default::default()
            }),
        };

        let response = self.generate(&self.api.tts_model, &request).await?;
        let data = response
            .inline_data()
            .ok_or_else(|| KaviraError::Api("No audio data returned".to_string()))?;

        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| KaviraError::Api(format!("Invalid audio payload: {}", e)).into())
    }
}

/// History messages as role-tagged text contents
fn history_contents(history: &[Message]) -> Vec<Content> {
    history
        .iter()
        .map(|m| match m.role {
            Role::User => Content::user_text(&m.text),
            Role::Model => Content::model_text(&m.text),
        })
        .collect()
}

/// Build the suggestion prompt from the trailing conversation window
fn build_suggestion_prompt(history: &[Message]) -> String {
    let window_start = history.len().saturating_sub(SUGGESTION_CONTEXT_TURNS);
    let conversation = history[window_start..]
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Model => "model",
            };
            format!("{}: {}", role, m.text)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Based on this conversation, provide 3 short, distinct, and relevant \
         follow-up prompts for the user. The prompts should be things the user \
         might ask next. Focus on the model's last response.\n\n\
         Conversation:\n{}\n\nReplies:",
        conversation
    )
}

/// Mime type embedded in a data URI, defaulting to JPEG
pub fn data_uri_mime(data_uri: &str) -> &str {
    data_uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split(";base64,").next())
        .filter(|mime| !mime.is_empty())
        .unwrap_or("image/jpeg")
}

/// Base64 payload of a data URI (everything after the first comma)
pub fn data_uri_payload(data_uri: &str) -> &str {
    data_uri
        .find(',')
        .map(|idx| &data_uri[idx + 1..])
        .unwrap_or(data_uri)
}
