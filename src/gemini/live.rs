//! Live transcription transport
//!
//! Connects to the bidirectional websocket API, streams base64 PCM frames
//! up, and forwards incoming input transcription text down to the caller
//! over an mpsc channel. Transport failures end the session with a warning
//! log; nothing here panics or surfaces errors to the capture path.

use crate::config::Config;
use crate::error::{KaviraError, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Mime type of uploaded microphone frames
pub const AUDIO_MIME: &str = "audio/pcm;rate=16000";

const BIDI_PATH: &str = "/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// An open live transcription session
///
/// Send base64 PCM frames into `frames` (fire-and-forget; a full or
/// closed channel just drops the frame) and read transcript text from
/// `transcripts`. Dropping both ends tears the connection down.
pub struct LiveSession {
    /// Upload side: base64-encoded 16 kHz mono s16le PCM frames
    pub frames: mpsc::Sender<String>,

    /// Download side: incremental transcription text
    pub transcripts: mpsc::Receiver<String>,
}

/// Open a live session against the configured model
///
/// # Errors
///
/// Returns `KaviraError::Live` when the websocket connection or the setup
/// handshake fails. Errors after setup end the session quietly.
pub async fn connect(config: &Config) -> Result<LiveSession> {
    let api_key = config.require_api_key()?;
    let url = ws_endpoint(&config.api.base_url, &api_key);

    let (mut ws, _) = connect_async(url)
        .await
        .map_err(|e| KaviraError::Live(format!("Connection failed: {}", e)))?;

    let setup = setup_message(&config.api.live_model);
    ws.send(WsMessage::Text(setup.to_string()))
        .await
        .map_err(|e| KaviraError::Live(format!("Setup failed: {}", e)))?;

    tracing::debug!("Live connection opened");

    let (frames_tx, mut frames_rx) = mpsc::channel::<String>(64);
    let (transcripts_tx, transcripts_rx) = mpsc::channel::<String>(64);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = frames_rx.recv() => {
                    match frame {
                        Some(data) => {
                            let msg = frame_message(&data);
                            if let Err(e) = ws.send(WsMessage::Text(msg.to_string())).await {
                                tracing::warn!("Live session send failed: {}", e);
                                break;
                            }
                        }
                        None => {
                            // Capture side closed; end the session.
                            let _ = ws.close(None).await;
                            break;
                        }
                    }
                }
                incoming = ws.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
                                if let Some(transcript) = extract_transcription(&value) {
                                    if transcripts_tx.send(transcript).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        Some(Ok(WsMessage::Binary(bytes))) => {
                            if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&bytes) {
                                if let Some(transcript) = extract_transcription(&value) {
                                    if transcripts_tx.send(transcript).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) | None => {
                            tracing::debug!("Live connection closed");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!("Live session error: {}", e);
                            break;
                        }
                    }
                }
            }
        }
    });

    Ok(LiveSession {
        frames: frames_tx,
        transcripts: transcripts_rx,
    })
}

/// Websocket endpoint derived from the HTTP base URL
fn ws_endpoint(base_url: &str, api_key: &str) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base_url.to_string()
    };
    format!("{}{}?key={}", ws_base, BIDI_PATH, api_key)
}

/// Session setup frame: audio responses with input transcription enabled
fn setup_message(model: &str) -> serde_json::Value {
    serde_json::json!({
        "setup": {
            "model": format!("models/{}", model),
            "generationConfig": {
                "responseModalities": ["AUDIO"]
            },
            "inputAudioTranscription": {}
        }
    })
}

/// Wrap one base64 PCM frame for upload
fn frame_message(data: &str) -> serde_json::Value {
    serde_json::json!({
        "realtimeInput": {
            "mediaChunks": [{
                "mimeType": AUDIO_MIME,
                "data": data
            }]
        }
    })
}

/// Pull input transcription text out of a server frame, if present
fn extract_transcription(value: &serde_json::Value) -> Option<String> {
    let text = value
        .get("serverContent")?
        .get("inputTranscription")?
        .get("text")?
        .as_str()?;
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
