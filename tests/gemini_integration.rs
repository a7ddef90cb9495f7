use futures::StreamExt;
use serde_json::json;

use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kavira::config::Config;
use kavira::gemini::FALLBACK_TEXT;
use kavira::session::Message;
use kavira::{ChatMode, GeminiClient, ResponseFragment};

fn client_for(server: &MockServer) -> GeminiClient {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.api.api_key = Some("test-key".to_string());
    GeminiClient::new(&config).unwrap()
}

fn sse_body(chunks: &[&str]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        let payload = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": chunk}]}
            }]
        });
        body.push_str(&format!("data: {}\n\n", payload));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

async fn collect(mut stream: kavira::ResponseStream) -> Vec<ResponseFragment> {
    let mut fragments = Vec::new();
    while let Some(fragment) = stream.next().await {
        fragments.push(fragment);
    }
    fragments
}

/// Streamed chat yields one fragment per SSE chunk, in order
#[tokio::test]
async fn test_fast_chat_streams_text_deltas() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&["Hello", ", ", "world"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let fragments = collect(client.send(&[], &Message::user("hi"), ChatMode::Fast)).await;

    let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
    assert_eq!(texts, vec!["Hello", ", ", "world"]);
    assert!(fragments.iter().all(|f| f.sources.is_empty()));
}

/// The full history rides along with the new message
#[tokio::test]
async fn test_history_is_sent_with_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:streamGenerateContent"))
        .and(body_string_contains("earlier question"))
        .and(body_string_contains("earlier answer"))
        .and(body_string_contains("follow-up"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(&["ok"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let history = vec![
        Message::user("earlier question"),
        Message::model("earlier answer"),
    ];
    let fragments = collect(client.send(&history, &Message::user("follow-up"), ChatMode::Fast)).await;

    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].text, "ok");
}

/// An HTTP error degrades to exactly one fallback fragment, never an Err
#[tokio::test]
async fn test_server_error_yields_single_fallback_fragment() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:streamGenerateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let fragments = collect(client.send(&[], &Message::user("hi"), ChatMode::Fast)).await;

    assert_eq!(fragments.len(), 1);
    assert!(fragments[0].is_fallback());
    assert_eq!(fragments[0].text, FALLBACK_TEXT);
}

/// Unparsable and non-data SSE lines are skipped without killing the stream
#[tokio::test]
async fn test_malformed_sse_lines_are_ignored() {
    let server = MockServer::start().await;

    let body = format!(
        ": keep-alive comment\n\ndata: not json at all\n\n{}",
        sse_body(&["survived"])
    );
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:streamGenerateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let fragments = collect(client.send(&[], &Message::user("hi"), ChatMode::Fast)).await;

    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].text, "survived");
}

/// Reasoning mode targets the pro model and carries the thinking budget
#[tokio::test]
async fn test_reasoning_mode_uses_pro_model_with_thinking_budget() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-pro:streamGenerateContent"))
        .and(body_string_contains("thinkingBudget"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(&["deep"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let fragments = collect(client.send(&[], &Message::user("why?"), ChatMode::Reasoning)).await;

    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].text, "deep");
}

/// A message carrying an image streams against the flash model with the
/// payload inlined, regardless of the selected mode
#[tokio::test]
async fn test_image_attachment_forces_vision_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:streamGenerateContent"))
        .and(body_string_contains("inlineData"))
        .and(body_string_contains("image/png"))
        .and(body_string_contains("aW1hZ2U="))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body(&["a cat"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let message =
        Message::user("what is this?").with_image("data:image/png;base64,aW1hZ2U=");
    let fragments = collect(client.send(&[], &message, ChatMode::Reasoning)).await;

    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].text, "a cat");
}

/// Search mode makes one grounded call and emits a single fragment with
/// its sources deduplicated by uri
#[tokio::test]
async fn test_search_mode_single_fragment_with_sources() {
    let server = MockServer::start().await;

    let body = json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "grounded answer"}]},
            "groundingMetadata": {
                "groundingChunks": [
                    {"web": {"uri": "https://a.example", "title": "A"}},
                    {"web": {"uri": "https://b.example", "title": "B"}},
                    {"web": {"uri": "https://a.example", "title": "A again"}}
                ]
            }
        }]
    });

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(body_string_contains("googleSearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let fragments = collect(client.send(&[], &Message::user("latest news"), ChatMode::Search)).await;

    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].text, "grounded answer");
    assert_eq!(fragments[0].sources.len(), 2);
    assert_eq!(fragments[0].sources[0].uri, "https://a.example");
    assert_eq!(fragments[0].sources[1].title, "B");
}

/// Search failures degrade to the fallback fragment like every other mode
#[tokio::test]
async fn test_search_error_yields_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let fragments = collect(client.send(&[], &Message::user("q"), ChatMode::Search)).await;

    assert_eq!(fragments.len(), 1);
    assert!(fragments[0].is_fallback());
}

/// Suggestions come from the lite model and are capped at three
#[tokio::test]
async fn test_suggest_replies_parses_and_caps_at_three() {
    let server = MockServer::start().await;

    let replies_json = json!({
        "replies": ["First?", "Second?", "Third?", "Fourth?"]
    })
    .to_string();
    let body = json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": replies_json}]}
        }]
    });

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-flash-lite-latest:generateContent"))
        .and(body_string_contains("responseSchema"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let history = vec![Message::user("q"), Message::model("a")];
    let replies = client.suggest_replies(&history).await;

    assert_eq!(replies, vec!["First?", "Second?", "Third?"]);
}

/// Suggestion failures are silent: an empty list, no error
#[tokio::test]
async fn test_suggest_replies_empty_on_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-flash-lite-latest:generateContent"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let history = vec![Message::user("q"), Message::model("a")];
    assert!(client.suggest_replies(&history).await.is_empty());
}

/// Malformed suggestion payloads also degrade to an empty list
#[tokio::test]
async fn test_suggest_replies_empty_on_malformed_payload() {
    let server = MockServer::start().await;

    let body = json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "not json"}]}
        }]
    });
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-flash-lite-latest:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let history = vec![Message::user("q"), Message::model("a")];
    assert!(client.suggest_replies(&history).await.is_empty());
}

/// Image generation returns the first prediction's base64 payload
#[tokio::test]
async fn test_generate_image_returns_base64() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/imagen-4.0-generate-001:predict"))
        .and(body_string_contains("a red fox"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{"bytesBase64Encoded": "aW1hZ2VieXRlcw=="}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let data = client.generate_image("a red fox").await.unwrap();
    assert_eq!(data, "aW1hZ2VieXRlcw==");
}

/// An empty prediction list is an error, not an empty image
#[tokio::test]
async fn test_generate_image_empty_predictions_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/imagen-4.0-generate-001:predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": []})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.generate_image("nothing").await.is_err());
}

/// Speech synthesis decodes the inline audio payload to raw PCM bytes
#[tokio::test]
async fn test_synthesize_decodes_pcm() {
    let server = MockServer::start().await;

    // "pcm!" as base64
    let body = json!({
        "candidates": [{
            "content": {"parts": [{"inlineData": {"mimeType": "audio/pcm", "data": "cGNtIQ=="}}]}
        }]
    });
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-preview-tts:generateContent"))
        .and(body_string_contains("AUDIO"))
        .and(body_string_contains("Kore"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let pcm = client.synthesize("hello", "Kore").await.unwrap();
    assert_eq!(pcm, b"pcm!");
}

/// A speech response without audio data is an error
#[tokio::test]
async fn test_synthesize_missing_audio_is_error() {
    let server = MockServer::start().await;

    let body = json!({
        "candidates": [{
            "content": {"parts": [{"text": "no audio here"}]}
        }]
    });
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-preview-tts:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.synthesize("hello", "Kore").await.is_err());
}
