//! Google generative-language API adapter.
//!
//! Implements both gateway contracts over the `generateContent` REST
//! endpoint: text replies through a conversational prompt (system
//! instructions, flattened history, the new input, and an optional
//! attached image as an inline part), and images through a second model
//! that returns inline base64 data.
//!
//! Request building and response parsing are pure functions; the adapter
//! itself only adds HTTP plumbing, so the interesting behavior is
//! testable without a network.

use async_trait::async_trait;
use base64::Engine as _;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::context::{ContextRequest, flatten_history};
use crate::error::GatewayError;
use crate::gateway::{ImageGateway, ImageReply, TextGateway, TextReply};

/// Instructions sent ahead of every text-generation request.
///
/// The inline `[GENERATE_IMAGE: ...]` directive is what the response
/// classifier later looks for; the reply must be exactly that instruction
/// when the model decides to produce an image.
const SYSTEM_PROMPT: &str = "\
You are Harium, a helpful and friendly AI assistant. Your primary goal is to assist the user.
Engage in a conversation with the user, remembering previous turns.
When you respond, please identify and emphasize important words or phrases by wrapping them in double asterisks, like **this**.
Please use emojis appropriately in your responses to make the conversation more engaging.

When providing code snippets (HTML, CSS, JavaScript, etc.), **always** wrap them in triple backticks, specifying the language if possible.

If the user asks you to create, draw, or generate an image, your response **must** be ONLY the specific instruction `[GENERATE_IMAGE: <detailed description of the image they want>]`. Do not add any other text or pleasantries around this instruction if you are issuing it. For example, if the user says 'draw a happy dog', you should respond with: `[GENERATE_IMAGE: a happy dog playing in a sunny park]`.

If the user asks a question about an image they attached, answer it directly based on the image. If the user's request is ambiguous about whether to generate an image or answer a question about an attachment, prioritize answering about the attachment if one is present.";

/// Safety thresholds sent with every request.
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_HARASSMENT",
];

/// Configuration for the Google generative-language adapter.
#[derive(Debug, Clone)]
pub struct GoogleAiConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL (defaults to `https://generativelanguage.googleapis.com`).
    pub base_url: String,
    /// Model used for text generation.
    pub text_model: String,
    /// Model used for image generation.
    pub image_model: String,
}

impl GoogleAiConfig {
    /// Create a config with the given API key and default models.
    pub fn new(api_key: impl Into<String>) -> Self {
        let defaults = ProviderConfig::default();
        Self {
            api_key: api_key.into(),
            base_url: defaults.base_url,
            text_model: defaults.text_model,
            image_model: defaults.image_model,
        }
    }

    /// Build a config from provider settings, resolving the API key.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConfigError`] if no API key is available.
    pub fn from_provider(provider: &ProviderConfig) -> Result<Self, GatewayError> {
        Ok(Self {
            api_key: provider.resolve_api_key()?,
            base_url: provider.base_url.clone(),
            text_model: provider.text_model.clone(),
            image_model: provider.image_model.clone(),
        })
    }

    /// Set a custom base URL (mainly for tests against a local server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the text-generation model.
    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    /// Set the image-generation model.
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }
}

// ── Request Builders ──────────────────────────────────────────

/// Build the `generateContent` body for a text request.
///
/// Parts, in order: system instructions, the flattened prior conversation
/// under a "Previous conversation:" heading (omitted when empty), the new
/// user input, the attached image as an inline-data part (if any), and a
/// trailing `assistant:` cue.
pub fn build_text_request(request: &ContextRequest) -> serde_json::Value {
    let mut parts = vec![serde_json::json!({ "text": SYSTEM_PROMPT })];

    if !request.turns.is_empty() {
        let history = flatten_history(&request.turns);
        parts.push(serde_json::json!({
            "text": format!("\n\nPrevious conversation:\n{history}"),
        }));
    }

    parts.push(serde_json::json!({
        "text": format!("\n\nuser: {}", request.user_input),
    }));

    if let Some(attachment) = &request.attachment {
        parts.push(serde_json::json!({
            "text": "\n(The user has attached the following image. Please consider it in your response if relevant to the query.)\nAttached Image:",
        }));
        if let Some((mime_type, data)) = split_data_uri(&attachment.data_uri) {
            parts.push(serde_json::json!({
                "inline_data": { "mime_type": mime_type, "data": data },
            }));
        }
    }

    parts.push(serde_json::json!({ "text": "\n\nassistant:" }));

    serde_json::json!({
        "contents": [{ "parts": parts }],
        "safetySettings": safety_settings(),
    })
}

/// Build the `generateContent` body for an image request.
///
/// Both modalities must be requested even though only the image is used.
pub fn build_image_request(prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        "safetySettings": safety_settings(),
    })
}

fn safety_settings() -> serde_json::Value {
    let settings: Vec<serde_json::Value> = SAFETY_CATEGORIES
        .iter()
        .map(|category| {
            serde_json::json!({
                "category": category,
                "threshold": "BLOCK_MEDIUM_AND_ABOVE",
            })
        })
        .collect();
    serde_json::json!(settings)
}

/// Split a `data:<mime>;base64,<data>` URI into its mime type and payload.
pub fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime_type, data) = rest.split_once(";base64,")?;
    if mime_type.is_empty() || data.is_empty() {
        return None;
    }
    Some((mime_type, data))
}

/// Encode raw image bytes as a `data:<mime>;base64,...` URI.
pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    let data = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime_type};base64,{data}")
}

// ── Response Parsing ──────────────────────────────────────────

/// Extract the reply text from a `generateContent` response body.
pub fn extract_text(body: &serde_json::Value) -> Result<String, GatewayError> {
    let parts = candidate_parts(body)
        .ok_or_else(|| GatewayError::ProviderError("response has no candidates".into()))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(GatewayError::ProviderError(
            "response candidate has no text parts".into(),
        ));
    }
    Ok(text)
}

/// Extract the generated image from a `generateContent` response body as
/// a data URI.
pub fn extract_image(body: &serde_json::Value) -> Result<String, GatewayError> {
    let parts = candidate_parts(body)
        .ok_or_else(|| GatewayError::ImageError("response has no candidates".into()))?;

    for part in parts {
        let inline = part.get("inlineData").or_else(|| part.get("inline_data"));
        if let Some(inline) = inline {
            let mime_type = inline.get("mimeType").or_else(|| inline.get("mime_type"));
            let (Some(mime_type), Some(data)) = (
                mime_type.and_then(|m| m.as_str()),
                inline.get("data").and_then(|d| d.as_str()),
            ) else {
                continue;
            };
            return Ok(format!("data:{mime_type};base64,{data}"));
        }
    }

    Err(GatewayError::ImageError(
        "generation returned no image data".into(),
    ))
}

fn candidate_parts(body: &serde_json::Value) -> Option<&Vec<serde_json::Value>> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()
}

/// Extract an error message from an API error response body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

/// Map an HTTP error status to the appropriate gateway error.
fn map_http_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 | 403 => GatewayError::AuthError(format!("authentication failed: {message}")),
        429 | 503 => GatewayError::Overloaded(format!("service overloaded: {message}")),
        _ => GatewayError::ProviderError(format!("HTTP {}: {message}", status.as_u16())),
    }
}

// ── Adapter ───────────────────────────────────────────────────

/// HTTP client for the Google generative-language API.
///
/// Implements both [`TextGateway`] and [`ImageGateway`]; the two concerns
/// differ only in model and response shape, so they share one client.
pub struct GoogleAiClient {
    config: GoogleAiConfig,
    client: reqwest::Client,
}

impl GoogleAiClient {
    /// Create a client with the given configuration.
    pub fn new(config: GoogleAiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/v1beta/models/{model}:generateContent")
    }

    /// POST a `generateContent` body and return the parsed JSON response.
    async fn generate_content(
        &self,
        model: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let request_id = Uuid::new_v4();
        let url = self.endpoint(model);
        debug!(%request_id, model, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::RequestError(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, &body_text));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::ProviderError(format!("invalid response body: {e}")))
    }
}

impl std::fmt::Debug for GoogleAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleAiClient")
            .field("base_url", &self.config.base_url)
            .field("text_model", &self.config.text_model)
            .field("image_model", &self.config.image_model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextGateway for GoogleAiClient {
    #[instrument(skip_all, fields(model = %self.config.text_model))]
    async fn generate(&self, request: &ContextRequest) -> Result<TextReply, GatewayError> {
        let body = build_text_request(request);
        let response = self
            .generate_content(&self.config.text_model, &body)
            .await?;
        Ok(TextReply::new(extract_text(&response)?))
    }
}

#[async_trait]
impl ImageGateway for GoogleAiClient {
    #[instrument(skip_all, fields(model = %self.config.image_model))]
    async fn generate(&self, prompt: &str) -> Result<ImageReply, GatewayError> {
        let body = build_image_request(prompt);
        let response = self
            .generate_content(&self.config.image_model, &body)
            .await
            .map_err(|e| match e {
                // Transport and status problems on the image path surface
                // as image failures so the controller picks the right notice.
                GatewayError::RequestError(m) | GatewayError::ProviderError(m) => {
                    GatewayError::ImageError(m)
                }
                other => other,
            })?;
        Ok(ImageReply::new(extract_image(&response)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::assemble;
    use crate::message::{Attachment, Message};

    fn text_of(part: &serde_json::Value) -> &str {
        part.get("text").and_then(|t| t.as_str()).unwrap_or("")
    }

    #[test]
    fn text_request_starts_with_system_prompt() {
        let request = assemble(&[], "hi", None);
        let body = build_text_request(&request);
        let parts = body["contents"][0]["parts"].as_array();
        let parts = match parts {
            Some(p) => p,
            None => unreachable!("body has parts"),
        };
        assert!(text_of(&parts[0]).contains("[GENERATE_IMAGE:"));
        assert!(text_of(&parts[0]).starts_with("You are Harium"));
    }

    #[test]
    fn text_request_flattens_history() {
        let messages = vec![Message::user("hi"), Message::assistant("hello")];
        let request = assemble(&messages, "next", None);
        let body = build_text_request(&request);
        let parts = match body["contents"][0]["parts"].as_array() {
            Some(p) => p,
            None => unreachable!("body has parts"),
        };
        assert!(text_of(&parts[1]).contains("Previous conversation:"));
        assert!(text_of(&parts[1]).contains("user: hi"));
        assert!(text_of(&parts[1]).contains("assistant: hello"));
        assert_eq!(text_of(&parts[2]), "\n\nuser: next");
        assert_eq!(text_of(&parts[3]), "\n\nassistant:");
    }

    #[test]
    fn text_request_without_history_skips_heading() {
        let request = assemble(&[], "hi", None);
        let body = build_text_request(&request);
        let parts = match body["contents"][0]["parts"].as_array() {
            Some(p) => p,
            None => unreachable!("body has parts"),
        };
        // System prompt, user input, assistant cue; no history block.
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn text_request_includes_attachment_as_inline_data() {
        let attachment = Attachment::new("data:image/png;base64,AAAA", "pic.png");
        let request = assemble(&[], "what is this?", Some(attachment));
        let body = build_text_request(&request);
        let parts = match body["contents"][0]["parts"].as_array() {
            Some(p) => p,
            None => unreachable!("body has parts"),
        };
        let inline = parts
            .iter()
            .find_map(|p| p.get("inline_data"))
            .and_then(|v| v.as_object());
        let inline = match inline {
            Some(i) => i,
            None => unreachable!("attachment part present"),
        };
        assert_eq!(inline["mime_type"], "image/png");
        assert_eq!(inline["data"], "AAAA");
    }

    #[test]
    fn image_request_asks_for_both_modalities() {
        let body = build_image_request("a red fox");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "a red fox");
        let modalities = body["generationConfig"]["responseModalities"]
            .as_array()
            .map(|a| a.len());
        assert_eq!(modalities, Some(2));
    }

    #[test]
    fn requests_carry_safety_settings() {
        let body = build_image_request("x");
        let settings = body["safetySettings"].as_array().map(|a| a.len());
        assert_eq!(settings, Some(4));
    }

    #[test]
    fn split_data_uri_parses_mime_and_payload() {
        assert_eq!(
            split_data_uri("data:image/jpeg;base64,QUJD"),
            Some(("image/jpeg", "QUJD"))
        );
        assert_eq!(split_data_uri("not a uri"), None);
        assert_eq!(split_data_uri("data:;base64,QUJD"), None);
        assert_eq!(split_data_uri("data:image/png;base64,"), None);
    }

    #[test]
    fn to_data_uri_round_trips_through_split() {
        let uri = to_data_uri("image/png", b"hello");
        let (mime_type, data) = match split_data_uri(&uri) {
            Some(pair) => pair,
            None => unreachable!("uri splits"),
        };
        assert_eq!(mime_type, "image/png");
        assert_eq!(data, "aGVsbG8=");
    }

    #[test]
    fn extract_text_joins_text_parts() {
        let body = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "there!" }] }
            }]
        });
        assert!(matches!(extract_text(&body), Ok(t) if t == "Hello there!"));
    }

    #[test]
    fn extract_text_without_candidates_is_provider_error() {
        let body = serde_json::json!({ "candidates": [] });
        assert!(matches!(
            extract_text(&body),
            Err(e) if e.code() == "PROVIDER_ERROR"
        ));
    }

    #[test]
    fn extract_image_builds_data_uri() {
        let body = serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "here is your image" },
                    { "inlineData": { "mimeType": "image/png", "data": "QUJD" } }
                ] }
            }]
        });
        assert!(matches!(
            extract_image(&body),
            Ok(uri) if uri == "data:image/png;base64,QUJD"
        ));
    }

    #[test]
    fn extract_image_without_inline_data_is_image_error() {
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "no image" }] } }]
        });
        assert!(matches!(
            extract_image(&body),
            Err(e) if e.code() == "IMAGE_FAILED"
        ));
    }

    #[test]
    fn map_http_error_classifies_statuses() {
        let auth = map_http_error(reqwest::StatusCode::FORBIDDEN, "{}");
        assert_eq!(auth.code(), "AUTH_FAILED");

        let overloaded = map_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "{}");
        assert_eq!(overloaded.code(), "OVERLOADED");

        let unavailable = map_http_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, "{}");
        assert_eq!(unavailable.code(), "OVERLOADED");

        let other = map_http_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "{}");
        assert_eq!(other.code(), "PROVIDER_ERROR");
    }

    #[test]
    fn map_http_error_extracts_api_message() {
        let body = r#"{"error":{"code":429,"message":"quota exceeded"}}"#;
        let err = map_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, body);
        assert!(err.message().contains("quota exceeded"));
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let client = GoogleAiClient::new(
            GoogleAiConfig::new("key").with_base_url("http://localhost:8080/"),
        );
        assert_eq!(
            client.endpoint("gemini-1.5-flash-latest"),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash-latest:generateContent"
        );
    }

    #[test]
    fn config_from_provider_requires_key() {
        let provider = ProviderConfig::default();
        // Default has no inline key; only fails when the env var is unset.
        if std::env::var("HARIUM_API_KEY").is_err() {
            assert!(matches!(
                GoogleAiConfig::from_provider(&provider),
                Err(e) if e.code() == "CONFIG_INVALID"
            ));
        }
    }
}
