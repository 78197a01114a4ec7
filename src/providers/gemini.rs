//! Native Gemini streaming provider.
//!
//! Speaks the Gemini REST API directly: `streamGenerateContent` with
//! `alt=sse`, authenticated with an API key sent as a `?key=` query
//! parameter. Each SSE event carries one JSON document with candidate parts.
//!
//! Thinking model support: Gemini 2.5 models interleave parts tagged
//! `thought: true`. Those are intermediate reasoning steps and are filtered
//! out of the delta text.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{CbotError, Result};

use super::sse::SseParser;
use super::{parse_provider_error, ChatProvider, Content, ModelVariant, StreamEvent};

/// Gemini v1beta REST API base.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Bound on the in-flight event channel so a fast producer cannot buffer
/// an entire response ahead of a slow consumer.
const STREAM_CHANNEL_CAPACITY: usize = 256;

/// Provider that streams responses from the Gemini REST API.
pub struct GeminiProvider {
    api_key: String,
    client: Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GeminiProvider { api_key: [REDACTED] }")
    }
}

impl GeminiProvider {
    /// Build a provider from an API key.
    ///
    /// # Errors
    ///
    /// Returns [`CbotError::Credential`] when the key is empty — the only
    /// validation performed; a wrong key surfaces later as an HTTP 4xx.
    pub fn new(api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(CbotError::Credential("API key not provided".into()));
        }
        Ok(Self {
            api_key: api_key.to_string(),
            client: Self::build_client(),
        })
    }

    fn build_client() -> Client {
        // Connect timeout only. A total request timeout would cut off long
        // streaming responses, which are expected to run for minutes.
        Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .build()
            .expect("failed to build HTTP client")
    }

    /// Full API URL for a streaming generation call.
    fn api_url(&self, variant: ModelVariant) -> String {
        format!(
            "{}/models/{}:streamGenerateContent",
            GEMINI_API_BASE,
            variant.model_id()
        )
    }

    /// Build the request body: conversation contents plus the session's
    /// system instruction. Generation parameters are left at API defaults.
    pub(crate) fn build_request_body(system_instruction: &str, contents: &[Content]) -> Value {
        json!({
            "contents": contents,
            "systemInstruction": { "parts": [{ "text": system_instruction }] }
        })
    }

    /// Extract delta text from one streamed response document.
    ///
    /// Joins the text of all non-thought parts of the first candidate.
    /// Returns `None` when the document carries no text (e.g. a pure
    /// usage-metadata event at the end of the stream).
    pub(crate) fn extract_delta(document: &Value) -> Option<String> {
        let parts = document["candidates"][0]["content"]["parts"].as_array()?;
        let text: String = parts
            .iter()
            .filter(|p| !p["thought"].as_bool().unwrap_or(false))
            .filter_map(|p| p["text"].as_str())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Pull a useful message out of a Gemini error body, falling back to the
    /// raw text.
    fn error_message(status: u16, body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v["error"]["message"]
                    .as_str()
                    .map(|m| format!("Gemini API error: {}", m))
            })
            .unwrap_or_else(|| format!("Gemini API error (HTTP {}): {}", status, body))
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    async fn stream_generate(
        &self,
        variant: ModelVariant,
        system_instruction: &str,
        contents: Vec<Content>,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        let body = Self::build_request_body(system_instruction, &contents);

        debug!(
            model = variant.model_id(),
            turns = contents.len(),
            "Gemini stream request"
        );

        let response = self
            .client
            .post(self.api_url(variant))
            .query(&[("alt", "sse"), ("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CbotError::Provider(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = Self::error_message(status.as_u16(), &text);
            return Err(parse_provider_error(status.as_u16(), &message));
        }

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut parser = SseParser::new();
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(StreamEvent::Error(format!("stream interrupted: {}", e)))
                            .await;
                        return;
                    }
                };
                for payload in parser.feed(&bytes) {
                    let document: Value = match serde_json::from_str(&payload) {
                        Ok(document) => document,
                        Err(e) => {
                            warn!("Skipping unparsable stream event: {}", e);
                            continue;
                        }
                    };
                    if let Some(text) = Self::extract_delta(&document) {
                        if tx.send(StreamEvent::Delta(text)).await.is_err() {
                            // Receiver dropped: nobody is interested anymore.
                            return;
                        }
                    }
                }
            }
            let _ = tx.send(StreamEvent::Done).await;
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Part;

    #[test]
    fn test_empty_key_is_rejected() {
        assert!(matches!(
            GeminiProvider::new(""),
            Err(CbotError::Credential(_))
        ));
        assert!(matches!(
            GeminiProvider::new("   "),
            Err(CbotError::Credential(_))
        ));
        assert!(GeminiProvider::new("AIza-test").is_ok());
    }

    #[test]
    fn test_api_url_targets_streaming_endpoint() {
        let provider = GeminiProvider::new("k").unwrap();
        let url = provider.api_url(ModelVariant::Pro);
        assert!(url.ends_with("/models/gemini-2.5-pro:streamGenerateContent"));
    }

    #[test]
    fn test_request_body_carries_system_instruction_and_contents() {
        let contents = vec![
            Content::user(vec![Part::text("O que é IVA?")]),
            Content::model("É um imposto."),
        ];
        let body = GeminiProvider::build_request_body("instrução", &contents);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "instrução");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "O que é IVA?");
        assert_eq!(body["contents"][1]["role"], "model");
    }

    #[test]
    fn test_request_body_keeps_inline_data_part() {
        let contents = vec![Content::user(vec![
            Part::text("resume isto"),
            Part::inline_data("application/pdf", "QUJD"),
        ])];
        let body = GeminiProvider::build_request_body("sys", &contents);
        let part = &body["contents"][0]["parts"][1];
        assert_eq!(part["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(part["inlineData"]["data"], "QUJD");
    }

    #[test]
    fn test_extract_delta_joins_parts() {
        let document = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "O prazo " },
                { "text": "é dia 20." }
            ]}}]
        });
        assert_eq!(
            GeminiProvider::extract_delta(&document).unwrap(),
            "O prazo é dia 20."
        );
    }

    #[test]
    fn test_extract_delta_skips_thought_parts() {
        let document = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "a pensar...", "thought": true },
                { "text": "resposta final" }
            ]}}]
        });
        assert_eq!(
            GeminiProvider::extract_delta(&document).unwrap(),
            "resposta final"
        );
    }

    #[test]
    fn test_extract_delta_none_without_text() {
        let document = json!({ "usageMetadata": { "totalTokenCount": 42 } });
        assert!(GeminiProvider::extract_delta(&document).is_none());
        let document = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "só pensamento", "thought": true }
            ]}}]
        });
        assert!(GeminiProvider::extract_delta(&document).is_none());
    }

    #[test]
    fn test_error_message_prefers_api_detail() {
        let body = r#"{"error":{"code":400,"message":"API key not valid"}}"#;
        let message = GeminiProvider::error_message(400, body);
        assert_eq!(message, "Gemini API error: API key not valid");
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        let message = GeminiProvider::error_message(502, "<html>bad gateway</html>");
        assert!(message.contains("HTTP 502"));
        assert!(message.contains("bad gateway"));
    }
}
