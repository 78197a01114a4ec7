//! Remote model plumbing: variants, wire types, the streaming event
//! vocabulary, and the provider trait the rest of the crate talks to.

pub mod gemini;
pub mod sse;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{CbotError, Result};

pub use gemini::GeminiProvider;

// ── Model variants ───────────────────────────────────────────────────────────

/// The two model variants the assistant can run on.
///
/// This is a closed set: the UI offers exactly these two and nothing in the
/// crate ever constructs a model id from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Fast, cheaper variant. The default.
    #[default]
    Flash,
    /// Slower, higher-quality variant.
    Pro,
}

impl ModelVariant {
    /// Full model identifier as the API expects it.
    pub fn model_id(self) -> &'static str {
        match self {
            Self::Flash => "gemini-2.5-flash",
            Self::Pro => "gemini-2.5-pro",
        }
    }

    /// Short human label used in session greetings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Flash => "Flash",
            Self::Pro => "Pro",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.model_id())
    }
}

impl FromStr for ModelVariant {
    type Err = CbotError;

    /// Accepts the short name or the full model id.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "flash" | "gemini-2.5-flash" => Ok(Self::Flash),
            "pro" | "gemini-2.5-pro" => Ok(Self::Pro),
            other => Err(CbotError::Config(format!(
                "unknown model variant '{}' (expected 'flash' or 'pro')",
                other
            ))),
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

/// Role of a conversation turn on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

/// One part of a message: literal text or an inline binary payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

/// Base64 payload with its MIME type, exactly as the API wants it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// One conversation turn: a role and its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: ContentRole,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: ContentRole::User,
            parts,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ContentRole::Model,
            parts: vec![Part::text(text)],
        }
    }
}

// ── Streaming events ─────────────────────────────────────────────────────────

/// Events delivered over a turn's response channel.
///
/// The sequence is finite and ordered: zero or more `Delta`s followed by
/// exactly one `Done` or one `Error`. It cannot be restarted; dropping the
/// receiver discards the rest of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One chunk of response text, in arrival order.
    Delta(String),
    /// The stream completed normally.
    Done,
    /// The stream failed mid-flight. Terminal.
    Error(String),
}

// ── Provider trait ───────────────────────────────────────────────────────────

/// Transport seam for the hosted conversational model.
///
/// Implementations are stateless with respect to the conversation: the full
/// turn history is passed on every call. [`crate::session::ChatSession`]
/// owns the history.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Open a streaming generation request and return its event channel.
    ///
    /// Pre-flight failures (bad credential, transport refusal, HTTP error
    /// status) are returned as `Err`; failures after streaming has begun
    /// arrive as a terminal [`StreamEvent::Error`].
    async fn stream_generate(
        &self,
        variant: ModelVariant,
        system_instruction: &str,
        contents: Vec<Content>,
    ) -> Result<mpsc::Receiver<StreamEvent>>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}

/// Map an HTTP error status to the crate error taxonomy.
pub fn parse_provider_error(status: u16, message: &str) -> CbotError {
    match status {
        401 | 403 => CbotError::Unauthorized(message.to_string()),
        429 => CbotError::QuotaExceeded(message.to_string()),
        _ => CbotError::Provider(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_parses_short_and_full_names() {
        assert_eq!("flash".parse::<ModelVariant>().unwrap(), ModelVariant::Flash);
        assert_eq!("Pro".parse::<ModelVariant>().unwrap(), ModelVariant::Pro);
        assert_eq!(
            "gemini-2.5-pro".parse::<ModelVariant>().unwrap(),
            ModelVariant::Pro
        );
        assert!("ultra".parse::<ModelVariant>().is_err());
    }

    #[test]
    fn test_variant_display_is_model_id() {
        assert_eq!(ModelVariant::Flash.to_string(), "gemini-2.5-flash");
    }

    #[test]
    fn test_text_part_wire_shape() {
        let json = serde_json::to_value(Part::text("olá")).unwrap();
        assert_eq!(json, serde_json::json!({ "text": "olá" }));
    }

    #[test]
    fn test_inline_part_wire_shape() {
        let json = serde_json::to_value(Part::inline_data("application/pdf", "QUJD")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "inlineData": { "mimeType": "application/pdf", "data": "QUJD" }
            })
        );
    }

    #[test]
    fn test_content_roles_serialize_lowercase() {
        let json = serde_json::to_value(Content::model("ok")).unwrap();
        assert_eq!(json["role"], "model");
        let json = serde_json::to_value(Content::user(vec![Part::text("q")])).unwrap();
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_provider_error_mapping() {
        assert!(matches!(
            parse_provider_error(401, "bad key"),
            CbotError::Unauthorized(_)
        ));
        assert!(matches!(
            parse_provider_error(403, "forbidden"),
            CbotError::Unauthorized(_)
        ));
        assert!(matches!(
            parse_provider_error(429, "slow down"),
            CbotError::QuotaExceeded(_)
        ));
        assert!(matches!(
            parse_provider_error(500, "boom"),
            CbotError::Provider(_)
        ));
    }
}
