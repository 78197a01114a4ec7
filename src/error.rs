//! Crate-wide error type and `Result` alias.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CbotError>;

/// All errors the assistant can produce.
///
/// Storage failures in the MCP store are deliberately *not* represented
/// here — the store swallows and logs them per its contract. The variants
/// below are the ones callers actually see.
#[derive(Debug, Error)]
pub enum CbotError {
    /// Filesystem error (config, credential blob).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing or empty API credential at session creation.
    #[error("credential error: {0}")]
    Credential(String),

    /// Attachment rejected before sending (missing file, oversized payload).
    #[error("attachment error: {0}")]
    Attachment(String),

    /// Remote API transport or protocol failure.
    #[error("provider error: {0}")]
    Provider(String),

    /// The remote rejected our credential (HTTP 401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The remote reported quota exhaustion (HTTP 429).
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CbotError = io.into();
        assert!(matches!(err, CbotError::Io(_)));
    }

    #[test]
    fn test_display_includes_detail() {
        let err = CbotError::Provider("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }
}
