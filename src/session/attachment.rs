//! File attachments encoded as inline message parts.
//!
//! The remote API takes binary payloads inline: base64 data plus a MIME
//! type, one per message at most. Files are read fully into memory before
//! the message is built, so oversized files are rejected up front.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{CbotError, Result};
use crate::providers::Part;

/// Maximum accepted attachment size (20 MiB).
pub const MAX_ATTACHMENT_SIZE: usize = 20 * 1024 * 1024;

/// A file staged for sending with the next message.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Original file name, shown next to the user's message.
    pub file_name: String,
    /// MIME type guessed from the extension.
    pub mime_type: String,
    data: Vec<u8>,
}

impl Attachment {
    /// Read a file from disk and stage it as an attachment.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or exceeds
    /// [`MAX_ATTACHMENT_SIZE`].
    pub async fn read(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| CbotError::Attachment(format!("{}: {}", path.display(), e)))?;
        if data.len() > MAX_ATTACHMENT_SIZE {
            return Err(CbotError::Attachment(format!(
                "{} is {} bytes, above the {} byte limit",
                path.display(),
                data.len(),
                MAX_ATTACHMENT_SIZE
            )));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = guess_mime(path).to_string();
        Ok(Self {
            file_name,
            mime_type,
            data,
        })
    }

    /// Build an attachment from raw bytes (tests, embedding).
    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Encode as the inline-data part the wire format wants.
    pub fn to_part(&self) -> Part {
        Part::inline_data(&self.mime_type, BASE64.encode(&self.data))
    }
}

/// Map a file extension to a MIME type.
///
/// Unknown extensions go out as `application/octet-stream`; the model deals
/// with what it can.
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}
