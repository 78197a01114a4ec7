//! The MCP question/answer cache.
//!
//! "MCP" (Modelo de Conhecimento Persistente) is the assistant's local
//! knowledge base: a flat list of question/answer pairs consulted before any
//! remote call. Matching is exact — trimmed, case-folded string equality —
//! never fuzzy.

pub mod store;

use serde::{Deserialize, Serialize};

pub use store::{JsonFileStorage, McpStorage, McpStore, MemoryStorage};

/// One cached question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpEntry {
    pub question: String,
    pub answer: String,
}

impl McpEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Canonical form of a question for equality checks: surrounding whitespace
/// trimmed, Unicode-lowercased.
pub fn normalize(question: &str) -> String {
    question.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize("  O Que É Iva? "), "o que é iva?");
        assert_eq!(normalize("PRAZO"), "prazo");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_entry_blob_shape() {
        // The on-disk blob format is a bare {question, answer} object.
        let entry = McpEntry::new("prazo IVA", "O prazo é dia 20.");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "question": "prazo IVA", "answer": "O prazo é dia 20." })
        );
    }
}
