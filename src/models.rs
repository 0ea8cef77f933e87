//! Core data models used throughout docchat.
//!
//! These types represent the documents, chunks, and conversation turns that
//! flow through the ingestion and chat pipeline.

use std::collections::HashMap;

/// Normalized text unit produced by the document loader.
///
/// `text` is non-empty once a document leaves the loader;
/// `metadata["filename"]` is set when the source is an uploaded file.
/// Documents are immutable after loading.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Build a document from extracted text and its source filename.
    pub fn from_file(text: impl Into<String>, filename: &str) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("filename".to_string(), filename.to_string());
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Source filename for provenance display, if recorded.
    pub fn filename(&self) -> Option<&str> {
        self.metadata.get("filename").map(String::as_str)
    }
}

/// A chunk of a document's text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    /// Source filename carried over from the document, for provenance display.
    pub source: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// A chunk paired with its relevance score, as returned by the retriever.
/// Valid only within a single retrieval call; never stored.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry in a session transcript. Append-only within a session.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// Provenance reference returned alongside an answer.
#[derive(Debug, Clone)]
pub struct SourceRef {
    pub source: String,
    pub chunk_id: String,
    pub score: f32,
}
