//! Error taxonomy for the ingestion pipeline and chat engine.
//!
//! Two tiers: [`FileError`] values are per-file, collected into batch
//! summaries alongside the filename, and never abort processing of the
//! remaining files. [`EngineError`] values are batch- or turn-fatal and
//! surface to the caller; the operation that raised one leaves session
//! state unchanged.

use thiserror::Error;

/// Per-file ingestion failure. Recorded and skipped, never fatal to a batch.
#[derive(Debug, Error)]
pub enum FileError {
    /// Declared `text/plain` but the bytes are not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    Decode(String),

    /// Extraction produced no text; the document is dropped.
    #[error("document is empty after extraction")]
    EmptyDocument,

    /// Declared MIME type is neither `text/plain` nor `application/pdf`.
    #[error("unsupported file type: {0}")]
    Unsupported(String),

    /// The PDF extraction service failed on this file.
    #[error("PDF extraction failed: {0}")]
    Extract(String),
}

/// A per-file failure paired with the file it came from.
#[derive(Debug)]
pub struct FileFailure {
    pub filename: String,
    pub error: FileError,
}

/// Batch- or turn-fatal engine failure.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Index construction failed: empty document set or embedding service error.
    #[error("indexing failed: {0}")]
    Indexing(String),

    /// Retrieval against the index failed.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// A chat turn arrived before any index was attached to the session.
    #[error("no documents indexed yet; upload files before asking questions")]
    NotReady,

    /// The language-model service failed: quota, timeout, or malformed response.
    #[error("language model error: {0}")]
    Upstream(String),
}
