//! Upload-batch orchestration.
//!
//! Coordinates the full upload flow: loader → chunking/indexing → session
//! attach. Per-file failures are collected into the summary and never abort
//! the batch; an index-build failure is returned as an error and leaves the
//! session's previous index, state, and transcript untouched.

use tracing::{info, warn};

use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::{EngineError, FileFailure};
use crate::index::build_index;
use crate::loader::{load_files, PdfExtract, UploadedFile};
use crate::session::SessionState;

/// Outcome of processing one upload batch.
#[derive(Debug, Default)]
pub struct UploadSummary {
    pub documents: usize,
    pub chunks: usize,
    pub failures: Vec<FileFailure>,
    /// Whether an index was built and attached for this batch.
    pub indexed: bool,
}

/// Process an upload batch to completion and attach the resulting index to
/// the session, replacing any previous index wholesale.
///
/// A batch that yields no documents skips indexing and reports its per-file
/// failures; the session keeps whatever index it had before.
pub async fn process_upload(
    files: &[UploadedFile],
    config: &Config,
    pdf: &dyn PdfExtract,
    embedder: &dyn Embedder,
    sessions: &SessionState,
    session_id: &str,
) -> Result<UploadSummary, EngineError> {
    let outcome = load_files(files, pdf);
    let documents = outcome.documents.len();

    if outcome.documents.is_empty() {
        warn!(
            failures = outcome.failures.len(),
            "upload produced no documents"
        );
        return Ok(UploadSummary {
            documents: 0,
            chunks: 0,
            failures: outcome.failures,
            indexed: false,
        });
    }

    let index = build_index(&outcome.documents, config, embedder).await?;
    let chunks = index.len();
    sessions.attach_index(session_id, index).await;

    info!(
        documents,
        chunks,
        failures = outcome.failures.len(),
        "upload batch indexed"
    );
    Ok(UploadSummary {
        documents,
        chunks,
        failures: outcome.failures,
        indexed: true,
    })
}
