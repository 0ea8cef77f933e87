//! Top-k semantic retrieval over a built index.

use crate::embedding::{embed_query, Embedder};
use crate::error::EngineError;
use crate::index::VectorIndex;
use crate::models::ScoredChunk;

/// Retrieve the `top_k` most relevant chunks for `query`.
///
/// Results are ordered by descending relevance score; ties keep original
/// chunk insertion order. Pure with respect to the index: the scan never
/// mutates it, so concurrent calls against one index are safe.
///
/// Fails with [`EngineError::Retrieval`] if `top_k` is zero or the
/// embedding service errors.
pub async fn retrieve(
    index: &VectorIndex,
    embedder: &dyn Embedder,
    query: &str,
    top_k: usize,
) -> Result<Vec<ScoredChunk>, EngineError> {
    if top_k == 0 {
        return Err(EngineError::Retrieval(
            "top_k must be at least 1".to_string(),
        ));
    }

    let query_vec = embed_query(embedder, query)
        .await
        .map_err(|e| EngineError::Retrieval(e.to_string()))?;

    Ok(index.scan(&query_vec, top_k))
}
