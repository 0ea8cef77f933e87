//! Semantic index construction over loaded documents.
//!
//! [`build_index`] chunks each document and embeds the chunk texts in one
//! batch through the external embedding service. The resulting
//! [`VectorIndex`] is immutable; a later upload batch builds a fresh index
//! that replaces the previous one wholesale (no incremental merge).

use tracing::info;

use crate::chunker::split_chunks;
use crate::config::Config;
use crate::embedding::{cosine_similarity, Embedder};
use crate::error::EngineError;
use crate::models::{Chunk, Document, ScoredChunk};

/// Immutable semantic index over one upload batch.
///
/// Owns the chunks and their embedding vectors. Immutable after
/// construction; concurrent retrieval needs no locking.
#[derive(Debug)]
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Brute-force cosine scan: every chunk scored against `query_vec`,
    /// ordered by descending score. `Vec::sort_by` is stable, so equal
    /// scores keep chunk insertion order.
    pub(crate) fn scan(&self, query_vec: &[f32], top_k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .zip(self.vectors.iter())
            .map(|(chunk, vector)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query_vec, vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }
}

/// Build a semantic index over a non-empty document batch.
///
/// Fails with [`EngineError::Indexing`] if the document set is empty or the
/// embedding service reports an error; the failure is surfaced, not retried.
pub async fn build_index(
    documents: &[Document],
    config: &Config,
    embedder: &dyn Embedder,
) -> Result<VectorIndex, EngineError> {
    if documents.is_empty() {
        return Err(EngineError::Indexing("document set is empty".to_string()));
    }

    let mut chunks = Vec::new();
    for doc in documents {
        let source = doc.filename().unwrap_or("untitled");
        chunks.extend(split_chunks(
            source,
            &doc.text,
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        ));
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder
        .embed(&texts)
        .await
        .map_err(|e| EngineError::Indexing(e.to_string()))?;

    if vectors.len() != chunks.len() {
        return Err(EngineError::Indexing(format!(
            "embedding service returned {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }

    info!(
        documents = documents.len(),
        chunks = chunks.len(),
        "index built"
    );
    Ok(VectorIndex { chunks, vectors })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;

    use super::*;

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        fn model_name(&self) -> &str {
            "unit"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("rate limited")
        }
    }

    #[tokio::test]
    async fn builds_at_least_one_chunk_per_document() {
        let docs = vec![Document::from_file("The sky is blue.", "sky.txt")];
        let index = build_index(&docs, &Config::default(), &UnitEmbedder)
            .await
            .unwrap();
        assert!(index.len() >= 1);
        assert_eq!(index.chunks()[0].source, "sky.txt");
    }

    #[tokio::test]
    async fn empty_document_set_is_an_indexing_error() {
        let err = build_index(&[], &Config::default(), &UnitEmbedder)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Indexing(_)));
    }

    #[tokio::test]
    async fn embedding_failure_is_surfaced_as_indexing_error() {
        let docs = vec![Document::from_file("some text", "a.txt")];
        let err = build_index(&docs, &Config::default(), &FailingEmbedder)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Indexing(_)));
    }

    #[tokio::test]
    async fn chunks_never_span_documents() {
        let docs = vec![
            Document::from_file("First document body.", "a.txt"),
            Document::from_file("Second document body.", "b.txt"),
        ];
        let index = build_index(&docs, &Config::default(), &UnitEmbedder)
            .await
            .unwrap();
        for chunk in index.chunks() {
            assert!(chunk.source == "a.txt" || chunk.source == "b.txt");
            if chunk.source == "a.txt" {
                assert!(!chunk.text.contains("Second"));
            } else {
                assert!(!chunk.text.contains("First"));
            }
        }
    }
}
