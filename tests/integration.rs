//! End-to-end pipeline tests over in-process fake services.
//!
//! The embedding service is a deterministic bag-of-words hasher and the
//! language model echoes its grounded context, so retrieval quality and
//! transcript behavior can be asserted without network access.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result as AnyResult;
use async_trait::async_trait;

use docchat::config::Config;
use docchat::embedding::Embedder;
use docchat::engine::ChatEngine;
use docchat::error::{EngineError, FileError};
use docchat::index::build_index;
use docchat::ingest::process_upload;
use docchat::llm::{ChatMessage, Completion, LanguageModel};
use docchat::loader::{load_files, PdfExtract, UploadedFile, MIME_PDF, MIME_TEXT};
use docchat::models::{Document, Role};
use docchat::session::SessionState;

const DIMS: usize = 64;

fn word_bag(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let bucket = word.bytes().map(|b| b as usize).sum::<usize>() % DIMS;
        v[bucket] += 1.0;
    }
    v
}

/// Deterministic embedding fake; records every embed call.
struct WordBagEmbedder {
    calls: Mutex<Vec<Vec<String>>>,
}

impl WordBagEmbedder {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The most recent single-text call, i.e. the last retrieval query
    /// that was embedded.
    fn last_query(&self) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|texts| texts.len() == 1)
            .map(|texts| texts[0].clone())
    }
}

#[async_trait]
impl Embedder for WordBagEmbedder {
    fn model_name(&self) -> &str {
        "word-bag"
    }

    fn dims(&self) -> usize {
        DIMS
    }

    async fn embed(&self, texts: &[String]) -> AnyResult<Vec<Vec<f32>>> {
        self.calls.lock().unwrap().push(texts.to_vec());
        Ok(texts.iter().map(|t| word_bag(t)).collect())
    }
}

/// Language-model fake. Condensation calls fold the whole conversation
/// into one query string; generation calls echo the grounded system
/// message so tests can see which context was supplied. Optionally fails
/// every call to exercise turn-failure behavior.
struct EchoModel {
    fail: bool,
}

impl EchoModel {
    fn new() -> Self {
        Self { fail: false }
    }

    fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl LanguageModel for EchoModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, EngineError> {
        if self.fail {
            return Err(EngineError::Upstream("quota exceeded".to_string()));
        }
        let system = messages
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let text = if system.contains("standalone question") {
            messages[1..]
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            system
        };
        Ok(Completion { text, usage: None })
    }
}

/// PDF extraction fake returning fixed text for any staged file.
struct StaticPdf(&'static str);

impl PdfExtract for StaticPdf {
    fn extract(&self, _path: &Path, filename: &str) -> Result<Vec<Document>, FileError> {
        Ok(vec![Document::from_file(self.0, filename)])
    }
}

fn txt(name: &str, content: &str) -> UploadedFile {
    UploadedFile {
        name: name.to_string(),
        content_type: MIME_TEXT.to_string(),
        bytes: content.as_bytes().to_vec(),
    }
}

async fn upload(
    files: &[UploadedFile],
    config: &Config,
    embedder: &WordBagEmbedder,
    sessions: &SessionState,
) -> docchat::ingest::UploadSummary {
    process_upload(files, config, &StaticPdf(""), embedder, sessions, "s")
        .await
        .unwrap()
}

#[tokio::test]
async fn upload_txt_then_ask_returns_grounded_answer() {
    let config = Config::default();
    let embedder = Arc::new(WordBagEmbedder::new());
    let sessions = SessionState::new();

    let summary = upload(
        &[txt("sky.txt", "The sky is blue.")],
        &config,
        &embedder,
        &sessions,
    )
    .await;
    assert_eq!(summary.documents, 1);
    assert!(summary.chunks >= 1);
    assert!(summary.indexed);
    assert!(summary.failures.is_empty());

    let engine = ChatEngine::new(config, embedder.clone(), Arc::new(EchoModel::new()));
    let session = sessions.get_or_create("s");
    let mut session = session.lock().await;
    let reply = engine
        .chat(&mut session, "What color is the sky?")
        .await
        .unwrap();

    assert!(reply.answer.contains("blue"));
    assert!(reply.sources.iter().any(|s| s.source == "sky.txt"));
    assert_eq!(session.transcript.len(), 2);
}

#[tokio::test]
async fn unsupported_file_is_reported_and_batch_completes() {
    let config = Config::default();
    let embedder = Arc::new(WordBagEmbedder::new());
    let sessions = SessionState::new();

    let png = UploadedFile {
        name: "image.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
    };
    let summary = upload(
        &[png, txt("ok.txt", "readable text")],
        &config,
        &embedder,
        &sessions,
    )
    .await;

    assert_eq!(summary.documents, 1);
    assert!(summary.indexed);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].filename, "image.png");
    assert!(matches!(
        summary.failures[0].error,
        FileError::Unsupported(_)
    ));
}

#[tokio::test]
async fn question_before_any_upload_is_rejected() {
    let config = Config::default();
    let embedder = Arc::new(WordBagEmbedder::new());
    let sessions = SessionState::new();

    let engine = ChatEngine::new(config, embedder, Arc::new(EchoModel::new()));
    let session = sessions.get_or_create("s");
    let mut session = session.lock().await;

    let err = engine
        .chat(&mut session, "What color is the sky?")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotReady));
    assert!(session.transcript.is_empty());
}

#[tokio::test]
async fn second_turn_condenses_with_prior_context() {
    let config = Config::default();
    let embedder = Arc::new(WordBagEmbedder::new());
    let sessions = SessionState::new();

    upload(
        &[txt("notes.txt", "A page of notes about colors.")],
        &config,
        &embedder,
        &sessions,
    )
    .await;

    let engine = ChatEngine::new(config, embedder.clone(), Arc::new(EchoModel::new()));
    let session = sessions.get_or_create("s");
    let mut session = session.lock().await;

    engine
        .chat(&mut session, "My favorite color is green.")
        .await
        .unwrap();
    engine
        .chat(&mut session, "What is my favorite color?")
        .await
        .unwrap();

    assert_eq!(session.transcript.len(), 4);
    assert_eq!(session.transcript[0].role, Role::User);
    assert_eq!(session.transcript[1].role, Role::Assistant);
    assert_eq!(session.transcript[2].role, Role::User);
    assert_eq!(session.transcript[3].role, Role::Assistant);

    // The condensed query for turn 2 resolved the reference via the
    // transcript: the last embedded retrieval query mentions "green".
    let query = embedder.last_query().unwrap();
    assert!(query.contains("green"), "condensed query was: {}", query);
}

#[tokio::test]
async fn second_batch_replaces_the_first_index_wholesale() {
    let config = Config::default();
    let embedder = Arc::new(WordBagEmbedder::new());
    let sessions = SessionState::new();

    upload(
        &[txt("first.txt", "alpha facts about rust")],
        &config,
        &embedder,
        &sessions,
    )
    .await;
    upload(
        &[txt("second.txt", "beta facts about python")],
        &config,
        &embedder,
        &sessions,
    )
    .await;

    let engine = ChatEngine::new(config, embedder.clone(), Arc::new(EchoModel::new()));
    let session = sessions.get_or_create("s");
    let mut session = session.lock().await;

    // Even a query aimed at batch 1 can only surface batch-2 chunks.
    let reply = engine
        .chat(&mut session, "alpha facts about rust")
        .await
        .unwrap();
    assert!(!reply.sources.is_empty());
    for source in &reply.sources {
        assert_eq!(source.source, "second.txt");
    }
}

#[tokio::test]
async fn batch_with_no_documents_keeps_previous_index() {
    let config = Config::default();
    let embedder = Arc::new(WordBagEmbedder::new());
    let sessions = SessionState::new();

    upload(
        &[txt("keep.txt", "the original indexed content")],
        &config,
        &embedder,
        &sessions,
    )
    .await;

    let png = UploadedFile {
        name: "only.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0x89],
    };
    let summary = upload(&[png], &config, &embedder, &sessions).await;
    assert!(!summary.indexed);
    assert_eq!(summary.failures.len(), 1);

    // The session still answers from the batch-1 index.
    let engine = ChatEngine::new(config, embedder.clone(), Arc::new(EchoModel::new()));
    let session = sessions.get_or_create("s");
    let mut session = session.lock().await;
    let reply = engine
        .chat(&mut session, "original content?")
        .await
        .unwrap();
    assert!(reply.sources.iter().any(|s| s.source == "keep.txt"));
}

#[tokio::test]
async fn reset_clears_transcript_and_keeps_index() {
    let config = Config::default();
    let embedder = Arc::new(WordBagEmbedder::new());
    let sessions = SessionState::new();

    upload(&[txt("doc.txt", "some content")], &config, &embedder, &sessions).await;

    let engine = ChatEngine::new(config, embedder.clone(), Arc::new(EchoModel::new()));
    {
        let session = sessions.get_or_create("s");
        let mut session = session.lock().await;
        engine.chat(&mut session, "a question").await.unwrap();
        assert_eq!(session.transcript.len(), 2);
    }

    sessions.reset("s").await;

    let session = sessions.get_or_create("s");
    let mut session = session.lock().await;
    assert!(session.transcript.is_empty());
    assert!(session.is_ready());

    // The retained index still answers turns after the reset.
    let reply = engine.chat(&mut session, "still there?").await.unwrap();
    assert!(!reply.sources.is_empty());
}

#[tokio::test]
async fn failed_generation_leaves_the_transcript_unchanged() {
    let config = Config::default();
    let embedder = Arc::new(WordBagEmbedder::new());
    let sessions = SessionState::new();

    upload(&[txt("doc.txt", "some content")], &config, &embedder, &sessions).await;

    let engine = ChatEngine::new(config, embedder, Arc::new(EchoModel::failing()));
    let session = sessions.get_or_create("s");
    let mut session = session.lock().await;

    let err = engine.chat(&mut session, "a question").await.unwrap_err();
    assert!(matches!(err, EngineError::Upstream(_)));
    assert!(session.transcript.is_empty());
}

#[tokio::test]
async fn pdf_files_flow_through_the_extraction_service() {
    let config = Config::default();
    let embedder = Arc::new(WordBagEmbedder::new());
    let sessions = SessionState::new();

    let pdf_file = UploadedFile {
        name: "report.pdf".to_string(),
        content_type: MIME_PDF.to_string(),
        bytes: b"%PDF-fake".to_vec(),
    };
    let summary = process_upload(
        &[pdf_file],
        &config,
        &StaticPdf("Quarterly revenue grew by ten percent."),
        embedder.as_ref(),
        &sessions,
        "s",
    )
    .await
    .unwrap();

    assert_eq!(summary.documents, 1);
    assert!(summary.indexed);

    let engine = ChatEngine::new(config, embedder.clone(), Arc::new(EchoModel::new()));
    let session = sessions.get_or_create("s");
    let mut session = session.lock().await;
    let reply = engine
        .chat(&mut session, "How much did revenue grow?")
        .await
        .unwrap();
    assert!(reply.sources.iter().any(|s| s.source == "report.pdf"));
}

#[tokio::test]
async fn index_builds_are_idempotent_for_identical_input() {
    let config = Config::default();
    let embedder = WordBagEmbedder::new();

    let files = [
        txt("a.txt", "First paragraph.\n\nSecond paragraph."),
        txt("b.txt", "Another document entirely."),
    ];
    let outcome = load_files(&files, &StaticPdf(""));
    assert_eq!(outcome.documents.len(), 2);

    let first = build_index(&outcome.documents, &config, &embedder)
        .await
        .unwrap();
    let second = build_index(&outcome.documents, &config, &embedder)
        .await
        .unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.chunks().iter().zip(second.chunks().iter()) {
        assert_eq!(a.text, b.text);
        assert_eq!(a.source, b.source);
        assert_eq!(a.chunk_index, b.chunk_index);
    }
}
