//! # docchat
//!
//! Document-grounded conversational QA over uploaded files.
//!
//! docchat ingests uploaded `.txt` and `.pdf` files into normalized
//! documents, builds an in-memory semantic index over their chunks, and
//! answers multi-turn questions grounded in the retrieved content.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌───────────────┐
//! │  Loader   │──▶│ Chunk+Embed │──▶│  VectorIndex  │
//! │ txt/pdf  │   │  (indexer)  │   │  (in-memory)  │
//! └──────────┘   └─────────────┘   └──────┬────────┘
//!                                         │
//!                  ┌──────────────────────┤
//!                  ▼                      ▼
//!            ┌───────────┐         ┌───────────┐
//!            │ ChatEngine │◀───────│ Retriever │
//!            │  sessions  │        │  (top-k)  │
//!            └───────────┘         └───────────┘
//! ```
//!
//! Each user turn condenses the dialogue history and new question into a
//! standalone query, retrieves the most relevant chunks, and generates a
//! grounded answer with provenance. Sessions are process-local; a new
//! upload batch replaces the session's index wholesale.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Per-file and engine error taxonomy |
//! | [`models`] | Core data types |
//! | [`loader`] | Document loading by declared MIME type |
//! | [`chunker`] | Paragraph-boundary text chunking |
//! | [`embedding`] | Embedding service clients |
//! | [`index`] | Immutable semantic index construction |
//! | [`retriever`] | Top-k retrieval |
//! | [`llm`] | Language-model service client |
//! | [`engine`] | Conversation manager |
//! | [`session`] | Process-local session store |
//! | [`ingest`] | Upload-batch orchestration |

pub mod chunker;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod models;
pub mod retriever;
pub mod session;
