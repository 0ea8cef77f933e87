//! # docchat CLI
//!
//! The `docchat` binary answers questions about uploaded documents. It
//! ingests the named `.txt`/`.pdf` files into an in-memory semantic index,
//! then answers one question (`ask`) or runs an interactive chat loop
//! (`chat`) grounded in the indexed content.
//!
//! ## Usage
//!
//! ```bash
//! docchat --config ./config/docchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat ask "<question>" --file a.txt --file b.pdf` | Ingest files and answer one question |
//! | `docchat chat --file a.txt` | Ingest files, then chat on stdin |
//!
//! In chat mode, `/reset` clears the transcript (the index is retained) and
//! `/quit` exits. Requires `OPENAI_API_KEY` in the environment unless the
//! configuration points both services elsewhere.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use docchat::config::{load_config, Config};
use docchat::embedding::{create_embedder, Embedder};
use docchat::engine::{ChatEngine, ChatReply};
use docchat::ingest::{process_upload, UploadSummary};
use docchat::llm::{LanguageModel, OpenAiChat};
use docchat::loader::{PdfExtractTool, UploadedFile, MIME_PDF, MIME_TEXT};
use docchat::session::SessionState;

/// docchat — document-grounded conversational QA.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; built-in defaults apply when the flag is omitted. See
/// `config/docchat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "Ask questions about your documents, grounded in their content",
    version,
    long_about = "docchat ingests uploaded text and PDF files into an in-memory semantic \
    index and answers multi-turn questions grounded in the retrieved content, with source \
    provenance for every answer."
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Ingest documents and answer a single question.
    Ask {
        /// The question to answer.
        question: String,

        /// Document to ingest (.txt or .pdf). Repeatable.
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
    },

    /// Ingest documents, then chat interactively on stdin.
    ///
    /// `/reset` clears the transcript; `/quit` exits.
    Chat {
        /// Document to ingest (.txt or .pdf). Repeatable.
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
    },
}

const SESSION_ID: &str = "cli";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Ask { question, files } => run_ask(&config, &question, &files).await,
        Commands::Chat { files } => run_chat(&config, &files).await,
    }
}

struct App {
    sessions: SessionState,
    engine: ChatEngine,
    embedder: Arc<dyn Embedder>,
}

impl App {
    fn new(config: &Config) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(&config.embedding)?);
        let model: Arc<dyn LanguageModel> = Arc::new(OpenAiChat::new(&config.chat)?);
        let engine = ChatEngine::new(config.clone(), Arc::clone(&embedder), model);
        Ok(Self {
            sessions: SessionState::new(),
            engine,
            embedder,
        })
    }

    async fn upload(&self, config: &Config, files: &[PathBuf]) -> Result<UploadSummary> {
        let uploads = read_uploads(files)?;
        eprintln!("processing documents...");
        let summary = process_upload(
            &uploads,
            config,
            &PdfExtractTool,
            self.embedder.as_ref(),
            &self.sessions,
            SESSION_ID,
        )
        .await?;
        print_summary(&summary);
        Ok(summary)
    }
}

async fn run_ask(config: &Config, question: &str, files: &[PathBuf]) -> Result<()> {
    let app = App::new(config)?;
    let summary = app.upload(config, files).await?;
    if !summary.indexed {
        bail!("no readable documents in the upload");
    }

    let session = app.sessions.get_or_create(SESSION_ID);
    let mut session = session.lock().await;
    let reply = app.engine.chat(&mut session, question).await?;
    print_reply(&reply);
    Ok(())
}

async fn run_chat(config: &Config, files: &[PathBuf]) -> Result<()> {
    let app = App::new(config)?;
    let summary = app.upload(config, files).await?;
    if !summary.indexed {
        bail!("no readable documents in the upload");
    }

    println!("Ask a question about your documents. /reset clears the chat, /quit exits.");
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                app.sessions.reset(SESSION_ID).await;
                println!("transcript cleared");
            }
            question => {
                let session = app.sessions.get_or_create(SESSION_ID);
                let mut session = session.lock().await;
                eprintln!("thinking...");
                match app.engine.chat(&mut session, question).await {
                    Ok(reply) => print_reply(&reply),
                    Err(e) => eprintln!("error: {}", e),
                }
            }
        }
    }
    Ok(())
}

/// Read each file from disk, declaring its MIME type from the extension.
/// Unknown extensions pass through and are reported by the loader.
fn read_uploads(files: &[PathBuf]) -> Result<Vec<UploadedFile>> {
    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        uploads.push(UploadedFile {
            content_type: declared_mime(path),
            name,
            bytes,
        });
    }
    Ok(uploads)
}

fn declared_mime(path: &Path) -> String {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("txt") => MIME_TEXT.to_string(),
        Some("pdf") => MIME_PDF.to_string(),
        Some(other) => format!("application/{}", other),
        None => "application/octet-stream".to_string(),
    }
}

fn print_summary(summary: &UploadSummary) {
    println!("upload");
    println!("  documents: {}", summary.documents);
    println!("  chunks: {}", summary.chunks);
    for failure in &summary.failures {
        println!("  error: {}: {}", failure.filename, failure.error);
    }
}

fn print_reply(reply: &ChatReply) {
    println!("{}", reply.answer);
    if !reply.sources.is_empty() {
        println!();
        println!("sources:");
        for source in &reply.sources {
            println!("  {} (score {:.3})", source.source, source.score);
        }
    }
}
