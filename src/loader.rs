//! Document loader: declared-MIME dispatch over uploaded byte streams.
//!
//! Every input file is handled independently; failures are collected as
//! [`FileFailure`] values so one bad file never aborts the batch. PDF bytes
//! are staged to `temp_<filename>` inside a per-file temporary directory so
//! the extraction service can be handed a filesystem path; the directory
//! guard removes the staged file on every exit path, including extraction
//! failure.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{FileError, FileFailure};
use crate::models::Document;

/// Accepted declared MIME types.
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_PDF: &str = "application/pdf";

/// Closed set of formats the loader dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    PlainText,
    Pdf,
    Unsupported,
}

impl FileKind {
    /// Map a declared MIME type onto the closed variant set.
    pub fn from_mime(content_type: &str) -> Self {
        match content_type {
            MIME_TEXT => FileKind::PlainText,
            MIME_PDF => FileKind::Pdf,
            _ => FileKind::Unsupported,
        }
    }
}

/// An uploaded file as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Result of loading a batch: documents that extracted cleanly plus the
/// per-file failures for everything else.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    pub failures: Vec<FileFailure>,
}

/// PDF extraction service: turns a staged file path into text-bearing
/// documents. A PDF may yield more than one document (e.g. per page);
/// returned documents inherit `filename` metadata when the service does
/// not set it.
pub trait PdfExtract: Send + Sync {
    fn extract(&self, path: &Path, filename: &str) -> Result<Vec<Document>, FileError>;
}

/// Default extraction service backed by the `pdf-extract` crate. Yields one
/// document per file; finer-grained splitting is left to the chunker.
pub struct PdfExtractTool;

impl PdfExtract for PdfExtractTool {
    fn extract(&self, path: &Path, filename: &str) -> Result<Vec<Document>, FileError> {
        let text =
            pdf_extract::extract_text(path).map_err(|e| FileError::Extract(e.to_string()))?;
        Ok(vec![Document::from_file(text, filename)])
    }
}

/// Load a batch of uploaded files into normalized documents.
///
/// Post-condition: every returned document has non-empty text and a
/// `filename` metadata entry. Documents whose extracted text is empty are
/// dropped and reported as [`FileError::EmptyDocument`].
pub fn load_files(files: &[UploadedFile], pdf: &dyn PdfExtract) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    for file in files {
        match load_one(file, pdf) {
            Ok(docs) => {
                let mut kept = 0usize;
                for doc in docs {
                    if doc.text.trim().is_empty() {
                        outcome.failures.push(FileFailure {
                            filename: file.name.clone(),
                            error: FileError::EmptyDocument,
                        });
                    } else {
                        outcome.documents.push(doc);
                        kept += 1;
                    }
                }
                debug!(file = %file.name, documents = kept, "loaded");
            }
            Err(error) => {
                warn!(file = %file.name, %error, "skipping file");
                outcome.failures.push(FileFailure {
                    filename: file.name.clone(),
                    error,
                });
            }
        }
    }

    outcome
}

fn load_one(file: &UploadedFile, pdf: &dyn PdfExtract) -> Result<Vec<Document>, FileError> {
    match FileKind::from_mime(&file.content_type) {
        FileKind::PlainText => {
            let text = String::from_utf8(file.bytes.clone())
                .map_err(|e| FileError::Decode(e.utf8_error().to_string()))?;
            Ok(vec![Document::from_file(text, &file.name)])
        }
        FileKind::Pdf => stage_and_extract(file, pdf),
        FileKind::Unsupported => Err(FileError::Unsupported(file.content_type.clone())),
    }
}

/// Write the PDF bytes to `temp_<name>` inside a fresh temporary directory
/// and hand that path to the extraction service. The per-file directory
/// makes identically named uploads collision-free; dropping the guard
/// deletes the staged file on success and on every error path.
fn stage_and_extract(
    file: &UploadedFile,
    pdf: &dyn PdfExtract,
) -> Result<Vec<Document>, FileError> {
    let staging = tempfile::tempdir().map_err(|e| FileError::Extract(e.to_string()))?;
    let staged = staging
        .path()
        .join(format!("temp_{}", basename(&file.name)));
    std::fs::write(&staged, &file.bytes).map_err(|e| FileError::Extract(e.to_string()))?;

    let mut docs = pdf.extract(&staged, &file.name)?;
    for doc in &mut docs {
        doc.metadata
            .entry("filename".to_string())
            .or_insert_with(|| file.name.clone());
    }
    Ok(docs)
}

/// Basename only: path separators in an upload name must not escape the
/// staging directory.
fn basename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.pdf".to_string())
}
