//! Paragraph-boundary text chunker.
//!
//! Splits a document's text into [`Chunk`]s that respect a configurable
//! `chunk_size` budget, carrying a `chunk_overlap` tail between adjacent
//! chunks. Splitting occurs on paragraph boundaries (`\n\n`) to preserve
//! semantic coherence within each chunk; the caller invokes this once per
//! document, so chunks never span two source documents.
//!
//! Each chunk receives a UUID, the source filename for provenance, and a
//! SHA-256 hash of its text. Chunk text spans are deterministic for
//! identical input and configuration.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// Split text into chunks on paragraph boundaries, respecting `chunk_size`
/// tokens with `chunk_overlap` tokens of tail carry-over. Returns chunks
/// with contiguous indices starting at 0; always at least one chunk.
pub fn split_chunks(
    source: &str,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    let max_chars = chunk_size * CHARS_PER_TOKEN;
    let overlap_chars = chunk_overlap * CHARS_PER_TOKEN;

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current = String::new();
    // Whether `current` holds anything beyond the seeded overlap tail.
    let mut fresh = false;

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        let would_be = if current.is_empty() {
            trimmed.len()
        } else {
            current.len() + 2 + trimmed.len() // +2 for \n\n separator
        };

        if would_be > max_chars && fresh {
            flush(&mut chunks, source, &mut current, overlap_chars);
            fresh = false;
        }

        // A single paragraph over the limit is hard-split at word boundaries.
        if trimmed.len() > max_chars {
            if fresh {
                flush(&mut chunks, source, &mut current, overlap_chars);
            }
            current.clear();

            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let split_at = snap_to_char_boundary(remaining, max_chars);
                let actual = if split_at < remaining.len() {
                    remaining[..split_at]
                        .rfind('\n')
                        .or_else(|| remaining[..split_at].rfind(' '))
                        .map(|pos| pos + 1)
                        .unwrap_or(split_at)
                } else {
                    split_at
                };
                let piece = remaining[..actual].trim();
                if !piece.is_empty() {
                    push_chunk(&mut chunks, source, piece);
                }
                remaining = &remaining[actual..];
            }

            if let Some(last) = chunks.last() {
                current = overlap_tail(&last.text, overlap_chars);
            }
            fresh = false;
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(trimmed);
            fresh = true;
        }
    }

    if fresh && !current.trim().is_empty() {
        push_chunk(&mut chunks, source, current.trim());
    }

    // Guarantee at least one chunk
    if chunks.is_empty() {
        push_chunk(&mut chunks, source, text.trim());
    }

    chunks
}

fn flush(chunks: &mut Vec<Chunk>, source: &str, current: &mut String, overlap_chars: usize) {
    push_chunk(chunks, source, current.trim());
    let tail = overlap_tail(current, overlap_chars);
    current.clear();
    current.push_str(&tail);
}

/// Tail of `text` of roughly `overlap_chars` length, starting at a word
/// boundary. Empty when overlap is disabled.
fn overlap_tail(text: &str, overlap_chars: usize) -> String {
    if overlap_chars == 0 {
        return String::new();
    }
    if text.len() <= overlap_chars {
        return text.to_string();
    }

    let mut start = text.len() - overlap_chars;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    match text[start..].find(char::is_whitespace) {
        Some(pos) => text[start + pos..].trim_start().to_string(),
        None => text[start..].to_string(),
    }
}

fn snap_to_char_boundary(s: &str, idx: usize) -> usize {
    let mut i = idx.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn push_chunk(chunks: &mut Vec<Chunk>, source: &str, text: &str) {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    chunks.push(Chunk {
        id: Uuid::new_v4().to_string(),
        source: source.to_string(),
        chunk_index: chunks.len() as i64,
        text: text.to_string(),
        hash,
    });
}
