//! Free-text document loading and chunking.
//!
//! Reads `.txt` and `.md` files from a directory and splits them into
//! paragraph-bounded chunks of at most `chunk_size` characters.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use mmkg_core::document::Document;

const EXTENSIONS: &[&str] = &["txt", "md"];

/// Load and chunk every text document in `dir`.
///
/// A missing directory or one with no matching files yields no documents.
pub fn load_documents(dir: &Path, chunk_size: usize) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Document directory not found");
        return Ok(Vec::new());
    }

    let mut files: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map_or(false, |e| EXTENSIONS.contains(&e.to_lowercase().as_str()))
        })
        .collect();
    files.sort();

    let mut documents = Vec::new();
    for path in &files {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping unreadable document");
                continue;
            }
        };

        let chunks = chunk_text(&text, chunk_size);
        debug!(file = %source, chunks = chunks.len(), "Chunked document");
        for (i, content) in chunks.into_iter().enumerate() {
            documents.push(Document {
                id: format!("{}#{}", source, i),
                content,
                metadata: BTreeMap::from([
                    ("source".to_string(), source.clone().into()),
                    ("type".to_string(), "document_chunk".into()),
                    ("chunk".to_string(), i.into()),
                ]),
            });
        }
    }

    info!(files = files.len(), chunks = documents.len(), "Loaded text documents");
    Ok(documents)
}

/// Split text on blank lines and pack paragraphs into chunks.
///
/// Paragraphs longer than `chunk_size` are split at word boundaries.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs(text) {
        for piece in split_long(&paragraph, chunk_size) {
            let extra = if current.is_empty() { 0 } else { 2 };
            if !current.is_empty() && current.chars().count() + extra + piece.chars().count() > chunk_size {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&piece);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !lines.is_empty() {
                out.push(lines.join("\n"));
                lines.clear();
            }
        } else {
            lines.push(line.trim_end());
        }
    }
    if !lines.is_empty() {
        out.push(lines.join("\n"));
    }
    out
}

fn split_long(paragraph: &str, chunk_size: usize) -> Vec<String> {
    if paragraph.chars().count() <= chunk_size {
        return vec![paragraph.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in paragraph.split_whitespace() {
        let len = current.chars().count();
        if len > 0 && len + 1 + word.chars().count() > chunk_size {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
