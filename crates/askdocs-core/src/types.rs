//! Domain types shared by the loader, the index and the answer pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One embedding, positionally aligned with the chunk it was computed for.
pub type EmbeddingVector = Vec<f32>;

/// A chunk of a source document that is independently indexed.
///
/// - `content`: trimmed text payload, never empty
/// - `source`: `<path>#chunk-<n>` where `n` is 1-based within the document
///
/// Chunks are created once while indexing and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    content: String,
    source: String,
}

impl DocumentChunk {
    /// Returns `None` when `content` is blank.
    pub fn new(content: &str, source: impl Into<String>) -> Option<Self> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        Some(Self { content: content.to_string(), source: source.into() })
    }

    pub fn content(&self) -> &str { &self.content }

    pub fn source(&self) -> &str { &self.source }
}

/// Build the stable source label for the `ordinal`-th chunk of `path`.
///
/// Paths under the current working directory are shown relative to it, and
/// separators are always `/` so labels match across platforms.
pub fn format_source(path: &Path, ordinal: usize) -> String {
    let cwd = std::env::current_dir().ok();
    let shown = cwd
        .as_deref()
        .and_then(|cwd| path.strip_prefix(cwd).ok())
        .unwrap_or(path);
    let shown = shown.strip_prefix(".").unwrap_or(shown);
    let joined = shown.to_string_lossy().replace('\\', "/");
    format!("{joined}#chunk-{ordinal}")
}

/// A retrieved chunk together with its similarity to the query.
///
/// `score` is cosine similarity; higher is always better.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub score: f32,
    pub chunk: DocumentChunk,
}
