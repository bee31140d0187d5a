//! Paragraph-aligned greedy chunking by character count.
//!
//! Paragraphs (separated by a blank line) are packed into chunks until adding
//! the next one would bring the running size to `max_chars` or beyond. The
//! running size counts paragraph characters only, not the separators. A single
//! paragraph longer than `max_chars` is kept whole as its own chunk.

pub const DEFAULT_MAX_CHARS: usize = 1200;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_chars: DEFAULT_MAX_CHARS }
    }
}

/// Split `text` into chunks. A text without any non-blank paragraph comes
/// back unchanged as the only element; callers trim and drop blank chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut size = 0usize;

    for paragraph in text.split(PARAGRAPH_SEPARATOR).map(str::trim).filter(|p| !p.is_empty()) {
        let paragraph_size = paragraph.chars().count();
        if size + paragraph_size >= max_chars && !current.is_empty() {
            chunks.push(current.join(PARAGRAPH_SEPARATOR));
            current.clear();
            size = 0;
        }
        current.push(paragraph);
        size += paragraph_size;
    }
    if !current.is_empty() {
        chunks.push(current.join(PARAGRAPH_SEPARATOR));
    }

    if chunks.is_empty() {
        chunks.push(text.to_string());
    }
    chunks
}
