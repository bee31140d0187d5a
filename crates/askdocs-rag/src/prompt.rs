use askdocs_core::types::ScoredChunk;

pub const RAG_SYSTEM_PROMPT: &str = "You are a helpful assistant that only answers using the provided context. \
If the context is insufficient, reply that you do not know. \
Cite information conversationally and keep answers concise.";

/// `Source: <label>\n<content>` per chunk in ranked order, separated by a blank line.
pub fn build_context(ranked: &[ScoredChunk]) -> String {
    ranked
        .iter()
        .map(|hit| format!("Source: {}\n{}", hit.chunk.source(), hit.chunk.content()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(question: &str, context: &str) -> String {
    format!("{RAG_SYSTEM_PROMPT}\n\nContext:\n{context}\n\nQuestion: {question}\nAnswer:")
}

/// First `max_chars` characters of `content`. A hard cut, never mid code point.
pub fn preview(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}
