use crate::error::Result;
use crate::types::EmbeddingVector;

/// Turns text into a vector for similarity comparison.
///
/// `Ok` with an empty vector means "no embedding available" for this text;
/// `Err` is reserved for the embedding service itself failing.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model behind this embedder.
    fn model_id(&self) -> &str;
    fn embed(&self, text: &str) -> Result<EmbeddingVector>;
}

/// Produces free text from a prompt. `Ok(String::new())` means no answer.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}
