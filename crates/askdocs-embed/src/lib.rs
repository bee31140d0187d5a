//! Concrete embedding and generation backends.
//!
//! `OllamaClient` talks to a running Ollama server for both roles.
//! `APP_USE_FAKE_EMBEDDINGS=1` swaps embeddings for the deterministic
//! [`HashEmbedder`], which needs no server at all.

use std::sync::Arc;

use askdocs_core::traits::Embedder;
use tracing::info;

mod hash;
mod ollama;

pub use hash::{HashEmbedder, DEFAULT_HASH_DIM};
pub use ollama::OllamaClient;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Pick the embedder for this process: the Ollama client unless fake
/// embeddings were requested through the environment.
pub fn get_default_embedder(ollama: Arc<OllamaClient>) -> Arc<dyn Embedder> {
    if use_fake_embeddings() {
        info!("using hash embedder (APP_USE_FAKE_EMBEDDINGS)");
        return Arc::new(HashEmbedder::default());
    }
    ollama
}
