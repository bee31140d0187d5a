//! Settings loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `RAG_*` / `OLLAMA_*` env vars into an explicit [`Settings`] value that is
//! handed to the index builder and retriever at construction time.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const TOP_K_RANGE: std::ops::RangeInclusive<usize> = 1..=10;

/// Retrieval knobs; the `[rag]` section / `RAG_*` variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    #[serde(deserialize_with = "string_or_scalar")]
    pub documents_dir: String,
    /// Used when `documents_dir` is missing or holds no documents.
    #[serde(deserialize_with = "string_or_scalar")]
    pub fallback_file: String,
    #[serde(deserialize_with = "string_or_scalar")]
    pub embedding_model: String,
    pub top_k: usize,
    pub min_score: f32,
    pub chunk_max_chars: usize,
    pub preview_chars: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            documents_dir: "knowledge_base".to_string(),
            fallback_file: "README.md".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            top_k: 3,
            min_score: 0.25,
            chunk_max_chars: 1200,
            preview_chars: 280,
        }
    }
}

impl RagSettings {
    pub fn documents_dir(&self) -> PathBuf { expand_path(&self.documents_dir) }

    pub fn fallback_file(&self) -> PathBuf { expand_path(&self.fallback_file) }
}

/// Model runtime connection; the `[ollama]` section / `OLLAMA_*` variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    #[serde(deserialize_with = "string_or_scalar")]
    pub host: String,
    /// Generation model.
    #[serde(deserialize_with = "string_or_scalar")]
    pub model: String,
    pub temperature: f64,
    /// Upper bound for every single embedding or generation call.
    pub timeout_secs: u64,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            temperature: 0.4,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rag: RagSettings,
    pub ollama: OllamaSettings,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::from_figment(Self::figment(&env_name))
    }

    /// The provider chain used by [`Settings::load`], exposed for callers
    /// that want to merge extra sources on top.
    pub fn figment(env_name: &str) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment
            .merge(Env::prefixed("RAG_").map(|key| format!("rag.{key}").into()))
            .merge(Env::prefixed("OLLAMA_").map(|key| format!("ollama.{key}").into()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let rag = &self.rag;
        if !TOP_K_RANGE.contains(&rag.top_k) {
            return Err(Error::InvalidConfig(format!(
                "rag.top_k must be within {}..={}, got {}",
                TOP_K_RANGE.start(),
                TOP_K_RANGE.end(),
                rag.top_k
            )));
        }
        if !(0.0..=1.0).contains(&rag.min_score) {
            return Err(Error::InvalidConfig(format!(
                "rag.min_score must be within 0.0..=1.0, got {}",
                rag.min_score
            )));
        }
        if rag.chunk_max_chars == 0 {
            return Err(Error::InvalidConfig("rag.chunk_max_chars must be positive".to_string()));
        }
        if rag.documents_dir.trim().is_empty() {
            return Err(Error::InvalidConfig("rag.documents_dir must not be empty".to_string()));
        }
        if rag.embedding_model.trim().is_empty() {
            return Err(Error::InvalidConfig("rag.embedding_model must not be empty".to_string()));
        }
        if self.ollama.timeout_secs == 0 {
            return Err(Error::InvalidConfig("ollama.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

/// Accept a scalar where a string is expected.
///
/// The `Env` provider parses values such as `RAG_DOCUMENTS_DIR=2024` into
/// numbers; text settings take them back verbatim.
fn string_or_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
    })
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
