//! Blocking HTTP client for an Ollama runtime.
//!
//! Every call is bounded by `ollama.timeout_secs`. The client blocks the
//! calling thread, so async hosts must reach it through a blocking pool
//! (`tokio::task::spawn_blocking`), never from a reactor thread.

use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use askdocs_core::config::Settings;
use askdocs_core::error::{Error, Result};
use askdocs_core::traits::{Embedder, Generator};
use askdocs_core::types::EmbeddingVector;

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

const DEFAULT_PORT: u16 = 11434;

/// Turn an `OLLAMA_HOST`-style value into a base URL.
///
/// The server accepts scheme-less forms such as `0.0.0.0` or `gpu-box:8080`;
/// those get `http://` and, when no port is given, the default port.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        return host.to_string();
    }
    let authority = host.split('/').next().unwrap_or(host);
    let has_port = authority.rsplit(']').next().is_some_and(|tail| tail.contains(':'));
    if has_port {
        format!("http://{host}")
    } else {
        let (authority, path) = host.split_at(authority.len());
        format!("http://{authority}:{DEFAULT_PORT}{path}")
    }
}

pub struct OllamaClient {
    base_url: String,
    embedding_model: String,
    generation_model: String,
    temperature: f64,
    timeout: Duration,
    client: Client,
}

impl OllamaClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ollama.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Operation(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: normalize_host(&settings.ollama.host),
            embedding_model: settings.rag.embedding_model.clone(),
            generation_model: settings.ollama.model.clone(),
            temperature: settings.ollama.temperature,
            timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn post<T: DeserializeOwned>(&self, endpoint: &str, body: &Value) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let started = Instant::now();
        let res = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| self.transport_error(endpoint, e))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().unwrap_or_default();
            return Err(Error::Service(format!("Ollama {endpoint} returned {status}: {}", text.trim())));
        }

        let payload = res.json::<T>().map_err(|e| self.transport_error(endpoint, e))?;
        debug!(endpoint, elapsed_ms = started.elapsed().as_millis() as u64, "ollama call finished");
        Ok(payload)
    }

    fn transport_error(&self, endpoint: &str, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(format!("Ollama {endpoint} did not answer within {}s", self.timeout.as_secs()))
        } else if err.is_connect() {
            Error::Unavailable(format!("cannot connect to Ollama at {}: {err}", self.base_url))
        } else if err.is_decode() {
            Error::Service(format!("Ollama {endpoint} returned an unreadable body: {err}"))
        } else {
            Error::Service(format!("Ollama {endpoint} failed: {err}"))
        }
    }
}

impl Embedder for OllamaClient {
    fn model_id(&self) -> &str { &self.embedding_model }

    fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({ "model": self.embedding_model, "prompt": text });
        let response: EmbeddingResponse = self.post("/api/embeddings", &body)?;
        Ok(response.embedding)
    }
}

impl Generator for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Ok(String::new());
        }
        let body = json!({
            "model": self.generation_model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": self.temperature },
        });
        let response: GenerateResponse = self.post("/api/generate", &body)?;
        Ok(response.response)
    }
}
