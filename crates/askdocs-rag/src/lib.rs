//! Answer composition on top of the semantic index.
//!
//! [`RagService`] runs the linear answer pipeline: question check, index
//! (built once, shared), retrieval, prompt assembly, generation. Soft
//! outcomes come back as a [`RagAnswer`] carrying guidance text and no
//! sources; failures of the external runtime come back as `Err`.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use askdocs_core::config::RagSettings;
use askdocs_core::error::{Error, Result};
use askdocs_core::traits::Generator;
use askdocs_core::types::ScoredChunk;
use askdocs_vector::{IndexHandle, IndexStats, Retrieval, Retriever};

pub mod prompt;

pub use prompt::{build_context, build_prompt, RAG_SYSTEM_PROMPT};

pub const EMPTY_QUERY_MESSAGE: &str = "Please provide a question for the assistant to look up.";
pub const NO_QUERY_EMBEDDING_MESSAGE: &str = "I could not embed the question with the configured embedding model.";
pub const NO_MATCH_MESSAGE: &str = "I could not find relevant information in the knowledge base for that question.";
pub const NO_ANSWER_MESSAGE: &str = "I could not compose an answer from the retrieved context.";

pub fn empty_index_message(documents_dir: &str) -> String {
    format!("The knowledge base is empty. Add markdown or text files to the '{documents_dir}' directory and retry.")
}

/// Which pipeline state produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    EmptyQuery,
    EmptyIndex,
    NoQueryEmbedding,
    NoMatch,
    /// The model produced nothing; the answer is the fallback message.
    NoAnswer,
    Answered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcePreview {
    pub source: String,
    pub preview: String,
}

/// Caller-facing result: `{ answer, sources: [{ source, preview }] }`.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<SourcePreview>,
    #[serde(skip)]
    pub outcome: AnswerOutcome,
}

impl RagAnswer {
    fn soft(outcome: AnswerOutcome, answer: impl Into<String>) -> Self {
        Self { answer: answer.into(), sources: Vec::new(), outcome }
    }
}

pub struct RagService {
    index: Arc<IndexHandle>,
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    preview_chars: usize,
}

impl RagService {
    pub fn new(settings: &RagSettings, index: Arc<IndexHandle>, generator: Arc<dyn Generator>) -> Self {
        Self { index, retriever: Retriever::new(settings), generator, preview_chars: settings.preview_chars }
    }

    pub fn index(&self) -> &Arc<IndexHandle> { &self.index }

    /// Rebuild the shared index from disk and swap it in.
    pub fn rebuild_index(&self) -> Result<IndexStats> {
        Ok(self.index.rebuild()?.stats())
    }

    pub fn answer(&self, query: &str) -> Result<RagAnswer> {
        let question = query.trim();
        if question.is_empty() {
            return Ok(RagAnswer::soft(AnswerOutcome::EmptyQuery, EMPTY_QUERY_MESSAGE));
        }

        let index = self.index.get_or_build()?;
        let started = Instant::now();
        let ranked = match self.retriever.retrieve(&index, self.index.embedder().as_ref(), question)? {
            Retrieval::EmptyQuery => return Ok(RagAnswer::soft(AnswerOutcome::EmptyQuery, EMPTY_QUERY_MESSAGE)),
            Retrieval::EmptyIndex => {
                let dir = index.documents_dir().display().to_string();
                return Ok(RagAnswer::soft(AnswerOutcome::EmptyIndex, empty_index_message(&dir)));
            }
            Retrieval::NoQueryEmbedding => {
                return Ok(RagAnswer::soft(AnswerOutcome::NoQueryEmbedding, NO_QUERY_EMBEDDING_MESSAGE))
            }
            Retrieval::NoMatch => return Ok(RagAnswer::soft(AnswerOutcome::NoMatch, NO_MATCH_MESSAGE)),
            Retrieval::Matches(ranked) => ranked,
        };
        debug!(hits = ranked.len(), top_score = ranked[0].score, "retrieved context");

        let prompt = build_prompt(question, &build_context(&ranked));
        let generated = self.generator.generate(&prompt)?;
        let sources = self.previews(&ranked);

        let (answer, outcome) = if generated.trim().is_empty() {
            (NO_ANSWER_MESSAGE.to_string(), AnswerOutcome::NoAnswer)
        } else {
            (generated, AnswerOutcome::Answered)
        };
        info!(
            sources = sources.len(),
            outcome = ?outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answer composed"
        );
        Ok(RagAnswer { answer, sources, outcome })
    }

    /// Run [`RagService::answer`] on the blocking pool so an async host's
    /// reactor threads never wait on embedding or generation calls.
    pub async fn answer_async(self: Arc<Self>, query: String) -> Result<RagAnswer> {
        tokio::task::spawn_blocking(move || self.answer(&query))
            .await
            .map_err(|e| Error::Operation(format!("answer task failed: {e}")))?
    }

    fn previews(&self, ranked: &[ScoredChunk]) -> Vec<SourcePreview> {
        ranked
            .iter()
            .map(|hit| SourcePreview {
                source: hit.chunk.source().to_string(),
                preview: prompt::preview(hit.chunk.content(), self.preview_chars),
            })
            .collect()
    }
}
