use std::cmp::Ordering;

use tracing::debug;

use askdocs_core::config::RagSettings;
use askdocs_core::error::Result;
use askdocs_core::traits::Embedder;
use askdocs_core::types::ScoredChunk;

use crate::index_build::Index;
use crate::similarity::cosine_similarity;

/// Outcome of a retrieval. Every variant except `Matches` is a soft,
/// user-facing short circuit; hard failures travel as `Err` instead.
#[derive(Debug)]
pub enum Retrieval {
    EmptyQuery,
    EmptyIndex,
    /// The embedder produced no vector for the question.
    NoQueryEmbedding,
    NoMatch,
    /// Ranked best first, never empty, at most `top_k` long.
    Matches(Vec<ScoredChunk>),
}

#[derive(Debug, Clone, Copy)]
pub struct Retriever {
    top_k: usize,
    min_score: f32,
}

impl Retriever {
    pub fn new(settings: &RagSettings) -> Self {
        Self::with_limits(settings.top_k, settings.min_score)
    }

    pub fn with_limits(top_k: usize, min_score: f32) -> Self {
        Self { top_k, min_score }
    }

    pub fn top_k(&self) -> usize { self.top_k }

    pub fn min_score(&self) -> f32 { self.min_score }

    /// Embed `query` and rank the index against it.
    ///
    /// Blank queries and empty indexes return before any embedding call.
    pub fn retrieve(&self, index: &Index, embedder: &dyn Embedder, query: &str) -> Result<Retrieval> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Retrieval::EmptyQuery);
        }
        if index.is_empty() {
            return Ok(Retrieval::EmptyIndex);
        }
        let query_vec = embedder.embed(query)?;
        if query_vec.is_empty() {
            return Ok(Retrieval::NoQueryEmbedding);
        }
        let ranked = self.rank(index, &query_vec);
        debug!(candidates = index.len(), kept = ranked.len(), "ranked chunks");
        if ranked.is_empty() {
            return Ok(Retrieval::NoMatch);
        }
        Ok(Retrieval::Matches(ranked))
    }

    /// Score every chunk, keep those at or above `min_score`, best first.
    ///
    /// Ties keep indexing order.
    pub fn rank(&self, index: &Index, query_vec: &[f32]) -> Vec<ScoredChunk> {
        let mut scored: Vec<(usize, f32)> = index
            .vectors()
            .iter()
            .enumerate()
            .map(|(i, vector)| (i, cosine_similarity(query_vec, vector)))
            .filter(|&(_, score)| score >= self.min_score)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(self.top_k);
        scored
            .into_iter()
            .map(|(i, score)| ScoredChunk { score, chunk: index.chunks()[i].clone() })
            .collect()
    }
}
