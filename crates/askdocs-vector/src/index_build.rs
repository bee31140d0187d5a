//! One-shot bulk build of the in-memory semantic index.
//!
//! Flow:
//! 1) Discover documents in the configured directory (or the fallback file)
//! 2) Chunk each document, ordinals restarting at 1 per document
//! 3) Embed every chunk in order; chunks without a vector are dropped together
//!    with their would-be vector so both collections stay aligned

use std::path::{Path, PathBuf};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use askdocs_core::chunker::ChunkingConfig;
use askdocs_core::config::RagSettings;
use askdocs_core::data_processor::DataProcessor;
use askdocs_core::error::{Error, Result};
use askdocs_core::traits::Embedder;
use askdocs_core::types::{DocumentChunk, EmbeddingVector};

/// Counters collected while building, kept on the index for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks_seen: usize,
    pub indexed: usize,
    /// Chunks whose embedding came back empty.
    pub skipped_empty: usize,
    /// Chunks whose embed call failed.
    pub failed: usize,
}

/// Chunks and their vectors, positionally aligned. Immutable once built.
#[derive(Debug)]
pub struct Index {
    chunks: Vec<DocumentChunk>,
    vectors: Vec<EmbeddingVector>,
    documents_dir: PathBuf,
    stats: IndexStats,
}

impl Index {
    pub fn new(chunks: Vec<DocumentChunk>, vectors: Vec<EmbeddingVector>, documents_dir: impl Into<PathBuf>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::Operation(format!(
                "index parts are misaligned: {} chunks vs {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        let stats = IndexStats { chunks_seen: chunks.len(), indexed: chunks.len(), ..IndexStats::default() };
        Ok(Self { chunks, vectors, documents_dir: documents_dir.into(), stats })
    }

    pub fn len(&self) -> usize { self.chunks.len() }

    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }

    pub fn chunks(&self) -> &[DocumentChunk] { &self.chunks }

    pub fn vectors(&self) -> &[EmbeddingVector] { &self.vectors }

    /// The directory the index was built from, for user-facing messages.
    pub fn documents_dir(&self) -> &Path { &self.documents_dir }

    pub fn stats(&self) -> IndexStats { self.stats }
}

pub struct IndexBuilder {
    processor: DataProcessor,
    documents_dir: PathBuf,
    fallback_file: Option<PathBuf>,
    show_progress: bool,
}

impl IndexBuilder {
    pub fn new(settings: &RagSettings) -> Self {
        Self {
            processor: DataProcessor::with_chunking(ChunkingConfig { max_chars: settings.chunk_max_chars }),
            documents_dir: settings.documents_dir(),
            fallback_file: Some(settings.fallback_file()),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn without_fallback(mut self) -> Self {
        self.fallback_file = None;
        self
    }

    pub fn documents_dir(&self) -> &Path { &self.documents_dir }

    /// Build a fresh index.
    ///
    /// Chunk-level embedding problems are fail-soft: the chunk is dropped and
    /// logged. Only when no chunk could be embedded at all and at least one
    /// embed call failed is that failure returned, so an unreachable
    /// embedding service is not mistaken for an empty knowledge base.
    pub fn build(&self, embedder: &dyn Embedder) -> Result<Index> {
        let started = Instant::now();
        let paths = self.processor.list_documents(&self.documents_dir, self.fallback_file.as_deref());
        let candidates = self.processor.process_paths(&paths);

        let pb = self.progress_bar(candidates.len());
        let mut chunks = Vec::with_capacity(candidates.len());
        let mut vectors = Vec::with_capacity(candidates.len());
        let mut stats = IndexStats { documents: paths.len(), chunks_seen: candidates.len(), ..IndexStats::default() };
        let mut first_error = None;

        for chunk in candidates {
            match embedder.embed(chunk.content()) {
                Ok(vector) if !vector.is_empty() => {
                    chunks.push(chunk);
                    vectors.push(vector);
                }
                Ok(_) => {
                    stats.skipped_empty += 1;
                    warn!(source = chunk.source(), "no embedding produced, dropping chunk");
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(source = chunk.source(), error = %e, "embedding failed, dropping chunk");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if chunks.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        stats.indexed = chunks.len();
        info!(
            dir = %self.documents_dir.display(),
            model = embedder.model_id(),
            documents = stats.documents,
            chunks = stats.chunks_seen,
            indexed = stats.indexed,
            skipped = stats.skipped_empty,
            failed = stats.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index built"
        );

        let mut index = Index::new(chunks, vectors, self.documents_dir.clone())?;
        index.stats = stats;
        Ok(index)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%)",
        )
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }
}
