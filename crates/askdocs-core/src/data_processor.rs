use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::chunker::{chunk_text, ChunkingConfig};
use crate::error::{Error, Result};
use crate::types::{format_source, DocumentChunk};

/// Extension groups in discovery order: every markdown file comes before
/// every plain-text file.
pub const DOCUMENT_EXTENSIONS: [&str; 2] = ["md", "txt"];

#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_chunking(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    /// Discover documents under `data_dir` recursively.
    ///
    /// Each extension group is sorted so chunk ordinals are stable across
    /// runs. When nothing matches (or the directory is missing) the
    /// `fallback` file is used if it exists; otherwise the list is empty.
    pub fn list_documents(&self, data_dir: &Path, fallback: Option<&Path>) -> Vec<PathBuf> {
        let mut documents = Vec::new();
        if data_dir.is_dir() {
            let files: Vec<PathBuf> = walkdir::WalkDir::new(data_dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .collect();
            for ext in DOCUMENT_EXTENSIONS {
                let mut group: Vec<PathBuf> = files
                    .iter()
                    .filter(|p| p.extension().and_then(|s| s.to_str()) == Some(ext))
                    .cloned()
                    .collect();
                group.sort();
                documents.extend(group);
            }
        } else {
            debug!(dir = %data_dir.display(), "documents directory not found");
        }

        if documents.is_empty() {
            if let Some(fallback) = fallback.filter(|f| f.is_file()) {
                info!(file = %fallback.display(), "no documents found, using fallback file");
                documents.push(fallback.to_path_buf());
            }
        }
        documents
    }

    /// Read a document as UTF-8, re-reading lossily when it is not valid UTF-8.
    pub fn read_document(&self, path: &Path) -> Result<String> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(content),
            Err(_) => {
                let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
                warn!(file = %path.display(), "document is not valid UTF-8, decoding lossily");
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }

    /// Chunk one document's text; ordinals start at 1 for every document.
    pub fn chunk_document(&self, path: &Path, text: &str) -> Vec<DocumentChunk> {
        chunk_text(text, self.chunking_config.max_chars)
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| DocumentChunk::new(chunk, format_source(path, i + 1)))
            .collect()
    }

    /// Read and chunk every path in order. Unreadable files are skipped.
    pub fn process_paths(&self, paths: &[PathBuf]) -> Vec<DocumentChunk> {
        let mut all_chunks = Vec::new();
        for (file_index, file_path) in paths.iter().enumerate() {
            debug!(file = %file_path.display(), "processing file {}/{}", file_index + 1, paths.len());
            let content = match self.read_document(file_path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable document");
                    continue;
                }
            };
            all_chunks.extend(self.chunk_document(file_path, &content));
        }
        info!(documents = paths.len(), chunks = all_chunks.len(), "chunked documents");
        all_chunks
    }
}
