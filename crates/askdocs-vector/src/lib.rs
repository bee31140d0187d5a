//! In-memory semantic index: build once, rank many times.

pub mod handle;
pub mod index_build;
pub mod search;
pub mod similarity;

pub use handle::IndexHandle;
pub use index_build::{Index, IndexBuilder, IndexStats};
pub use search::{Retrieval, Retriever};
pub use similarity::cosine_similarity;
