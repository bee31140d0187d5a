//! Shared ownership of the current index.
//!
//! Readers get an `Arc<Index>` and never block each other. Builds are
//! serialized by a dedicated mutex, so concurrent first callers trigger a
//! single build and everyone else waits for its result. A rebuild publishes a
//! new index by swapping the `Arc`; readers holding the old one are unaffected.

use std::sync::{Arc, Mutex, RwLock};

use tracing::info;

use askdocs_core::error::{Error, Result};
use askdocs_core::traits::Embedder;

use crate::index_build::{Index, IndexBuilder};

pub struct IndexHandle {
    builder: IndexBuilder,
    embedder: Arc<dyn Embedder>,
    current: RwLock<Option<Arc<Index>>>,
    build_lock: Mutex<()>,
}

impl IndexHandle {
    /// A handle that builds lazily on first use.
    pub fn new(builder: IndexBuilder, embedder: Arc<dyn Embedder>) -> Self {
        Self { builder, embedder, current: RwLock::new(None), build_lock: Mutex::new(()) }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    /// The published index, if any, without building.
    pub fn current(&self) -> Result<Option<Arc<Index>>> {
        let slot = self.current.read().map_err(|_| poisoned("index slot"))?;
        Ok(slot.clone())
    }

    pub fn get_or_build(&self) -> Result<Arc<Index>> {
        if let Some(index) = self.current()? {
            return Ok(index);
        }
        let _build = self.build_lock.lock().map_err(|_| poisoned("build lock"))?;
        // Another caller may have finished a build while we waited.
        if let Some(index) = self.current()? {
            return Ok(index);
        }
        info!(dir = %self.builder.documents_dir().display(), "building index on first use");
        self.build_and_publish()
    }

    /// Build a new index and swap it in. On failure the previous index stays.
    pub fn rebuild(&self) -> Result<Arc<Index>> {
        let _build = self.build_lock.lock().map_err(|_| poisoned("build lock"))?;
        info!(dir = %self.builder.documents_dir().display(), "rebuilding index");
        self.build_and_publish()
    }

    fn build_and_publish(&self) -> Result<Arc<Index>> {
        let index = Arc::new(self.builder.build(&*self.embedder)?);
        let mut slot = self.current.write().map_err(|_| poisoned("index slot"))?;
        *slot = Some(Arc::clone(&index));
        Ok(index)
    }
}

fn poisoned(what: &str) -> Error {
    Error::Operation(format!("{what} poisoned by a panicked thread"))
}
