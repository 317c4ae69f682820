//! Semantic search engine over project documents.
//!
//! The engine pins one embedding model for its whole lifetime and publishes
//! the indexed corpus as an immutable `Arc<Corpus>`:
//! - writers build the replacement corpus with no lock held, then swap it in
//! - readers clone the `Arc` and rank without holding any lock
//!
//! A reader therefore always sees documents and vectors from the same
//! indexing pass.

use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::documents::Document;
use crate::semantic::embeddings::{EmbeddingError, Embedder};
use crate::semantic::index::{Corpus, IndexError};
use crate::semantic::preprocess::document_text;
use crate::semantic::storage::{SnapshotStorage, StorageError};

/// Errors that can occur during engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Model returned {got} vectors for {expected} documents")]
    VectorCountMismatch { expected: usize, got: usize },
}

impl From<IndexError> for EngineError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::DimensionMismatch { expected, got } => {
                EngineError::DimensionMismatch { expected, got }
            }
            IndexError::LengthMismatch { documents, vectors } => EngineError::VectorCountMismatch {
                expected: documents,
                got: vectors,
            },
        }
    }
}

/// A document with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

pub struct SearchEngine {
    model: Arc<dyn Embedder>,
    corpus: RwLock<Arc<Corpus>>,
}

impl SearchEngine {
    /// Create an engine with an empty corpus.
    pub fn new(model: Arc<dyn Embedder>) -> Self {
        let corpus = Arc::new(Corpus::empty(model.dimensions()));
        Self {
            model,
            corpus: RwLock::new(corpus),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The currently published corpus.
    pub fn snapshot(&self) -> Arc<Corpus> {
        match self.corpus.read() {
            Ok(guard) => guard.clone(),
            // a single Arc cannot be left half-written
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the corpus with `documents`.
    ///
    /// All documents are embedded in one batch before anything is published;
    /// on error the previous corpus stays in place.
    pub fn index(&self, documents: Vec<Document>) -> Result<(), EngineError> {
        log::info!("Indexing {} documents", documents.len());

        let texts: Vec<String> = documents.iter().map(document_text).collect();
        let empty = texts.iter().filter(|text| text.is_empty()).count();
        if empty > 0 {
            log::warn!("{} documents have no text to embed and will never rank", empty);
        }

        let vectors = self.model.embed_batch(&texts)?;
        let corpus = Corpus::new(documents, vectors, self.model.dimensions())?;

        log::info!(
            "Created {} embeddings with {} dimensions",
            corpus.vectors().len(),
            corpus.dimensions()
        );

        self.publish(corpus);
        Ok(())
    }

    /// Rank indexed documents against `query`, best first.
    ///
    /// Blank queries and an empty corpus give no results without touching
    /// the model. `top_k` is clamped to the corpus size.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>, EngineError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }

        let corpus = self.snapshot();
        if corpus.is_empty() || top_k == 0 {
            return Ok(vec![]);
        }

        let query_embedding = self.model.embed(query)?;
        let results = corpus.search(&query_embedding, top_k.min(corpus.len()))?;

        log::debug!("query {:?} ranked {} documents", query, results.len());

        Ok(results
            .into_iter()
            .filter_map(|result| {
                corpus.get(result.position).map(|document| ScoredDocument {
                    document: document.clone(),
                    score: result.score,
                })
            })
            .collect())
    }

    /// Persist the current corpus to `path`, replacing any previous snapshot.
    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        let corpus = self.snapshot();
        let storage = SnapshotStorage::new(path.to_path_buf());
        storage.save(&corpus, &self.model.model_id_hash())?;

        log::info!(
            "Index with {} documents saved to {}",
            corpus.len(),
            storage.path().display()
        );
        Ok(())
    }

    /// Replace the corpus with the snapshot at `path`.
    ///
    /// Returns `Ok(false)` when there is no snapshot. A snapshot that exists
    /// but cannot be read, or was built with another model, is an error and
    /// leaves the current corpus untouched.
    pub fn load(&self, path: &Path) -> Result<bool, EngineError> {
        let storage = SnapshotStorage::new(path.to_path_buf());
        let corpus = match storage.load(&self.model.model_id_hash(), self.model.dimensions())? {
            Some(corpus) => corpus,
            None => return Ok(false),
        };

        log::info!("Loaded index with {} documents from {}", corpus.len(), path.display());

        self.publish(corpus);
        Ok(true)
    }

    fn publish(&self, corpus: Corpus) {
        let corpus = Arc::new(corpus);
        match self.corpus.write() {
            Ok(mut guard) => *guard = corpus,
            Err(poisoned) => *poisoned.into_inner() = corpus,
        }
    }
}
