//! Semantic search over project documents.
//!
//! This module provides local semantic search using fastembed-rs for
//! generating embeddings and in-memory cosine similarity ranking.
//!
//! # Architecture
//!
//! - `embeddings`: Wraps fastembed behind the `Embedder` trait
//! - `preprocess`: Builds the text embedded for each document
//! - `index`: Immutable corpus of documents and vectors with cosine search
//! - `storage`: Binary snapshot I/O for search_index.bin persistence
//! - `engine`: Indexing, search and persistence with snapshot publishing

pub mod embeddings;
mod engine;
mod index;
mod preprocess;
mod storage;

pub use embeddings::{model_id_hash, EmbeddingError, EmbeddingModel, Embedder};
pub use engine::{EngineError, ScoredDocument, SearchEngine};
pub use storage::{SnapshotStorage, StorageError};

/// Default embedding model name
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Default number of results per query
pub const DEFAULT_TOP_K: usize = 5;
