//! In-memory corpus with cosine similarity search.
//!
//! Documents and their embeddings are stored side by side, in insertion order.
//! A `Corpus` is immutable once built: reindexing builds a new one.

use crate::documents::Document;

/// Documents paired positionally with their embedding vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    documents: Vec<Document>,
    vectors: Vec<Vec<f32>>,
    /// Expected embedding dimensions
    dimensions: usize,
}

/// A ranked position in the corpus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    /// Position of the document in the corpus
    pub position: usize,
    /// Cosine similarity score (-1.0 to 1.0)
    pub score: f32,
}

impl Corpus {
    /// Create an empty corpus for vectors of the given dimensions.
    pub fn empty(dimensions: usize) -> Self {
        Self {
            documents: Vec::new(),
            vectors: Vec::new(),
            dimensions,
        }
    }

    /// Pair documents with vectors.
    ///
    /// Fails unless there is exactly one vector per document and every vector
    /// has `dimensions` entries.
    pub fn new(
        documents: Vec<Document>,
        vectors: Vec<Vec<f32>>,
        dimensions: usize,
    ) -> Result<Self, IndexError> {
        if documents.len() != vectors.len() {
            return Err(IndexError::LengthMismatch {
                documents: documents.len(),
                vectors: vectors.len(),
            });
        }

        if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
            return Err(IndexError::DimensionMismatch {
                expected: dimensions,
                got: bad.len(),
            });
        }

        Ok(Self {
            documents,
            vectors,
            dimensions,
        })
    }

    /// Get the expected embedding dimensions.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Get the number of documents in the corpus.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Document at `position`, if any.
    pub fn get(&self, position: usize) -> Option<&Document> {
        self.documents.get(position)
    }

    /// Iterate over (document, vector) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Document, &[f32])> {
        self.documents
            .iter()
            .zip(self.vectors.iter().map(Vec::as_slice))
    }

    /// Rank the corpus against a query vector.
    ///
    /// Results are sorted by score, highest first. The sort is stable, so
    /// equal scores keep insertion order. Zero-norm corpus vectors have no
    /// direction and are left out of the ranking; a zero-norm query ranks
    /// nothing.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>, IndexError> {
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }

        let query_norm = l2_norm(query);
        if query_norm < f32::EPSILON || limit == 0 {
            return Ok(vec![]);
        }

        let mut results: Vec<SearchResult> = self
            .vectors
            .iter()
            .enumerate()
            .filter_map(|(position, vector)| {
                cosine_similarity(query, vector, query_norm)
                    .map(|score| SearchResult { position, score })
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        results.truncate(limit);

        Ok(results)
    }
}

/// Compute L2 norm of a vector.
fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity between a query and a target vector.
/// Assumes query_norm is precomputed for efficiency.
///
/// `None` when the target has zero norm or the score is not finite.
fn cosine_similarity(query: &[f32], target: &[f32], query_norm: f32) -> Option<f32> {
    let target_norm = l2_norm(target);
    if target_norm < f32::EPSILON {
        return None;
    }

    let dot_product: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
    let score = dot_product / (query_norm * target_norm);

    score.is_finite().then_some(score)
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Got {vectors} vectors for {documents} documents")]
    LengthMismatch { documents: usize, vectors: usize },
}
