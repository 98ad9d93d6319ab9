use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StorageError;

/// A fixed-size slice of document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    pub chunk_index: usize,
    /// Offset of the chunk start, in chars.
    pub char_offset: usize,
}

/// Chunking strategy trait
pub trait Chunker {
    fn chunk(&self, text: &str) -> Vec<TextChunk>;
}

/// Embedding model abstraction
pub trait EmbeddingModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, StorageError>;
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StorageError>;
    fn dimension(&self) -> usize;
}

/// One immutable index entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    /// Content-addressed; re-appending the same chunk is a no-op.
    pub id: Uuid,
    pub namespace: String,
    pub document_id: Uuid,
    pub chunk_index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A retrieval hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub document_id: Uuid,
    pub chunk_index: usize,
    pub content: String,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// Append-only, namespaced vector store.
///
/// Entries are never mutated; a namespace can only be dropped as a whole.
pub trait VectorStore: Send + Sync {
    /// Append records, skipping ids already present. Returns the number
    /// actually inserted. All-or-nothing.
    fn append(&self, records: &[ChunkRecord]) -> Result<usize, StorageError>;

    /// Up to `k` entries of `namespace`, most similar first. Ties keep
    /// insertion order.
    fn search(&self, namespace: &str, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StorageError>;

    fn count(&self, namespace: &str) -> Result<usize, StorageError>;

    /// Ids of every entry of `namespace`, in insertion order.
    fn ids(&self, namespace: &str) -> Result<Vec<Uuid>, StorageError>;

    /// Remove every entry of `namespace`. Returns the number removed.
    fn drop_namespace(&self, namespace: &str) -> Result<usize, StorageError>;
}

/// Cosine similarity; 0.0 for empty or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!((sim - 1.0).abs() < 0.01);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(sim.abs() < 0.01);
    }

    #[test]
    fn cosine_similarity_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
