pub mod types;
pub mod chunker;
pub mod embedder;
pub mod vectordb;
pub mod index;

pub use chunker::FixedSizeChunker;
pub use embedder::{HashingEmbedder, OllamaEmbedder};
pub use index::{namespace_for, IndexedDocument, KnowledgeIndex};
pub use types::*;
pub use vectordb::{InMemoryVectorStore, SqliteVectorStore};

use thiserror::Error;

use crate::db::DatabaseError;
use crate::pipeline::rag::ModelError;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Vector DB error: {0}")]
    VectorDb(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Embedding model error: {0}")]
    Model(#[from] ModelError),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector store lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(e))
    }
}
