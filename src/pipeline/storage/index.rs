//! Per-patient knowledge index.
//!
//! One namespace per patient, keyed by the lowercased email. Ingestion only
//! appends; retrieval never looks outside the requested namespace.

use std::sync::Arc;

use uuid::Uuid;

use super::chunker::FixedSizeChunker;
use super::types::{ChunkRecord, Chunker, EmbeddingModel, ScoredChunk, VectorStore};
use super::StorageError;

/// UUIDv5 namespace for content-addressed chunk ids.
const CHUNK_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6d79_6e75_7273_655f_6368_756e_6b5f_6964);

/// Index namespace for a patient email.
pub fn namespace_for(patient_email: &str) -> String {
    patient_email.trim().to_lowercase()
}

/// The document a batch of chunks was cut from.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub id: Uuid,
    /// Hex SHA-256 of the raw upload; makes chunk ids stable across re-uploads.
    pub content_hash: String,
}

/// Deterministic id: same patient, same document bytes, same position,
/// same text gives the same id.
fn chunk_id(namespace: &str, content_hash: &str, chunk_index: usize, content: &str) -> Uuid {
    let key = format!("{namespace}\u{0}{content_hash}\u{0}{chunk_index}\u{0}{content}");
    Uuid::new_v5(&CHUNK_ID_NAMESPACE, key.as_bytes())
}

pub struct KnowledgeIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingModel>,
    chunker: FixedSizeChunker,
}

impl KnowledgeIndex {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingModel>,
        chunker: FixedSizeChunker,
    ) -> Self {
        Self {
            store,
            embedder,
            chunker,
        }
    }

    /// Cut `text` into fixed-size chunks.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        self.chunker
            .chunk(text)
            .into_iter()
            .map(|c| c.content)
            .collect()
    }

    /// Embed and append `chunks` to the patient's namespace.
    ///
    /// All embeddings are computed before anything is written, so a failing
    /// embedder leaves the namespace untouched. Returns the number of chunks
    /// newly added; chunks already present are skipped.
    pub fn ingest(
        &self,
        patient_email: &str,
        document: &IndexedDocument,
        chunks: &[String],
    ) -> Result<usize, StorageError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let namespace = namespace_for(patient_email);
        let texts: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;

        if embeddings.len() != chunks.len() {
            return Err(StorageError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let records: Vec<ChunkRecord> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (content, embedding))| ChunkRecord {
                id: chunk_id(&namespace, &document.content_hash, i, content),
                namespace: namespace.clone(),
                document_id: document.id,
                chunk_index: i,
                content: content.clone(),
                embedding,
            })
            .collect();

        let inserted = self.store.append(&records)?;

        tracing::info!(
            document_id = %document.id,
            chunks = chunks.len(),
            inserted,
            "Knowledge index updated"
        );

        Ok(inserted)
    }

    /// Chunk `text` and ingest the chunks.
    pub fn ingest_text(
        &self,
        patient_email: &str,
        document: &IndexedDocument,
        text: &str,
    ) -> Result<usize, StorageError> {
        let chunks = self.chunk_text(text);
        self.ingest(patient_email, document, &chunks)
    }

    /// The `k` chunks of the patient's namespace nearest to `query`.
    /// A missing or empty namespace yields an empty list.
    pub fn retrieve(
        &self,
        patient_email: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, StorageError> {
        let namespace = namespace_for(patient_email);
        if k == 0 || self.store.count(&namespace)? == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query)?;
        let hits = self.store.search(&namespace, &query_embedding, k)?;

        tracing::debug!(hits = hits.len(), k, "Knowledge retrieval complete");
        Ok(hits)
    }

    pub fn chunk_count(&self, patient_email: &str) -> Result<usize, StorageError> {
        self.store.count(&namespace_for(patient_email))
    }

    /// Chunk ids of the patient's namespace, in insertion order.
    pub fn chunk_ids(&self, patient_email: &str) -> Result<Vec<Uuid>, StorageError> {
        self.store.ids(&namespace_for(patient_email))
    }

    /// Drop the patient's whole namespace.
    pub fn drop_patient(&self, patient_email: &str) -> Result<usize, StorageError> {
        self.store.drop_namespace(&namespace_for(patient_email))
    }
}
