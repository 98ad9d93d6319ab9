use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::types::{cosine_similarity, ChunkRecord, ScoredChunk, VectorStore};
use super::StorageError;
use crate::db::sqlite::{open_database, open_memory_database, INDEX_MIGRATIONS};

/// Rank candidates by similarity, keeping insertion order on ties.
fn top_k(mut scored: Vec<ScoredChunk>, k: usize) -> Vec<ScoredChunk> {
    // Stable sort preserves the incoming (insertion) order for equal scores.
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}

// ═══════════════════════════════════════════════════════════
// InMemoryVectorStore
// ═══════════════════════════════════════════════════════════

/// In-memory vector store for tests and throwaway sessions.
pub struct InMemoryVectorStore {
    entries: Mutex<Vec<ChunkRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn entries(&self) -> Result<MutexGuard<'_, Vec<ChunkRecord>>, StorageError> {
        self.entries.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore for InMemoryVectorStore {
    fn append(&self, records: &[ChunkRecord]) -> Result<usize, StorageError> {
        let mut entries = self.entries()?;
        let mut seen: HashSet<Uuid> = entries.iter().map(|e| e.id).collect();
        let mut inserted = 0;

        for record in records {
            if seen.insert(record.id) {
                entries.push(record.clone());
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    fn search(&self, namespace: &str, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StorageError> {
        let entries = self.entries()?;
        let scored = entries
            .iter()
            .filter(|e| e.namespace == namespace)
            .map(|e| ScoredChunk {
                document_id: e.document_id,
                chunk_index: e.chunk_index,
                content: e.content.clone(),
                score: cosine_similarity(query, &e.embedding),
            })
            .collect();
        Ok(top_k(scored, k))
    }

    fn count(&self, namespace: &str) -> Result<usize, StorageError> {
        Ok(self.entries()?.iter().filter(|e| e.namespace == namespace).count())
    }

    fn ids(&self, namespace: &str) -> Result<Vec<Uuid>, StorageError> {
        Ok(self
            .entries()?
            .iter()
            .filter(|e| e.namespace == namespace)
            .map(|e| e.id)
            .collect())
    }

    fn drop_namespace(&self, namespace: &str) -> Result<usize, StorageError> {
        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|e| e.namespace != namespace);
        Ok(before - entries.len())
    }
}

// ═══════════════════════════════════════════════════════════
// SqliteVectorStore
// ═══════════════════════════════════════════════════════════

/// Persistent vector store in its own SQLite file.
///
/// Embeddings are stored as little-endian f32 BLOBs and scored in process;
/// a patient namespace holds at most a few thousand chunks.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            conn: Mutex::new(open_database(path, INDEX_MIGRATIONS)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database(INDEX_MIGRATIONS)?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> Result<Vec<f32>, StorageError> {
    if blob.len() % 4 != 0 {
        return Err(StorageError::VectorDb(format!(
            "Embedding blob length {} is not a multiple of 4",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

impl VectorStore for SqliteVectorStore {
    fn append(&self, records: &[ChunkRecord]) -> Result<usize, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO knowledge_chunks
                 (id, namespace, document_id, chunk_index, content, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for r in records {
                inserted += stmt.execute(params![
                    r.id.to_string(),
                    r.namespace,
                    r.document_id.to_string(),
                    r.chunk_index as i64,
                    r.content,
                    encode_embedding(&r.embedding),
                ])?;
            }
        }

        // Dropping `tx` without commit rolls the whole batch back.
        tx.commit()?;
        Ok(inserted)
    }

    fn search(&self, namespace: &str, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT document_id, chunk_index, content, embedding
             FROM knowledge_chunks WHERE namespace = ?1 ORDER BY rowid",
        )?;

        let rows = stmt
            .query_map(params![namespace], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut scored = Vec::with_capacity(rows.len());
        for (document_id, chunk_index, content, blob) in rows {
            let embedding = decode_embedding(&blob)?;
            let document_id = Uuid::parse_str(&document_id)
                .map_err(|e| StorageError::VectorDb(format!("Bad document id: {e}")))?;
            scored.push(ScoredChunk {
                document_id,
                chunk_index: chunk_index as usize,
                content,
                score: cosine_similarity(query, &embedding),
            });
        }

        Ok(top_k(scored, k))
    }

    fn count(&self, namespace: &str) -> Result<usize, StorageError> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM knowledge_chunks WHERE namespace = ?1",
            params![namespace],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn ids(&self, namespace: &str) -> Result<Vec<Uuid>, StorageError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id FROM knowledge_chunks WHERE namespace = ?1 ORDER BY rowid")?;
        let raw = stmt
            .query_map(params![namespace], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        raw.iter()
            .map(|id| {
                Uuid::parse_str(id).map_err(|e| StorageError::VectorDb(format!("Bad chunk id: {e}")))
            })
            .collect()
    }

    fn drop_namespace(&self, namespace: &str) -> Result<usize, StorageError> {
        let removed = self.conn()?.execute(
            "DELETE FROM knowledge_chunks WHERE namespace = ?1",
            params![namespace],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(namespace: &str, index: usize, content: &str, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{namespace}/{index}/{content}").as_bytes()),
            namespace: namespace.into(),
            document_id: Uuid::nil(),
            chunk_index: index,
            content: content.into(),
            embedding,
        }
    }

    fn stores() -> Vec<(&'static str, Box<dyn VectorStore>)> {
        vec![
            ("memory", Box::new(InMemoryVectorStore::new()) as Box<dyn VectorStore>),
            ("sqlite", Box::new(SqliteVectorStore::open_in_memory().unwrap()) as Box<dyn VectorStore>),
        ]
    }

    #[test]
    fn search_ranks_by_similarity() {
        for (name, store) in stores() {
            store
                .append(&[
                    record("a", 0, "lontano", vec![0.0, 1.0]),
                    record("a", 1, "vicino", vec![1.0, 0.1]),
                ])
                .unwrap();
            let hits = store.search("a", &[1.0, 0.0], 2).unwrap();
            assert_eq!(hits[0].content, "vicino", "{name}");
            assert_eq!(hits.len(), 2, "{name}");
        }
    }

    #[test]
    fn search_never_crosses_namespaces() {
        for (name, store) in stores() {
            store.append(&[record("a", 0, "di a", vec![1.0, 0.0])]).unwrap();
            store.append(&[record("b", 0, "di b", vec![1.0, 0.0])]).unwrap();
            let hits = store.search("a", &[1.0, 0.0], 10).unwrap();
            assert_eq!(hits.len(), 1, "{name}");
            assert_eq!(hits[0].content, "di a", "{name}");
        }
    }

    #[test]
    fn missing_namespace_is_empty() {
        for (name, store) in stores() {
            assert!(store.search("nessuno", &[1.0], 3).unwrap().is_empty(), "{name}");
            assert_eq!(store.count("nessuno").unwrap(), 0, "{name}");
        }
    }

    #[test]
    fn append_is_idempotent_on_id() {
        for (name, store) in stores() {
            let batch = vec![record("a", 0, "x", vec![1.0]), record("a", 1, "y", vec![1.0])];
            assert_eq!(store.append(&batch).unwrap(), 2, "{name}");
            assert_eq!(store.append(&batch).unwrap(), 0, "{name}");
            assert_eq!(store.count("a").unwrap(), 2, "{name}");
        }
    }

    #[test]
    fn ties_keep_insertion_order() {
        for (name, store) in stores() {
            store
                .append(&[
                    record("a", 0, "primo", vec![1.0, 0.0]),
                    record("a", 1, "secondo", vec![1.0, 0.0]),
                    record("a", 2, "terzo", vec![1.0, 0.0]),
                ])
                .unwrap();
            let hits = store.search("a", &[1.0, 0.0], 2).unwrap();
            let order: Vec<&str> = hits.iter().map(|h| h.content.as_str()).collect();
            assert_eq!(order, vec!["primo", "secondo"], "{name}");
        }
    }

    #[test]
    fn ids_listed_per_namespace_in_order() {
        for (name, store) in stores() {
            let first = record("a", 0, "x", vec![1.0]);
            let second = record("a", 1, "y", vec![1.0]);
            store.append(&[first.clone(), record("b", 0, "z", vec![1.0]), second.clone()]).unwrap();
            assert_eq!(store.ids("a").unwrap(), vec![first.id, second.id], "{name}");
            assert!(store.ids("nessuno").unwrap().is_empty(), "{name}");
        }
    }

    #[test]
    fn drop_namespace_removes_only_that_namespace() {
        for (name, store) in stores() {
            store.append(&[record("a", 0, "x", vec![1.0]), record("b", 0, "y", vec![1.0])]).unwrap();
            assert_eq!(store.drop_namespace("a").unwrap(), 1, "{name}");
            assert_eq!(store.count("a").unwrap(), 0, "{name}");
            assert_eq!(store.count("b").unwrap(), 1, "{name}");
        }
    }

    #[test]
    fn sqlite_store_persists_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.db");
        {
            let store = SqliteVectorStore::open(&path).unwrap();
            store.append(&[record("a", 0, "x", vec![0.25, -1.5, 3.0])]).unwrap();
        }
        let store = SqliteVectorStore::open(&path).unwrap();
        let hits = store.search("a", &[0.25, -1.5, 3.0], 1).unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn embedding_blob_round_trip() {
        let v = vec![0.5, -2.0, f32::MIN_POSITIVE];
        assert_eq!(decode_embedding(&encode_embedding(&v)).unwrap(), v);
        assert!(decode_embedding(&[1, 2, 3]).is_err());
    }
}
