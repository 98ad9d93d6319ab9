//! `ClinicalAssistant`: the one object the page layer talks to.
//!
//! Owns the record store, the knowledge index, the model client and the
//! ingestion locks, and exposes the two entry points: answering a question
//! and ingesting a document.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{self, AssistantConfig};
use crate::db::{DatabaseError, RecordStore, SqliteRecordStore};
use crate::models::{Document, Patient};
use crate::pipeline::intake::DocumentIntakeValidator;
use crate::pipeline::processor::{DocumentProcessor, IngestError, IngestOutcome};
use crate::pipeline::rag::orchestrator::{AnswerOutcome, QaPipeline};
use crate::pipeline::rag::{LlmGenerate, ModelError, OllamaClient, QaError};
use crate::pipeline::storage::{
    EmbeddingModel, FixedSizeChunker, KnowledgeIndex, OllamaEmbedder, SqliteVectorStore,
    StorageError,
};
use crate::session::SessionContext;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Cannot create data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

// ═══════════════════════════════════════════════════════════
// ClinicalAssistant
// ═══════════════════════════════════════════════════════════

pub struct ClinicalAssistant {
    records: Arc<dyn RecordStore>,
    index: Arc<KnowledgeIndex>,
    qa: QaPipeline,
    processor: DocumentProcessor,
}

impl ClinicalAssistant {
    /// Wire the assistant from already-built parts.
    pub fn new(
        config: &AssistantConfig,
        llm: Arc<dyn LlmGenerate>,
        records: Arc<dyn RecordStore>,
        index: Arc<KnowledgeIndex>,
    ) -> Self {
        let validator = DocumentIntakeValidator::new(llm.clone(), config);
        Self {
            qa: QaPipeline::new(llm, records.clone(), index.clone(), config),
            processor: DocumentProcessor::new(validator, records.clone(), index.clone()),
            records,
            index,
        }
    }

    /// Production wiring under the default data directory.
    pub fn open(config: &AssistantConfig) -> Result<Self, AssistantError> {
        Self::open_in(&config::app_data_dir(), config)
    }

    /// SQLite stores under `dir`, Ollama for generation and embeddings.
    pub fn open_in(dir: &Path, config: &AssistantConfig) -> Result<Self, AssistantError> {
        std::fs::create_dir_all(dir)?;

        let records: Arc<dyn RecordStore> =
            Arc::new(SqliteRecordStore::open(&dir.join(config::RECORDS_DB_FILE))?);
        let embedder: Arc<dyn EmbeddingModel> = Arc::new(OllamaEmbedder::from_config(config)?);
        let index = Arc::new(KnowledgeIndex::new(
            Arc::new(SqliteVectorStore::open(&dir.join(config::INDEX_DB_FILE))?),
            embedder,
            FixedSizeChunker::new(config.chunk_size),
        ));
        let llm: Arc<dyn LlmGenerate> = Arc::new(OllamaClient::from_config(config)?);

        tracing::info!(
            data_dir = %dir.display(),
            model = %config.generation_model,
            "{} v{} ready",
            config::APP_NAME,
            config::APP_VERSION
        );

        Ok(Self::new(config, llm, records, index))
    }

    // ── Questions ──────────────────────────────────────────

    /// Structured outcome of one question.
    pub fn ask(&self, session: &mut SessionContext, query: &str) -> Result<AnswerOutcome, QaError> {
        self.qa.answer_question(session, query)
    }

    /// Display text for one question. Failures degrade to a fixed message.
    pub fn answer_question(&self, session: &mut SessionContext, query: &str) -> String {
        match self.ask(session, query) {
            Ok(outcome) => outcome.display_text(),
            Err(e) => {
                tracing::warn!(error = %e, retryable = e.is_retryable(), "Question failed");
                e.user_message().to_string()
            }
        }
    }

    // ── Documents ──────────────────────────────────────────

    /// Structured outcome of one upload.
    pub fn ingest(
        &self,
        patient: &Patient,
        filename: &str,
        bytes: &[u8],
    ) -> Result<IngestOutcome, IngestError> {
        self.processor.ingest_document(patient, filename, bytes)
    }

    /// `(accepted, reason)` for one upload. Failures count as not accepted,
    /// with a fixed reason.
    pub fn ingest_document(&self, patient: &Patient, filename: &str, bytes: &[u8]) -> (bool, String) {
        match self.ingest(patient, filename, bytes) {
            Ok(outcome) => (outcome.accepted, outcome.reason),
            Err(e) => {
                tracing::warn!(error = %e, "Ingestion failed");
                (false, e.user_message().to_string())
            }
        }
    }

    pub fn rebuild_patient_index(&self, patient_email: &str) -> Result<usize, IngestError> {
        self.processor.rebuild_patient_index(patient_email)
    }

    /// Newest first.
    pub fn list_documents(&self, patient_email: &str) -> Result<Vec<Document>, DatabaseError> {
        self.records.list_documents(patient_email)
    }

    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    pub fn index(&self) -> &KnowledgeIndex {
        &self.index
    }
}
