//! Document ingestion: validate → record → index.
//!
//! Ingestion is serialized per patient by [`IngestionLocks`]; a second
//! upload for a patient already being processed fails fast instead of
//! queueing. Different patients ingest in parallel.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{DatabaseError, RecordStore};
use crate::models::{content_hash, Document, DocumentVerdict, Patient};
use crate::pipeline::intake::{extract_document_text, DocumentIntakeValidator, IntakeError, IntakeReport};
use crate::pipeline::storage::{namespace_for, IndexedDocument, KnowledgeIndex, StorageError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Processing already in progress for {0}")]
    InProgress(String),

    #[error("Validation failed: {0}")]
    Intake(#[from] IntakeError),

    #[error("Knowledge index error: {0}")]
    Storage(#[from] StorageError),

    #[error("Record store error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Ingestion lock poisoned")]
    LockPoisoned,
}

impl IngestError {
    /// Safe fixed message for the uploader.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InProgress(_) => {
                "Elaborazione in corso per questo paziente. Riprova al termine del caricamento precedente."
            }
            Self::Intake(_) => crate::pipeline::rag::prompt::MODEL_UNAVAILABLE,
            _ => "Si è verificato un errore interno. Il documento non è stato salvato.",
        }
    }
}

// ---------------------------------------------------------------------------
// Per-patient locks
// ---------------------------------------------------------------------------

/// Patients with an ingestion currently running.
#[derive(Default)]
pub struct IngestionLocks {
    active: Mutex<HashSet<String>>,
}

impl IngestionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the patient's slot, or fail with `InProgress` if it is taken.
    pub fn try_acquire(&self, patient_email: &str) -> Result<IngestionGuard<'_>, IngestError> {
        let key = namespace_for(patient_email);
        let mut active = self.active.lock().map_err(|_| IngestError::LockPoisoned)?;
        if !active.insert(key.clone()) {
            return Err(IngestError::InProgress(key));
        }
        Ok(IngestionGuard { locks: self, key })
    }

    pub fn is_busy(&self, patient_email: &str) -> bool {
        self.active
            .lock()
            .map(|a| a.contains(&namespace_for(patient_email)))
            .unwrap_or(false)
    }
}

/// Releases the patient's slot on drop, including on early return.
pub struct IngestionGuard<'a> {
    locks: &'a IngestionLocks,
    key: String,
}

impl Drop for IngestionGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.locks.active.lock() {
            active.remove(&self.key);
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// Record-store id; for a duplicate upload, the id of the earlier copy.
    pub document_id: Uuid,
    pub accepted: bool,
    /// Itemized rejection reasons, empty when accepted.
    pub reason: String,
    /// Chunks newly added to the index.
    pub chunks_indexed: usize,
    /// The same bytes were already accepted for this patient.
    pub duplicate: bool,
    pub report: IntakeReport,
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

pub struct DocumentProcessor {
    validator: DocumentIntakeValidator,
    records: Arc<dyn RecordStore>,
    index: Arc<KnowledgeIndex>,
    locks: IngestionLocks,
}

impl DocumentProcessor {
    pub fn new(
        validator: DocumentIntakeValidator,
        records: Arc<dyn RecordStore>,
        index: Arc<KnowledgeIndex>,
    ) -> Self {
        Self {
            validator,
            records,
            index,
            locks: IngestionLocks::new(),
        }
    }

    pub fn locks(&self) -> &IngestionLocks {
        &self.locks
    }

    /// Validate an upload and, when accepted, record and index it.
    ///
    /// Rejected uploads are kept as audit records and never indexed. The
    /// record is written before the index; a failed index write is repaired
    /// by [`DocumentProcessor::rebuild_patient_index`].
    pub fn ingest_document(
        &self,
        patient: &Patient,
        filename: &str,
        bytes: &[u8],
    ) -> Result<IngestOutcome, IngestError> {
        let _guard = self.locks.try_acquire(&patient.email)?;

        // Step 1: Validate
        let report = self.validator.validate(bytes)?;
        let hash = content_hash(bytes);

        // Step 2: Rejected → audit record only
        if !report.accepted {
            let reason = report.reason();
            let doc = Document::new(
                filename,
                &patient.email,
                bytes.to_vec(),
                DocumentVerdict::Rejected,
                &reason,
            );
            self.records.save_document(&doc)?;

            tracing::info!(
                document_id = %doc.id,
                suspicion_score = report.suspicion_score,
                findings = report.findings.len(),
                "Document rejected at intake"
            );

            return Ok(IngestOutcome {
                document_id: doc.id,
                accepted: false,
                reason,
                chunks_indexed: 0,
                duplicate: false,
                report,
            });
        }

        // Step 3: Record (skipped for a byte-identical re-upload)
        let existing = self.records.find_accepted_document_by_hash(&patient.email, &hash)?;
        let duplicate = existing.is_some();
        let document_id = match existing {
            Some(doc) => doc.id,
            None => {
                let doc = Document::new(
                    filename,
                    &patient.email,
                    bytes.to_vec(),
                    DocumentVerdict::Accepted,
                    "",
                );
                self.records.save_document(&doc)?;
                doc.id
            }
        };

        // Step 4: Index. Content-addressed ids make a repeat a no-op.
        let indexed = IndexedDocument {
            id: document_id,
            content_hash: hash,
        };
        let chunks_indexed = match self.index.ingest_text(&patient.email, &indexed, &report.extracted_text) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(
                    document_id = %document_id,
                    error = %e,
                    "Document recorded but not indexed; rebuild the patient index"
                );
                return Err(e.into());
            }
        };

        tracing::info!(
            document_id = %document_id,
            chunks_indexed,
            duplicate,
            "Document accepted"
        );

        Ok(IngestOutcome {
            document_id,
            accepted: true,
            reason: String::new(),
            chunks_indexed,
            duplicate,
            report,
        })
    }

    /// Re-derive the patient's namespace from the record store's accepted
    /// documents. Returns the number of chunks indexed.
    pub fn rebuild_patient_index(&self, patient_email: &str) -> Result<usize, IngestError> {
        let _guard = self.locks.try_acquire(patient_email)?;

        let dropped = self.index.drop_patient(patient_email)?;
        let mut total = 0;
        let mut skipped = 0;

        for doc in self.records.list_documents(patient_email)? {
            if !doc.is_accepted() {
                continue;
            }
            let text = match extract_document_text(&doc.content) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(document_id = %doc.id, error = %e, "Skipping unreadable document");
                    skipped += 1;
                    continue;
                }
            };
            let indexed = IndexedDocument {
                id: doc.id,
                content_hash: doc.content_hash.clone(),
            };
            total += self.index.ingest_text(patient_email, &indexed, &text)?;
        }

        tracing::info!(dropped, indexed = total, skipped, "Patient index rebuilt");
        Ok(total)
    }
}
