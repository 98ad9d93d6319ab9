pub mod sqlite;
pub mod repository;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use thiserror::Error;

use crate::models::{Document, Patient, User};

pub use sqlite::*;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// Persistent identities and uploaded documents.
///
/// The question-answering core only reads identities; documents are written
/// once at ingestion and never updated.
pub trait RecordStore: Send + Sync {
    fn find_patients_by_clinician_email(&self, email: &str) -> Result<Vec<Patient>, DatabaseError>;

    fn save_document(&self, doc: &Document) -> Result<(), DatabaseError>;

    /// Newest first.
    fn list_documents(&self, patient_email: &str) -> Result<Vec<Document>, DatabaseError>;

    fn find_accepted_document_by_hash(
        &self,
        patient_email: &str,
        hash: &str,
    ) -> Result<Option<Document>, DatabaseError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;
}

/// SQLite-backed record store behind a single connection.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_database(path, RECORD_MIGRATIONS)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database(RECORD_MIGRATIONS)?),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

impl RecordStore for SqliteRecordStore {
    fn find_patients_by_clinician_email(&self, email: &str) -> Result<Vec<Patient>, DatabaseError> {
        let conn = self.conn()?;
        repository::find_patients_by_clinician_email(&conn, email)
    }

    fn save_document(&self, doc: &Document) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        // Single INSERT: either the whole row lands or nothing does.
        repository::insert_document(&conn, doc)
    }

    fn list_documents(&self, patient_email: &str) -> Result<Vec<Document>, DatabaseError> {
        let conn = self.conn()?;
        repository::list_documents_by_patient(&conn, patient_email)
    }

    fn find_accepted_document_by_hash(
        &self,
        patient_email: &str,
        hash: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        let conn = self.conn()?;
        repository::get_accepted_document_by_hash(&conn, patient_email, hash)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let conn = self.conn()?;
        repository::find_user_by_email(&conn, email)
    }

    fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        repository::insert_user(&conn, user)
    }
}
