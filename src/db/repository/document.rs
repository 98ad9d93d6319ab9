use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::*;

const DOCUMENT_COLUMNS: &str =
    "id, filename, patient_email, content, content_hash, verdict, reason, uploaded_at";

pub fn insert_document(conn: &Connection, doc: &Document) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents (id, filename, patient_email, content, content_hash, verdict,
         reason, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            doc.id.to_string(),
            doc.filename,
            doc.patient_email,
            doc.content,
            doc.content_hash,
            doc.verdict.as_str(),
            doc.reason,
            doc.uploaded_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// All documents of a patient, newest first.
pub fn list_documents_by_patient(
    conn: &Connection,
    patient_email: &str,
) -> Result<Vec<Document>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents
         WHERE patient_email = ?1
         ORDER BY uploaded_at DESC, rowid DESC"
    ))?;

    let rows = stmt
        .query_map(params![patient_email], DocumentRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(document_from_row).collect()
}

/// An accepted document of this patient with the given content hash, if any.
pub fn get_accepted_document_by_hash(
    conn: &Connection,
    patient_email: &str,
    hash: &str,
) -> Result<Option<Document>, DatabaseError> {
    let result = conn.query_row(
        &format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents
             WHERE patient_email = ?1 AND content_hash = ?2 AND verdict = 'accepted'
             LIMIT 1"
        ),
        params![patient_email, hash],
        DocumentRow::from_row,
    );

    match result {
        Ok(row) => Ok(Some(document_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

struct DocumentRow {
    id: String,
    filename: String,
    patient_email: String,
    content: Vec<u8>,
    content_hash: String,
    verdict: String,
    reason: String,
    uploaded_at: String,
}

impl DocumentRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            filename: row.get(1)?,
            patient_email: row.get(2)?,
            content: row.get(3)?,
            content_hash: row.get(4)?,
            verdict: row.get(5)?,
            reason: row.get(6)?,
            uploaded_at: row.get(7)?,
        })
    }
}

fn document_from_row(row: DocumentRow) -> Result<Document, DatabaseError> {
    let id = Uuid::parse_str(&row.id).map_err(|_| DatabaseError::InvalidEnum {
        field: "document.id".into(),
        value: row.id.clone(),
    })?;
    let uploaded_at = NaiveDateTime::parse_from_str(&row.uploaded_at, TIMESTAMP_FORMAT)
        .map_err(|_| DatabaseError::InvalidEnum {
            field: "document.uploaded_at".into(),
            value: row.uploaded_at.clone(),
        })?;

    Ok(Document {
        id,
        filename: row.filename,
        patient_email: row.patient_email,
        content: row.content,
        content_hash: row.content_hash,
        verdict: DocumentVerdict::from_str(&row.verdict)?,
        reason: row.reason,
        uploaded_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::insert_user;
    use crate::db::sqlite::{open_memory_database, RECORD_MIGRATIONS};

    fn setup() -> Connection {
        let conn = open_memory_database(RECORD_MIGRATIONS).unwrap();
        insert_user(
            &conn,
            &User::Patient(Patient {
                email: "maria.rossi@example.it".into(),
                first_name: "Maria".into(),
                last_name: "Rossi".into(),
                associated_clinician_email: None,
            }),
        )
        .unwrap();
        conn
    }

    fn document(filename: &str, verdict: DocumentVerdict, minute: u32) -> Document {
        let content = format!("contenuto di {filename}").into_bytes();
        Document {
            id: Uuid::new_v4(),
            filename: filename.into(),
            patient_email: "maria.rossi@example.it".into(),
            content_hash: crate::models::content_hash(&content),
            content,
            verdict,
            reason: String::new(),
            uploaded_at: chrono::NaiveDate::from_ymd_opt(2025, 3, 14)
                .unwrap()
                .and_hms_opt(9, minute, 0)
                .unwrap(),
        }
    }

    #[test]
    fn insert_and_list_newest_first() {
        let conn = setup();
        insert_document(&conn, &document("emocromo.pdf", DocumentVerdict::Accepted, 1)).unwrap();
        insert_document(&conn, &document("referto.pdf", DocumentVerdict::Accepted, 5)).unwrap();

        let docs = list_documents_by_patient(&conn, "maria.rossi@example.it").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].filename, "referto.pdf");
        assert_eq!(docs[1].content, b"contenuto di emocromo.pdf");
    }

    #[test]
    fn unknown_patient_has_no_documents() {
        let conn = setup();
        assert!(list_documents_by_patient(&conn, "nessuno@example.it").unwrap().is_empty());
    }

    #[test]
    fn document_requires_existing_patient() {
        let conn = setup();
        let mut doc = document("orfano.pdf", DocumentVerdict::Accepted, 1);
        doc.patient_email = "nessuno@example.it".into();
        assert!(insert_document(&conn, &doc).is_err());
    }

    #[test]
    fn hash_lookup_ignores_rejected_documents() {
        let conn = setup();
        let rejected = document("sospetto.pdf", DocumentVerdict::Rejected, 1);
        insert_document(&conn, &rejected).unwrap();
        assert!(get_accepted_document_by_hash(&conn, "maria.rossi@example.it", &rejected.content_hash)
            .unwrap()
            .is_none());

        let accepted = document("referto.pdf", DocumentVerdict::Accepted, 2);
        insert_document(&conn, &accepted).unwrap();
        let found = get_accepted_document_by_hash(&conn, "maria.rossi@example.it", &accepted.content_hash)
            .unwrap()
            .unwrap();
        assert_eq!(found.id, accepted.id);
    }
}
