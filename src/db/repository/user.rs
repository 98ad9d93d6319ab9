use std::str::FromStr;

use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    let (first, last, clinician) = match user {
        User::Clinician(c) => (&c.first_name, &c.last_name, None),
        User::Patient(p) => (&p.first_name, &p.last_name, p.associated_clinician_email.as_deref()),
    };
    conn.execute(
        "INSERT INTO users (email, first_name, last_name, role, associated_clinician_email)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.email(), first, last, user.role().as_str(), clinician],
    )?;
    Ok(())
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DatabaseError> {
    let result = conn.query_row(
        "SELECT email, first_name, last_name, role, associated_clinician_email
         FROM users WHERE email = ?1",
        params![email],
        UserRow::from_row,
    );

    match result {
        Ok(row) => Ok(Some(user_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Patients whose associated clinician is `clinician_email`, ordered by name.
pub fn find_patients_by_clinician_email(
    conn: &Connection,
    clinician_email: &str,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT email, first_name, last_name, role, associated_clinician_email
         FROM users WHERE associated_clinician_email = ?1 AND role = 'patient'
         ORDER BY last_name, first_name",
    )?;

    let rows = stmt
        .query_map(params![clinician_email], UserRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|row| match user_from_row(row)? {
            User::Patient(p) => Ok(p),
            User::Clinician(c) => Err(DatabaseError::ConstraintViolation(format!(
                "{} listed as patient but stored as clinician",
                c.email
            ))),
        })
        .collect()
}

struct UserRow {
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    associated_clinician_email: Option<String>,
}

impl UserRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            email: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            role: row.get(3)?,
            associated_clinician_email: row.get(4)?,
        })
    }
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    Ok(match Role::from_str(&row.role)? {
        Role::Clinician => User::Clinician(Clinician {
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
        }),
        Role::Patient => User::Patient(Patient {
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            associated_clinician_email: row.associated_clinician_email,
        }),
    })
}
