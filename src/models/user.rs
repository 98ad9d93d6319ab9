use serde::{Deserialize, Serialize};

use super::enums::Role;

/// A patient as known to the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub associated_clinician_email: Option<String>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clinician {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Clinician {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// An already-authenticated identity handed over by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum User {
    Clinician(Clinician),
    Patient(Patient),
}

impl User {
    pub fn email(&self) -> &str {
        match self {
            Self::Clinician(c) => &c.email,
            Self::Patient(p) => &p.email,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::Clinician(_) => Role::Clinician,
            Self::Patient(_) => Role::Patient,
        }
    }

    pub fn full_name(&self) -> String {
        match self {
            Self::Clinician(c) => c.full_name(),
            Self::Patient(p) => p.full_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_exposes_identity() {
        let user = User::Patient(Patient {
            email: "maria.rossi@example.it".into(),
            first_name: "Maria".into(),
            last_name: "Rossi".into(),
            associated_clinician_email: Some("dr.verdi@example.it".into()),
        });
        assert_eq!(user.email(), "maria.rossi@example.it");
        assert_eq!(user.role(), Role::Patient);
        assert_eq!(user.full_name(), "Maria Rossi");
    }

    #[test]
    fn user_serializes_with_role_tag() {
        let user = User::Clinician(Clinician {
            email: "dr.verdi@example.it".into(),
            first_name: "Anna".into(),
            last_name: "Verdi".into(),
        });
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("\"role\":\"clinician\""));
    }
}
