use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::Speaker;

/// One entry of a session's chat log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: NaiveDateTime,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            timestamp: chrono::Local::now().naive_local(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
            timestamp: chrono::Local::now().naive_local(),
        }
    }
}
