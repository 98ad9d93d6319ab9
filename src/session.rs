//! Per-session interaction context.
//!
//! The page layer owns one `SessionContext` per signed-in user and hands it
//! to the assistant by `&mut`, which keeps the chat log single-writer.

use crate::models::{ChatTurn, User};

/// Turns from the log that are replayed into the answer prompt.
pub const HISTORY_WINDOW: usize = 4;

pub struct SessionContext {
    current_user: User,
    turns: Vec<ChatTurn>,
}

impl SessionContext {
    pub fn new(current_user: User) -> Self {
        Self {
            current_user,
            turns: Vec::new(),
        }
    }

    pub fn current_user(&self) -> &User {
        &self.current_user
    }

    /// Full chat log in arrival order.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The last `HISTORY_WINDOW` turns.
    pub fn recent_turns(&self) -> &[ChatTurn] {
        let start = self.turns.len().saturating_sub(HISTORY_WINDOW);
        &self.turns[start..]
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// Record one question/answer exchange.
    pub fn record_exchange(&mut self, question: &str, answer: &str) {
        self.push(ChatTurn::user(question));
        self.push(ChatTurn::assistant(answer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Patient, Speaker};

    fn session() -> SessionContext {
        SessionContext::new(User::Patient(Patient {
            email: "maria.rossi@example.it".into(),
            first_name: "Maria".into(),
            last_name: "Rossi".into(),
            associated_clinician_email: None,
        }))
    }

    #[test]
    fn exchange_appends_in_order() {
        let mut s = session();
        s.record_exchange("Come sta?", "Bene.");
        assert_eq!(s.turns().len(), 2);
        assert_eq!(s.turns()[0].speaker, Speaker::User);
        assert_eq!(s.turns()[1].speaker, Speaker::Assistant);
        assert_eq!(s.turns()[1].text, "Bene.");
    }

    #[test]
    fn recent_turns_window() {
        let mut s = session();
        assert!(s.recent_turns().is_empty());
        for i in 0..5 {
            s.record_exchange(&format!("domanda {i}"), &format!("risposta {i}"));
        }
        let recent = s.recent_turns();
        assert_eq!(recent.len(), HISTORY_WINDOW);
        assert_eq!(recent[0].text, "domanda 3");
        assert_eq!(recent[3].text, "risposta 4");
    }
}
