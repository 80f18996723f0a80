//! Per-conversation turn history
//!
//! Sessions are created lazily on first append and live for the process
//! lifetime unless cleared. History is bounded at [`MAX_TURNS`] entries and
//! trimmed in user/assistant pairs so it never ends mid-exchange.

mod pacing;

pub use pacing::PacingGate;

use dashmap::DashMap;

use crate::types::{Role, Turn};

/// Maximum number of turns kept per session
pub const MAX_TURNS: usize = 50;

/// In-memory map of session id to turn history.
///
/// Ids are used exactly as given; no normalization, so distinct ids never
/// merge. Appends from concurrent requests on the same id may interleave,
/// which is acceptable for best-effort prompt context.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Vec<Turn>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn, creating the session on first use, then trim.
    pub fn append(&self, session_id: &str, turn: Turn) {
        let mut history = self.sessions.entry(session_id.to_string()).or_default();
        history.push(turn);
        Self::trim(&mut history);
    }

    /// Append a full user/assistant exchange in one call.
    pub fn append_exchange(&self, session_id: &str, user: &str, assistant: &str) {
        let mut history = self.sessions.entry(session_id.to_string()).or_default();
        history.push(Turn::user(user));
        history.push(Turn::assistant(assistant));
        Self::trim(&mut history);
    }

    // Drops the oldest pair while over the cap so history always starts
    // with a user turn.
    fn trim(history: &mut Vec<Turn>) {
        while history.len() > MAX_TURNS {
            history.drain(..2);
        }
    }

    /// Last `n` turns in original order. Not a mutation; missing sessions
    /// yield an empty history.
    pub fn recent(&self, session_id: &str, n: usize) -> Vec<Turn> {
        self.sessions
            .get(session_id)
            .map(|h| h.iter().skip(h.len().saturating_sub(n)).cloned().collect())
            .unwrap_or_default()
    }

    /// Remove all history for a session. Idempotent.
    pub fn clear(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    pub fn len(&self, session_id: &str) -> usize {
        self.sessions.get(session_id).map(|h| h.len()).unwrap_or(0)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_create_and_append() {
        let store = SessionStore::new();
        assert_eq!(store.len("s1"), 0);
        store.append("s1", Turn::user("hi"));
        assert_eq!(store.len("s1"), 1);
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn test_trim_keeps_pairs() {
        let store = SessionStore::new();
        for i in 0..26 {
            store.append_exchange("s", &format!("u{}", i), &format!("a{}", i));
        }
        assert_eq!(store.len("s"), MAX_TURNS);
        let history = store.recent("s", MAX_TURNS);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "u1");
        assert_eq!(history.last().unwrap().content, "a25");
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let store = SessionStore::new();
        store.append_exchange("s", "first", "second");
        store.append_exchange("s", "third", "fourth");
        let recent = store.recent("s", 2);
        assert_eq!(recent[0].content, "third");
        assert_eq!(recent[1].content, "fourth");
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = SessionStore::new();
        store.append("s", Turn::user("hi"));
        store.clear("s");
        store.clear("s");
        assert_eq!(store.len("s"), 0);
    }

    #[test]
    fn test_ids_never_merge() {
        let store = SessionStore::new();
        store.append("a", Turn::user("one"));
        store.append("A", Turn::user("two"));
        assert_eq!(store.len("a"), 1);
        assert_eq!(store.len("A"), 1);
    }
}
