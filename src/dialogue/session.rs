use std::collections::HashMap;

use super::state::FlowState;

#[derive(Debug, Default)]
pub struct Session {
    pub flow: Option<FlowState>,
    pub messages: u64,
}

/// Sessions keyed by conversation id; owned by the daemon state, never global.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `chat_id`, creating it on first contact.
    pub fn touch(&mut self, chat_id: &str) -> &mut Session {
        let session = self.sessions.entry(chat_id.to_string()).or_default();
        session.messages += 1;
        session
    }

    pub fn flow(&self, chat_id: &str) -> Option<&FlowState> {
        self.sessions.get(chat_id).and_then(|s| s.flow.as_ref())
    }

    pub fn set_flow(&mut self, chat_id: &str, state: FlowState) {
        self.sessions.entry(chat_id.to_string()).or_default().flow = Some(state);
    }

    /// Ends the active flow; returns whether one was active.
    pub fn clear_flow(&mut self, chat_id: &str) -> bool {
        self.sessions
            .get_mut(chat_id)
            .and_then(|s| s.flow.take())
            .is_some()
    }

    /// Drops the whole session, e.g. when the transport reports a disconnect.
    pub fn evict(&mut self, chat_id: &str) -> bool {
        self.sessions.remove(chat_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_keeps_session_but_evict_drops_it() {
        let mut store = SessionStore::new();
        store.touch("42");
        store.set_flow("42", FlowState::AddStudents);
        assert_eq!(store.flow("42"), Some(&FlowState::AddStudents));

        assert!(store.clear_flow("42"));
        assert!(!store.clear_flow("42"));
        assert_eq!(store.len(), 1);

        assert!(store.evict("42"));
        assert!(!store.evict("42"));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn sessions_are_isolated_per_chat() {
        let mut store = SessionStore::new();
        store.set_flow("a", FlowState::StatsMode);
        store.set_flow("b", FlowState::GroupName);
        store.clear_flow("a");
        assert_eq!(store.flow("a"), None);
        assert_eq!(store.flow("b"), Some(&FlowState::GroupName));
    }
}
