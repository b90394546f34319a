//! Store state and its transition function.
//!
//! Every change to `StoreState` goes through `reduce`, a total match over
//! `Action`. Session merges are keyed by identifier, never by position.

use serde::Serialize;

use crate::models::{Message, Session};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    pub current_session: Option<Session>,
    /// Unique by id. Order is insertion order.
    pub sessions: Vec<Session>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl StoreState {
    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session.as_ref().map(|s| s.id.as_str())
    }

    pub fn find_session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    /// Replace the known set wholesale.
    SetSessions(Vec<Session>),
    /// Make `session` active and merge it into the known set by id.
    SetCurrentSession(Session),
    /// Activate a known session, or clear the selection if unknown.
    SelectSession(String),
    /// Append to the active session; dropped when none is active.
    AddMessage(Message),
    /// Synthesize a local session, make it active and prepend it.
    CreateSession { name: Option<String> },
    SetLoading(bool),
    SetError(Option<String>),
}

pub fn reduce(state: &mut StoreState, action: Action) {
    match action {
        Action::SetSessions(sessions) => {
            state.sessions = sessions;
        }
        Action::SetCurrentSession(session) => {
            match state.sessions.iter_mut().find(|s| s.id == session.id) {
                Some(existing) => *existing = session.clone(),
                None => state.sessions.push(session.clone()),
            }
            state.current_session = Some(session);
        }
        Action::SelectSession(id) => {
            state.current_session = state.find_session(&id).cloned();
        }
        Action::AddMessage(message) => {
            let Some(current) = state.current_session.as_mut() else {
                tracing::debug!("Dropping message: no active session");
                return;
            };
            current.push_message(message);
            let updated = current.clone();
            if let Some(known) = state.sessions.iter_mut().find(|s| s.id == updated.id) {
                *known = updated;
            }
        }
        Action::CreateSession { name } => {
            let session = Session::local(name.as_deref());
            state.sessions.insert(0, session.clone());
            state.current_session = Some(session);
        }
        Action::SetLoading(loading) => {
            state.is_loading = loading;
        }
        Action::SetError(error) => {
            state.error = error;
        }
    }
}
