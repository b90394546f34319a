//! Conversation store: the single owner of client-side conversation state.
//!
//! UI intents (create, select, send) come in as method calls; anything that
//! needs server data goes through the injected `PodDoctorApi`, and the result
//! is applied as one or more `Action`s. State lives in a `watch` channel so
//! observers get each transition whole and in order.
//!
//! `create_session`, `open_session` and `send_message` are serialized by an
//! async operation lock: a second call waits until the first has applied its
//! result, so results land in call order.

use tokio::sync::{watch, Mutex};

use crate::gateway::{HealthStatus, PodDoctorApi};
use crate::error::GatewayError;
use crate::models::{Message, Session};

use super::state::{reduce, Action, StoreState};

/// How a `send_message` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server's session snapshot was adopted.
    Delivered,
    /// The gateway failed; a synthetic assistant message explains why.
    Failed,
    /// No session could be created. Nothing was appended and the caller
    /// still owns the text.
    Aborted,
}

pub struct ConversationStore<A: PodDoctorApi> {
    api: A,
    state: watch::Sender<StoreState>,
    op_lock: Mutex<()>,
}

impl<A: PodDoctorApi> ConversationStore<A> {
    pub fn new(api: A) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            api,
            state,
            op_lock: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    pub fn current_session(&self) -> Option<Session> {
        self.state.borrow().current_session.clone()
    }

    /// Observe every applied transition.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    fn dispatch(&self, action: Action) {
        self.state.send_modify(|state| reduce(state, action));
    }

    fn fail(&self, err: &GatewayError) -> String {
        let message = err.to_string();
        self.dispatch(Action::SetError(Some(message.clone())));
        message
    }

    /// Load the known sessions. Failure leaves the set empty.
    pub async fn initialize(&self) {
        match self.api.list_sessions().await {
            Ok(sessions) => {
                tracing::info!(count = sessions.len(), "Loaded sessions");
                self.dispatch(Action::SetSessions(sessions));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load sessions, starting empty");
            }
        }
    }

    /// Create a session on the server, falling back to a local one so the
    /// user is never blocked. Always ends with an active session.
    pub async fn create_session(&self, name: Option<&str>) {
        let _guard = self.op_lock.lock().await;

        self.dispatch(Action::SetLoading(true));
        self.dispatch(Action::SetError(None));

        if let Err(e) = self.create_remote(name).await {
            let message = self.fail(&e);
            tracing::warn!(error = %message, "Session creation failed, using a local session");
            self.dispatch(Action::CreateSession {
                name: name.map(str::to_string),
            });
        }

        self.dispatch(Action::SetLoading(false));
    }

    async fn create_remote(&self, name: Option<&str>) -> Result<String, GatewayError> {
        let session = self.api.create_session(name).await?;
        let id = session.id.clone();
        tracing::info!(session_id = %id, "Adopted server session");
        self.dispatch(Action::SetCurrentSession(session));
        Ok(id)
    }

    /// Local lookup only. Returns whether a session is now active.
    pub fn select_session(&self, id: &str) -> bool {
        self.dispatch(Action::SelectSession(id.to_string()));
        self.state.borrow().current_session.is_some()
    }

    /// Fetch a session from the server and make it active. On failure the
    /// error is recorded and a known session with that id is selected
    /// instead, if any.
    pub async fn open_session(&self, id: &str) -> bool {
        let _guard = self.op_lock.lock().await;

        self.dispatch(Action::SetLoading(true));
        self.dispatch(Action::SetError(None));

        let opened = match self.api.get_session(id).await {
            Ok(session) => {
                self.dispatch(Action::SetCurrentSession(session));
                true
            }
            Err(e) => {
                self.fail(&e);
                self.select_session(id)
            }
        };

        self.dispatch(Action::SetLoading(false));
        opened
    }

    pub async fn send_message(&self, content: &str) -> SendOutcome {
        let _guard = self.op_lock.lock().await;

        let existing = self.state.borrow().current_session_id().map(str::to_string);
        let session_id = match existing {
            Some(id) => id,
            None => {
                self.dispatch(Action::SetLoading(true));
                self.dispatch(Action::SetError(None));
                match self.create_remote(None).await {
                    Ok(id) => id,
                    Err(e) => {
                        let message = self.fail(&e);
                        tracing::warn!(error = %message, "No session available, message not sent");
                        self.dispatch(Action::SetLoading(false));
                        return SendOutcome::Aborted;
                    }
                }
            }
        };

        // Optimistic: the user's text is visible before the round-trip.
        self.dispatch(Action::AddMessage(Message::user(content)));
        self.dispatch(Action::SetLoading(true));
        self.dispatch(Action::SetError(None));

        let outcome = match self.api.send_message(content, Some(&session_id)).await {
            Ok(response) => {
                let missing = !response.session.contains_message(&response.message.id);
                self.dispatch(Action::SetCurrentSession(response.session));
                if missing {
                    tracing::debug!(
                        message_id = %response.message.id,
                        "Assistant message missing from snapshot, appending"
                    );
                    self.dispatch(Action::AddMessage(response.message));
                }
                SendOutcome::Delivered
            }
            Err(e) => {
                let message = self.fail(&e);
                tracing::warn!(session_id = %session_id, error = %message, "Send failed");
                self.dispatch(Action::AddMessage(Message::assistant(format!(
                    "I apologize, but I encountered an error: {}. Please try again.",
                    message
                ))));
                SendOutcome::Failed
            }
        };

        self.dispatch(Action::SetLoading(false));
        outcome
    }

    pub async fn health_check(&self) -> Result<HealthStatus, GatewayError> {
        self.api.health_check().await
    }
}
