use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Message;

/// A consultation: an append-only, chronological message thread.
///
/// Server-created sessions are adopted verbatim; `Session::local` is the
/// fallback used when the server cannot be reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Synthesize a client-side session with a fresh id.
    pub fn local(name: Option<&str>) -> Self {
        let now = Utc::now();
        let name = match name {
            Some(n) if !n.trim().is_empty() => n.to_string(),
            _ => Self::default_name(now),
        };
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn default_name(now: DateTime<Utc>) -> String {
        format!("Session {}", now.format("%Y-%m-%d"))
    }

    pub fn contains_message(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append and bump `updated_at`, never letting it fall behind `created_at`.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now().max(self.created_at);
    }
}
