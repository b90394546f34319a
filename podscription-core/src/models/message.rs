use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Confidence shown when the backend did not classify a reply.
pub const DEFAULT_CONFIDENCE_PERCENT: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Kubernetes problem area the backend assigned to a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentCategory {
    Networking,
    Storage,
    PodIssues,
    Rbac,
    Performance,
    General,
}

impl IntentCategory {
    pub fn label(&self) -> &'static str {
        match self {
            IntentCategory::Networking => "networking",
            IntentCategory::Storage => "storage",
            IntentCategory::PodIssues => "pod issues",
            IntentCategory::Rbac => "rbac",
            IntentCategory::Performance => "performance",
            IntentCategory::General => "general",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodIntent {
    pub category: IntentCategory,
    /// In [0, 1].
    pub confidence: f64,
    #[serde(default)]
    pub symptoms: Vec<String>,
}

impl PodIntent {
    pub fn confidence_percent(&self) -> u8 {
        (self.confidence * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Structured diagnosis attached to an assistant reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub diagnosis: String,
    pub treatment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<PodIntent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription: Option<Prescription>,
}

impl Message {
    /// A locally authored user message with a fresh id, stamped now.
    pub fn user(content: impl Into<String>) -> Self {
        Self::local(Role::User, content.into())
    }

    /// A locally synthesized assistant message (used for failure notices).
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::local(Role::Assistant, content.into())
    }

    fn local(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: Utc::now(),
            intent: None,
            prescription: None,
        }
    }

    pub fn confidence_percent(&self) -> u8 {
        self.intent
            .as_ref()
            .map(PodIntent::confidence_percent)
            .unwrap_or(DEFAULT_CONFIDENCE_PERCENT)
    }
}
