//! Plain-text rendering of sessions and messages.
//!
//! Pure functions over core types: nothing here touches the store or the
//! network, which keeps the output format unit-testable.

use chrono::{DateTime, Local, Utc};
use podscription_core::{IntentCategory, Message, Role, Session};

const PREVIEW_CHARS: usize = 30;

/// "Just now" under an hour, "<n>h ago" under a day, else the date.
pub fn format_relative(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - at).num_minutes() as f64 / 60.0;
    if hours < 1.0 {
        "Just now".to_string()
    } else if hours < 24.0 {
        format!("{}h ago", hours.floor() as i64)
    } else {
        at.format("%Y-%m-%d").to_string()
    }
}

/// Icon for the history list, keyed on the last reply's category.
pub fn session_icon(session: &Session) -> &'static str {
    let category = session
        .last_message()
        .filter(|m| m.role == Role::Assistant)
        .and_then(|m| m.intent.as_ref())
        .map(|i| i.category);

    match category {
        Some(IntentCategory::PodIssues) => "🔴",
        Some(IntentCategory::Networking) => "🌐",
        Some(IntentCategory::Storage) => "💾",
        Some(IntentCategory::Performance) => "⚡",
        Some(IntentCategory::Rbac) => "🔐",
        _ => "📋",
    }
}

pub fn preview(content: &str) -> String {
    let mut out: String = content.chars().take(PREVIEW_CHARS).collect();
    if content.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

/// One history entry: icon, name, id, then counts and a last-message preview.
pub fn history_entry(session: &Session, current_id: Option<&str>, now: DateTime<Utc>) -> String {
    let marker = if current_id == Some(session.id.as_str()) { "*" } else { " " };
    let mut out = format!(
        "{} {} {}  ({})\n    {} messages • {}",
        marker,
        session_icon(session),
        session.name,
        session.id,
        session.messages.len(),
        format_relative(session.updated_at, now)
    );
    if let Some(last) = session.last_message() {
        out.push_str(&format!("\n    Last: {}", preview(&last.content)));
    }
    out
}

fn clock(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S").to_string()
}

pub fn render_message(message: &Message) -> String {
    match message.role {
        Role::User => format!("[{}] You: {}", clock(message.timestamp), message.content),
        Role::Assistant => render_card(message),
    }
}

/// Assistant reply as a prescription card. Falls back to the raw content
/// when the reply carries no structured prescription.
pub fn render_card(message: &Message) -> String {
    let mut header = String::from("👨‍⚕️ Pod Doctor");
    if let Some(intent) = &message.intent {
        header.push_str(&format!(" [{}]", intent.category.label()));
    }
    let mut lines = vec![
        header,
        format!(
            "   {} • Confidence: {}%",
            clock(message.timestamp),
            message.confidence_percent()
        ),
    ];

    match &message.prescription {
        Some(rx) => {
            lines.push(format!("🔍 Diagnosis: {}", rx.diagnosis));
            lines.push(format!("💊 Treatment: {}", rx.treatment));
            if let Some(commands) = rx.commands.as_ref().filter(|c| !c.is_empty()) {
                lines.push("⚙️ Commands:".to_string());
                for (i, cmd) in commands.iter().enumerate() {
                    lines.push(format!("   {}. {}", i + 1, cmd));
                }
            }
            if let Some(follow_up) = &rx.follow_up {
                lines.push(format!("📋 Follow-up: {}", follow_up));
            }
        }
        None => lines.push(message.content.clone()),
    }

    lines.join("\n")
}

pub fn render_transcript(session: &Session) -> String {
    let mut out = format!("{} ({})\n", session.name, session.id);
    if session.messages.is_empty() {
        out.push_str("\nWelcome to Podscription. Describe your pod symptoms and the Pod Doctor will diagnose them.\n");
    }
    for message in &session.messages {
        out.push('\n');
        out.push_str(&render_message(message));
        out.push('\n');
    }
    out
}
