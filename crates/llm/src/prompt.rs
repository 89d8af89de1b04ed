//! Chat messages and prompt helpers

use lead_qualifier_core::{TranscriptEntry, TranscriptRole};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

static JSON_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid json object regex"));

/// Chat role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message sent to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&TranscriptEntry> for Message {
    fn from(entry: &TranscriptEntry) -> Self {
        match entry.role {
            TranscriptRole::User => Message::user(entry.content.clone()),
            TranscriptRole::Assistant => Message::assistant(entry.content.clone()),
        }
    }
}

/// Build the request: system prompt followed by the conversation history
pub fn build_messages(prompt: &str, history: &[TranscriptEntry]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(Message::system(prompt));
    messages.extend(history.iter().map(Message::from));
    messages
}

/// Render the last `window` transcript entries as `Speaker: text` lines
pub fn format_history(history: &[TranscriptEntry], window: usize, assistant_name: &str) -> String {
    let start = history.len().saturating_sub(window);
    let lines: Vec<String> = history[start..]
        .iter()
        .map(|entry| {
            let speaker = match entry.role {
                TranscriptRole::Assistant => assistant_name,
                TranscriptRole::User => "Cliente",
            };
            format!("{}: {}", speaker, entry.content)
        })
        .collect();

    if lines.is_empty() {
        "Primeira interação".to_string()
    } else {
        lines.join("\n")
    }
}

/// Find the outermost `{...}` in a reply and parse it as JSON.
///
/// Models often wrap JSON in prose or code fences; anything outside the
/// braces is ignored.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let candidate = JSON_OBJECT.find(text)?;
    serde_json::from_str::<Value>(candidate.as_str())
        .ok()
        .filter(|v| v.is_object())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_messages_orders_history() {
        let history = vec![
            TranscriptEntry::assistant("Olá! Sou a Ana."),
            TranscriptEntry::user("Oi, tudo bem?"),
        ];
        let messages = build_messages("system prompt", &history);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[2], Message::user("Oi, tudo bem?"));
    }

    #[test]
    fn test_format_history_window() {
        let history: Vec<TranscriptEntry> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    TranscriptEntry::user(format!("msg {}", i))
                } else {
                    TranscriptEntry::assistant(format!("msg {}", i))
                }
            })
            .collect();

        let formatted = format_history(&history, 6, "Ana");
        assert_eq!(formatted.lines().count(), 6);
        assert!(formatted.starts_with("Cliente: msg 4"));
        assert!(formatted.ends_with("Ana: msg 9"));

        assert_eq!(format_history(&[], 6, "Ana"), "Primeira interação");
    }

    #[test]
    fn test_extract_json_object() {
        let reply = "Claro! Segue a análise:\n```json\n{\"ready\": true, \"confidence\": 90}\n```";
        let value = extract_json_object(reply).unwrap();
        assert_eq!(value["ready"], true);

        assert!(extract_json_object("sem json aqui").is_none());
        assert!(extract_json_object("{ quebrado").is_none());
    }
}
