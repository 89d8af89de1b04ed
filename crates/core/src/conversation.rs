//! Conversation session, context blob and transcript messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::qualification::{AnswerMap, Category, QualificationStep};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Active,
    /// Human takeover; the engine does not advance a paused session
    Paused,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(SessionStatus::Active),
            "paused" => Some(SessionStatus::Paused),
            "closed" => Some(SessionStatus::Closed),
            _ => None,
        }
    }
}

/// Speaker of a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    User,
    Assistant,
}

/// One transcript line as stored in the session context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: TranscriptRole,
    pub content: String,
}

impl TranscriptEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TranscriptRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TranscriptRole::Assistant,
            content: content.into(),
        }
    }
}

/// Provisional natural-language values gathered by the conversational strategy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedInfo {
    #[serde(default)]
    pub net_worth: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub interest: Option<String>,
}

impl CollectedInfo {
    pub fn get(&self, category: Category) -> Option<&str> {
        let value = match category {
            Category::NetWorth => &self.net_worth,
            Category::Objective => &self.objective,
            Category::Urgency => &self.urgency,
            Category::Interest => &self.interest,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// Categories with no usable signal yet, in question order
    pub fn missing(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.get(*c).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Keep previously gathered values the newer analysis did not mention
    pub fn merge(&mut self, newer: CollectedInfo) {
        for (slot, value) in [
            (&mut self.net_worth, newer.net_worth),
            (&mut self.objective, newer.objective),
            (&mut self.urgency, newer.urgency),
            (&mut self.interest, newer.interest),
        ] {
            if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
                *slot = Some(v);
            }
        }
    }
}

/// Persisted session context
///
/// Round-trips through storage. Keys this version does not know about are
/// kept in `extra` so read-modify-write cycles preserve them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default)]
    pub current_step: QualificationStep,
    #[serde(default)]
    pub answers: AnswerMap,
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_info: Option<CollectedInfo>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionContext {
    pub fn from_json(value: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(value)?)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Number of user replies in the transcript
    pub fn user_turns(&self) -> usize {
        self.transcript
            .iter()
            .filter(|e| e.role == TranscriptRole::User)
            .count()
    }
}

/// One qualification attempt for a lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
    pub lead_id: String,
    pub status: SessionStatus,
    pub step: QualificationStep,
    pub context: SessionContext,
    /// Incremented by the store on every successful write
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    /// New active session at `start`
    pub fn new(lead_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            lead_id: lead_id.into(),
            status: SessionStatus::Active,
            step: QualificationStep::Start,
            context: SessionContext::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the context and mirror its step onto the session
    pub fn apply_context(&mut self, context: SessionContext) {
        self.step = context.current_step;
        if self.step.is_terminal() {
            self.status = SessionStatus::Closed;
        }
        self.context = context;
        self.updated_at = Utc::now();
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.status, SessionStatus::Closed)
    }
}

/// Message direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

impl MessageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageDirection::Inbound => "inbound",
            MessageDirection::Outbound => "outbound",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inbound" => Some(MessageDirection::Inbound),
            "outbound" => Some(MessageDirection::Outbound),
            _ => None,
        }
    }
}

/// Message content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Media,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Media => "media",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(MessageType::Text),
            "media" => Some(MessageType::Media),
            _ => None,
        }
    }
}

/// Immutable, append-only transcript record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub direction: MessageDirection,
    pub content: String,
    pub message_type: MessageType,
    pub transport_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn inbound(
        session_id: impl Into<String>,
        content: impl Into<String>,
        message_type: MessageType,
        transport_message_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            direction: MessageDirection::Inbound,
            content: content.into(),
            message_type,
            transport_message_id,
            created_at: Utc::now(),
        }
    }

    pub fn outbound(
        session_id: impl Into<String>,
        content: impl Into<String>,
        transport_message_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            direction: MessageDirection::Outbound,
            content: content.into(),
            message_type: MessageType::Text,
            transport_message_id,
            created_at: Utc::now(),
        }
    }
}
