//! Lead record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lead lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    InConversation,
    Qualified,
    Disqualified,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::InConversation => "in_conversation",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Disqualified => "disqualified",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(LeadStatus::New),
            "in_conversation" => Some(LeadStatus::InConversation),
            "qualified" => Some(LeadStatus::Qualified),
            "disqualified" => Some(LeadStatus::Disqualified),
            _ => None,
        }
    }

    /// A verdict has been reached; inbound messages go to a human
    pub fn is_final(&self) -> bool {
        matches!(self, LeadStatus::Qualified | LeadStatus::Disqualified)
    }
}

/// Prospective customer being qualified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub source: String,
    pub status: LeadStatus,
    /// 0-100
    pub score: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub qualified_at: Option<DateTime<Utc>>,
}

impl Lead {
    pub fn new(
        tenant_id: impl Into<String>,
        name: impl Into<String>,
        phone: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            phone: normalize_phone(&phone.into()),
            email: None,
            source: source.into(),
            status: LeadStatus::New,
            score: 0,
            created_at: now,
            updated_at: now,
            qualified_at: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Record the verdict of a completed qualification
    pub fn record_verdict(&mut self, score: u8, qualified: bool) {
        let now = Utc::now();
        self.score = score.min(100);
        self.updated_at = now;
        if qualified {
            self.status = LeadStatus::Qualified;
            self.qualified_at = Some(now);
        } else {
            self.status = LeadStatus::Disqualified;
        }
    }
}

/// Strip transport prefixes and formatting from a phone number.
///
/// `whatsapp:+55 (11) 99999-0000` becomes `+5511999990000`.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);

    let mut out = String::with_capacity(without_scheme.len());
    for (i, ch) in without_scheme.trim().chars().enumerate() {
        if ch.is_ascii_digit() || (i == 0 && ch == '+') {
            out.push(ch);
        }
    }
    out
}
