//! Payload handed to notification channels when a lead completes qualification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lead::Lead;
use crate::qualification::{AnswerMap, Category};

/// Canonical answers by category, as letters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAnswers {
    pub net_worth: Option<String>,
    pub objective: Option<String>,
    pub urgency: Option<String>,
    pub interest: Option<String>,
}

impl From<&AnswerMap> for NotificationAnswers {
    fn from(answers: &AnswerMap) -> Self {
        let letter = |c: Category| answers.get(&c).map(|a| a.as_str().to_string());
        Self {
            net_worth: letter(Category::NetWorth),
            objective: letter(Category::Objective),
            urgency: letter(Category::Urgency),
            interest: letter(Category::Interest),
        }
    }
}

/// Notification payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub lead_id: String,
    pub tenant_id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub score: u8,
    pub qualified: bool,
    pub answers: NotificationAnswers,
    pub qualified_at: Option<DateTime<Utc>>,
    pub source: String,
    /// Human-readable answer summary, e.g. `Patrimônio: Mais de R$ 500 mil | ...`
    pub summary: String,
}

impl NotificationPayload {
    /// Build from an updated lead and its answers
    pub fn new(lead: &Lead, answers: &AnswerMap, qualified: bool, summary: String) -> Self {
        Self {
            lead_id: lead.id.clone(),
            tenant_id: lead.tenant_id.clone(),
            name: lead.name.clone(),
            phone: lead.phone.clone(),
            email: lead.email.clone(),
            score: lead.score,
            qualified,
            answers: NotificationAnswers::from(answers),
            qualified_at: lead.qualified_at,
            source: lead.source.clone(),
            summary,
        }
    }
}
