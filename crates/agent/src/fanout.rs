//! Completion fan-out
//!
//! Records the verdict on the lead, then hands qualified leads to every
//! notification channel. Channels run concurrently; one failing never stops
//! the others or undoes the verdict.
//!
//! Leads created from inbound messages go through the same channels as an
//! intake event.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use lead_qualifier_config::QuestionCatalog;
use lead_qualifier_core::{
    ChannelOutcome, Lead, LeadStore, NotificationChannel, NotificationPayload, QualificationResult,
};

use crate::metrics::record_channel_failure;
use crate::AgentError;

/// Per-channel delivery summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanoutReport {
    pub qualified: bool,
    pub score: u8,
    /// Channel name to success; skipped channels count as success
    pub channels: BTreeMap<String, bool>,
}

pub struct CompletionFanout {
    leads: Arc<dyn LeadStore>,
    channels: Vec<Arc<dyn NotificationChannel>>,
    catalog: Arc<QuestionCatalog>,
}

impl CompletionFanout {
    pub fn new(
        leads: Arc<dyn LeadStore>,
        channels: Vec<Arc<dyn NotificationChannel>>,
        catalog: Arc<QuestionCatalog>,
    ) -> Self {
        Self {
            leads,
            channels,
            catalog,
        }
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name().to_string()).collect()
    }

    pub async fn complete(
        &self,
        lead: &Lead,
        result: &QualificationResult,
    ) -> Result<FanoutReport, AgentError> {
        let mut updated = lead.clone();
        updated.record_verdict(result.score, result.qualified);
        self.leads.update_lead(&updated).await?;

        tracing::info!(
            lead_id = %updated.id,
            score = updated.score,
            status = updated.status.as_str(),
            "Lead verdict recorded"
        );

        let mut report = FanoutReport {
            qualified: result.qualified,
            score: updated.score,
            channels: BTreeMap::new(),
        };
        if !result.qualified {
            return Ok(report);
        }

        let summary = if result.notes.is_empty() {
            self.catalog.summarize(&result.answers)
        } else {
            result.notes.clone()
        };
        let payload = NotificationPayload::new(&updated, &result.answers, true, summary);

        let deliveries = self.channels.iter().map(|channel| {
            let payload = &payload;
            async move { (channel.name().to_string(), channel.deliver(payload).await) }
        });
        report.channels = settle(&updated.id, join_all(deliveries).await);

        Ok(report)
    }

    /// Announce a lead created from an inbound message
    pub async fn intake(&self, lead: &Lead) -> BTreeMap<String, bool> {
        let intakes = self.channels.iter().map(|channel| async move {
            (channel.name().to_string(), channel.intake(lead).await)
        });
        settle(&lead.id, join_all(intakes).await)
    }
}

/// Log failures; skipped channels count as success
fn settle(
    lead_id: &str,
    outcomes: Vec<(String, lead_qualifier_core::Result<ChannelOutcome>)>,
) -> BTreeMap<String, bool> {
    outcomes
        .into_iter()
        .map(|(name, outcome)| {
            let ok = match outcome {
                Ok(ChannelOutcome::Delivered) => true,
                Ok(ChannelOutcome::Skipped) => {
                    tracing::debug!(channel = %name, lead_id, "Channel skipped");
                    true
                }
                Err(e) => {
                    tracing::error!(channel = %name, lead_id, error = %e, "Notification channel failed");
                    record_channel_failure(&name);
                    false
                }
            };
            (name, ok)
        })
        .collect()
}
