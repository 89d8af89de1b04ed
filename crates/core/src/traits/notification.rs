//! Notification channel capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::lead::Lead;
use crate::notification::NotificationPayload;
use crate::Result;

/// Successful channel outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelOutcome {
    Delivered,
    /// Channel not configured; counts as success
    Skipped,
}

/// A downstream notification channel (email, CRM, audit log)
#[async_trait]
pub trait NotificationChannel: Send + Sync + 'static {
    /// Stable channel name used as the key in fan-out reports
    fn name(&self) -> &str;

    async fn deliver(&self, payload: &NotificationPayload) -> Result<ChannelOutcome>;

    /// A lead was created from an inbound message. Channels without an
    /// intake step skip it.
    async fn intake(&self, _lead: &Lead) -> Result<ChannelOutcome> {
        Ok(ChannelOutcome::Skipped)
    }
}
