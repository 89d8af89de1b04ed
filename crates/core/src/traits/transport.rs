//! Messaging transport capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Inbound message as received from the messaging provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub text: String,
    pub sender_address: String,
    #[serde(default)]
    pub transport_message_id: Option<String>,
    #[serde(default)]
    pub profile_name: Option<String>,
    #[serde(default)]
    pub media_count: u32,
}

impl InboundMessage {
    pub fn text(sender_address: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender_address: sender_address.into(),
            transport_message_id: None,
            profile_name: None,
            media_count: 0,
        }
    }

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.transport_message_id = Some(id.into());
        self
    }

    /// Media attachment with no text to interpret
    pub fn is_media_only(&self) -> bool {
        self.media_count > 0 && self.text.trim().is_empty()
    }
}

/// Provider receipt for an outbound send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub success: bool,
    pub transport_message_id: Option<String>,
    pub error: Option<String>,
}

impl DeliveryReceipt {
    pub fn delivered(transport_message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            transport_message_id: Some(transport_message_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            transport_message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Outbound messaging transport
///
/// A receipt with `success == false` and an `Err` are both delivery failures;
/// the former is a provider rejection, the latter a transport fault.
#[async_trait]
pub trait MessageTransport: Send + Sync + 'static {
    async fn send(&self, to: &str, text: &str) -> Result<DeliveryReceipt>;

    /// Provider name for logging
    fn provider(&self) -> &str;
}
