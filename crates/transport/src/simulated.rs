//! Simulated transport
//!
//! Messages are NOT sent anywhere. Each send is logged and kept in memory so
//! local runs and tests can inspect the outbound stream.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use lead_qualifier_core::{DeliveryReceipt, MessageTransport, Result};

/// A message handed to the simulated transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub text: String,
    pub transport_message_id: String,
}

#[derive(Default)]
pub struct SimulatedTransport {
    sent: RwLock<Vec<SentMessage>>,
    counter: AtomicU64,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, in order
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.read().clone()
    }
}

#[async_trait]
impl MessageTransport for SimulatedTransport {
    async fn send(&self, to: &str, text: &str) -> Result<DeliveryReceipt> {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let id = format!("SIM_{}_{}", Utc::now().timestamp_millis(), seq);

        tracing::info!(to = %to, message_id = %id, "Message simulated");
        tracing::debug!(to = %to, text = %text, "Simulated message content");

        self.sent.write().push(SentMessage {
            to: to.to_string(),
            text: text.to_string(),
            transport_message_id: id.clone(),
        });

        Ok(DeliveryReceipt::delivered(id))
    }

    fn provider(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_sends_with_unique_ids() {
        let transport = SimulatedTransport::new();
        let first = transport.send("+5511999990000", "Olá").await.unwrap();
        let second = transport.send("+5511999990000", "Tudo bem?").await.unwrap();

        assert!(first.success);
        assert_ne!(first.transport_message_id, second.transport_message_id);
        assert!(first
            .transport_message_id
            .as_deref()
            .is_some_and(|id| id.starts_with("SIM_")));

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].text, "Tudo bem?");
    }
}
