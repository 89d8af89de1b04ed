//! Messaging transports
//!
//! Outbound delivery goes through the core `MessageTransport` trait:
//! - `TwilioTransport` posts to the Twilio Messages API (WhatsApp)
//! - `SimulatedTransport` logs and records sends without leaving the process
//!
//! `TwilioWebhook` decodes the provider's inbound form payload.

pub mod simulated;
pub mod twilio;
pub mod webhook;

use std::sync::Arc;

use lead_qualifier_config::{TransportConfig, TransportProvider};
use lead_qualifier_core::MessageTransport;
use thiserror::Error;

pub use simulated::{SentMessage, SimulatedTransport};
pub use twilio::{whatsapp_address, TwilioTransport};
pub use webhook::TwilioWebhook;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider rejected message: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err.to_string())
    }
}

impl From<TransportError> for lead_qualifier_core::Error {
    fn from(err: TransportError) -> Self {
        lead_qualifier_core::Error::Transport(err.to_string())
    }
}

/// Build the configured transport
pub fn build_transport(
    config: &TransportConfig,
) -> Result<Arc<dyn MessageTransport>, TransportError> {
    match config.provider {
        TransportProvider::Simulated => {
            tracing::info!("Using simulated messaging transport");
            Ok(Arc::new(SimulatedTransport::new()))
        }
        TransportProvider::Twilio => {
            let transport = TwilioTransport::new(&config.twilio)?;
            tracing::info!("Using Twilio WhatsApp transport");
            Ok(Arc::new(transport))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simulated_by_default() {
        let transport = build_transport(&TransportConfig::default()).unwrap();
        assert_eq!(transport.provider(), "simulated");
    }

    #[test]
    fn test_twilio_requires_credentials() {
        let config = TransportConfig {
            provider: TransportProvider::Twilio,
            ..Default::default()
        };
        assert!(matches!(
            build_transport(&config),
            Err(TransportError::Configuration(_))
        ));
    }
}
