//! Twilio WhatsApp transport
//!
//! Sends through `POST {api_base}/Accounts/{sid}/Messages.json` with basic
//! auth. Both endpoints are addressed as `whatsapp:+<digits>`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use lead_qualifier_config::TwilioConfig;
use lead_qualifier_core::{DeliveryReceipt, MessageTransport, Result};

use crate::TransportError;

const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Prefix an address with `whatsapp:` unless it already has it
pub fn whatsapp_address(number: &str) -> String {
    if number.starts_with(WHATSAPP_PREFIX) {
        number.to_string()
    } else {
        format!("{}{}", WHATSAPP_PREFIX, number)
    }
}

pub struct TwilioTransport {
    client: Client,
    account_sid: String,
    auth_token: String,
    from: String,
    api_base: String,
}

impl TwilioTransport {
    pub fn new(config: &TwilioConfig) -> std::result::Result<Self, TransportError> {
        let account_sid = required(&config.account_sid, "transport.twilio.account_sid")?;
        let auth_token = required(&config.auth_token, "transport.twilio.auth_token")?;
        let from_number = required(&config.from_number, "transport.twilio.from_number")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| TransportError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            account_sid,
            auth_token,
            from: whatsapp_address(&from_number),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.api_base, self.account_sid)
    }

    async fn post_message(
        &self,
        to: &str,
        text: &str,
    ) -> std::result::Result<DeliveryReceipt, TransportError> {
        let to = whatsapp_address(to);
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("From", self.from.as_str()), ("To", to.as_str()), ("Body", text)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason = serde_json::from_str::<TwilioError>(&body)
                .map(|e| format!("{} (code {})", e.message, e.code.unwrap_or_default()))
                .unwrap_or_else(|_| format!("HTTP {}", status));
            tracing::warn!(to = %to, status = %status, reason = %reason, "Twilio rejected message");
            return Ok(DeliveryReceipt::failed(reason));
        }

        let message: TwilioMessage = serde_json::from_str(&body)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        tracing::info!(to = %to, sid = %message.sid, status = ?message.status, "Message sent via Twilio");
        Ok(DeliveryReceipt::delivered(message.sid))
    }
}

fn required(value: &Option<String>, field: &str) -> std::result::Result<String, TransportError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| TransportError::Configuration(format!("{} is required", field)))
}

#[async_trait]
impl MessageTransport for TwilioTransport {
    async fn send(&self, to: &str, text: &str) -> Result<DeliveryReceipt> {
        Ok(self.post_message(to, text).await?)
    }

    fn provider(&self) -> &str {
        "twilio"
    }
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    #[serde(default)]
    code: Option<u32>,
    message: String,
}
