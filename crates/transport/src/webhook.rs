//! Inbound Twilio webhook payload

use serde::Deserialize;

use lead_qualifier_core::InboundMessage;

/// Form fields Twilio posts for an incoming WhatsApp message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwilioWebhook {
    #[serde(rename = "From")]
    pub from: String,

    #[serde(rename = "Body", default)]
    pub body: String,

    #[serde(rename = "MessageSid", default)]
    pub message_sid: Option<String>,

    #[serde(rename = "ProfileName", default)]
    pub profile_name: Option<String>,

    /// Twilio sends this as a decimal string
    #[serde(rename = "NumMedia", default)]
    pub num_media: Option<String>,
}

impl From<TwilioWebhook> for InboundMessage {
    fn from(hook: TwilioWebhook) -> Self {
        InboundMessage {
            text: hook.body,
            sender_address: hook.from,
            transport_message_id: hook.message_sid.filter(|s| !s.is_empty()),
            profile_name: hook.profile_name.filter(|s| !s.trim().is_empty()),
            media_count: hook
                .num_media
                .and_then(|n| n.trim().parse().ok())
                .unwrap_or(0),
        }
    }
}
