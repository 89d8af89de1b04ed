//! Consultant email channel
//!
//! Sends an HTML summary of the qualified lead over SMTP (STARTTLS). When no
//! SMTP host is configured the channel runs in log-only mode.

use async_trait::async_trait;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use lead_qualifier_config::EmailConfig;
use lead_qualifier_core::{ChannelOutcome, NotificationChannel, NotificationPayload, Result};

use crate::IntegrationError;

enum Mailer {
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    },
    LogOnly,
}

pub struct EmailChannel {
    mailer: Mailer,
    consultant: Mailbox,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig) -> std::result::Result<Self, IntegrationError> {
        let consultant: Mailbox = config.consultant_email.parse().map_err(|e| {
            IntegrationError::Configuration(format!(
                "invalid consultant email '{}': {}",
                config.consultant_email, e
            ))
        })?;

        let mailer = match config.smtp_host.as_deref().filter(|h| !h.trim().is_empty()) {
            Some(host) => {
                let sender = config
                    .from_address
                    .as_deref()
                    .or(config.smtp_user.as_deref())
                    .ok_or_else(|| {
                        IntegrationError::Configuration(
                            "email.from_address or email.smtp_user is required".to_string(),
                        )
                    })?;
                let from: Mailbox = sender.parse().map_err(|e| {
                    IntegrationError::Configuration(format!("invalid sender '{}': {}", sender, e))
                })?;

                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(|e| IntegrationError::Configuration(e.to_string()))?
                    .port(config.smtp_port);
                if let (Some(user), Some(password)) = (&config.smtp_user, &config.smtp_password) {
                    builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
                }

                tracing::info!(host = %host, port = config.smtp_port, "SMTP email channel configured");
                Mailer::Smtp {
                    transport: builder.build(),
                    from,
                }
            }
            None => {
                tracing::warn!("SMTP not configured, email channel will only log");
                Mailer::LogOnly
            }
        };

        Ok(Self { mailer, consultant })
    }

    pub fn is_log_only(&self) -> bool {
        matches!(self.mailer, Mailer::LogOnly)
    }
}

pub(crate) fn subject(payload: &NotificationPayload) -> String {
    let name = if payload.name.trim().is_empty() {
        "Sem nome"
    } else {
        payload.name.as_str()
    };
    format!("🎯 Lead Qualificado: {}", name)
}

fn score_label(score: u8) -> &'static str {
    if score >= 90 {
        "EXCELENTE"
    } else if score >= 80 {
        "MUITO BOM"
    } else {
        "BOM"
    }
}

pub(crate) fn plain_body(payload: &NotificationPayload) -> String {
    format!(
        "Lead qualificado\n\nScore: {}/100 - {}\nNome: {}\nEmail: {}\nTelefone: {}\nOrigem: {}\n\n{}\n\nContato: https://wa.me/{}",
        payload.score,
        score_label(payload.score),
        payload.name,
        payload.email.as_deref().unwrap_or("Não informado"),
        payload.phone,
        payload.source,
        payload.summary,
        payload.phone.trim_start_matches('+'),
    )
}

fn html_body(payload: &NotificationPayload) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Lead Qualificado</title></head>
<body style="font-family: sans-serif;">
  <h1>🎯 Lead Qualificado</h1>
  <p><strong>SCORE: {score}/100 - {label}</strong></p>
  <table>
    <tr><td>Nome:</td><td>{name}</td></tr>
    <tr><td>Email:</td><td>{email}</td></tr>
    <tr><td>Telefone:</td><td>{phone}</td></tr>
    <tr><td>Origem:</td><td>{source}</td></tr>
  </table>
  <p>{summary}</p>
  <p><a href="https://wa.me/{wa}">📱 Entrar em contato via WhatsApp</a></p>
</body>
</html>"#,
        score = payload.score,
        label = score_label(payload.score),
        name = payload.name,
        email = payload.email.as_deref().unwrap_or("Não informado"),
        phone = payload.phone,
        source = payload.source,
        summary = payload.summary,
        wa = payload.phone.trim_start_matches('+'),
    )
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, payload: &NotificationPayload) -> Result<ChannelOutcome> {
        let (transport, from) = match &self.mailer {
            Mailer::Smtp { transport, from } => (transport, from),
            Mailer::LogOnly => {
                tracing::info!(
                    lead_id = %payload.lead_id,
                    to = %self.consultant,
                    subject = %subject(payload),
                    "Email simulated (SMTP not configured)"
                );
                return Ok(ChannelOutcome::Delivered);
            }
        };

        let message = Message::builder()
            .from(from.clone())
            .to(self.consultant.clone())
            .subject(subject(payload))
            .multipart(MultiPart::alternative_plain_html(
                plain_body(payload),
                html_body(payload),
            ))
            .map_err(|e| IntegrationError::Email(e.to_string()))?;

        transport
            .send(message)
            .await
            .map_err(|e| IntegrationError::Email(e.to_string()))?;

        tracing::info!(lead_id = %payload.lead_id, to = %self.consultant, "Qualified lead email sent");
        Ok(ChannelOutcome::Delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_qualifier_core::{AnswerMap, Lead};

    fn payload(score: u8) -> NotificationPayload {
        let mut lead = Lead::new("default", "Maria", "+5511999990000", "whatsapp");
        lead.record_verdict(score, true);
        NotificationPayload::new(&lead, &AnswerMap::new(), true, "Patrimônio: X".to_string())
    }

    #[test]
    fn test_subject_and_body() {
        let p = payload(92);
        assert_eq!(subject(&p), "🎯 Lead Qualificado: Maria");
        let body = plain_body(&p);
        assert!(body.contains("Score: 92/100 - EXCELENTE"));
        assert!(body.contains("Email: Não informado"));
        assert!(body.contains("https://wa.me/5511999990000"));
        assert_eq!(score_label(80), "MUITO BOM");
        assert_eq!(score_label(70), "BOM");
    }

    #[test]
    fn test_invalid_consultant_rejected() {
        let config = EmailConfig {
            consultant_email: "not an address".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            EmailChannel::new(&config),
            Err(IntegrationError::Configuration(_))
        ));
    }

    #[test]
    fn test_smtp_requires_sender() {
        let config = EmailConfig {
            smtp_host: Some("smtp.exemplo.com".to_string()),
            ..Default::default()
        };
        assert!(EmailChannel::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_log_only_mode_delivers() {
        let channel = EmailChannel::new(&EmailConfig::default()).unwrap();
        assert!(channel.is_log_only());
        let outcome = channel.deliver(&payload(75)).await.unwrap();
        assert_eq!(outcome, ChannelOutcome::Delivered);
    }
}
