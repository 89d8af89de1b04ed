//! Qualification orchestrator
//!
//! Drives one inbound message end to end:
//!
//! ```text
//! lead lookup -> lock(lead) -> duplicate/pause/hand-off guards
//!   -> strategy turn -> CAS save -> transport send -> append messages
//!   -> fan-out (on completion)
//! ```
//!
//! A failed send restores the previous session record so the same inbound
//! message replays from the same step.
//!
//! Completion is taken from the strategy's result; the marker in the closing
//! text is only checked for consistency. The session is closed before the
//! verdict reaches the lead, so a closed `complete` session under a lead
//! without a verdict means the fan-out failed. The next call for that lead
//! re-runs it from the stored answers.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use lead_qualifier_config::{QualificationConfig, QuestionCatalog, ScoringTable, StrategyKind};
use lead_qualifier_core::{
    normalize_phone, parse_completion_marker, strip_completion_marker, AnswerMap, CompletionModel,
    ConversationSession, DeliveryReceipt, InboundMessage, Lead, LeadStatus, LeadStore, Message,
    MessageStore, MessageTransport, MessageType, NotificationChannel, QualificationResult,
    QualificationStep, SessionContext, SessionStatus, SessionStore,
};

use crate::fanout::{CompletionFanout, FanoutReport};
use crate::locks::SessionLocks;
use crate::metrics::{record_completion, record_delivery_failure, record_inbound, record_turn_latency};
use crate::scoring::ScoringModel;
use crate::stage::StageMachine;
use crate::strategy::{
    pin_strategy, pinned_strategy, ConversationalStrategy, DeterministicStrategy, StrategySet,
};
use crate::AgentError;

/// What happened to an inbound message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InboundOutcome {
    /// Conversation advanced (or re-prompted) and a reply was delivered
    Replied {
        session_id: String,
        step: QualificationStep,
        reply: String,
    },
    /// Final answer received; verdict recorded and channels notified
    Completed {
        session_id: String,
        reply: String,
        result: QualificationResult,
        report: FanoutReport,
    },
    /// Transport message id already recorded
    Duplicate { transport_message_id: String },
    /// Session paused; message recorded only
    Paused { session_id: String },
    /// Lead already has a verdict and no open session
    HandOff { lead_id: String, status: LeadStatus },
    /// Media without text; recorded, not interpreted
    MediaIgnored { session_id: String },
}

/// Result of a manual start
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartOutcome {
    pub lead_id: String,
    pub session_id: String,
    pub step: QualificationStep,
    pub message: String,
}

/// Read-only projection of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub id: String,
    pub lead_id: String,
    pub status: SessionStatus,
    pub step: QualificationStep,
    pub strategy: Option<StrategyKind>,
    pub answers: AnswerMap,
    pub transcript_len: usize,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ConversationSession> for SessionView {
    fn from(session: &ConversationSession) -> Self {
        Self {
            id: session.id.clone(),
            lead_id: session.lead_id.clone(),
            status: session.status,
            step: session.step,
            strategy: pinned_strategy(&session.context),
            answers: session.context.answers.clone(),
            transcript_len: session.context.transcript.len(),
            version: session.version,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// What to do with the saved session when the transport fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compensation {
    /// Put the previous record back
    Restore,
    /// Close a session that was opened for this send
    Close,
}

pub struct QualificationEngine {
    config: Arc<QualificationConfig>,
    leads: Arc<dyn LeadStore>,
    sessions: Arc<dyn SessionStore>,
    messages: Arc<dyn MessageStore>,
    transport: Arc<dyn MessageTransport>,
    strategies: StrategySet,
    scoring: ScoringModel,
    fanout: CompletionFanout,
    locks: SessionLocks,
}

impl QualificationEngine {
    pub fn builder(config: QualificationConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn config(&self) -> &QualificationConfig {
        &self.config
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.fanout.channel_names()
    }

    pub fn transport_provider(&self) -> &str {
        self.transport.provider()
    }

    /// Leads with a turn in progress or waiting
    pub fn busy_leads(&self) -> usize {
        self.locks.len()
    }

    /// Handle one inbound message.
    ///
    /// `tenant_id` applies only when the sender is unknown and a lead has to
    /// be created; existing leads keep their tenant.
    pub async fn handle_inbound(
        &self,
        inbound: &InboundMessage,
        tenant_id: Option<&str>,
    ) -> Result<InboundOutcome, AgentError> {
        let started = Instant::now();
        record_inbound();

        let outcome = self.process_inbound(inbound, tenant_id).await;
        record_turn_latency(started.elapsed());
        outcome
    }

    async fn process_inbound(
        &self,
        inbound: &InboundMessage,
        tenant_id: Option<&str>,
    ) -> Result<InboundOutcome, AgentError> {
        let phone = normalize_phone(&inbound.sender_address);
        if phone.is_empty() {
            return Err(AgentError::InvalidInput(format!(
                "sender address '{}' has no phone number",
                inbound.sender_address
            )));
        }
        let tenant = tenant_id.unwrap_or(&self.config.default_tenant_id);

        let lead = self
            .find_or_create_lead(tenant, &phone, inbound.profile_name.as_deref())
            .await?;
        let _guard = self.locks.acquire(&lead.id).await;

        // Re-read under the lock; a concurrent completion may have changed it
        let lead = self
            .leads
            .get_lead(&lead.id)
            .await?
            .ok_or_else(|| AgentError::LeadNotFound(lead.id.clone()))?;
        // Before the duplicate check, so a provider retry of the final answer
        // also records the verdict
        let lead = self.recover_verdict(lead).await?;

        if let Some(tid) = inbound.transport_message_id.as_deref() {
            if self.messages.has_transport_message(tid).await? {
                tracing::info!(lead_id = %lead.id, transport_message_id = tid, "Duplicate inbound ignored");
                return Ok(InboundOutcome::Duplicate {
                    transport_message_id: tid.to_string(),
                });
            }
        }

        let session = match self.sessions.find_open_for_lead(&lead.id).await? {
            Some(session) => session,
            None if lead.status.is_final() => {
                tracing::info!(
                    lead_id = %lead.id,
                    status = lead.status.as_str(),
                    "Lead already has a verdict, handing off"
                );
                return Ok(InboundOutcome::HandOff {
                    lead_id: lead.id,
                    status: lead.status,
                });
            }
            None => self.open_session(&lead).await?,
        };

        if session.status == SessionStatus::Paused {
            self.record_inbound_message(&session.id, inbound, MessageType::Text)
                .await?;
            tracing::info!(session_id = %session.id, "Session paused, inbound recorded");
            return Ok(InboundOutcome::Paused {
                session_id: session.id,
            });
        }

        if inbound.is_media_only() {
            self.record_inbound_message(&session.id, inbound, MessageType::Media)
                .await?;
            tracing::debug!(session_id = %session.id, media = inbound.media_count, "Media without text ignored");
            return Ok(InboundOutcome::MediaIgnored {
                session_id: session.id,
            });
        }

        let kind = pinned_strategy(&session.context)
            .unwrap_or_else(|| self.config.strategy_for(&lead.tenant_id));
        let strategy = self.strategies.get(kind)?;
        let turn = strategy
            .respond(&session.context, &inbound.text, &lead.tenant_id)
            .await?;

        let from = session.step;
        let (saved, reply, receipt) = self
            .persist_and_deliver(&session, turn.context, &turn.outbound, &lead.phone, Compensation::Restore)
            .await?;

        self.record_inbound_message(&saved.id, inbound, MessageType::Text)
            .await?;
        self.messages
            .append_message(&Message::outbound(
                &saved.id,
                reply.clone(),
                receipt.transport_message_id,
            ))
            .await?;

        tracing::info!(
            session_id = %saved.id,
            lead_id = %lead.id,
            from = %from,
            to = %saved.step,
            "Turn processed"
        );

        let Some(result) = turn.result else {
            return Ok(InboundOutcome::Replied {
                session_id: saved.id,
                step: saved.step,
                reply,
            });
        };

        if parse_completion_marker(&turn.outbound) != Some(result.score) {
            tracing::warn!(
                session_id = %saved.id,
                score = result.score,
                "Closing message does not carry the computed score"
            );
        }

        record_completion(result.qualified);
        // On failure the closed session stays behind for `recover_verdict`
        let report = self.fanout.complete(&lead, &result).await?;
        tracing::info!(
            session_id = %saved.id,
            lead_id = %lead.id,
            score = result.score,
            qualified = result.qualified,
            "Qualification complete"
        );

        Ok(InboundOutcome::Completed {
            session_id: saved.id,
            reply,
            result,
            report,
        })
    }

    /// Open a session for a lead and deliver the opening message
    pub async fn start_qualification(
        &self,
        lead_id: &str,
        phone: Option<&str>,
    ) -> Result<StartOutcome, AgentError> {
        let lead = self
            .leads
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| AgentError::LeadNotFound(lead_id.to_string()))?;
        let _guard = self.locks.acquire(&lead.id).await;

        if let Some(active) = self.sessions.find_open_for_lead(&lead.id).await? {
            return Err(AgentError::SessionAlreadyActive(active.id));
        }
        let lead = self.recover_verdict(lead).await?;

        let address = phone
            .map(normalize_phone)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| lead.phone.clone());

        let session = self.open_session(&lead).await?;
        let kind = pinned_strategy(&session.context)
            .unwrap_or_else(|| self.config.strategy_for(&lead.tenant_id));
        let turn = self
            .strategies
            .get(kind)?
            .opening(&session.context, &lead.tenant_id)
            .await?;

        let (saved, message, receipt) = self
            .persist_and_deliver(&session, turn.context, &turn.outbound, &address, Compensation::Close)
            .await?;
        self.messages
            .append_message(&Message::outbound(
                &saved.id,
                message.clone(),
                receipt.transport_message_id,
            ))
            .await?;

        tracing::info!(session_id = %saved.id, lead_id = %lead.id, strategy = ?kind, "Qualification started");

        Ok(StartOutcome {
            lead_id: lead.id,
            session_id: saved.id,
            step: saved.step,
            message,
        })
    }

    /// Stop interpreting inbound messages for a session
    pub async fn pause_session(&self, session_id: &str) -> Result<SessionView, AgentError> {
        self.set_status(session_id, SessionStatus::Active, SessionStatus::Paused)
            .await
    }

    pub async fn resume_session(&self, session_id: &str) -> Result<SessionView, AgentError> {
        self.set_status(session_id, SessionStatus::Paused, SessionStatus::Active)
            .await
    }

    pub async fn session_view(&self, session_id: &str) -> Result<SessionView, AgentError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))?;
        Ok(SessionView::from(&session))
    }

    async fn set_status(
        &self,
        session_id: &str,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<SessionView, AgentError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))?;
        let _guard = self.locks.acquire(&session.lead_id).await;

        // Re-read under the lock
        let mut session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))?;

        if session.status == to {
            return Ok(SessionView::from(&session));
        }
        if session.status != from {
            return Err(AgentError::InvalidState(format!(
                "session {} is {}, expected {}",
                session.id,
                session.status.as_str(),
                from.as_str()
            )));
        }

        let expected = session.version;
        session.status = to;
        session.updated_at = Utc::now();
        let saved = self.sessions.save_session(&session, expected).await?;

        tracing::info!(session_id = %saved.id, status = saved.status.as_str(), "Session status changed");
        Ok(SessionView::from(&saved))
    }

    /// Record the verdict of a completed session whose fan-out failed.
    ///
    /// Returns the lead as stored afterwards. Must run under the lead's lock.
    async fn recover_verdict(&self, lead: Lead) -> Result<Lead, AgentError> {
        if lead.status.is_final() || self.sessions.find_open_for_lead(&lead.id).await?.is_some() {
            return Ok(lead);
        }
        let Some(latest) = self.sessions.latest_for_lead(&lead.id).await? else {
            return Ok(lead);
        };
        if latest.step != QualificationStep::Complete {
            return Ok(lead);
        }

        let result = self.scoring.evaluate(&latest.context.answers, String::new());
        tracing::warn!(
            session_id = %latest.id,
            lead_id = %lead.id,
            score = result.score,
            "Completed session without a recorded verdict, retrying fan-out"
        );
        self.fanout.complete(&lead, &result).await?;

        self.leads
            .get_lead(&lead.id)
            .await?
            .ok_or_else(|| AgentError::LeadNotFound(lead.id.clone()))
    }

    async fn find_or_create_lead(
        &self,
        tenant_id: &str,
        phone: &str,
        profile_name: Option<&str>,
    ) -> Result<Lead, AgentError> {
        if let Some(lead) = self.leads.find_by_phone(tenant_id, phone).await? {
            return Ok(lead);
        }

        let name = profile_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(phone);
        let lead = Lead::new(tenant_id, name, phone, self.config.lead_source.as_str());

        match self.leads.create_lead(&lead).await {
            Ok(()) => {
                tracing::info!(lead_id = %lead.id, tenant_id, "Lead created from inbound message");
                let channels = self.fanout.intake(&lead).await;
                tracing::debug!(lead_id = %lead.id, channels = ?channels, "Lead intake announced");
                Ok(lead)
            }
            // Lost a race with another message from the same sender
            Err(e) if e.is_conflict() => self
                .leads
                .find_by_phone(tenant_id, phone)
                .await?
                .ok_or_else(|| AgentError::Conflict(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn open_session(&self, lead: &Lead) -> Result<ConversationSession, AgentError> {
        let kind = self.config.strategy_for(&lead.tenant_id);
        // Fail before anything is written if the strategy is unavailable
        self.strategies.get(kind)?;

        let mut session = ConversationSession::new(&lead.id);
        pin_strategy(&mut session.context, kind);
        let created = self.sessions.create_session(&session).await?;

        if lead.status != LeadStatus::InConversation {
            let mut updated = lead.clone();
            updated.status = LeadStatus::InConversation;
            updated.updated_at = Utc::now();
            self.leads.update_lead(&updated).await?;
        }

        tracing::info!(session_id = %created.id, lead_id = %lead.id, strategy = ?kind, "Session opened");
        Ok(created)
    }

    async fn persist_and_deliver(
        &self,
        previous: &ConversationSession,
        context: SessionContext,
        outbound: &str,
        address: &str,
        compensation: Compensation,
    ) -> Result<(ConversationSession, String, DeliveryReceipt), AgentError> {
        let mut next = previous.clone();
        next.apply_context(context);
        let saved = self.sessions.save_session(&next, previous.version).await?;

        let text = strip_completion_marker(outbound);
        let failure = match self.transport.send(address, &text).await {
            Ok(receipt) if receipt.success => return Ok((saved, text, receipt)),
            Ok(receipt) => receipt
                .error
                .unwrap_or_else(|| "transport rejected the message".to_string()),
            Err(e) => e.to_string(),
        };

        record_delivery_failure();
        tracing::error!(
            session_id = %saved.id,
            provider = self.transport.provider(),
            error = %failure,
            "Outbound delivery failed, rolling back session"
        );

        let mut rollback = previous.clone();
        if compensation == Compensation::Close {
            rollback.status = SessionStatus::Closed;
        }
        rollback.updated_at = Utc::now();
        if let Err(e) = self.sessions.save_session(&rollback, saved.version).await {
            tracing::error!(session_id = %saved.id, error = %e, "Session rollback failed");
        }

        Err(AgentError::Delivery(failure))
    }

    async fn record_inbound_message(
        &self,
        session_id: &str,
        inbound: &InboundMessage,
        message_type: MessageType,
    ) -> Result<(), AgentError> {
        self.messages
            .append_message(&Message::inbound(
                session_id,
                inbound.text.clone(),
                message_type,
                inbound.transport_message_id.clone(),
            ))
            .await?;
        Ok(())
    }
}

/// Assembles a `QualificationEngine`
pub struct EngineBuilder {
    config: QualificationConfig,
    catalog: Option<QuestionCatalog>,
    scoring: Option<ScoringTable>,
    leads: Option<Arc<dyn LeadStore>>,
    sessions: Option<Arc<dyn SessionStore>>,
    messages: Option<Arc<dyn MessageStore>>,
    transport: Option<Arc<dyn MessageTransport>>,
    channels: Vec<Arc<dyn NotificationChannel>>,
    completion: Option<Arc<dyn CompletionModel>>,
}

impl EngineBuilder {
    pub fn new(config: QualificationConfig) -> Self {
        Self {
            config,
            catalog: None,
            scoring: None,
            leads: None,
            sessions: None,
            messages: None,
            transport: None,
            channels: Vec::new(),
            completion: None,
        }
    }

    /// Defaults to the configured catalog file or the built-in copy
    pub fn catalog(mut self, catalog: QuestionCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Defaults to the configured override or the built-in table
    pub fn scoring(mut self, table: ScoringTable) -> Self {
        self.scoring = Some(table);
        self
    }

    pub fn stores(
        mut self,
        leads: Arc<dyn LeadStore>,
        sessions: Arc<dyn SessionStore>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        self.leads = Some(leads);
        self.sessions = Some(sessions);
        self.messages = Some(messages);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn MessageTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn channels(mut self, channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        self.channels = channels;
        self
    }

    pub fn completion_model(mut self, model: Arc<dyn CompletionModel>) -> Self {
        self.completion = Some(model);
        self
    }

    pub fn build(self) -> Result<QualificationEngine, AgentError> {
        let missing = |what: &str| AgentError::Configuration(format!("{} not provided", what));

        let leads = self.leads.ok_or_else(|| missing("lead store"))?;
        let sessions = self.sessions.ok_or_else(|| missing("session store"))?;
        let messages = self.messages.ok_or_else(|| missing("message store"))?;
        let transport = self.transport.ok_or_else(|| missing("transport"))?;

        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => self
                .config
                .question_catalog()
                .map_err(|e| AgentError::Configuration(e.to_string()))?,
        };
        let table = self.scoring.unwrap_or_else(|| self.config.scoring_table());
        table
            .validate()
            .map_err(|e| AgentError::Configuration(e.to_string()))?;

        let catalog = Arc::new(catalog);
        let scoring = ScoringModel::new(Arc::new(table));
        let config = Arc::new(self.config);

        let machine = StageMachine::new(catalog.clone(), scoring.clone());
        let mut strategies = StrategySet::new(Arc::new(DeterministicStrategy::new(machine)));
        match self.completion {
            Some(model) => {
                strategies = strategies.with_natural_language(Arc::new(ConversationalStrategy::new(
                    model,
                    config.clone(),
                    catalog.clone(),
                    scoring.clone(),
                )));
            }
            None if config.uses_natural_language() => {
                return Err(AgentError::Configuration(
                    "natural-language strategy configured without a completion model".to_string(),
                ));
            }
            None => {}
        }

        let fanout = CompletionFanout::new(leads.clone(), self.channels, catalog);

        Ok(QualificationEngine {
            config,
            leads,
            sessions,
            messages,
            transport,
            strategies,
            scoring,
            fanout,
            locks: SessionLocks::new(),
        })
    }
}
