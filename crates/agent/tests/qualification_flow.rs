//! End-to-end tests for the qualification engine
//!
//! Run the orchestrator against in-memory stores, a recording transport and
//! scripted notification channels.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use lead_qualifier_agent::{AgentError, InboundOutcome, QualificationEngine};
use lead_qualifier_config::{QualificationConfig, QuestionCatalog, StrategyKind};
use lead_qualifier_core::{
    parse_completion_marker, Category, CanonicalAnswer, ChannelOutcome, Completion,
    CompletionModel, DeliveryReceipt, InboundMessage, Lead, LeadStatus, LeadStore, MessageDirection,
    MessageTransport, MessageType, NotificationChannel, NotificationPayload, QualificationStep,
    SessionStatus, TranscriptEntry,
};
use lead_qualifier_persistence::{InMemoryLeadStore, InMemoryMessageStore, InMemorySessionStore};
use lead_qualifier_transport::SimulatedTransport;

const PHONE: &str = "whatsapp:+5511999990000";
const NORMALIZED: &str = "+5511999990000";

/// Transport that records sends and can be told to reject them
#[derive(Default)]
struct RecordingTransport {
    sent: RwLock<Vec<(String, String)>>,
    failing: AtomicBool,
    seq: AtomicU64,
}

impl RecordingTransport {
    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn texts(&self) -> Vec<String> {
        self.sent.read().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send(&self, to: &str, text: &str) -> lead_qualifier_core::Result<DeliveryReceipt> {
        if self.failing.load(Ordering::SeqCst) {
            return Ok(DeliveryReceipt::failed("provider unavailable"));
        }
        self.sent.write().push((to.to_string(), text.to_string()));
        let id = self.seq.fetch_add(1, Ordering::SeqCst);
        Ok(DeliveryReceipt::delivered(format!("OUT{}", id)))
    }

    fn provider(&self) -> &str {
        "recording"
    }
}

/// Channel that records payloads and optionally fails
struct ScriptedChannel {
    name: &'static str,
    fail: bool,
    payloads: RwLock<Vec<NotificationPayload>>,
    intakes: RwLock<Vec<String>>,
}

impl ScriptedChannel {
    fn new(name: &'static str, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail,
            payloads: RwLock::new(Vec::new()),
            intakes: RwLock::new(Vec::new()),
        })
    }
}

#[async_trait]
impl NotificationChannel for ScriptedChannel {
    fn name(&self) -> &str {
        self.name
    }

    async fn deliver(
        &self,
        payload: &NotificationPayload,
    ) -> lead_qualifier_core::Result<ChannelOutcome> {
        self.payloads.write().push(payload.clone());
        if self.fail {
            Err(lead_qualifier_core::Error::Notification(format!("{} down", self.name)))
        } else {
            Ok(ChannelOutcome::Delivered)
        }
    }

    async fn intake(&self, lead: &Lead) -> lead_qualifier_core::Result<ChannelOutcome> {
        self.intakes.write().push(lead.id.clone());
        Ok(ChannelOutcome::Delivered)
    }
}

/// Lead store whose verdict writes can be made to fail
#[derive(Default)]
struct FlakyLeads {
    inner: InMemoryLeadStore,
    fail_verdicts: AtomicBool,
}

#[async_trait]
impl LeadStore for FlakyLeads {
    async fn create_lead(&self, lead: &Lead) -> lead_qualifier_core::Result<()> {
        self.inner.create_lead(lead).await
    }

    async fn get_lead(&self, id: &str) -> lead_qualifier_core::Result<Option<Lead>> {
        self.inner.get_lead(id).await
    }

    async fn find_by_phone(
        &self,
        tenant_id: &str,
        phone: &str,
    ) -> lead_qualifier_core::Result<Option<Lead>> {
        self.inner.find_by_phone(tenant_id, phone).await
    }

    async fn update_lead(&self, lead: &Lead) -> lead_qualifier_core::Result<()> {
        if lead.status.is_final() && self.fail_verdicts.load(Ordering::SeqCst) {
            return Err(lead_qualifier_core::Error::Storage("write timed out".into()));
        }
        self.inner.update_lead(lead).await
    }
}

/// Completion model replaying canned replies in order
struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedModel {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        })
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(
        &self,
        _prompt: &str,
        _history: &[TranscriptEntry],
    ) -> lead_qualifier_core::Result<Completion> {
        let text = self
            .replies
            .lock()
            .pop_front()
            .ok_or_else(|| lead_qualifier_core::Error::Llm("script exhausted".into()))?;
        let structured = lead_qualifier_llm::extract_json_object(&text);
        Ok(Completion { text, structured })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

struct Harness {
    engine: Arc<QualificationEngine>,
    leads: Arc<InMemoryLeadStore>,
    sessions: Arc<InMemorySessionStore>,
    messages: Arc<InMemoryMessageStore>,
    transport: Arc<RecordingTransport>,
    email: Arc<ScriptedChannel>,
    crm: Arc<ScriptedChannel>,
}

impl Harness {
    fn new() -> Self {
        Self::build(QualificationConfig::default(), false, None)
    }

    fn build(
        config: QualificationConfig,
        email_fails: bool,
        model: Option<Arc<dyn CompletionModel>>,
    ) -> Self {
        let leads = Arc::new(InMemoryLeadStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let messages = Arc::new(InMemoryMessageStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let email = ScriptedChannel::new("email", email_fails);
        let crm = ScriptedChannel::new("crm", false);

        let channels: Vec<Arc<dyn NotificationChannel>> = vec![email.clone(), crm.clone()];
        let mut builder = QualificationEngine::builder(config)
            .stores(leads.clone(), sessions.clone(), messages.clone())
            .transport(transport.clone())
            .channels(channels);
        if let Some(model) = model {
            builder = builder.completion_model(model);
        }

        Self {
            engine: Arc::new(builder.build().unwrap()),
            leads,
            sessions,
            messages,
            transport,
            email,
            crm,
        }
    }

    async fn say(&self, text: &str) -> Result<InboundOutcome, AgentError> {
        self.engine
            .handle_inbound(&InboundMessage::text(PHONE, text), None)
            .await
    }

    async fn lead(&self) -> Lead {
        self.leads
            .find_by_phone(&QualificationConfig::default().default_tenant_id, NORMALIZED)
            .await
            .unwrap()
            .unwrap()
    }

    async fn run(&self, replies: &[&str]) -> InboundOutcome {
        let mut last = self.say("oi").await.unwrap();
        for reply in replies {
            last = self.say(reply).await.unwrap();
        }
        last
    }
}

fn completed(outcome: InboundOutcome) -> (u8, bool, std::collections::BTreeMap<String, bool>) {
    match outcome {
        InboundOutcome::Completed { result, report, .. } => {
            (result.score, result.qualified, report.channels)
        }
        other => panic!("expected completion, got {:?}", other),
    }
}

/// Test that four recognized answers complete the conversation in four exchanges
#[tokio::test]
async fn test_four_answers_complete_qualification() {
    let h = Harness::new();

    let opening = h.say("oi").await.unwrap();
    let InboundOutcome::Replied { step, reply, .. } = opening else {
        panic!("expected opening reply");
    };
    assert_eq!(step, QualificationStep::NetWorth);
    assert!(reply.starts_with("Olá!"));

    let mut steps = vec![step];
    for answer in ["D", "A", "A"] {
        match h.say(answer).await.unwrap() {
            InboundOutcome::Replied { step, .. } => steps.push(step),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    assert_eq!(
        steps,
        vec![
            QualificationStep::NetWorth,
            QualificationStep::Objective,
            QualificationStep::Urgency,
            QualificationStep::Interest,
        ]
    );

    let (score, qualified, channels) = completed(h.say("A").await.unwrap());
    assert_eq!(score, 100);
    assert!(qualified);
    assert_eq!(channels.get("email"), Some(&true));
    assert_eq!(channels.get("crm"), Some(&true));

    let lead = h.lead().await;
    assert_eq!(lead.status, LeadStatus::Qualified);
    assert_eq!(lead.score, 100);
    assert!(lead.qualified_at.is_some());

    let sessions = h.sessions.sessions_for_lead(&lead.id);
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Closed);
    assert_eq!(sessions[0].step, QualificationStep::Complete);
    assert_eq!(sessions[0].context.answers.len(), 4);

    // Marker stays in the transcript but never reaches the user
    let last_entry = sessions[0].context.transcript.last().unwrap();
    assert_eq!(parse_completion_marker(&last_entry.content), Some(100));
    let texts = h.transport.texts();
    assert_eq!(texts.len(), 5);
    assert!(texts.iter().all(|t| parse_completion_marker(t).is_none()));

    let messages = h.messages.all();
    assert_eq!(messages.len(), 10);
    assert!(messages
        .iter()
        .filter(|m| m.direction == MessageDirection::Outbound)
        .all(|m| m.transport_message_id.is_some() && parse_completion_marker(&m.content).is_none()));

    let payload = &h.crm.payloads.read()[0];
    assert_eq!(payload.score, 100);
    assert_eq!(payload.answers.net_worth.as_deref(), Some("D"));
    assert_eq!(payload.phone, NORMALIZED);
}

/// Test the reference answer combinations end to end
#[tokio::test]
async fn test_reference_scores() {
    let h = Harness::new();
    let (score, qualified, _) = completed(h.run(&["A", "A", "A", "A"]).await);
    assert_eq!((score, qualified), (80, true));

    let h = Harness::new();
    let (score, qualified, channels) = completed(h.run(&["A", "D", "D", "D"]).await);
    assert_eq!((score, qualified), (25, false));
    assert!(channels.is_empty());
    assert!(h.crm.payloads.read().is_empty());
    assert!(h.email.payloads.read().is_empty());
    assert_eq!(h.lead().await.status, LeadStatus::Disqualified);
}

/// Test that unrecognized replies re-ask the same question at every step
#[tokio::test]
async fn test_unrecognized_reply_reprompts() {
    let h = Harness::new();
    let catalog = QuestionCatalog::default();
    h.say("oi").await.unwrap();

    for (category, answer) in [
        (Category::NetWorth, "B"),
        (Category::Objective, "B"),
        (Category::Urgency, "B"),
        (Category::Interest, "B"),
    ] {
        let before = h.sessions.sessions_for_lead(&h.lead().await.id)[0].clone();

        match h.say("como assim?").await.unwrap() {
            InboundOutcome::Replied { step, reply, .. } => {
                assert_eq!(step, QualificationStep::for_category(category));
                assert_eq!(reply, catalog.reprompt(category).trim());
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let after = h.sessions.sessions_for_lead(&h.lead().await.id)[0].clone();
        assert_eq!(after.context.answers, before.context.answers);

        h.say(answer).await.unwrap();
    }
}

/// Test that a stated amount is bracketed and advances the flow
#[tokio::test]
async fn test_amount_reply_advances() {
    let h = Harness::new();
    h.say("oi").await.unwrap();

    let outcome = h.say("tenho 500 mil").await.unwrap();
    assert!(matches!(
        outcome,
        InboundOutcome::Replied { step: QualificationStep::Objective, .. }
    ));

    let session = h.sessions.sessions_for_lead(&h.lead().await.id)[0].clone();
    assert_eq!(
        session.context.answers.get(&Category::NetWorth),
        Some(&CanonicalAnswer::D)
    );
}

/// Test that a failed delivery leaves the session where it was so a retry replays
#[tokio::test]
async fn test_delivery_failure_rolls_back() {
    let h = Harness::new();
    h.say("oi").await.unwrap();
    let lead_id = h.lead().await.id;
    let before = h.sessions.sessions_for_lead(&lead_id)[0].clone();
    let messages_before = h.messages.all().len();

    h.transport.set_failing(true);
    let inbound = InboundMessage::text(PHONE, "B").with_message_id("SM-retry");
    let err = h.engine.handle_inbound(&inbound, None).await.unwrap_err();
    assert!(matches!(err, AgentError::Delivery(_)));

    let after_failure = h.sessions.sessions_for_lead(&lead_id)[0].clone();
    assert_eq!(after_failure.step, before.step);
    assert_eq!(after_failure.context, before.context);
    assert_eq!(after_failure.status, SessionStatus::Active);
    assert_eq!(h.messages.all().len(), messages_before);

    h.transport.set_failing(false);
    let retried = h.engine.handle_inbound(&inbound, None).await.unwrap();
    match retried {
        InboundOutcome::Replied { step, reply, .. } => {
            assert_eq!(step, QualificationStep::Objective);
            assert_eq!(reply, QuestionCatalog::default().ask(Category::Objective).trim());
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

/// Test that replaying a message id already recorded is a no-op
#[tokio::test]
async fn test_duplicate_webhook_is_ignored() {
    let h = Harness::new();
    h.say("oi").await.unwrap();

    let inbound = InboundMessage::text(PHONE, "C").with_message_id("SM123");
    h.engine.handle_inbound(&inbound, None).await.unwrap();
    let sent = h.transport.texts().len();

    let again = h.engine.handle_inbound(&inbound, None).await.unwrap();
    assert_eq!(
        again,
        InboundOutcome::Duplicate {
            transport_message_id: "SM123".to_string()
        }
    );
    assert_eq!(h.transport.texts().len(), sent);

    let session = h.sessions.sessions_for_lead(&h.lead().await.id)[0].clone();
    assert_eq!(session.step, QualificationStep::Objective);
}

/// Test that a paused session records messages without advancing
#[tokio::test]
async fn test_paused_session_does_not_advance() {
    let h = Harness::new();
    h.say("oi").await.unwrap();
    let session_id = h.sessions.sessions_for_lead(&h.lead().await.id)[0].id.clone();

    let view = h.engine.pause_session(&session_id).await.unwrap();
    assert_eq!(view.status, SessionStatus::Paused);

    let outcome = h.say("D").await.unwrap();
    assert_eq!(
        outcome,
        InboundOutcome::Paused {
            session_id: session_id.clone()
        }
    );
    let view = h.engine.session_view(&session_id).await.unwrap();
    assert_eq!(view.step, QualificationStep::NetWorth);
    assert!(view.answers.is_empty());

    h.engine.resume_session(&session_id).await.unwrap();
    let outcome = h.say("D").await.unwrap();
    assert!(matches!(
        outcome,
        InboundOutcome::Replied { step: QualificationStep::Objective, .. }
    ));

    let inbound_count = h
        .messages
        .all()
        .iter()
        .filter(|m| m.direction == MessageDirection::Inbound)
        .count();
    assert_eq!(inbound_count, 3);
}

/// Test that a lead with a verdict is handed off instead of re-qualified
#[tokio::test]
async fn test_finished_lead_is_handed_off() {
    let h = Harness::new();
    h.run(&["D", "A", "A", "A"]).await;

    let outcome = h.say("oi de novo").await.unwrap();
    assert!(matches!(
        outcome,
        InboundOutcome::HandOff {
            status: LeadStatus::Qualified,
            ..
        }
    ));
    assert_eq!(h.sessions.sessions_for_lead(&h.lead().await.id).len(), 1);
}

/// Test that one failing channel does not affect the others or the verdict
#[tokio::test]
async fn test_email_failure_is_isolated() {
    let h = Harness::build(QualificationConfig::default(), true, None);
    let (score, qualified, channels) = completed(h.run(&["D", "A", "A", "A"]).await);

    assert_eq!(score, 100);
    assert!(qualified);
    assert_eq!(channels.get("email"), Some(&false));
    assert_eq!(channels.get("crm"), Some(&true));
    assert_eq!(h.crm.payloads.read().len(), 1);
    assert_eq!(h.lead().await.status, LeadStatus::Qualified);
}

/// Test that media without text is recorded and not interpreted
#[tokio::test]
async fn test_media_only_message_is_ignored() {
    let h = Harness::new();
    h.say("oi").await.unwrap();

    let mut photo = InboundMessage::text(PHONE, "");
    photo.media_count = 1;
    let outcome = h.engine.handle_inbound(&photo, None).await.unwrap();
    assert!(matches!(outcome, InboundOutcome::MediaIgnored { .. }));

    let stored = h.messages.all();
    assert_eq!(stored.last().unwrap().message_type, MessageType::Media);
    let session = h.sessions.sessions_for_lead(&h.lead().await.id)[0].clone();
    assert_eq!(session.step, QualificationStep::NetWorth);
}

/// Test the manual start trigger and its active-session guard
#[tokio::test]
async fn test_start_qualification() {
    let h = Harness::new();
    let lead = Lead::new("default", "Maria", "+5511911112222", "import");
    h.leads.create_lead(&lead).await.unwrap();

    let started = h.engine.start_qualification(&lead.id, None).await.unwrap();
    assert_eq!(started.step, QualificationStep::NetWorth);
    assert_eq!(started.message, QuestionCatalog::default().opening());
    assert_eq!(h.transport.sent.read()[0].0, "+5511911112222");

    let stored = h.leads.get_lead(&lead.id).await.unwrap().unwrap();
    assert_eq!(stored.status, LeadStatus::InConversation);

    let again = h.engine.start_qualification(&lead.id, None).await.unwrap_err();
    assert!(matches!(again, AgentError::SessionAlreadyActive(id) if id == started.session_id));

    let missing = h.engine.start_qualification("nope", None).await.unwrap_err();
    assert!(matches!(missing, AgentError::LeadNotFound(_)));
}

/// Test that a failed opening closes the fresh session so a new start can run
#[tokio::test]
async fn test_start_delivery_failure_closes_session() {
    let h = Harness::new();
    let lead = Lead::new("default", "João", "+5511933334444", "import");
    h.leads.create_lead(&lead).await.unwrap();

    h.transport.set_failing(true);
    let err = h.engine.start_qualification(&lead.id, None).await.unwrap_err();
    assert!(matches!(err, AgentError::Delivery(_)));
    let sessions = h.sessions.sessions_for_lead(&lead.id);
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].status, SessionStatus::Closed);

    h.transport.set_failing(false);
    let started = h
        .engine
        .start_qualification(&lead.id, Some("+55 11 93333-4444"))
        .await
        .unwrap();
    assert_ne!(started.session_id, sessions[0].id);
}

/// Test that concurrent messages from a new sender create one lead and one session
#[tokio::test]
async fn test_concurrent_first_messages() {
    let h = Harness::new();

    let a = {
        let engine = h.engine.clone();
        tokio::spawn(async move {
            engine
                .handle_inbound(&InboundMessage::text(PHONE, "oi"), None)
                .await
        })
    };
    let b = {
        let engine = h.engine.clone();
        tokio::spawn(async move {
            engine
                .handle_inbound(&InboundMessage::text(PHONE, "olá"), None)
                .await
        })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(h.leads.len(), 1);
    let sessions = h.sessions.sessions_for_lead(&h.lead().await.id);
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].step, QualificationStep::NetWorth);
    assert_eq!(sessions[0].context.user_turns(), 2);
    assert_eq!(h.engine.busy_leads(), 0);
    assert_eq!(h.crm.intakes.read().len(), 1);
}

/// Test that lock entries do not outlive the turns that used them
#[tokio::test]
async fn test_locks_released_after_turns() {
    let h = Harness::new();
    h.run(&["D", "A", "A", "A"]).await;
    h.say("obrigado").await.unwrap();
    assert_eq!(h.engine.busy_leads(), 0);
}

/// Test that a lead created from an inbound message is announced once
#[tokio::test]
async fn test_new_lead_intake() {
    let h = Harness::new();
    h.say("oi").await.unwrap();
    h.say("B").await.unwrap();

    let lead = h.lead().await;
    assert_eq!(*h.crm.intakes.read(), vec![lead.id.clone()]);
    assert_eq!(*h.email.intakes.read(), vec![lead.id]);
}

/// Test that a verdict lost to a failed lead write is recorded on the next message
#[tokio::test]
async fn test_failed_verdict_write_is_recovered() {
    let leads = Arc::new(FlakyLeads::default());
    let sessions = Arc::new(InMemorySessionStore::new());
    let crm = ScriptedChannel::new("crm", false);
    let channels: Vec<Arc<dyn NotificationChannel>> = vec![crm.clone()];
    let engine = QualificationEngine::builder(QualificationConfig::default())
        .stores(leads.clone(), sessions.clone(), Arc::new(InMemoryMessageStore::new()))
        .transport(Arc::new(RecordingTransport::default()))
        .channels(channels)
        .build()
        .unwrap();
    async fn say(engine: &QualificationEngine, text: &str) -> Result<InboundOutcome, AgentError> {
        engine
            .handle_inbound(&InboundMessage::text(PHONE, text), None)
            .await
    }

    for reply in ["oi", "D", "A", "A"] {
        say(&engine, reply).await.unwrap();
    }
    leads.fail_verdicts.store(true, Ordering::SeqCst);
    assert!(matches!(say(&engine, "A").await, Err(AgentError::Storage(_))));

    let tenant = QualificationConfig::default().default_tenant_id;
    let lead = leads.find_by_phone(&tenant, NORMALIZED).await.unwrap().unwrap();
    assert_eq!(lead.status, LeadStatus::InConversation);

    // Still failing: no second qualification is started
    assert!(say(&engine, "oi de novo").await.is_err());
    assert_eq!(sessions.sessions_for_lead(&lead.id).len(), 1);

    leads.fail_verdicts.store(false, Ordering::SeqCst);
    let outcome = say(&engine, "oi de novo").await.unwrap();
    assert!(matches!(
        outcome,
        InboundOutcome::HandOff {
            status: LeadStatus::Qualified,
            ..
        }
    ));

    let lead = leads.get_lead(&lead.id).await.unwrap().unwrap();
    assert_eq!(lead.score, 100);
    assert_eq!(sessions.sessions_for_lead(&lead.id).len(), 1);
    assert_eq!(crm.payloads.read().len(), 1);
    assert_eq!(crm.payloads.read()[0].score, 100);
}

/// Test the natural-language strategy produces a table-derived verdict
#[tokio::test]
async fn test_natural_language_flow() {
    let model: Arc<dyn CompletionModel> = ScriptedModel::new(&[
        // opening turn
        "Oi! Eu sou a Ana. Me conta, você já investe hoje?",
        r#"{"ready": false, "collected_info": {"net_worth": null}}"#,
        // second turn
        "Que ótimo! Entendi tudo, vou te passar para um especialista.",
        r#"{"ready": true, "collected_info": {"net_worth": "uns 800 mil", "objective": "aposentadoria", "urgency": "agora", "interest": "quer falar hoje"}, "confidence": 90}"#,
        r#"{"net_worth": "D", "objective": "A", "urgency": "A", "interest": "B"}"#,
    ]);
    let config = QualificationConfig {
        strategy: StrategyKind::NaturalLanguage,
        ..Default::default()
    };
    let h = Harness::build(config, false, Some(model));

    let first = h.say("oi, quero investir").await.unwrap();
    assert!(matches!(
        first,
        InboundOutcome::Replied { step: QualificationStep::NetWorth, .. }
    ));

    let outcome = h
        .say("tenho 800 mil, é pra aposentadoria e quero começar agora")
        .await
        .unwrap();
    let InboundOutcome::Completed { result, report, reply, .. } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(result.score, 95);
    assert!(result.qualified);
    assert_eq!(report.channels.get("crm"), Some(&true));
    assert!(reply.starts_with("Que ótimo!"));
    assert!(parse_completion_marker(&reply).is_none());

    let session = h.sessions.sessions_for_lead(&h.lead().await.id)[0].clone();
    let view = h.engine.session_view(&session.id).await.unwrap();
    assert_eq!(view.strategy, Some(StrategyKind::NaturalLanguage));
    assert_eq!(view.step, QualificationStep::Complete);
    assert!(session.context.collected_info.is_some());
}

/// Test that a natural-language tenant without a model is rejected at build time
#[test]
fn test_natural_language_requires_model() {
    let config = QualificationConfig {
        strategy: StrategyKind::NaturalLanguage,
        ..Default::default()
    };
    let result = QualificationEngine::builder(config)
        .stores(
            Arc::new(InMemoryLeadStore::new()),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryMessageStore::new()),
        )
        .transport(Arc::new(SimulatedTransport::new()))
        .build();
    assert!(matches!(result, Err(AgentError::Configuration(_))));
}

/// Test the engine against the simulated transport used in development
#[tokio::test]
async fn test_simulated_transport_records_sends() {
    let transport = Arc::new(SimulatedTransport::new());
    let engine = QualificationEngine::builder(QualificationConfig::default())
        .stores(
            Arc::new(InMemoryLeadStore::new()),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(InMemoryMessageStore::new()),
        )
        .transport(transport.clone())
        .build()
        .unwrap();

    engine
        .handle_inbound(&InboundMessage::text(PHONE, "oi"), Some("acme"))
        .await
        .unwrap();
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, NORMALIZED);
    assert!(sent[0].transport_message_id.starts_with("SIM_"));
}
