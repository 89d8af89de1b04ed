//! Qualification strategies
//!
//! Both strategies take the persisted session context plus the inbound text
//! and return the next context and outbound text. A session is pinned to the
//! strategy it started with.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use lead_qualifier_config::{render, QualificationConfig, QuestionCatalog, StrategyKind};
use lead_qualifier_core::{
    AnswerMap, CanonicalAnswer, Category, CollectedInfo, CompletionModel, QualificationResult,
    QualificationStep, Result, SessionContext, TranscriptEntry,
};
use lead_qualifier_llm::format_history;

use crate::scoring::ScoringModel;
use crate::stage::StageMachine;
use crate::AgentError;

const STRATEGY_KEY: &str = "strategy";

/// Outcome of one strategy call
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub context: SessionContext,
    /// Text for the transcript; may carry the completion marker
    pub outbound: String,
    pub result: Option<QualificationResult>,
}

#[async_trait]
pub trait QualificationStrategy: Send + Sync + 'static {
    fn kind(&self) -> StrategyKind;

    /// First message of a freshly started session
    async fn opening(&self, context: &SessionContext, tenant_id: &str) -> Result<Turn>;

    /// Reply to an inbound message
    async fn respond(
        &self,
        context: &SessionContext,
        inbound: &str,
        tenant_id: &str,
    ) -> Result<Turn>;
}

/// Strategy recorded in the context when the session was created
pub fn pinned_strategy(context: &SessionContext) -> Option<StrategyKind> {
    context
        .extra
        .get(STRATEGY_KEY)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

pub fn pin_strategy(context: &mut SessionContext, kind: StrategyKind) {
    context.extra.insert(
        STRATEGY_KEY.to_string(),
        serde_json::to_value(kind).unwrap_or_default(),
    );
}

/// Fixed multiple-choice flow driven by the state machine
pub struct DeterministicStrategy {
    machine: StageMachine,
}

impl DeterministicStrategy {
    pub fn new(machine: StageMachine) -> Self {
        Self { machine }
    }
}

#[async_trait]
impl QualificationStrategy for DeterministicStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Deterministic
    }

    async fn opening(&self, context: &SessionContext, _tenant_id: &str) -> Result<Turn> {
        let transition = self
            .machine
            .advance(QualificationStep::Start, &context.answers, "");

        let mut next = context.clone();
        next.current_step = transition.to;
        next.answers = transition.answers.clone();
        next.transcript
            .push(TranscriptEntry::assistant(transition.outbound.clone()));

        Ok(Turn {
            context: next,
            outbound: transition.outbound,
            result: None,
        })
    }

    async fn respond(
        &self,
        context: &SessionContext,
        inbound: &str,
        _tenant_id: &str,
    ) -> Result<Turn> {
        let transition = self
            .machine
            .advance(context.current_step, &context.answers, inbound);
        let result = transition.result().cloned();

        let mut next = context.clone();
        next.current_step = transition.to;
        next.answers = transition.answers;
        next.transcript.push(TranscriptEntry::user(inbound));
        next.transcript
            .push(TranscriptEntry::assistant(transition.outbound.clone()));

        Ok(Turn {
            context: next,
            outbound: transition.outbound,
            result,
        })
    }
}

/// Open-ended dialogue generated by a completion model.
///
/// After every exchange a readiness pass reads the transcript and reports a
/// provisional value per category. Once ready, a rubric pass maps those
/// values onto the A-D options and the shared scoring model decides.
pub struct ConversationalStrategy {
    model: Arc<dyn CompletionModel>,
    config: Arc<QualificationConfig>,
    catalog: Arc<QuestionCatalog>,
    scoring: ScoringModel,
}

/// Parsed readiness reply
#[derive(Debug, Clone, PartialEq)]
struct Readiness {
    ready: bool,
    collected: CollectedInfo,
}

impl ConversationalStrategy {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        config: Arc<QualificationConfig>,
        catalog: Arc<QuestionCatalog>,
        scoring: ScoringModel,
    ) -> Self {
        Self {
            model,
            config,
            catalog,
            scoring,
        }
    }

    /// `context` is the state before `message`; the history rendered into
    /// the prompt never includes it
    async fn converse(
        &self,
        context: &SessionContext,
        message: &str,
        tenant_id: &str,
    ) -> Result<String> {
        let persona = &self.config.persona;
        let collected = serde_json::to_string_pretty(&context.collected_info.clone().unwrap_or_default())?;
        let history = format_history(&context.transcript, self.config.history_window, &persona.name);

        let prompt = render(
            &self.config.prompts.conversation,
            &[
                ("persona_name", persona.name.as_str()),
                ("persona_role", persona.role.as_str()),
                ("persona_style", persona.style.as_str()),
                ("company_context", self.config.company_context_for(tenant_id)),
                ("collected_info", collected.as_str()),
                ("history", history.as_str()),
                ("message", message),
            ],
        );

        // The latest message lives in the prompt, not in the history
        let completion = self.model.complete(&prompt, &[]).await?;
        Ok(completion.text.trim().to_string())
    }

    async fn assess(&self, context: &SessionContext) -> Result<Readiness> {
        let history = format_history(
            &context.transcript,
            self.config.history_window,
            &self.config.persona.name,
        );
        let prompt = render(&self.config.prompts.readiness, &[("history", history.as_str())]);
        let completion = self.model.complete(&prompt, &[]).await?;

        let parsed = completion.structured.as_ref().and_then(|value| {
            let ready = value.get("ready")?.as_bool()?;
            let collected = value
                .get("collected_info")
                .map(parse_collected)
                .unwrap_or_default();
            Some(Readiness { ready, collected })
        });

        Ok(parsed.unwrap_or_else(|| {
            let ready = context.transcript.len() >= self.config.readiness_fallback_entries;
            tracing::warn!(
                entries = context.transcript.len(),
                ready,
                "Readiness reply not parseable, using transcript length"
            );
            Readiness {
                ready,
                collected: CollectedInfo::default(),
            }
        }))
    }

    async fn map_rubric(&self, collected: &CollectedInfo) -> Result<AnswerMap> {
        let info = serde_json::to_string_pretty(collected)?;
        let rubric = self.rubric_text();
        let prompt = render(
            &self.config.prompts.rubric,
            &[("collected_info", info.as_str()), ("rubric", rubric.as_str())],
        );
        let completion = self.model.complete(&prompt, &[]).await?;

        let mut answers = AnswerMap::new();
        if let Some(value) = completion.structured.as_ref() {
            for category in Category::ALL {
                if let Some(answer) = value
                    .get(category.key())
                    .and_then(Value::as_str)
                    .and_then(rubric_letter)
                {
                    answers.insert(category, answer);
                }
            }
        } else {
            tracing::warn!("Rubric reply not parseable, no answers mapped");
        }
        Ok(answers)
    }

    fn rubric_text(&self) -> String {
        Category::ALL
            .iter()
            .map(|category| {
                let question = self.catalog.question(*category);
                let options = CanonicalAnswer::ALL
                    .iter()
                    .map(|a| format!("{}) {}", a, question.option_label(*a)))
                    .collect::<Vec<_>>()
                    .join("; ");
                format!("{} ({}): {}", category.key(), question.label, options)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn parse_collected(value: &Value) -> CollectedInfo {
    let field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
            .map(str::to_string)
    };
    CollectedInfo {
        net_worth: field("net_worth"),
        objective: field("objective"),
        urgency: field("urgency"),
        interest: field("interest"),
    }
}

fn rubric_letter(raw: &str) -> Option<CanonicalAnswer> {
    let trimmed = raw.trim().trim_end_matches(|c: char| c == ')' || c == '.');
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => CanonicalAnswer::from_letter(c),
        _ => None,
    }
}

/// First category still lacking a value; `interest` once all have one
fn progress_step(collected: &CollectedInfo) -> QualificationStep {
    collected
        .missing()
        .first()
        .map(|c| QualificationStep::for_category(*c))
        .unwrap_or(QualificationStep::Interest)
}

#[async_trait]
impl QualificationStrategy for ConversationalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NaturalLanguage
    }

    async fn opening(&self, context: &SessionContext, tenant_id: &str) -> Result<Turn> {
        let reply = self.converse(context, "", tenant_id).await?;

        let mut next = context.clone();
        next.current_step = progress_step(&next.collected_info.clone().unwrap_or_default());
        next.transcript.push(TranscriptEntry::assistant(reply.clone()));

        Ok(Turn {
            context: next,
            outbound: reply,
            result: None,
        })
    }

    async fn respond(
        &self,
        context: &SessionContext,
        inbound: &str,
        tenant_id: &str,
    ) -> Result<Turn> {
        let reply = self.converse(context, inbound, tenant_id).await?;

        let mut next = context.clone();
        next.transcript.push(TranscriptEntry::user(inbound));
        next.transcript.push(TranscriptEntry::assistant(reply.clone()));

        let readiness = self.assess(&next).await?;
        let mut collected = next.collected_info.take().unwrap_or_default();
        collected.merge(readiness.collected);

        if !readiness.ready {
            next.current_step = progress_step(&collected);
            next.collected_info = Some(collected);
            return Ok(Turn {
                context: next,
                outbound: reply,
                result: None,
            });
        }

        let answers = self.map_rubric(&collected).await?;
        let notes = self.catalog.summarize(&answers);
        let result = self.scoring.evaluate(&answers, notes);
        let card = self.scoring.score(&answers);
        tracing::info!(
            score = result.score,
            qualified = result.qualified,
            breakdown = %card.describe(),
            "Natural-language qualification complete"
        );

        let outbound = format!(
            "{}\n\n{}",
            reply,
            self.catalog.closing(result.score, result.qualified)
        );
        if let Some(last) = next.transcript.last_mut() {
            last.content = outbound.clone();
        }
        next.current_step = QualificationStep::Complete;
        next.answers = answers;
        next.collected_info = Some(collected);

        Ok(Turn {
            context: next,
            outbound,
            result: Some(result),
        })
    }
}

/// Strategies available to the engine
#[derive(Clone)]
pub struct StrategySet {
    deterministic: Arc<dyn QualificationStrategy>,
    natural_language: Option<Arc<dyn QualificationStrategy>>,
}

impl StrategySet {
    pub fn new(deterministic: Arc<dyn QualificationStrategy>) -> Self {
        Self {
            deterministic,
            natural_language: None,
        }
    }

    pub fn with_natural_language(mut self, strategy: Arc<dyn QualificationStrategy>) -> Self {
        self.natural_language = Some(strategy);
        self
    }

    pub fn get(
        &self,
        kind: StrategyKind,
    ) -> std::result::Result<Arc<dyn QualificationStrategy>, AgentError> {
        match kind {
            StrategyKind::Deterministic => Ok(self.deterministic.clone()),
            StrategyKind::NaturalLanguage => self.natural_language.clone().ok_or_else(|| {
                AgentError::Configuration(
                    "natural-language strategy selected but no completion model configured"
                        .to_string(),
                )
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_qualifier_core::{parse_completion_marker, Completion};
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replies in order; structured JSON is parsed from the text
    struct Scripted {
        replies: Mutex<VecDeque<String>>,
    }

    impl Scripted {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl CompletionModel for Scripted {
        async fn complete(&self, _prompt: &str, _history: &[TranscriptEntry]) -> Result<Completion> {
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

    /// Records every prompt and history it is called with
    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl CompletionModel for Recording {
        async fn complete(&self, prompt: &str, history: &[TranscriptEntry]) -> Result<Completion> {
            self.calls.lock().push((prompt.to_string(), history.len()));
            Ok(Completion {
                text: "Entendi!".to_string(),
                structured: None,
            })
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn conversational(model: Arc<dyn CompletionModel>) -> ConversationalStrategy {
        ConversationalStrategy::new(
            model,
            Arc::new(QualificationConfig::default()),
            Arc::new(QuestionCatalog::default()),
            ScoringModel::default(),
        )
    }

    #[test]
    fn test_pinning() {
        let mut ctx = SessionContext::default();
        assert_eq!(pinned_strategy(&ctx), None);
        pin_strategy(&mut ctx, StrategyKind::NaturalLanguage);
        assert_eq!(pinned_strategy(&ctx), Some(StrategyKind::NaturalLanguage));

        let restored = SessionContext::from_json(&ctx.to_json().unwrap()).unwrap();
        assert_eq!(pinned_strategy(&restored), Some(StrategyKind::NaturalLanguage));
    }

    #[tokio::test]
    async fn test_deterministic_turn_appends_transcript() {
        let machine = StageMachine::new(Arc::new(QuestionCatalog::default()), ScoringModel::default());
        let strategy = DeterministicStrategy::new(machine);

        let opening = strategy.opening(&SessionContext::default(), "t").await.unwrap();
        assert_eq!(opening.context.current_step, QualificationStep::NetWorth);
        assert_eq!(opening.context.transcript.len(), 1);

        let turn = strategy.respond(&opening.context, "B", "t").await.unwrap();
        assert_eq!(turn.context.current_step, QualificationStep::Objective);
        assert_eq!(turn.context.answers[&Category::NetWorth], CanonicalAnswer::B);
        assert_eq!(turn.context.transcript.len(), 3);
        assert!(turn.result.is_none());
    }

    #[tokio::test]
    async fn test_not_ready_tracks_progress() {
        let model = Scripted::new(&[
            "Que legal! E qual o seu objetivo com esse dinheiro?",
            r#"{"ready": false, "collected_info": {"net_worth": "cerca de 300 mil", "objective": null, "urgency": "null", "interest": null}, "confidence": 40}"#,
        ]);
        let strategy = conversational(model);

        let turn = strategy
            .respond(&SessionContext::default(), "tenho uns 300 mil", "t")
            .await
            .unwrap();

        assert!(turn.result.is_none());
        assert_eq!(turn.context.current_step, QualificationStep::Objective);
        let collected = turn.context.collected_info.unwrap();
        assert_eq!(collected.net_worth.as_deref(), Some("cerca de 300 mil"));
        assert!(collected.urgency.is_none());
    }

    #[tokio::test]
    async fn test_ready_maps_rubric_and_scores() {
        let model = Scripted::new(&[
            "Perfeito, entendi tudo!",
            r#"{"ready": true, "collected_info": {"net_worth": "1 milhão", "objective": "aposentadoria", "urgency": "esta semana", "interest": "muito"}, "confidence": 95}"#,
            r#"{"net_worth": "D", "objective": "A", "urgency": "A", "interest": "A"}"#,
        ]);
        let strategy = conversational(model);

        let turn = strategy
            .respond(&SessionContext::default(), "quero falar com alguém hoje", "t")
            .await
            .unwrap();

        let result = turn.result.unwrap();
        assert_eq!(result.score, 100);
        assert!(result.qualified);
        assert_eq!(turn.context.current_step, QualificationStep::Complete);
        assert_eq!(parse_completion_marker(&turn.outbound), Some(100));
        assert!(turn.outbound.starts_with("Perfeito, entendi tudo!"));
        assert_eq!(turn.context.transcript.last().unwrap().content, turn.outbound);
    }

    #[tokio::test]
    async fn test_unmappable_rubric_scores_zero() {
        let model = Scripted::new(&[
            "Obrigada!",
            r#"{"ready": true, "collected_info": {}}"#,
            r#"{"net_worth": "null", "objective": "talvez B", "urgency": null, "interest": "X"}"#,
        ]);
        let turn = conversational(model)
            .respond(&SessionContext::default(), "ok", "t")
            .await
            .unwrap();

        let result = turn.result.unwrap();
        assert!(result.answers.is_empty());
        assert_eq!(result.score, 0);
        assert!(!result.qualified);
    }

    #[tokio::test]
    async fn test_readiness_fallback_on_transcript_length() {
        let mut ctx = SessionContext::default();
        for i in 0..3 {
            ctx.transcript.push(TranscriptEntry::user(format!("u{}", i)));
            ctx.transcript.push(TranscriptEntry::assistant(format!("a{}", i)));
        }

        // 6 + 2 = 8 entries after this exchange
        let model = Scripted::new(&["Certo!", "não consigo analisar", r#"{"net_worth": "B"}"#]);
        let turn = conversational(model).respond(&ctx, "sim", "t").await.unwrap();

        assert_eq!(turn.context.current_step, QualificationStep::Complete);
        assert_eq!(turn.result.unwrap().score, 20);
    }

    #[tokio::test]
    async fn test_inbound_sent_to_model_once() {
        let mut ctx = SessionContext::default();
        ctx.transcript.push(TranscriptEntry::assistant("Olá! Como posso ajudar?"));

        let model = Arc::new(Recording::default());
        conversational(model.clone())
            .respond(&ctx, "quero investir minha herança", "t")
            .await
            .unwrap();

        let calls = model.calls.lock();
        let (prompt, history_len) = &calls[0];
        assert_eq!(*history_len, 0);
        assert_eq!(prompt.matches("quero investir minha herança").count(), 1);
        assert!(prompt.contains("Olá! Como posso ajudar?"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Scripted::new(&[]);
        let err = conversational(model)
            .respond(&SessionContext::default(), "oi", "t")
            .await
            .unwrap_err();
        assert!(matches!(err, lead_qualifier_core::Error::Llm(_)));
    }

    #[test]
    fn test_strategy_set_requires_model_for_natural_language() {
        let machine = StageMachine::new(Arc::new(QuestionCatalog::default()), ScoringModel::default());
        let set = StrategySet::new(Arc::new(DeterministicStrategy::new(machine)));
        assert!(set.get(StrategyKind::Deterministic).is_ok());
        assert!(matches!(
            set.get(StrategyKind::NaturalLanguage),
            Err(AgentError::Configuration(_))
        ));
    }
}
