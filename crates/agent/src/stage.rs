//! Qualification state machine
//!
//! `start → net_worth → objective → urgency → interest → complete`, one step
//! per recognized answer. Unrecognized replies keep the step and re-ask the
//! same question. There are no backward transitions and no skips.

use std::sync::Arc;

use lead_qualifier_config::QuestionCatalog;
use lead_qualifier_core::{AnswerMap, QualificationResult, QualificationStep};

use crate::extractor::AnswerExtractor;
use crate::scoring::ScoringModel;

/// Why the machine moved (or did not)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionReason {
    /// Greeting and first question sent
    Started,
    /// Reply recognized, next question asked
    Answered,
    /// Reply not recognized, same question asked again
    Unrecognized,
    /// Last answer recorded; verdict computed
    Completed(QualificationResult),
    /// Session already complete; nothing to say
    Terminal,
}

/// Result of one `advance`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTransition {
    pub from: QualificationStep,
    pub to: QualificationStep,
    pub answers: AnswerMap,
    /// Text to deliver; empty only for `Terminal`
    pub outbound: String,
    pub reason: TransitionReason,
}

impl StageTransition {
    pub fn result(&self) -> Option<&QualificationResult> {
        match &self.reason {
            TransitionReason::Completed(result) => Some(result),
            _ => None,
        }
    }
}

/// Deterministic question flow over a catalog, an extractor and a scoring model
#[derive(Debug, Clone)]
pub struct StageMachine {
    catalog: Arc<QuestionCatalog>,
    extractor: AnswerExtractor,
    scoring: ScoringModel,
}

impl StageMachine {
    pub fn new(catalog: Arc<QuestionCatalog>, scoring: ScoringModel) -> Self {
        Self {
            catalog,
            extractor: AnswerExtractor::new(),
            scoring,
        }
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn advance(
        &self,
        step: QualificationStep,
        answers: &AnswerMap,
        incoming: &str,
    ) -> StageTransition {
        let transition = |to: QualificationStep,
                          answers: AnswerMap,
                          outbound: String,
                          reason: TransitionReason| StageTransition {
            from: step,
            to,
            answers,
            outbound,
            reason,
        };

        let Some(category) = step.category() else {
            return if step.is_terminal() {
                transition(step, answers.clone(), String::new(), TransitionReason::Terminal)
            } else {
                transition(
                    step.next(),
                    answers.clone(),
                    self.catalog.opening(),
                    TransitionReason::Started,
                )
            };
        };

        let Some(answer) = self.extractor.extract(category, incoming) else {
            tracing::debug!(step = %step, "Reply not recognized, re-asking");
            return transition(
                step,
                answers.clone(),
                self.catalog.reprompt(category),
                TransitionReason::Unrecognized,
            );
        };

        let mut updated = answers.clone();
        updated.insert(category, answer);
        let next = step.next();

        match next.category() {
            Some(next_category) => transition(
                next,
                updated,
                self.catalog.ask(next_category),
                TransitionReason::Answered,
            ),
            None => {
                let summary = self.catalog.summarize(&updated);
                let result = self.scoring.evaluate(&updated, summary);
                let card = self.scoring.score(&updated);
                tracing::info!(
                    score = result.score,
                    qualified = result.qualified,
                    breakdown = %card.describe(),
                    "Qualification complete"
                );
                transition(
                    QualificationStep::Complete,
                    updated,
                    self.catalog.closing(result.score, result.qualified),
                    TransitionReason::Completed(result),
                )
            }
        }
    }
}
