//! Lead scoring
//!
//! Pure function of the answer map: sum the table points of each answered
//! category, cap at 100, qualify at or above the table threshold. Missing
//! categories contribute nothing.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lead_qualifier_config::ScoringTable;
use lead_qualifier_core::{AnswerMap, Category, QualificationResult};

const MAX_SCORE: u32 = 100;

/// Score with its per-category breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub total: u8,
    pub qualified: bool,
    pub breakdown: BTreeMap<Category, u8>,
}

impl ScoreCard {
    /// `net_worth=30 objective=25 ...`, for logs
    pub fn describe(&self) -> String {
        self.breakdown
            .iter()
            .map(|(category, points)| format!("{}={}", category, points))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct ScoringModel {
    table: Arc<ScoringTable>,
}

impl ScoringModel {
    pub fn new(table: Arc<ScoringTable>) -> Self {
        Self { table }
    }

    pub fn score(&self, answers: &AnswerMap) -> ScoreCard {
        let breakdown: BTreeMap<Category, u8> = answers
            .iter()
            .map(|(category, answer)| (*category, self.table.points(*category, *answer)))
            .collect();

        let sum: u32 = breakdown.values().map(|p| *p as u32).sum();
        let total = sum.min(MAX_SCORE) as u8;

        ScoreCard {
            total,
            qualified: total >= self.table.threshold,
            breakdown,
        }
    }

    /// Terminal projection for a completed answer map
    pub fn evaluate(&self, answers: &AnswerMap, notes: impl Into<String>) -> QualificationResult {
        let card = self.score(answers);
        QualificationResult {
            answers: answers.clone(),
            score: card.total,
            qualified: card.qualified,
            notes: notes.into(),
        }
    }
}

impl Default for ScoringModel {
    fn default() -> Self {
        Self::new(Arc::new(ScoringTable::default()))
    }
}
