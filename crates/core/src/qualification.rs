//! Qualification vocabulary: steps, categories and canonical answers

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Marker embedded in closing messages so callers can detect completion
/// without re-deriving state.
pub const COMPLETION_MARKER: &str = "QUALIFICACAO_COMPLETA";

static MARKER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"QUALIFICACAO_COMPLETA:\s*(\d{1,3})\.?\s*").expect("valid marker regex")
});

/// Conversation step, in fixed order.
///
/// `Start` and `Complete` are the only steps that do not ask a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualificationStep {
    #[default]
    Start,
    NetWorth,
    Objective,
    Urgency,
    Interest,
    Complete,
}

impl QualificationStep {
    /// Category asked at this step, if it is a question step
    pub fn category(&self) -> Option<Category> {
        match self {
            QualificationStep::NetWorth => Some(Category::NetWorth),
            QualificationStep::Objective => Some(Category::Objective),
            QualificationStep::Urgency => Some(Category::Urgency),
            QualificationStep::Interest => Some(Category::Interest),
            QualificationStep::Start | QualificationStep::Complete => None,
        }
    }

    /// The step that follows this one; `Complete` maps to itself
    pub fn next(&self) -> QualificationStep {
        match self {
            QualificationStep::Start => QualificationStep::NetWorth,
            QualificationStep::NetWorth => QualificationStep::Objective,
            QualificationStep::Objective => QualificationStep::Urgency,
            QualificationStep::Urgency => QualificationStep::Interest,
            QualificationStep::Interest | QualificationStep::Complete => QualificationStep::Complete,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QualificationStep::Complete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualificationStep::Start => "start",
            QualificationStep::NetWorth => "net_worth",
            QualificationStep::Objective => "objective",
            QualificationStep::Urgency => "urgency",
            QualificationStep::Interest => "interest",
            QualificationStep::Complete => "complete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "start" => Some(QualificationStep::Start),
            "net_worth" => Some(QualificationStep::NetWorth),
            "objective" => Some(QualificationStep::Objective),
            "urgency" => Some(QualificationStep::Urgency),
            "interest" => Some(QualificationStep::Interest),
            "complete" => Some(QualificationStep::Complete),
            _ => None,
        }
    }

    /// Step on which a category is asked
    pub fn for_category(category: Category) -> QualificationStep {
        match category {
            Category::NetWorth => QualificationStep::NetWorth,
            Category::Objective => QualificationStep::Objective,
            Category::Urgency => QualificationStep::Urgency,
            Category::Interest => QualificationStep::Interest,
        }
    }
}

impl fmt::Display for QualificationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Capital available to invest
    NetWorth,
    /// Main investment objective
    Objective,
    /// When the lead intends to start
    Urgency,
    /// Interest in talking to a specialist
    Interest,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::NetWorth,
        Category::Objective,
        Category::Urgency,
        Category::Interest,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Category::NetWorth => "net_worth",
            Category::Objective => "objective",
            Category::Urgency => "urgency",
            Category::Interest => "interest",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One of the four fixed options a reply is normalized into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalAnswer {
    A,
    B,
    C,
    D,
}

impl CanonicalAnswer {
    pub const ALL: [CanonicalAnswer; 4] = [
        CanonicalAnswer::A,
        CanonicalAnswer::B,
        CanonicalAnswer::C,
        CanonicalAnswer::D,
    ];

    /// Parse a single letter (case-insensitive)
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(CanonicalAnswer::A),
            'B' => Some(CanonicalAnswer::B),
            'C' => Some(CanonicalAnswer::C),
            'D' => Some(CanonicalAnswer::D),
            _ => None,
        }
    }

    /// Zero-based position (A = 0)
    pub fn index(&self) -> usize {
        match self {
            CanonicalAnswer::A => 0,
            CanonicalAnswer::B => 1,
            CanonicalAnswer::C => 2,
            CanonicalAnswer::D => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalAnswer::A => "A",
            CanonicalAnswer::B => "B",
            CanonicalAnswer::C => "C",
            CanonicalAnswer::D => "D",
        }
    }
}

impl fmt::Display for CanonicalAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulated canonical answers, keyed by category
pub type AnswerMap = BTreeMap<Category, CanonicalAnswer>;

/// Terminal projection of a completed session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationResult {
    pub answers: AnswerMap,
    pub score: u8,
    pub qualified: bool,
    #[serde(default)]
    pub notes: String,
}

/// Build the completion marker for a score, e.g. `QUALIFICACAO_COMPLETA: 80.`
pub fn completion_marker(score: u8) -> String {
    format!("{}: {}.", COMPLETION_MARKER, score)
}

/// Extract the score from a message carrying the completion marker
pub fn parse_completion_marker(text: &str) -> Option<u8> {
    MARKER_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u8>().ok())
        .filter(|score| *score <= 100)
}

/// Remove the completion marker, leaving the user-facing text
pub fn strip_completion_marker(text: &str) -> String {
    MARKER_PATTERN.replace_all(text, "").trim().to_string()
}
