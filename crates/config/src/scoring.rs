//! Scoring table
//!
//! Points per canonical answer for each category, plus the qualification
//! threshold. The engine takes one `ScoringTable` as an injected artifact;
//! nothing else in the workspace hardcodes point values.

use lead_qualifier_core::{CanonicalAnswer, Category};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Points for options A, B, C, D
pub type OptionPoints = [u8; 4];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringTable {
    #[serde(default = "default_net_worth")]
    pub net_worth: OptionPoints,

    #[serde(default = "default_objective")]
    pub objective: OptionPoints,

    #[serde(default = "default_urgency")]
    pub urgency: OptionPoints,

    #[serde(default = "default_interest")]
    pub interest: OptionPoints,

    /// Minimum total to be considered qualified
    #[serde(default = "default_threshold")]
    pub threshold: u8,
}

fn default_net_worth() -> OptionPoints {
    [10, 20, 25, 30]
}
fn default_objective() -> OptionPoints {
    [25, 20, 15, 10]
}
fn default_urgency() -> OptionPoints {
    [25, 20, 15, 5]
}
fn default_interest() -> OptionPoints {
    [20, 15, 10, 0]
}
fn default_threshold() -> u8 {
    70
}

impl Default for ScoringTable {
    fn default() -> Self {
        Self {
            net_worth: default_net_worth(),
            objective: default_objective(),
            urgency: default_urgency(),
            interest: default_interest(),
            threshold: default_threshold(),
        }
    }
}

impl ScoringTable {
    /// Load from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|_| ConfigError::FileNotFound(path.as_ref().display().to_string()))?;
        let table: ScoringTable =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    pub fn row(&self, category: Category) -> &OptionPoints {
        match category {
            Category::NetWorth => &self.net_worth,
            Category::Objective => &self.objective,
            Category::Urgency => &self.urgency,
            Category::Interest => &self.interest,
        }
    }

    /// Points awarded for an answer
    pub fn points(&self, category: Category, answer: CanonicalAnswer) -> u8 {
        self.row(category)[answer.index()]
    }

    /// Best possible total before the 100 cap
    pub fn max_total(&self) -> u32 {
        Category::ALL
            .iter()
            .map(|c| self.row(*c).iter().copied().max().unwrap_or(0) as u32)
            .sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for category in Category::ALL {
            if let Some(points) = self.row(category).iter().find(|p| **p > 100) {
                return Err(ConfigError::InvalidValue {
                    field: format!("scoring.{}", category.key()),
                    message: format!("Points must be at most 100, got {}", points),
                });
            }
        }

        if self.threshold > 100 {
            return Err(ConfigError::InvalidValue {
                field: "scoring.threshold".to_string(),
                message: format!("Must be between 0 and 100, got {}", self.threshold),
            });
        }

        if self.max_total() < self.threshold as u32 {
            tracing::warn!(
                max_total = self.max_total(),
                threshold = self.threshold,
                "Scoring table can never reach the qualification threshold"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_table() {
        let table = ScoringTable::default();
        assert_eq!(table.points(Category::NetWorth, CanonicalAnswer::D), 30);
        assert_eq!(table.points(Category::Objective, CanonicalAnswer::A), 25);
        assert_eq!(table.points(Category::Urgency, CanonicalAnswer::D), 5);
        assert_eq!(table.points(Category::Interest, CanonicalAnswer::D), 0);
        assert_eq!(table.max_total(), 100);
        assert_eq!(table.threshold, 70);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut table = ScoringTable::default();
        table.urgency = [25, 20, 150, 5];
        assert!(table.validate().is_err());

        let mut table = ScoringTable::default();
        table.threshold = 101;
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let table: ScoringTable = toml::from_str("threshold = 60\nnet_worth = [5, 10, 15, 20]").unwrap();
        assert_eq!(table.threshold, 60);
        assert_eq!(table.net_worth, [5, 10, 15, 20]);
        assert_eq!(table.objective, default_objective());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "threshold = 75").unwrap();
        let table = ScoringTable::load(file.path()).unwrap();
        assert_eq!(table.threshold, 75);

        assert!(ScoringTable::load("does/not/exist.toml").is_err());
    }
}
