//! Domain models for Tagwise

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A spending category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A transaction handed over by the import pipeline
///
/// Only `description` is inspected by the engine; the rest is carried through
/// so decisions can be traced back to the source row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedTransaction {
    /// Stable identifier from the source file (or a content hash)
    pub external_id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Negative = expense, positive = income
    pub amount: f64,
}

/// A learned association between normalized text and a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationPattern {
    pub pattern_text: String,
    pub category_id: i64,
    /// Belief in [0, 1] that this pattern predicts the category
    pub confidence: f64,
    /// Number of reinforcing observations
    pub frequency: i64,
    pub last_updated: DateTime<Utc>,
}

impl ClassificationPattern {
    pub fn key(&self) -> PatternKey {
        PatternKey::new(&self.pattern_text, self.category_id)
    }
}

/// Identity of a pattern: one pattern per (text, category) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternKey {
    pub pattern_text: String,
    pub category_id: i64,
}

impl PatternKey {
    pub fn new(pattern_text: &str, category_id: i64) -> Self {
        Self {
            pattern_text: pattern_text.to_string(),
            category_id,
        }
    }
}

impl std::fmt::Display for PatternKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' → {}", self.pattern_text, self.category_id)
    }
}

/// How a pattern matched a description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Pattern text is contained in the description
    Substring,
    /// Some pattern tokens appear in the description
    Token,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Substring => "substring",
            Self::Token => "token",
        }
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The engine's best guess for a description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSuggestion {
    pub category_id: i64,
    /// Confidence of the winning pattern
    pub confidence: f64,
    pub pattern_text: String,
    /// match quality * confidence
    pub score: f64,
    pub match_kind: MatchKind,
}

/// Decision state of a review candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DecisionState {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl DecisionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::str::FromStr for DecisionState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown decision state: {}", s)),
        }
    }
}

impl std::fmt::Display for DecisionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction awaiting (or having received) a classification decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCandidate {
    /// Position in the loaded batch
    pub position: usize,
    pub transaction: ImportedTransaction,
    pub normalized_text: String,
    pub suggestion: Option<ClassificationSuggestion>,
    pub state: DecisionState,
    /// Category chosen by hand, if any
    pub manual_category_id: Option<i64>,
}

/// Overall state of a review session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Candidates remain
    Active,
    /// Every candidate has been decided
    Completed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of decision applied to a candidate (decision log)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Accept,
    Reject,
    Manual,
    /// Accept or manual classification against a category that no longer exists
    InvalidCategory,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Manual => "manual",
            Self::InvalidCategory => "invalid_category",
        }
    }
}

impl std::str::FromStr for DecisionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            "manual" => Ok(Self::Manual),
            "invalid_category" => Ok(Self::InvalidCategory),
            _ => Err(format!("Unknown decision kind: {}", s)),
        }
    }
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a decision did to the pattern store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum PatternEffect {
    /// Nothing was written
    None,
    Created { pattern: ClassificationPattern },
    Reinforced { pattern: ClassificationPattern },
    Decayed { pattern: ClassificationPattern },
    Retired { pattern: ClassificationPattern },
}

/// Result of applying one decision in a review session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub position: usize,
    pub kind: DecisionKind,
    pub state: DecisionState,
    /// Pattern changes in the order they were applied
    pub effects: Vec<PatternEffect>,
    pub session: SessionState,
}

/// A row of the decision log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: i64,
    pub external_id: String,
    pub description: String,
    pub normalized_text: String,
    pub kind: DecisionKind,
    pub suggested_category_id: Option<i64>,
    pub suggested_pattern: Option<String>,
    pub suggested_confidence: Option<f64>,
    pub assigned_category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A decision log row before insertion
#[derive(Debug, Clone)]
pub struct NewDecisionRecord {
    pub external_id: String,
    pub description: String,
    pub normalized_text: String,
    pub kind: DecisionKind,
    pub suggested_category_id: Option<i64>,
    pub suggested_pattern: Option<String>,
    pub suggested_confidence: Option<f64>,
    pub assigned_category_id: Option<i64>,
}

/// Decision log counts by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionStats {
    pub total: i64,
    pub accepted: i64,
    pub rejected: i64,
    pub manual: i64,
    pub invalid_category: i64,
}

/// Progress counts for a review session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub total: usize,
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Decided candidates that carry a manual category
    pub manually_classified: usize,
    /// Candidates that were loaded without a suggestion
    pub without_suggestion: usize,
}

/// Per-category aggregate in the metrics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryUsage {
    pub category_id: i64,
    pub pattern_count: usize,
    pub total_frequency: i64,
    /// Share of all pattern frequency, 0-100
    pub percentage: f64,
}

/// Summary statistics over a pattern snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub total_patterns: usize,
    pub active_patterns: usize,
    pub average_confidence: f64,
    pub category_usage: Vec<CategoryUsage>,
    pub top_patterns: Vec<ClassificationPattern>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_state_roundtrip() {
        for state in [
            DecisionState::Pending,
            DecisionState::Accepted,
            DecisionState::Rejected,
        ] {
            assert_eq!(state.as_str().parse::<DecisionState>().unwrap(), state);
        }
        assert!("maybe".parse::<DecisionState>().is_err());
        assert!(!DecisionState::Pending.is_terminal());
        assert!(DecisionState::Rejected.is_terminal());
    }

    #[test]
    fn test_decision_kind_parse() {
        assert_eq!(
            "invalid_category".parse::<DecisionKind>().unwrap(),
            DecisionKind::InvalidCategory
        );
        assert_eq!("ACCEPT".parse::<DecisionKind>().unwrap(), DecisionKind::Accept);
        assert!("skip".parse::<DecisionKind>().is_err());
    }

    #[test]
    fn test_pattern_effect_serializes_with_tag() {
        let json = serde_json::to_value(PatternEffect::None).unwrap();
        assert_eq!(json["effect"], "none");
    }

    #[test]
    fn test_pattern_key_ordering() {
        let a = PatternKey::new("AMAZON", 2);
        let b = PatternKey::new("AMAZON", 3);
        let c = PatternKey::new("NETFLIX", 1);
        assert!(a < b);
        assert!(b < c);
    }
}
