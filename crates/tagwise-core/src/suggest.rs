//! Suggestion engine
//!
//! Picks the best learned pattern for a description. Scoring is
//! `match_quality * confidence` (see [`crate::store::match_quality`]); the
//! highest score wins and ties are broken by higher frequency, then the more
//! recently updated pattern, then the smallest pattern text and finally the
//! smallest category id, so the result never depends on iteration order.
//! A winning score below the configured minimum yields no suggestion.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::directory::CategoryDirectory;
use crate::error::Result;
use crate::models::{ClassificationPattern, ClassificationSuggestion, MatchKind};
use crate::normalize::normalize;
use crate::store::{match_quality, PatternStore};

/// Suggests categories from a [`PatternStore`]
pub struct SuggestionEngine<'a> {
    store: &'a PatternStore,
    directory: Option<&'a dyn CategoryDirectory>,
}

impl<'a> SuggestionEngine<'a> {
    pub fn new(store: &'a PatternStore) -> Self {
        Self {
            store,
            directory: None,
        }
    }

    /// Downgrade suggestions whose category is missing from `directory`
    pub fn with_directory(mut self, directory: &'a dyn CategoryDirectory) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Suggest a category for a raw bank description
    pub fn suggest(&self, raw_description: &str) -> Result<Option<ClassificationSuggestion>> {
        self.suggest_normalized(&normalize(raw_description))
    }

    /// Suggest a category for text that is already normalized
    pub fn suggest_normalized(
        &self,
        normalized_text: &str,
    ) -> Result<Option<ClassificationSuggestion>> {
        let candidates = self.store.find_candidates(normalized_text);
        let Some(suggestion) = best_suggestion(
            normalized_text,
            &candidates,
            self.store.config().min_confidence,
        ) else {
            return Ok(None);
        };

        if let Some(directory) = self.directory {
            if !directory.category_exists(suggestion.category_id)? {
                warn!(
                    "Dropping suggestion for '{}': category {} no longer exists",
                    normalized_text, suggestion.category_id
                );
                return Ok(None);
            }
        }

        Ok(Some(suggestion))
    }

    /// Suggest for each description, preserving input order
    pub fn suggest_batch<I, S>(&self, descriptions: I) -> Result<Vec<Option<ClassificationSuggestion>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        descriptions
            .into_iter()
            .map(|d| self.suggest(d.as_ref()))
            .collect()
    }
}

struct Scored<'p> {
    pattern: &'p ClassificationPattern,
    kind: MatchKind,
    score: f64,
}

/// Pick the winning pattern for `normalized_text` among `patterns`
///
/// Pure: the same inputs always produce the same output regardless of the
/// order of `patterns`. Patterns that do not match contribute nothing.
pub fn best_suggestion(
    normalized_text: &str,
    patterns: &[ClassificationPattern],
    min_confidence: f64,
) -> Option<ClassificationSuggestion> {
    let best = patterns
        .iter()
        .filter_map(|pattern| {
            let (kind, quality) = match_quality(&pattern.pattern_text, normalized_text)?;
            let score = quality * pattern.confidence;
            debug!(
                "Candidate {} scored {:.4} ({} match, quality {:.4})",
                pattern.key(),
                score,
                kind,
                quality
            );
            Some(Scored {
                pattern,
                kind,
                score,
            })
        })
        .max_by(rank)?;

    if best.score < min_confidence {
        debug!(
            "Best score {:.4} for '{}' is below {:.2}",
            best.score, normalized_text, min_confidence
        );
        return None;
    }

    Some(ClassificationSuggestion {
        category_id: best.pattern.category_id,
        confidence: best.pattern.confidence,
        pattern_text: best.pattern.pattern_text.clone(),
        score: best.score,
        match_kind: best.kind,
    })
}

/// Greater means a better suggestion
fn rank(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.pattern.frequency.cmp(&b.pattern.frequency))
        .then_with(|| a.pattern.last_updated.cmp(&b.pattern.last_updated))
        .then_with(|| b.pattern.pattern_text.cmp(&a.pattern.pattern_text))
        .then_with(|| b.pattern.category_id.cmp(&a.pattern.category_id))
}
