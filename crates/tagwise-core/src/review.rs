//! Review queue
//!
//! One review session over an imported batch. Candidates are decided one at a
//! time, in order, and every decision is written to the [`PatternStore`]
//! before the queue advances:
//!
//! - accept: reinforce the suggested pattern
//! - reject: decay the suggested pattern (if any)
//! - manual: reinforce the normalized description under the chosen category,
//!   decaying a suggestion that pointed elsewhere
//!
//! A decision whose pattern write fails leaves the candidate current so the
//! call can be retried. Writes a failed manual decision already made are kept
//! for that candidate until it is decided and reported with that decision.
//! Decisions naming a category that no longer exists are downgraded to a
//! rejection with no pattern effect.
//!
//! Suggestions are computed when the batch is loaded. Accepting one whose
//! pattern has since been retired looks the suggestion up again first.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::directory::CategoryDirectory;
use crate::error::{Error, Result};
use crate::models::{
    DecisionKind, DecisionOutcome, DecisionState, ImportedTransaction, NewDecisionRecord,
    PatternEffect, ReviewCandidate, ReviewSummary, SessionState,
};
use crate::normalize::normalize;
use crate::store::PatternStore;
use crate::suggest::SuggestionEngine;

/// Sink for the decision log
///
/// Failures are logged and never block the queue.
pub trait DecisionRecorder: Send + Sync {
    fn record_decision(&self, record: &NewDecisionRecord) -> Result<()>;
}

/// A pattern write that is part of a decision
#[derive(Debug, Clone)]
enum Step {
    Reinforce { text: String, category_id: i64 },
    Decay { text: String, category_id: i64 },
}

/// Pattern writes applied for a candidate whose manual decision failed part way
#[derive(Debug, Default)]
struct Progress {
    /// Category of the most recent failed manual attempt
    category_id: i64,
    /// Writes made by that attempt, in step order
    applied: Vec<PatternEffect>,
    /// Writes made by earlier attempts under another category
    abandoned: Vec<PatternEffect>,
}

impl Progress {
    fn into_effects(self) -> Vec<PatternEffect> {
        let mut effects = self.abandoned;
        effects.extend(self.applied);
        effects
    }
}

pub struct ReviewQueue {
    store: Arc<PatternStore>,
    directory: Arc<dyn CategoryDirectory>,
    recorder: Option<Arc<dyn DecisionRecorder>>,
    candidates: Vec<ReviewCandidate>,
    pending: VecDeque<usize>,
    decided: Vec<usize>,
    /// Partial manual decisions, by candidate position
    progress: HashMap<usize, Progress>,
}

impl ReviewQueue {
    /// Create an empty (completed) queue
    pub fn new(store: Arc<PatternStore>, directory: Arc<dyn CategoryDirectory>) -> Self {
        Self {
            store,
            directory,
            recorder: None,
            candidates: Vec::new(),
            pending: VecDeque::new(),
            decided: Vec::new(),
            progress: HashMap::new(),
        }
    }

    /// Record every applied decision with `recorder`
    pub fn with_recorder(mut self, recorder: Arc<dyn DecisionRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Start a new session over `transactions`, discarding any previous one
    pub fn load_batch(&mut self, transactions: Vec<ImportedTransaction>) -> Result<SessionState> {
        let engine = SuggestionEngine::new(&self.store).with_directory(self.directory.as_ref());

        let mut candidates = Vec::with_capacity(transactions.len());
        for (position, transaction) in transactions.into_iter().enumerate() {
            let normalized_text = normalize(&transaction.description);
            let suggestion = engine.suggest_normalized(&normalized_text)?;
            debug!(
                "Candidate {} '{}' → {:?}",
                position,
                normalized_text,
                suggestion.as_ref().map(|s| s.category_id)
            );
            candidates.push(ReviewCandidate {
                position,
                transaction,
                normalized_text,
                suggestion,
                state: DecisionState::Pending,
                manual_category_id: None,
            });
        }

        self.pending = (0..candidates.len()).collect();
        self.candidates = candidates;
        self.decided.clear();
        self.progress.clear();

        let with_suggestion = self
            .candidates
            .iter()
            .filter(|c| c.suggestion.is_some())
            .count();
        info!(
            "Review session loaded: {} candidates, {} with suggestions",
            self.candidates.len(),
            with_suggestion
        );

        Ok(self.state())
    }

    pub fn state(&self) -> SessionState {
        if self.pending.is_empty() {
            SessionState::Completed
        } else {
            SessionState::Active
        }
    }

    /// The candidate awaiting a decision
    pub fn current(&self) -> Option<&ReviewCandidate> {
        self.pending.front().map(|&i| &self.candidates[i])
    }

    /// Every candidate in batch order
    pub fn candidates(&self) -> &[ReviewCandidate] {
        &self.candidates
    }

    /// Decided candidates in the order they were decided
    pub fn decided(&self) -> impl Iterator<Item = &ReviewCandidate> {
        self.decided.iter().map(|&i| &self.candidates[i])
    }

    /// Accept the current candidate's suggestion
    pub fn accept(&mut self) -> Result<DecisionOutcome> {
        let index = self.head()?;
        let mut suggestion = self.candidates[index]
            .suggestion
            .clone()
            .ok_or(Error::NoSuggestionToAccept)?;

        if self
            .store
            .get(&suggestion.pattern_text, suggestion.category_id)
            .is_none()
        {
            let refreshed = SuggestionEngine::new(&self.store)
                .with_directory(self.directory.as_ref())
                .suggest_normalized(&self.candidates[index].normalized_text)?;
            info!(
                "Pattern '{}' for candidate {} was retired; suggestion now {:?}",
                suggestion.pattern_text,
                index,
                refreshed.as_ref().map(|s| s.category_id)
            );
            self.candidates[index].suggestion = refreshed.clone();
            suggestion = refreshed.ok_or(Error::NoSuggestionToAccept)?;
        }

        if !self.directory.category_exists(suggestion.category_id)? {
            return Ok(self.downgrade(index, suggestion.category_id));
        }

        let effect = self
            .store
            .reinforce(&suggestion.pattern_text, suggestion.category_id)?;
        Ok(self.finish(
            index,
            DecisionKind::Accept,
            DecisionState::Accepted,
            None,
            vec![effect],
        ))
    }

    /// Reject the current candidate's suggestion
    pub fn reject(&mut self) -> Result<DecisionOutcome> {
        let index = self.head()?;
        let effect = match &self.candidates[index].suggestion {
            Some(s) => self.store.decay(&s.pattern_text, s.category_id)?,
            None => PatternEffect::None,
        };
        Ok(self.finish(
            index,
            DecisionKind::Reject,
            DecisionState::Rejected,
            None,
            vec![effect],
        ))
    }

    /// Assign `category_id` to the current candidate by hand
    ///
    /// Choosing the suggested category is an accept. Otherwise the normalized
    /// description is reinforced under `category_id` and a suggestion for a
    /// different category is decayed. The candidate ends up rejected with its
    /// manual category set.
    pub fn classify_manually(&mut self, category_id: i64) -> Result<DecisionOutcome> {
        let index = self.head()?;

        if !self.directory.category_exists(category_id)? {
            return Ok(self.downgrade(index, category_id));
        }

        let candidate = &self.candidates[index];
        if let Some(s) = &candidate.suggestion {
            if s.category_id == category_id {
                return self.accept();
            }
        }

        let mut steps = Vec::new();
        if !candidate.normalized_text.is_empty() {
            steps.push(Step::Reinforce {
                text: candidate.normalized_text.clone(),
                category_id,
            });
        }
        if let Some(s) = &candidate.suggestion {
            steps.push(Step::Decay {
                text: s.pattern_text.clone(),
                category_id: s.category_id,
            });
        }

        let effects = self.apply_steps(index, category_id, &steps)?;
        Ok(self.finish(
            index,
            DecisionKind::Manual,
            DecisionState::Rejected,
            Some(category_id),
            effects,
        ))
    }

    /// Manually classify a candidate that was already rejected
    ///
    /// The session state is unchanged; the rejection already decayed the
    /// suggestion, so only the normalized description is reinforced.
    pub fn classify_rejected(&mut self, position: usize, category_id: i64) -> Result<DecisionOutcome> {
        let Some(candidate) = self.candidates.get(position) else {
            return Err(Error::NotFound(format!("review candidate {}", position)));
        };
        if candidate.state != DecisionState::Rejected {
            return Err(Error::NotFound(format!(
                "rejected review candidate {}",
                position
            )));
        }
        if candidate.manual_category_id.is_some() {
            return Err(Error::InvalidData(format!(
                "review candidate {} is already classified",
                position
            )));
        }

        if !self.directory.category_exists(category_id)? {
            warn!(
                "Late classification of candidate {} names missing category {}",
                position, category_id
            );
            self.record(position, DecisionKind::InvalidCategory, None);
            return Ok(DecisionOutcome {
                position,
                kind: DecisionKind::InvalidCategory,
                state: DecisionState::Rejected,
                effects: vec![PatternEffect::None],
                session: self.state(),
            });
        }

        let effect = if candidate.normalized_text.is_empty() {
            PatternEffect::None
        } else {
            self.store
                .reinforce(&candidate.normalized_text, category_id)?
        };

        self.candidates[position].manual_category_id = Some(category_id);
        self.record(position, DecisionKind::Manual, Some(category_id));
        info!(
            "Candidate {} classified after rejection as category {}",
            position, category_id
        );

        Ok(DecisionOutcome {
            position,
            kind: DecisionKind::Manual,
            state: DecisionState::Rejected,
            effects: vec![effect],
            session: self.state(),
        })
    }

    /// Move the current candidate to the back of the pending list
    pub fn defer(&mut self) -> Option<&ReviewCandidate> {
        if let Some(index) = self.pending.pop_front() {
            self.pending.push_back(index);
            debug!("Deferred candidate {}", index);
        }
        self.current()
    }

    pub fn summary(&self) -> ReviewSummary {
        let mut summary = ReviewSummary {
            total: self.candidates.len(),
            pending: self.pending.len(),
            ..Default::default()
        };
        for candidate in &self.candidates {
            match candidate.state {
                DecisionState::Pending => {}
                DecisionState::Accepted => summary.accepted += 1,
                DecisionState::Rejected => summary.rejected += 1,
            }
            if candidate.manual_category_id.is_some() {
                summary.manually_classified += 1;
            }
            if candidate.suggestion.is_none() {
                summary.without_suggestion += 1;
            }
        }
        summary
    }

    fn head(&self) -> Result<usize> {
        self.pending
            .front()
            .copied()
            .ok_or_else(|| Error::NotFound("pending review candidate".to_string()))
    }

    /// Apply `steps`, resuming after the writes a failed attempt already made
    ///
    /// Writes from an earlier attempt under another category stay in the
    /// store and are returned ahead of this attempt's effects.
    fn apply_steps(
        &mut self,
        position: usize,
        category_id: i64,
        steps: &[Step],
    ) -> Result<Vec<PatternEffect>> {
        let mut progress = match self.progress.remove(&position) {
            Some(p) if p.category_id == category_id => p,
            Some(p) => Progress {
                category_id,
                applied: Vec::new(),
                abandoned: p.into_effects(),
            },
            None => Progress {
                category_id,
                ..Default::default()
            },
        };

        for step in steps.iter().skip(progress.applied.len()) {
            let result = match step {
                Step::Reinforce { text, category_id } => self.store.reinforce(text, *category_id),
                Step::Decay { text, category_id } => self.store.decay(text, *category_id),
            };
            match result {
                Ok(effect) => progress.applied.push(effect),
                Err(e) => {
                    self.progress.insert(position, progress);
                    return Err(e);
                }
            }
        }

        if progress.applied.is_empty() {
            progress.applied.push(PatternEffect::None);
        }
        Ok(progress.into_effects())
    }

    fn downgrade(&mut self, index: usize, category_id: i64) -> DecisionOutcome {
        warn!(
            "Category {} no longer exists; candidate {} rejected without learning",
            category_id, index
        );
        self.finish(
            index,
            DecisionKind::InvalidCategory,
            DecisionState::Rejected,
            None,
            vec![PatternEffect::None],
        )
    }

    fn finish(
        &mut self,
        index: usize,
        kind: DecisionKind,
        state: DecisionState,
        manual_category_id: Option<i64>,
        mut effects: Vec<PatternEffect>,
    ) -> DecisionOutcome {
        self.pending.retain(|&i| i != index);
        self.decided.push(index);

        if let Some(partial) = self.progress.remove(&index) {
            let mut earlier = partial.into_effects();
            warn!(
                "Candidate {} decided as {} after a failed manual classification; keeping {} earlier pattern writes",
                index,
                kind,
                earlier.len()
            );
            earlier.append(&mut effects);
            effects = earlier;
        }

        let candidate = &mut self.candidates[index];
        candidate.state = state;
        candidate.manual_category_id = manual_category_id;

        let assigned = match state {
            DecisionState::Accepted => candidate.suggestion.as_ref().map(|s| s.category_id),
            _ => manual_category_id,
        };
        self.record(index, kind, assigned);

        let session = self.state();
        debug!("Candidate {} decided: {} ({})", index, kind, state);
        if session == SessionState::Completed {
            info!("Review session completed: {:?}", self.summary());
        }

        DecisionOutcome {
            position: index,
            kind,
            state,
            effects,
            session,
        }
    }

    fn record(&self, index: usize, kind: DecisionKind, assigned_category_id: Option<i64>) {
        let Some(recorder) = &self.recorder else {
            return;
        };
        let candidate = &self.candidates[index];
        let record = NewDecisionRecord {
            external_id: candidate.transaction.external_id.clone(),
            description: candidate.transaction.description.clone(),
            normalized_text: candidate.normalized_text.clone(),
            kind,
            suggested_category_id: candidate.suggestion.as_ref().map(|s| s.category_id),
            suggested_pattern: candidate.suggestion.as_ref().map(|s| s.pattern_text.clone()),
            suggested_confidence: candidate.suggestion.as_ref().map(|s| s.confidence),
            assigned_category_id,
        };
        if let Err(e) = recorder.record_decision(&record) {
            warn!("Failed to record decision for candidate {}: {}", index, e);
        }
    }
}
