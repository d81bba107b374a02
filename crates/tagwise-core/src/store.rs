//! Pattern store
//!
//! Owns every learned [`ClassificationPattern`] and applies the learning rules:
//! reinforcement moves confidence toward 1.0 by a fraction of the remaining
//! distance, decay subtracts a fixed step and retires patterns that fall to the
//! retirement floor.
//!
//! Writes are serialized by a writer lock held across compute → persist →
//! publish, so two decisions on the same key can never lose an update. The
//! committed map is only locked for the final in-memory insert, so readers
//! never wait on persistence I/O. A write that fails to persist is never
//! published.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::LearningConfig;
use crate::error::{Error, Result};
use crate::models::{ClassificationPattern, MatchKind, PatternEffect, PatternKey};
use crate::normalize;

/// Durable backing for the pattern store
///
/// Implemented by [`crate::db::Database`]; tests substitute in-memory or
/// failing implementations.
pub trait PatternPersistence: Send + Sync {
    fn load_patterns(&self) -> Result<Vec<ClassificationPattern>>;
    fn upsert_pattern(&self, pattern: &ClassificationPattern) -> Result<()>;
    fn delete_pattern(&self, key: &PatternKey) -> Result<()>;
}

type PatternMap = BTreeMap<PatternKey, ClassificationPattern>;

/// Learned pattern collection with serialized learning writes
pub struct PatternStore {
    config: LearningConfig,
    persistence: Option<Arc<dyn PatternPersistence>>,
    committed: RwLock<PatternMap>,
    writer: Mutex<()>,
}

impl PatternStore {
    /// Create an empty store with no durable backing
    pub fn in_memory(config: LearningConfig) -> Self {
        Self::with_patterns(config, Vec::new())
    }

    /// Create a store seeded with `patterns` and no durable backing
    pub fn with_patterns(config: LearningConfig, patterns: Vec<ClassificationPattern>) -> Self {
        let map = patterns.into_iter().map(|p| (p.key(), p)).collect();
        Self {
            config,
            persistence: None,
            committed: RwLock::new(map),
            writer: Mutex::new(()),
        }
    }

    /// Open a store backed by `persistence`, loading every saved pattern
    pub fn open(persistence: Arc<dyn PatternPersistence>, config: LearningConfig) -> Result<Self> {
        let patterns = persistence.load_patterns().map_err(into_persistence)?;
        let count = patterns.len();
        let map: PatternMap = patterns.into_iter().map(|p| (p.key(), p)).collect();
        if map.len() != count {
            warn!(
                "Pattern load returned {} rows for {} distinct keys",
                count,
                map.len()
            );
        }
        info!("Pattern store opened with {} patterns", map.len());

        Ok(Self {
            config,
            persistence: Some(persistence),
            committed: RwLock::new(map),
            writer: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Look up a single pattern
    pub fn get(&self, pattern_text: &str, category_id: i64) -> Option<ClassificationPattern> {
        self.read()
            .get(&PatternKey::new(pattern_text, category_id))
            .cloned()
    }

    /// Every pattern whose text is contained in, or shares a token with, `normalized_text`
    pub fn find_candidates(&self, normalized_text: &str) -> Vec<ClassificationPattern> {
        if normalized_text.is_empty() {
            return Vec::new();
        }
        self.read()
            .values()
            .filter(|p| match_quality(&p.pattern_text, normalized_text).is_some())
            .cloned()
            .collect()
    }

    /// Point-in-time copy of all patterns, ordered by (text, category)
    pub fn snapshot(&self) -> Vec<ClassificationPattern> {
        self.read().values().cloned().collect()
    }

    /// Confirm `pattern_text → category_id`, creating the pattern if needed
    ///
    /// Returns [`PatternEffect::Created`] or [`PatternEffect::Reinforced`].
    pub fn reinforce(&self, pattern_text: &str, category_id: i64) -> Result<PatternEffect> {
        if pattern_text.trim().is_empty() {
            return Err(Error::InvalidData(
                "cannot learn a pattern from empty text".to_string(),
            ));
        }

        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let key = PatternKey::new(pattern_text, category_id);
        let now = Utc::now();

        let existing = self.read().get(&key).cloned();
        let (pattern, created) = match existing {
            Some(existing) => (
                ClassificationPattern {
                    confidence: reinforced_confidence(
                        existing.confidence,
                        self.config.learning_rate,
                    ),
                    frequency: existing.frequency + 1,
                    last_updated: now,
                    ..existing
                },
                false,
            ),
            None => (
                ClassificationPattern {
                    pattern_text: pattern_text.to_string(),
                    category_id,
                    confidence: self.config.initial_confidence,
                    frequency: 1,
                    last_updated: now,
                },
                true,
            ),
        };

        if let Some(persistence) = &self.persistence {
            persistence
                .upsert_pattern(&pattern)
                .map_err(into_persistence)?;
        }
        self.write().insert(key, pattern.clone());

        debug!(
            "Reinforced {} (confidence {:.4}, frequency {})",
            pattern.key(),
            pattern.confidence,
            pattern.frequency
        );

        Ok(if created {
            PatternEffect::Created { pattern }
        } else {
            PatternEffect::Reinforced { pattern }
        })
    }

    /// Weaken `pattern_text → category_id` after a rejection
    ///
    /// Returns [`PatternEffect::Decayed`], [`PatternEffect::Retired`] when the
    /// pattern fell to the retirement floor and was deleted, or
    /// [`PatternEffect::None`] when no such pattern exists.
    pub fn decay(&self, pattern_text: &str, category_id: i64) -> Result<PatternEffect> {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let key = PatternKey::new(pattern_text, category_id);

        let Some(existing) = self.read().get(&key).cloned() else {
            return Ok(PatternEffect::None);
        };

        let pattern = ClassificationPattern {
            confidence: decayed_confidence(existing.confidence, self.config.decay_rate),
            last_updated: Utc::now(),
            ..existing
        };

        if pattern.confidence <= self.config.retirement_floor {
            if let Some(persistence) = &self.persistence {
                persistence.delete_pattern(&key).map_err(into_persistence)?;
            }
            self.write().remove(&key);
            info!(
                "Retired pattern {} (confidence {:.4})",
                key, pattern.confidence
            );
            return Ok(PatternEffect::Retired { pattern });
        }

        if let Some(persistence) = &self.persistence {
            persistence
                .upsert_pattern(&pattern)
                .map_err(into_persistence)?;
        }
        self.write().insert(key, pattern.clone());

        debug!(
            "Decayed {} (confidence {:.4})",
            pattern.key(),
            pattern.confidence
        );
        Ok(PatternEffect::Decayed { pattern })
    }

    /// Delete a pattern outright (manual cleanup)
    pub fn remove(&self, pattern_text: &str, category_id: i64) -> Result<Option<ClassificationPattern>> {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let key = PatternKey::new(pattern_text, category_id);

        if !self.read().contains_key(&key) {
            return Ok(None);
        }
        if let Some(persistence) = &self.persistence {
            persistence.delete_pattern(&key).map_err(into_persistence)?;
        }
        Ok(self.write().remove(&key))
    }

    fn read(&self) -> RwLockReadGuard<'_, PatternMap> {
        // The map is only mutated by single inserts/removes, so a poisoned
        // lock still guards a consistent map
        self.committed.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, PatternMap> {
        self.committed.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Confidence after one reinforcement; approaches 1.0 without overshoot
pub fn reinforced_confidence(confidence: f64, learning_rate: f64) -> f64 {
    (confidence + learning_rate * (1.0 - confidence)).clamp(0.0, 1.0)
}

/// Confidence after one decay step, floored at 0.0
pub fn decayed_confidence(confidence: f64, decay_rate: f64) -> f64 {
    (confidence - decay_rate).max(0.0)
}

/// How well `pattern_text` matches `normalized_text`
///
/// Containment scores 1.0. Otherwise the quality is the share of the
/// pattern's distinct tokens that appear in the description; a token repeated
/// in the pattern counts once. `None` when nothing overlaps or either side is
/// empty.
pub fn match_quality(pattern_text: &str, normalized_text: &str) -> Option<(MatchKind, f64)> {
    if pattern_text.is_empty() || normalized_text.is_empty() {
        return None;
    }
    if normalized_text.contains(pattern_text) {
        return Some((MatchKind::Substring, 1.0));
    }

    let pattern_tokens: HashSet<&str> = normalize::tokens(pattern_text).collect();
    if pattern_tokens.is_empty() {
        return None;
    }
    let text_tokens: HashSet<&str> = normalize::tokens(normalized_text).collect();
    let shared = pattern_tokens.intersection(&text_tokens).count();
    if shared == 0 {
        return None;
    }

    Some((MatchKind::Token, shared as f64 / pattern_tokens.len() as f64))
}

fn into_persistence(err: Error) -> Error {
    match err {
        Error::Persistence(_) => err,
        other => Error::Persistence(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    /// Persistence double that can be switched into failure mode
    #[derive(Default)]
    pub(crate) struct FlakyPersistence {
        pub fail: AtomicBool,
        /// Fail writes for this pattern text only
        pub fail_text: Mutex<Option<String>>,
        pub rows: Mutex<BTreeMap<PatternKey, ClassificationPattern>>,
    }

    impl FlakyPersistence {
        fn check(&self, pattern_text: &str) -> Result<()> {
            let targeted = self.fail_text.lock().unwrap().as_deref() == Some(pattern_text);
            if targeted || self.fail.load(Ordering::SeqCst) {
                return Err(Error::Io(std::io::Error::other("disk unavailable")));
            }
            Ok(())
        }
    }

    impl PatternPersistence for FlakyPersistence {
        fn load_patterns(&self) -> Result<Vec<ClassificationPattern>> {
            Ok(self.rows.lock().unwrap().values().cloned().collect())
        }

        fn upsert_pattern(&self, pattern: &ClassificationPattern) -> Result<()> {
            self.check(&pattern.pattern_text)?;
            self.rows
                .lock()
                .unwrap()
                .insert(pattern.key(), pattern.clone());
            Ok(())
        }

        fn delete_pattern(&self, key: &PatternKey) -> Result<()> {
            self.check(&key.pattern_text)?;
            self.rows.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn store() -> PatternStore {
        PatternStore::in_memory(LearningConfig::default())
    }

    fn confidence(effect: &PatternEffect) -> f64 {
        match effect {
            PatternEffect::Created { pattern }
            | PatternEffect::Reinforced { pattern }
            | PatternEffect::Decayed { pattern }
            | PatternEffect::Retired { pattern } => pattern.confidence,
            PatternEffect::None => panic!("no pattern effect"),
        }
    }

    #[test]
    fn test_reinforce_creates_pattern() {
        let store = store();
        let effect = store.reinforce("NETFLIX.COM", 7).unwrap();
        assert!(matches!(effect, PatternEffect::Created { .. }));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].pattern_text, "NETFLIX.COM");
        assert_eq!(snapshot[0].category_id, 7);
        assert_eq!(snapshot[0].confidence, 0.5);
        assert_eq!(snapshot[0].frequency, 1);
    }

    #[test]
    fn test_reinforce_rejects_empty_text() {
        let store = store();
        assert!(matches!(
            store.reinforce("  ", 1),
            Err(Error::InvalidData(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_reinforcement_converges() {
        let store = store();
        store.reinforce("SPOTIFY USA", 3).unwrap();

        let expected = [0.6, 0.68, 0.744, 0.7952, 0.83616];
        for want in expected {
            let got = confidence(&store.reinforce("SPOTIFY USA", 3).unwrap());
            assert!((got - want).abs() < 1e-9, "expected {} got {}", want, got);
        }
        assert_eq!(store.get("SPOTIFY USA", 3).unwrap().frequency, 6);
    }

    #[test]
    fn test_reinforcement_monotonic_and_bounded() {
        let store = store();
        store.reinforce("HULU", 1).unwrap();

        let mut previous = 0.5;
        let mut previous_step = f64::MAX;
        for _ in 0..30 {
            let c = confidence(&store.reinforce("HULU", 1).unwrap());
            let step = c - previous;
            assert!(c > previous);
            assert!(c <= 1.0);
            assert!(step < previous_step);
            previous_step = step;
            previous = c;
        }
    }

    #[test]
    fn test_decay_monotonic_then_retires() {
        let store = store();
        store.reinforce("GYM CLUB", 4).unwrap();

        let first = store.decay("GYM CLUB", 4).unwrap();
        assert!(matches!(first, PatternEffect::Decayed { .. }));
        assert!((confidence(&first) - 0.35).abs() < 1e-9);

        let second = store.decay("GYM CLUB", 4).unwrap();
        assert!(confidence(&second) < confidence(&first));

        let third = store.decay("GYM CLUB", 4).unwrap();
        assert!(matches!(third, PatternEffect::Retired { .. }));
        assert!(confidence(&third) >= 0.0);
        assert!(store.get("GYM CLUB", 4).is_none());
        assert!(store.find_candidates("GYM CLUB").is_empty());
    }

    #[test]
    fn test_decay_missing_pattern_is_noop() {
        let store = store();
        assert_eq!(store.decay("NOTHING", 1).unwrap(), PatternEffect::None);
    }

    #[test]
    fn test_same_text_multiple_categories() {
        let store = store();
        store.reinforce("AMAZON", 1).unwrap();
        store.reinforce("AMAZON", 2).unwrap();
        store.reinforce("AMAZON", 2).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("AMAZON", 1).unwrap().confidence, 0.5);
        assert!((store.get("AMAZON", 2).unwrap().confidence - 0.6).abs() < 1e-9);

        store.decay("AMAZON", 1).unwrap();
        assert!((store.get("AMAZON", 2).unwrap().confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_find_candidates_substring_and_token() {
        let store = store();
        store.reinforce("NETFLIX.COM", 1).unwrap();
        store.reinforce("WHOLE FOODS", 2).unwrap();
        store.reinforce("SHELL OIL", 3).unwrap();

        let found = store.find_candidates("WHOLE FOODS MARKET");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category_id, 2);

        let found = store.find_candidates("SHELL SERVICE STATION");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pattern_text, "SHELL OIL");

        assert!(store.find_candidates("").is_empty());
        assert!(store.find_candidates("TARGET").is_empty());
    }

    #[test]
    fn test_match_quality() {
        assert_eq!(
            match_quality("NETFLIX", "NETFLIX.COM"),
            Some((MatchKind::Substring, 1.0))
        );
        assert_eq!(
            match_quality("WHOLE FOODS MARKET", "WHOLE FOODS"),
            Some((MatchKind::Token, 2.0 / 3.0))
        );
        assert_eq!(
            match_quality("SHELL OIL", "SHELL STATION"),
            Some((MatchKind::Token, 0.5))
        );
        assert_eq!(match_quality("TARGET", "WALMART"), None);
        assert_eq!(match_quality("", "WALMART"), None);
        assert_eq!(match_quality("WALMART", ""), None);
    }

    #[test]
    fn test_match_quality_counts_repeated_tokens_once() {
        assert_eq!(
            match_quality("PAYPAL PAYPAL INST", "PAYPAL TRANSFER"),
            Some((MatchKind::Token, 0.5))
        );
        assert_eq!(
            match_quality("PAYPAL PAYPAL", "PAYPAL TRANSFER"),
            Some((MatchKind::Token, 1.0))
        );
    }

    #[test]
    fn test_snapshot_is_point_in_time() {
        let store = store();
        store.reinforce("UBER", 5).unwrap();
        let before = store.snapshot();

        store.reinforce("UBER", 5).unwrap();
        store.reinforce("LYFT", 5).unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(before[0].frequency, 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_snapshot_round_trip_exact() {
        let store = store();
        let created = match store.reinforce("COSTCO WHSE", 9).unwrap() {
            PatternEffect::Created { pattern } => pattern,
            other => panic!("unexpected {:?}", other),
        };
        let snapshot = store.snapshot();
        assert_eq!(snapshot, vec![created]);
    }

    #[test]
    fn test_concurrent_reinforce_loses_no_updates() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..50 {
                        store.reinforce("TRADER JOE S", 2).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("TRADER JOE S", 2).unwrap().frequency, 200);
    }

    #[test]
    fn test_persistence_failure_leaves_memory_untouched() {
        let backend = Arc::new(FlakyPersistence::default());
        let store = PatternStore::open(backend.clone(), LearningConfig::default()).unwrap();
        store.reinforce("CHEVRON", 3).unwrap();
        let before = store.get("CHEVRON", 3).unwrap();

        backend.fail.store(true, Ordering::SeqCst);
        let err = store.reinforce("CHEVRON", 3).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(err.is_retryable());
        assert_eq!(store.get("CHEVRON", 3).unwrap(), before);

        let err = store.decay("CHEVRON", 3).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.get("CHEVRON", 3).unwrap(), before);

        assert!(store.reinforce("NEW PLACE", 1).is_err());
        assert!(store.get("NEW PLACE", 1).is_none());

        backend.fail.store(false, Ordering::SeqCst);
        store.reinforce("CHEVRON", 3).unwrap();
        assert_eq!(store.get("CHEVRON", 3).unwrap().frequency, 2);
    }

    #[test]
    fn test_open_loads_persisted_patterns() {
        let backend = Arc::new(FlakyPersistence::default());
        {
            let store = PatternStore::open(backend.clone(), LearningConfig::default()).unwrap();
            store.reinforce("PG&E", 6).unwrap();
            store.reinforce("PG&E", 6).unwrap();
        }
        let reopened = PatternStore::open(backend, LearningConfig::default()).unwrap();
        let pattern = reopened.get("PG&E", 6).unwrap();
        assert_eq!(pattern.frequency, 2);
        assert!((pattern.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_retirement_deletes_from_persistence() {
        let backend = Arc::new(FlakyPersistence::default());
        let store = PatternStore::open(backend.clone(), LearningConfig::default()).unwrap();
        store.reinforce("ARCADE", 8).unwrap();
        for _ in 0..3 {
            store.decay("ARCADE", 8).unwrap();
        }
        assert!(backend.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn test_remove() {
        let store = store();
        store.reinforce("PARKING", 2).unwrap();
        assert!(store.remove("PARKING", 2).unwrap().is_some());
        assert!(store.remove("PARKING", 2).unwrap().is_none());
        assert!(store.is_empty());
    }
}
