//! Metrics over a pattern snapshot
//!
//! Read-only; nothing here touches the store.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{CategoryUsage, ClassificationMetrics, ClassificationPattern};

/// Summarize `patterns`
///
/// `activity_threshold` is inclusive. `top_n` bounds the top patterns list,
/// ordered by confidence, then frequency, then pattern text.
pub fn compute_metrics(
    patterns: &[ClassificationPattern],
    activity_threshold: f64,
    top_n: usize,
) -> ClassificationMetrics {
    if patterns.is_empty() {
        return ClassificationMetrics::default();
    }

    let total_patterns = patterns.len();
    let active_patterns = patterns
        .iter()
        .filter(|p| p.confidence >= activity_threshold)
        .count();
    let average_confidence =
        patterns.iter().map(|p| p.confidence).sum::<f64>() / total_patterns as f64;

    // category_id -> (pattern count, frequency)
    let mut by_category: BTreeMap<i64, (usize, i64)> = BTreeMap::new();
    for p in patterns {
        let entry = by_category.entry(p.category_id).or_default();
        entry.0 += 1;
        entry.1 += p.frequency;
    }
    let total_frequency: i64 = by_category.values().map(|(_, f)| f).sum();

    let mut category_usage: Vec<CategoryUsage> = by_category
        .into_iter()
        .map(|(category_id, (pattern_count, frequency))| CategoryUsage {
            category_id,
            pattern_count,
            total_frequency: frequency,
            percentage: if total_frequency > 0 {
                frequency as f64 * 100.0 / total_frequency as f64
            } else {
                0.0
            },
        })
        .collect();
    // BTreeMap order already breaks ties by category id; the sort is stable
    category_usage.sort_by(|a, b| b.total_frequency.cmp(&a.total_frequency));

    let mut ranked: Vec<&ClassificationPattern> = patterns.iter().collect();
    ranked.sort_by(|a, b| top_pattern_order(a, b));
    let top_patterns = ranked.into_iter().take(top_n).cloned().collect();

    ClassificationMetrics {
        total_patterns,
        active_patterns,
        average_confidence,
        category_usage,
        top_patterns,
    }
}

fn top_pattern_order(a: &ClassificationPattern, b: &ClassificationPattern) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.frequency.cmp(&a.frequency))
        .then_with(|| a.pattern_text.cmp(&b.pattern_text))
        .then_with(|| a.category_id.cmp(&b.category_id))
}
