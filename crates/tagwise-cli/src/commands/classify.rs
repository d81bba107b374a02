//! Suggestion and learning command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use tagwise_core::{
    compute_metrics,
    db::Database,
    models::{ClassificationPattern, PatternEffect},
    normalize, LearningConfig, SuggestionEngine,
};

use super::{category_label, category_names, open_store, resolve_category, truncate};

pub fn cmd_suggest(
    db: &Arc<Database>,
    config: LearningConfig,
    descriptions: &[String],
    json: bool,
) -> Result<()> {
    let store = open_store(db, config)?;
    let engine = SuggestionEngine::new(&store).with_directory(&**db);
    let suggestions = engine.suggest_batch(descriptions)?;

    if json {
        let results: Vec<serde_json::Value> = descriptions
            .iter()
            .zip(&suggestions)
            .map(|(description, suggestion)| {
                serde_json::json!({
                    "description": description,
                    "normalized": normalize(description),
                    "suggestion": suggestion,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    let names = category_names(db)?;
    println!();
    for (description, suggestion) in descriptions.iter().zip(&suggestions) {
        match suggestion {
            Some(s) => println!(
                "   {:<40} → {} ({:.0}%, {} match on '{}')",
                truncate(description, 40),
                category_label(&names, s.category_id),
                s.score * 100.0,
                s.match_kind.as_str(),
                s.pattern_text
            ),
            None => println!("   {:<40} → (no suggestion)", truncate(description, 40)),
        }
    }

    Ok(())
}

/// Teach `category` for `description` without a review session
pub fn cmd_classify(
    db: &Arc<Database>,
    config: LearningConfig,
    description: &str,
    category: &str,
) -> Result<()> {
    let normalized = normalize(description);
    if normalized.is_empty() {
        anyhow::bail!("Nothing to learn from '{}'", description);
    }

    let category = resolve_category(db, category)?;
    let store = open_store(db, config)?;
    let effect = store
        .reinforce(&normalized, category.id)
        .context("Failed to save learned pattern")?;

    match effect {
        PatternEffect::Created { pattern } => println!(
            "✅ Learned '{}' → {} ({:.0}%)",
            pattern.pattern_text,
            category.name,
            pattern.confidence * 100.0
        ),
        PatternEffect::Reinforced { pattern } => println!(
            "✅ Reinforced '{}' → {} ({:.0}%, seen {} times)",
            pattern.pattern_text,
            category.name,
            pattern.confidence * 100.0,
            pattern.frequency
        ),
        _ => {}
    }

    Ok(())
}

/// Patterns ordered strongest first
pub fn sorted_patterns(mut patterns: Vec<ClassificationPattern>) -> Vec<ClassificationPattern> {
    patterns.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.frequency.cmp(&a.frequency))
            .then_with(|| a.pattern_text.cmp(&b.pattern_text))
    });
    patterns
}

pub fn cmd_patterns_list(
    db: &Arc<Database>,
    config: LearningConfig,
    category: Option<&str>,
    limit: usize,
) -> Result<()> {
    let filter = category.map(|c| resolve_category(db, c)).transpose()?;
    let store = open_store(db, config)?;

    let patterns: Vec<ClassificationPattern> = sorted_patterns(store.snapshot())
        .into_iter()
        .filter(|p| filter.as_ref().map_or(true, |c| p.category_id == c.id))
        .collect();

    if patterns.is_empty() {
        println!("No learned patterns yet. Run 'tagwise review --file statement.csv' to teach some.");
        return Ok(());
    }

    let names = category_names(db)?;
    println!();
    println!("🧠 Learned Patterns ({})", patterns.len());
    println!("   ─────────────────────────────────────────────────────────────");
    for pattern in patterns.iter().take(limit) {
        println!(
            "   {:<36} {:<18} {:>5.1}%  ×{:<4} {}",
            truncate(&pattern.pattern_text, 36),
            truncate(&category_label(&names, pattern.category_id), 18),
            pattern.confidence * 100.0,
            pattern.frequency,
            pattern.last_updated.format("%Y-%m-%d")
        );
    }
    if patterns.len() > limit {
        println!("   ... and {} more", patterns.len() - limit);
    }

    Ok(())
}

pub fn cmd_patterns_forget(
    db: &Arc<Database>,
    config: LearningConfig,
    pattern: &str,
    category: &str,
) -> Result<()> {
    let category = resolve_category(db, category)?;
    let store = open_store(db, config)?;

    match store.remove(pattern, category.id)? {
        Some(removed) => println!(
            "🗑️  Forgot '{}' → {} (was {:.0}%)",
            removed.pattern_text,
            category.name,
            removed.confidence * 100.0
        ),
        None => anyhow::bail!("No pattern '{}' for category '{}'", pattern, category.name),
    }

    Ok(())
}

pub fn cmd_metrics(db: &Arc<Database>, config: LearningConfig, json: bool) -> Result<()> {
    let store = open_store(db, config)?;
    let config = store.config();
    let metrics = compute_metrics(
        &store.snapshot(),
        config.activity_threshold,
        config.top_patterns,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    let names = category_names(db)?;
    println!();
    println!("📈 Learning Metrics");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Patterns: {}", metrics.total_patterns);
    println!(
        "   Active (≥{:.0}%): {}",
        config.activity_threshold * 100.0,
        metrics.active_patterns
    );
    println!(
        "   Average confidence: {:.1}%",
        metrics.average_confidence * 100.0
    );

    if !metrics.category_usage.is_empty() {
        println!();
        println!("   Category usage:");
        for usage in &metrics.category_usage {
            println!(
                "   {:<24} {:>4} patterns  {:>6} uses  {:>5.1}%",
                truncate(&category_label(&names, usage.category_id), 24),
                usage.pattern_count,
                usage.total_frequency,
                usage.percentage
            );
        }
    }

    if !metrics.top_patterns.is_empty() {
        println!();
        println!("   Top patterns:");
        for pattern in &metrics.top_patterns {
            println!(
                "   {:<36} {:<18} {:>5.1}%",
                truncate(&pattern.pattern_text, 36),
                truncate(&category_label(&names, pattern.category_id), 18),
                pattern.confidence * 100.0
            );
        }
    }

    Ok(())
}
