//! Interactive review session
//!
//! Walks the pending candidates of a CSV statement and reads one command per
//! line: `a` accept, `r` reject, `c <category>` classify, `d` defer, `q` quit.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tagwise_core::{
    db::Database,
    import::parse_csv,
    models::{DecisionOutcome, PatternEffect, ReviewCandidate, ReviewSummary},
    LearningConfig, ReviewQueue,
};

use super::{category_label, category_names, open_store, resolve_category, truncate};

const HELP: &str = "   Commands: [a]ccept  [r]eject  [c]lassify <category>  [d]efer  [q]uit";

pub fn cmd_review(db: &Arc<Database>, config: LearningConfig, file: &Path) -> Result<()> {
    let reader =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let transactions = parse_csv(reader).context("Failed to parse CSV")?;

    let store = Arc::new(open_store(db, config)?);
    let mut queue = ReviewQueue::new(store, db.clone()).with_recorder(db.clone());
    queue.load_batch(transactions)?;

    let summary = queue.summary();
    println!(
        "📋 Reviewing {} transactions ({} with suggestions)",
        summary.total,
        summary.total - summary.without_suggestion
    );
    println!("{}", HELP);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let summary = run_review(&mut queue, db, stdin.lock(), &mut stdout)?;

    println!();
    println!("📊 Review Summary");
    println!("   ─────────────────────────────");
    println!("   Accepted: {}", summary.accepted);
    println!("   Rejected: {}", summary.rejected);
    println!("   Classified by hand: {}", summary.manually_classified);
    if summary.pending > 0 {
        println!("   Still pending: {}", summary.pending);
    }

    Ok(())
}

/// Drive `queue` from line commands on `input` until it completes, the input
/// ends or the user quits
pub fn run_review<R: BufRead, W: Write>(
    queue: &mut ReviewQueue,
    db: &Database,
    mut input: R,
    output: &mut W,
) -> Result<ReviewSummary> {
    let total = queue.candidates().len();
    let names = category_names(db)?;

    loop {
        let Some(candidate) = queue.current().cloned() else {
            break;
        };

        writeln!(output)?;
        write_candidate(output, &candidate, total, &names)?;
        write!(output, "> ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let mut parts = line.trim().splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or("").to_lowercase();
        let argument = parts.next().map(str::trim).filter(|a| !a.is_empty());

        let result: Result<DecisionOutcome> = match (command.as_str(), argument) {
            ("a" | "accept", _) => queue.accept().map_err(Into::into),
            ("r" | "reject", _) => queue.reject().map_err(Into::into),
            ("c" | "classify", Some(arg)) => resolve_category(db, arg)
                .and_then(|category| queue.classify_manually(category.id).map_err(Into::into)),
            ("d" | "defer", _) => {
                queue.defer();
                writeln!(output, "   ↷ Deferred")?;
                continue;
            }
            ("q" | "quit", _) => break,
            _ => {
                writeln!(output, "{}", HELP)?;
                continue;
            }
        };

        match result {
            Ok(outcome) => write_outcome(output, &outcome, &names)?,
            Err(e) => {
                tracing::debug!("Review command '{}' failed: {:#}", command, e);
                writeln!(output, "   ⚠️  {}", e)?;
            }
        }
    }

    Ok(queue.summary())
}

fn write_candidate<W: Write>(
    output: &mut W,
    candidate: &ReviewCandidate,
    total: usize,
    names: &HashMap<i64, String>,
) -> io::Result<()> {
    let tx = &candidate.transaction;
    writeln!(
        output,
        "[{}/{}] {}  {:>10.2}  {}",
        candidate.position + 1,
        total,
        tx.date,
        tx.amount,
        truncate(&tx.description, 50)
    )?;
    match &candidate.suggestion {
        Some(s) => writeln!(
            output,
            "   Suggested: {} ({:.0}%, '{}')",
            category_label(names, s.category_id),
            s.score * 100.0,
            s.pattern_text
        ),
        None => writeln!(output, "   No suggestion"),
    }
}

fn write_outcome<W: Write>(
    output: &mut W,
    outcome: &DecisionOutcome,
    names: &HashMap<i64, String>,
) -> io::Result<()> {
    writeln!(output, "   ✓ {}", outcome.kind.as_str())?;
    for effect in &outcome.effects {
        if let Some(line) = describe_effect(effect, names) {
            writeln!(output, "     {}", line)?;
        }
    }
    Ok(())
}

/// One-line description of a pattern change, `None` when nothing changed
pub fn describe_effect(effect: &PatternEffect, names: &HashMap<i64, String>) -> Option<String> {
    let (verb, pattern) = match effect {
        PatternEffect::None => return None,
        PatternEffect::Created { pattern } => ("learned", pattern),
        PatternEffect::Reinforced { pattern } => ("reinforced", pattern),
        PatternEffect::Decayed { pattern } => ("weakened", pattern),
        PatternEffect::Retired { pattern } => ("retired", pattern),
    };
    Some(format!(
        "{} '{}' → {} ({:.0}%)",
        verb,
        pattern.pattern_text,
        category_label(names, pattern.category_id),
        pattern.confidence * 100.0
    ))
}
