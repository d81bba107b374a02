//! Decision log command implementations

use anyhow::Result;
use tagwise_core::db::Database;

use super::{category_label, category_names, truncate};

pub fn cmd_decisions_list(db: &Database, limit: i64) -> Result<()> {
    let records = db.list_decisions(limit.max(1))?;

    if records.is_empty() {
        println!("No decisions recorded yet.");
        return Ok(());
    }

    let names = category_names(db)?;
    println!();
    println!("📜 Recent Decisions");
    println!("   ─────────────────────────────────────────────────────────────");
    for record in &records {
        let assigned = record
            .assigned_category_id
            .map(|id| category_label(&names, id))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "   {}  {:<16} {:<32} → {}",
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.kind.as_str(),
            truncate(&record.normalized_text, 32),
            assigned
        );
    }

    Ok(())
}

pub fn cmd_decisions_stats(db: &Database) -> Result<()> {
    let stats = db.decision_stats()?;

    println!();
    println!("📊 Decision Stats");
    println!("   ─────────────────────────────");
    println!("   Total: {}", stats.total);
    println!("   Accepted: {}", stats.accepted);
    println!("   Rejected: {}", stats.rejected);
    println!("   Manual: {}", stats.manual);
    println!("   Invalid category: {}", stats.invalid_category);

    Ok(())
}
