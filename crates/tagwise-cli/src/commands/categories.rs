//! Category command implementations

use anyhow::Result;
use tagwise_core::db::Database;

use super::resolve_category;

pub fn cmd_categories_list(db: &Database) -> Result<()> {
    let categories = db.list_categories()?;

    if categories.is_empty() {
        println!("No categories found. Run 'tagwise init' to seed defaults.");
        return Ok(());
    }

    let counts: std::collections::HashMap<i64, i64> =
        db.pattern_counts_by_category()?.into_iter().collect();

    println!();
    println!("🏷️  Categories");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:>4}  {:<24} {:<9} {:>8}", "ID", "Name", "Color", "Patterns");

    for category in &categories {
        println!(
            "   {:>4}  {:<24} {:<9} {:>8}",
            category.id,
            category.name,
            category.color.as_deref().unwrap_or("-"),
            counts.get(&category.id).copied().unwrap_or(0)
        );
    }

    Ok(())
}

pub fn cmd_categories_add(db: &Database, name: &str, color: Option<&str>) -> Result<()> {
    let id = db.create_category(name, color)?;
    println!("✅ Created category '{}' (id: {})", name.trim(), id);
    Ok(())
}

pub fn cmd_categories_delete(db: &Database, arg: &str) -> Result<()> {
    let category = resolve_category(db, arg)?;
    db.delete_category(category.id)?;
    println!("🗑️  Deleted category '{}'", category.name);
    println!("   Learned patterns are kept but no longer suggested");
    Ok(())
}
