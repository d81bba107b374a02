//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` / `open_shared_db` - Open the database
//! - `load_config` / `open_store` - Learning config and the pattern store
//! - `resolve_category` - Look up a category by name or ID
//! - `cmd_init` - Initialize the database

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tagwise_core::{db::Database, models::Category, LearningConfig, PatternStore};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Open the database for commands that also need the pattern store
pub fn open_shared_db(db_path: &Path, no_encrypt: bool) -> Result<Arc<Database>> {
    Ok(Arc::new(open_db(db_path, no_encrypt)?))
}

pub fn load_config(path: Option<&Path>) -> Result<LearningConfig> {
    LearningConfig::load(path).context("Failed to load learning config")
}

/// Load every learned pattern from `db` into a store
pub fn open_store(db: &Arc<Database>, config: LearningConfig) -> Result<PatternStore> {
    PatternStore::open(db.clone(), config).context("Failed to load learned patterns")
}

/// Resolve a category argument: numeric ID first, then case-insensitive name
pub fn resolve_category(db: &Database, arg: &str) -> Result<Category> {
    if let Ok(id) = arg.parse::<i64>() {
        if let Some(category) = db.get_category(id)? {
            return Ok(category);
        }
    }

    db.get_category_by_name(arg)?
        .ok_or_else(|| anyhow::anyhow!("Category not found: {}", arg))
}

/// Category names by ID, for display
pub fn category_names(db: &Database) -> Result<HashMap<i64, String>> {
    Ok(db
        .list_categories()?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect())
}

/// Display name for a category ID, marking deleted categories
pub fn category_label(names: &HashMap<i64, String>, id: i64) -> String {
    names
        .get(&id)
        .cloned()
        .unwrap_or_else(|| format!("#{} (deleted)", id))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    let seeded = db
        .seed_default_categories()
        .context("Failed to seed default categories")?;
    println!("   Seeded {} default categories", seeded);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Review a statement: tagwise review --file statement.csv");
    println!("  2. Start web API: tagwise serve");

    Ok(())
}
