//! Status command implementation

use std::path::Path;

use anyhow::Result;
use tagwise_core::{db::DB_KEY_ENV, LearningConfig};

use super::open_db;

pub fn cmd_status(db_path: &Path, no_encrypt: bool, config: &LearningConfig) -> Result<()> {
    use std::fs;

    println!();
    println!("📊 Tagwise Status");
    println!("   ─────────────────────────────────────────────────────────────");

    // Database path
    println!("   Database: {}", db_path.display());

    // Check if database file exists and get size
    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    // Check encryption status
    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    println!();
    println!("   Learning rate: {}", config.learning_rate);
    println!("   Initial confidence: {}", config.initial_confidence);
    println!("   Decay rate: {}", config.decay_rate);
    println!("   Retirement floor: {}", config.retirement_floor);
    println!("   Suggestion threshold: {}", config.min_confidence);

    // Try to open the database and show stats
    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                let categories = db.category_count()?;
                let patterns: i64 = db
                    .pattern_counts_by_category()?
                    .iter()
                    .map(|(_, count)| count)
                    .sum();
                let decisions = db.decision_stats()?;
                println!();
                println!("   Categories: {}", categories);
                println!("   Learned patterns: {}", patterns);
                println!("   Decisions logged: {}", decisions.total);
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      Check that {} matches the database key", DB_KEY_ENV);
                }
            }
        }
    }

    Ok(())
}
