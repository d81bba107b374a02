//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use tagwise_core::LearningConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    learning: LearningConfig,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
) -> Result<()> {
    println!("🚀 Starting Tagwise web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    // Parse API keys from environment (comma-separated)
    let api_keys =
        tagwise_server::parse_api_keys(&std::env::var("TAGWISE_API_KEYS").unwrap_or_default());

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else if api_keys.is_empty() {
        println!("   ❌ Authentication: no keys configured, set TAGWISE_API_KEYS");
    } else {
        println!(
            "   🔑 API keys: {} configured (TAGWISE_API_KEYS)",
            api_keys.len()
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    // Ensure default categories are seeded (idempotent)
    db.seed_default_categories()
        .context("Failed to seed default categories")?;

    let config = tagwise_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins: vec![],
        api_keys,
    };

    tagwise_server::serve(db, learning, host, port, config).await?;

    Ok(())
}
