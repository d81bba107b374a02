//! Tagwise CLI - Self-learning transaction classifier
//!
//! Usage:
//!   tagwise init                   Initialize database
//!   tagwise review --file CSV      Review a statement interactively
//!   tagwise suggest "NETFLIX.COM"  Suggest a category
//!   tagwise serve --port 3000      Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt, &config),
        Commands::Categories { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(CategoriesAction::List) => commands::cmd_categories_list(&db),
                Some(CategoriesAction::Add { name, color }) => {
                    commands::cmd_categories_add(&db, &name, color.as_deref())
                }
                Some(CategoriesAction::Delete { category }) => {
                    commands::cmd_categories_delete(&db, &category)
                }
            }
        }
        Commands::Suggest { descriptions, json } => {
            let db = commands::open_shared_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_suggest(&db, config, &descriptions, json)
        }
        Commands::Classify {
            description,
            category,
        } => {
            let db = commands::open_shared_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_classify(&db, config, &description, &category)
        }
        Commands::Patterns { action } => {
            let db = commands::open_shared_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_patterns_list(&db, config, None, 50),
                Some(PatternsAction::List { category, limit }) => {
                    commands::cmd_patterns_list(&db, config, category.as_deref(), limit)
                }
                Some(PatternsAction::Forget { pattern, category }) => {
                    commands::cmd_patterns_forget(&db, config, &pattern, &category)
                }
            }
        }
        Commands::Metrics { json } => {
            let db = commands::open_shared_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_metrics(&db, config, json)
        }
        Commands::Review { file } => {
            let db = commands::open_shared_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_review(&db, config, &file)
        }
        Commands::Decisions { limit, stats } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            if stats {
                commands::cmd_decisions_stats(&db)
            } else {
                commands::cmd_decisions_list(&db, limit)
            }
        }
        Commands::Serve {
            port,
            host,
            no_auth,
        } => commands::cmd_serve(&cli.db, config, &host, port, no_auth, cli.no_encrypt).await,
    }
}
