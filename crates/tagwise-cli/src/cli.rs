//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tagwise - Transaction classification that learns from your decisions
#[derive(Parser)]
#[command(name = "tagwise")]
#[command(about = "Self-learning transaction classifier", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tagwise.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TAGWISE_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Learning config file (defaults to the data dir override, then built-in values)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed default categories
    Init,

    /// Show database and learning status
    Status,

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Suggest a category for one or more descriptions
    Suggest {
        /// Raw transaction descriptions
        #[arg(required = true)]
        descriptions: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Teach a category for a description outside a review session
    Classify {
        /// Raw transaction description
        description: String,

        /// Category name or ID
        category: String,
    },

    /// List or forget learned patterns
    Patterns {
        #[command(subcommand)]
        action: Option<PatternsAction>,
    },

    /// Show learning metrics
    Metrics {
        /// Print metrics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Review a CSV statement interactively
    ///
    /// For each transaction: [a]ccept, [r]eject, [c]lassify <category>,
    /// [d]efer or [q]uit.
    Review {
        /// CSV file to review
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show the decision log
    Decisions {
        /// Number of decisions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Show counts by decision kind instead
        #[arg(long)]
        stats: bool,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires a bearer key from TAGWISE_API_KEYS.
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List all categories
    List,

    /// Add a category
    Add {
        /// Category name
        name: String,

        /// Display color (e.g. "#f59e0b")
        #[arg(short, long)]
        color: Option<String>,
    },

    /// Delete a category (learned patterns are kept)
    Delete {
        /// Category name or ID
        category: String,
    },
}

#[derive(Subcommand)]
pub enum PatternsAction {
    /// List learned patterns, strongest first
    List {
        /// Only patterns for this category (name or ID)
        #[arg(short, long)]
        category: Option<String>,

        /// Maximum number of patterns to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Forget one learned pattern
    Forget {
        /// Normalized pattern text (as shown by 'tagwise patterns')
        pattern: String,

        /// Category name or ID
        category: String,
    },
}
