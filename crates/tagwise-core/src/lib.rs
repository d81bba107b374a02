//! Tagwise Core Library
//!
//! Self-learning transaction classification:
//! - Text normalization of raw bank descriptions
//! - Pattern store with reinforcement/decay learning
//! - Suggestion engine over learned patterns
//! - Review queue applying accept/reject/manual decisions
//! - Metrics over the learned pattern set
//! - SQLite persistence, categories and the decision log
//! - CSV import of review batches

pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod import;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod review;
pub mod store;
pub mod suggest;

pub use config::LearningConfig;
pub use db::Database;
pub use directory::{AnyCategory, CategoryDirectory};
pub use error::{Error, Result};
pub use metrics::compute_metrics;
pub use normalize::normalize;
pub use review::{DecisionRecorder, ReviewQueue};
pub use store::{PatternPersistence, PatternStore};
pub use suggest::SuggestionEngine;
