//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `categories` - Category management commands (list, add, delete)
//! - `classify` - Suggestion and learning commands (suggest, classify, patterns, metrics)
//! - `core` - Core commands (init) and shared utilities (open_db, open_store)
//! - `decisions` - Decision log commands
//! - `review` - Interactive review session
//! - `serve` - Web server command
//! - `status` - Status command

pub mod categories;
pub mod classify;
pub mod core;
pub mod decisions;
pub mod review;
pub mod serve;
pub mod status;

// Re-export command functions for main.rs
pub use categories::*;
pub use classify::*;
pub use core::*;
pub use decisions::*;
pub use review::*;
pub use serve::*;
pub use status::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
