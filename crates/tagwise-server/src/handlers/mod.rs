//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod categories;
pub mod decisions;
pub mod patterns;
pub mod review;
pub mod suggestions;

// Re-export all handlers for use in router
pub use categories::*;
pub use decisions::*;
pub use patterns::*;
pub use review::*;
pub use suggestions::*;
