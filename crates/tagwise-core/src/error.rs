//! Error types for Tagwise

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A pattern write did not reach the backing store. The in-memory
    /// pattern set is unchanged and the operation may be retried.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Current candidate has no suggestion to accept")]
    NoSuggestionToAccept,

    #[error("Unknown category: {0}")]
    InvalidCategory(i64),
}

impl Error {
    /// Whether the failed operation can be retried unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Pool(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
