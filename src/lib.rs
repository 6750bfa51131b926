//! Stockkeep - local state and session gating for a warehouse inventory tracker
//!
//! This library provides the layer the inventory screens sit on top of:
//! corruption-tolerant local persistence, a single lazily-initialized backend
//! connection, and a navigation gate driven by authentication state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod session;
pub mod storage;
pub mod tui;

#[cfg(test)]
mod tests;

/// Result type alias for Stockkeep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Stockkeep operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Local storage operation error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote backend error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Initialize the Stockkeep library with logging
pub fn init() {
    tracing_subscriber::fmt::init();
}
