//! Local storage module
//!
//! This module handles persistence of small pieces of session and app state:
//! - `kv` - The async key-value contract and its in-memory / SQLite backends
//! - `safe_store` - Validate-then-trust wrapper that evicts corrupted values

// Submodules
pub mod kv;
pub mod safe_store;

// Re-export commonly used types
pub use kv::{KeyValueStore, MemoryStore, SqliteStore};
pub use safe_store::{Corruption, SafeStore, DEFAULT_IDENTITY_NAMESPACE};
