//! Remote backend connection
//!
//! - `types` - SDK contract, handle and offline cache error types
//! - `bridge` - Single-initialization owner of the backend handle
//! - `cache` - SQLite offline document cache
//! - `rest` - REST implementation of the SDK contract

pub mod bridge;
pub mod cache;
pub mod rest;
pub mod types;

pub use bridge::BackendBridge;
pub use cache::OfflineCache;
pub use rest::{DataService, IdentityService, IdentityToken, RestApp, RestBackend};
pub use types::{BackendHandle, BackendSdk, CacheError, OfflineCacheStatus};
