//! Common types for the backend module

use crate::{config::BackendConfig, Result};
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// Errors from enabling the offline document cache
///
/// None of these abort backend initialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Another execution context (tab, process) already holds the cache lock
    #[error("Offline cache is held by another execution context")]
    Contended,

    /// The runtime doesn't support a persistent cache
    #[error("Offline cache is not supported by this runtime")]
    Unsupported,

    /// Any other failure
    #[error("Offline cache error: {0}")]
    Other(String),
}

/// Outcome of the offline cache step of initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfflineCacheStatus {
    /// Cache is active
    Enabled,
    /// Enabling was attempted and failed
    Unavailable(CacheError),
    /// Not attempted on this runtime target
    NotAttempted,
}

/// Remote backend SDK surface consumed by [`super::BackendBridge`]
///
/// An SDK keeps its own registry of initialized apps; `existing_app` returns
/// the one already registered, if any.
pub trait BackendSdk: Send + Sync + 'static {
    /// Initialized backend application
    type App: Clone + fmt::Debug + Send + Sync + 'static;
    /// Document data service
    type Data: Clone + Send + Sync + 'static;
    /// Identity service
    type Identity: Clone + Send + Sync + 'static;

    /// App already registered with the SDK
    fn existing_app(&self) -> Option<Self::App>;

    /// Create and register a new app
    fn create_app(&self, config: &BackendConfig) -> impl Future<Output = Result<Self::App>> + Send;

    /// Derive the data service from an app
    fn data_service(&self, app: &Self::App) -> Result<Self::Data>;

    /// Derive the identity service from an app
    fn identity_service(&self, app: &Self::App) -> Result<Self::Identity>;

    /// Turn on persistent offline caching for a data service
    fn enable_offline_cache(
        &self,
        data: &Self::Data,
    ) -> impl Future<Output = std::result::Result<(), CacheError>> + Send;
}

/// The single live backend connection
pub struct BackendHandle<B: BackendSdk> {
    /// Initialized app
    pub app: B::App,
    /// Data service derived from `app`
    pub data_service: B::Data,
    /// Identity service derived from `app`
    pub identity_service: B::Identity,
    /// What happened when enabling the offline cache
    pub offline_cache: OfflineCacheStatus,
}

impl<B: BackendSdk> fmt::Debug for BackendHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHandle")
            .field("app", &self.app)
            .field("offline_cache", &self.offline_cache)
            .finish_non_exhaustive()
    }
}
