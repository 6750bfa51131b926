//! Single-initialization owner of the backend connection
//!
//! The bridge builds at most one [`BackendHandle`]. Concurrent callers that
//! arrive while initialization is running wait on the same attempt instead of
//! starting their own. A failed attempt leaves nothing behind, so the next
//! call starts over.

use super::types::{BackendHandle, BackendSdk, CacheError, OfflineCacheStatus};
use crate::{config::{BackendConfig, RuntimeTarget}, Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

type InitOutcome<B> = Option<std::result::Result<Arc<BackendHandle<B>>, String>>;

enum InitState<B: BackendSdk> {
    Idle,
    Running(watch::Receiver<InitOutcome<B>>),
    Ready(Arc<BackendHandle<B>>),
}

struct BridgeInner<B: BackendSdk> {
    sdk: B,
    config: BackendConfig,
    state: Mutex<InitState<B>>,
    attempts: AtomicUsize,
}

/// Lazily-initialized backend connection, shared by cloning
///
/// # Example
/// ```rust,no_run
/// use stockkeep::backend::{BackendBridge, RestBackend};
/// use stockkeep::config::AppConfig;
///
/// # async fn example() -> stockkeep::Result<()> {
/// let config = AppConfig::load("stockkeep.json")?;
/// let bridge = BackendBridge::new(RestBackend::new(), config.backend);
///
/// // Await readiness before depending on the services
/// let handle = bridge.initialize().await?;
/// let documents = handle.data_service.clone();
/// # Ok(())
/// # }
/// ```
pub struct BackendBridge<B: BackendSdk> {
    inner: Arc<BridgeInner<B>>,
}

impl<B: BackendSdk> Clone for BackendBridge<B> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<B: BackendSdk> BackendBridge<B> {
    /// Create an uninitialized bridge
    pub fn new(sdk: B, config: BackendConfig) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                sdk,
                config,
                state: Mutex::new(InitState::Idle),
                attempts: AtomicUsize::new(0),
            }),
        }
    }

    /// The SDK this bridge drives
    pub fn sdk(&self) -> &B {
        &self.inner.sdk
    }

    /// Number of initialization attempts started so far
    pub fn init_attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Whether a handle has been built
    pub fn is_initialized(&self) -> bool {
        self.handle().is_some()
    }

    /// Current handle, without triggering initialization
    pub fn handle(&self) -> Option<Arc<BackendHandle<B>>> {
        match &*self.lock_state() {
            InitState::Ready(handle) => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    /// Build the backend handle, or return the one already built
    ///
    /// The attempt runs on its own task, so dropping this future doesn't
    /// cancel it. On failure the bridge stays uninitialized and the error is
    /// logged and returned.
    pub async fn initialize(&self) -> Result<Arc<BackendHandle<B>>> {
        let mut outcome = {
            let mut state = self.lock_state();
            match &*state {
                InitState::Ready(handle) => return Ok(Arc::clone(handle)),
                InitState::Running(rx) => {
                    debug!("Backend initialization already in flight, waiting");
                    rx.clone()
                }
                InitState::Idle => {
                    let (tx, rx) = watch::channel(None);
                    *state = InitState::Running(rx.clone());
                    self.spawn_attempt(tx);
                    rx
                }
            }
        };

        let result = match outcome.wait_for(|value| value.is_some()).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };

        match result {
            Some(Ok(handle)) => Ok(handle),
            Some(Err(message)) => Err(Error::Backend(message)),
            None => {
                // The attempt task ended without reporting
                let mut state = self.lock_state();
                if matches!(&*state, InitState::Running(_)) {
                    *state = InitState::Idle;
                }
                Err(Error::Backend("Backend initialization was interrupted".to_string()))
            }
        }
    }

    /// Data service, or `None` if not initialized yet
    ///
    /// When uninitialized this starts a background initialization without
    /// waiting for it. Callers that need a ready service must await
    /// [`Self::initialize`] first.
    pub fn data_service(&self) -> Option<B::Data> {
        match self.handle() {
            Some(handle) => Some(handle.data_service.clone()),
            None => {
                self.trigger_background_init();
                None
            }
        }
    }

    /// Identity service, or `None` if not initialized yet
    ///
    /// Same lazy behavior as [`Self::data_service`].
    pub fn identity_service(&self) -> Option<B::Identity> {
        match self.handle() {
            Some(handle) => Some(handle.identity_service.clone()),
            None => {
                self.trigger_background_init();
                None
            }
        }
    }

    fn trigger_background_init(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let bridge = self.clone();
                runtime.spawn(async move {
                    // Failures are logged by initialize()
                    let _ = bridge.initialize().await;
                });
            }
            Err(_) => debug!("No async runtime available, skipping lazy backend initialization"),
        }
    }

    fn spawn_attempt(&self, tx: watch::Sender<InitOutcome<B>>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let attempt = inner.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            info!("Initializing backend connection (attempt {})", attempt);

            let outcome = match connect(&inner.sdk, &inner.config).await {
                Ok(handle) => {
                    let handle = Arc::new(handle);
                    *lock(&inner.state) = InitState::Ready(Arc::clone(&handle));
                    info!("Backend connection ready ({:?})", handle.offline_cache);
                    Ok(handle)
                }
                Err(e) => {
                    *lock(&inner.state) = InitState::Idle;
                    error!("Backend initialization failed, will retry on next call: {}", e);
                    Err(e.to_string())
                }
            };

            let _ = tx.send(Some(outcome));
        });
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, InitState<B>> {
        lock(&self.inner.state)
    }
}

fn lock<B: BackendSdk>(state: &Mutex<InitState<B>>) -> std::sync::MutexGuard<'_, InitState<B>> {
    // State transitions are single assignments, so a poisoned lock still
    // holds a consistent value.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn connect<B: BackendSdk>(sdk: &B, config: &BackendConfig) -> Result<BackendHandle<B>> {
    let app = match sdk.existing_app() {
        Some(app) => {
            debug!("Reusing registered backend app");
            app
        }
        None => sdk.create_app(config).await?,
    };

    let data_service = sdk.data_service(&app)?;
    let identity_service = sdk.identity_service(&app)?;

    let offline_cache = if config.runtime == RuntimeTarget::Web {
        match sdk.enable_offline_cache(&data_service).await {
            Ok(()) => {
                info!("Offline cache enabled");
                OfflineCacheStatus::Enabled
            }
            Err(e) => {
                match &e {
                    CacheError::Contended => {
                        warn!("Offline cache unavailable: another execution context holds it")
                    }
                    CacheError::Unsupported => {
                        warn!("Offline cache unavailable: not supported by this runtime")
                    }
                    CacheError::Other(reason) => warn!("Offline cache unavailable: {}", reason),
                }
                OfflineCacheStatus::Unavailable(e)
            }
        }
    } else {
        OfflineCacheStatus::NotAttempted
    };

    Ok(BackendHandle {
        app,
        data_service,
        identity_service,
        offline_cache,
    })
}
