//! Main TUI application state and logic

use crate::backend::{BackendBridge, OfflineCacheStatus, RestBackend};
use crate::config::AppConfig;
use crate::session::{AuthSession, GateView, SessionGate, SessionProfile};
use crate::storage::{SafeStore, SqliteStore};
use crate::tui::types::{LoginForm, Screen, ScreenRouter};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{info, warn};
use uuid::Uuid;

/// Key of the per-install record
pub const INSTALL_KEY: &str = "app:install";

/// Per-install record, created on first launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRecord {
    /// Random install identifier
    pub install_id: Uuid,
    /// When the record was created
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Application state
pub struct App {
    /// Startup configuration
    pub config: AppConfig,
    /// Sign-in form
    pub login_form: LoginForm,
    /// Last status or error message
    pub status: Option<String>,
    /// Should quit
    pub should_quit: bool,
    /// This install's record
    pub install: InstallRecord,
    router: Arc<ScreenRouter>,
    store: SafeStore<SqliteStore>,
    auth: AuthSession<SqliteStore>,
    bridge: BackendBridge<RestBackend>,
    gate: SessionGate<ScreenRouter>,
    runtime: Runtime,
}

impl App {
    /// Create the application over the configured SQLite file
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = SqliteStore::new(&config.storage.db_path)?;
        Self::with_store(config, store)
    }

    /// Create the application over a given store
    pub fn with_store(config: AppConfig, store: SqliteStore) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let store = SafeStore::new(store).with_identity_namespace(config.storage.identity_namespace.clone());
        let install = runtime.block_on(load_or_create_install(&store));

        let auth = AuthSession::new(store.clone());
        let bridge = BackendBridge::new(RestBackend::new(), config.backend.clone());

        // Start on the landing route; the gate moves signed-out users to login
        let router = Arc::new(ScreenRouter::new(config.gate.landing_route.clone()));
        let gate = SessionGate::from_shared(Arc::clone(&router), config.gate.clone());

        let app = Self {
            config,
            login_form: LoginForm::default(),
            status: None,
            should_quit: false,
            install,
            router,
            store,
            auth,
            bridge,
            gate,
            runtime,
        };

        {
            let _enter = app.runtime.enter();
            app.gate.observe(app.auth.snapshot());
            // Starts initialization in the background
            let _ = app.bridge.identity_service();
        }

        Ok(app)
    }

    /// Resolve the persisted session
    pub fn restore_session(&mut self) {
        let snapshot = self.runtime.block_on(self.auth.restore());
        info!("Startup session: {:?}", snapshot);
        self.tick();
    }

    /// Feed the latest auth state and route through the gate
    pub fn tick(&mut self) -> GateView {
        let _enter = self.runtime.enter();
        self.gate.observe(self.auth.snapshot())
    }

    /// Screen to render right now
    pub fn current_screen(&self) -> Screen {
        if !self.gate.is_ready() {
            return Screen::Splash;
        }
        Screen::from_route(&self.router.current(), &self.config.gate)
    }

    /// Signed-in profile
    pub fn profile(&self) -> Option<SessionProfile> {
        self.runtime.block_on(self.auth.profile())
    }

    /// Human-readable backend state
    pub fn backend_status(&self) -> String {
        match self.bridge.handle() {
            None => format!("connecting (attempts: {})", self.bridge.init_attempts()),
            Some(handle) => match &handle.offline_cache {
                OfflineCacheStatus::Enabled => "connected, offline cache on".to_string(),
                OfflineCacheStatus::NotAttempted => "connected".to_string(),
                OfflineCacheStatus::Unavailable(e) => format!("connected, {}", e),
            },
        }
    }

    /// Retry backend initialization and wait for it
    pub fn retry_backend(&mut self) {
        match self.runtime.block_on(self.bridge.initialize()) {
            Ok(_) => self.status = Some("Backend ready".to_string()),
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    /// Submit the sign-in form
    pub fn submit_login(&mut self) {
        if !self.login_form.is_complete() {
            self.status = Some("Enter email and password".to_string());
            return;
        }

        let identity = {
            let _enter = self.runtime.enter();
            self.bridge.identity_service()
        };
        let Some(identity) = identity else {
            self.status = Some("Backend not ready yet, try again".to_string());
            return;
        };

        let email = self.login_form.email.trim().to_string();
        let password = self.login_form.password.clone();
        match self
            .runtime
            .block_on(self.auth.sign_in_with_password(&identity, &email, &password))
        {
            Ok(profile) => {
                self.login_form.clear();
                self.status = Some(format!("Signed in as {}", profile.email));
            }
            Err(e) => {
                warn!("Sign-in failed: {}", e);
                self.status = Some(e.to_string());
            }
        }
        self.tick();
    }

    /// Sign out and let the gate return to login
    pub fn sign_out(&mut self) {
        self.runtime.block_on(self.auth.sign_out());
        self.status = None;
        self.tick();
    }

    /// Stop pending navigation before teardown
    pub fn shutdown(&self) {
        self.gate.shutdown();
    }

    /// Persisted store (for diagnostics)
    pub fn store(&self) -> &SafeStore<SqliteStore> {
        &self.store
    }
}

async fn load_or_create_install(store: &SafeStore<SqliteStore>) -> InstallRecord {
    if let Some(record) = store.read_json::<InstallRecord>(INSTALL_KEY).await {
        return record;
    }

    let record = InstallRecord {
        install_id: Uuid::new_v4(),
        created_at: chrono::Utc::now(),
    };
    if !store.write_json(INSTALL_KEY, &record).await {
        warn!("Failed to persist install record, a new one will be created next launch");
    }
    info!("Created install record {}", record.install_id);
    record
}
