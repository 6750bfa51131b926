//! HTTPS REST implementation of the backend SDK
//!
//! Documents are read from the hosted document database's REST endpoint and
//! identities are resolved through the identity toolkit endpoint. When the
//! offline cache is enabled, every successful document read is mirrored
//! locally and served back if the network is unreachable.

use super::cache::OfflineCache;
use super::types::{BackendSdk, CacheError};
use crate::{config::BackendConfig, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Initialized backend application
#[derive(Debug, Clone)]
pub struct RestApp {
    /// Application identifier from the config
    pub app_id: String,
    /// Configuration the app was created with
    pub config: BackendConfig,
    client: reqwest::Client,
}

/// Document data service
#[derive(Debug, Clone)]
pub struct DataService {
    client: reqwest::Client,
    documents_url: String,
    cache_path: Option<PathBuf>,
    cache: Arc<OnceLock<OfflineCache>>,
}

impl DataService {
    /// Full URL of a document
    pub fn document_url(&self, path: &str) -> String {
        format!("{}/{}", self.documents_url, path.trim_start_matches('/'))
    }

    /// Whether reads are mirrored to the offline cache
    pub fn is_offline_cache_enabled(&self) -> bool {
        self.cache.get().is_some()
    }

    /// Fetch a document as JSON
    ///
    /// Falls back to the offline copy when the request can't reach the
    /// backend and a cached copy exists.
    pub async fn get_document(&self, path: &str) -> Result<serde_json::Value> {
        let url = self.document_url(path);
        debug!("Fetching document {}", url);

        match self.fetch(&url).await {
            Ok(document) => {
                if let Some(cache) = self.cache.get() {
                    if let Err(e) = cache.put(path, &document) {
                        warn!("Failed to mirror document {} to offline cache: {}", path, e);
                    }
                }
                Ok(document)
            }
            Err(Error::Http(e)) if e.is_connect() || e.is_timeout() => {
                if let Some(cached) = self.cached_document(path) {
                    info!("Serving {} from offline cache ({})", path, e);
                    return Ok(cached);
                }
                Err(Error::Http(e))
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch(&self, url: &str) -> Result<serde_json::Value> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    fn cached_document(&self, path: &str) -> Option<serde_json::Value> {
        let cache = self.cache.get()?;
        match cache.get(path) {
            Ok(document) => document,
            Err(e) => {
                warn!("Failed to read {} from offline cache: {}", path, e);
                None
            }
        }
    }
}

/// Signed-in identity returned by the identity service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityToken {
    /// Opaque ID token
    pub id_token: String,
    /// Token used to obtain a fresh ID token
    pub refresh_token: String,
    /// Backend user identifier
    pub local_id: String,
    /// Account email
    #[serde(default)]
    pub email: String,
    /// Token lifetime in seconds, as sent by the service
    pub expires_in: String,
}

#[derive(Debug, Deserialize)]
struct IdentityErrorBody {
    error: IdentityErrorDetail,
}

#[derive(Debug, Deserialize)]
struct IdentityErrorDetail {
    message: String,
}

/// Identity service
#[derive(Debug, Clone)]
pub struct IdentityService {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl IdentityService {
    /// URL of an identity toolkit method
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/v1/accounts:{}?key={}", self.endpoint, method, self.api_key)
    }

    /// Exchange an email and password for an identity token
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentityToken> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self
            .client
            .post(self.method_url("signInWithPassword"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<IdentityErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.to_string(),
            };
            return Err(Error::Backend(format!("Sign-in rejected: {}", message)));
        }

        Ok(response.json().await?)
    }
}

/// Backend SDK over REST endpoints
///
/// Keeps a registry of one app, like the hosted SDKs do.
#[derive(Debug, Default)]
pub struct RestBackend {
    app: Mutex<Option<RestApp>>,
}

impl RestBackend {
    /// Create an SDK with no registered app
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendSdk for RestBackend {
    type App = RestApp;
    type Data = DataService;
    type Identity = IdentityService;

    fn existing_app(&self) -> Option<RestApp> {
        self.app.lock().ok().and_then(|app| app.clone())
    }

    async fn create_app(&self, config: &BackendConfig) -> Result<RestApp> {
        if config.project_id.trim().is_empty() || config.api_key.trim().is_empty() {
            return Err(Error::Config("Backend project_id and api_key are required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        let app = RestApp {
            app_id: config.app_id.clone(),
            config: config.clone(),
            client,
        };

        let mut registry = self
            .app
            .lock()
            .map_err(|_| Error::Backend("App registry lock poisoned".to_string()))?;
        // Another caller may have registered first
        let app = registry.get_or_insert(app).clone();
        info!("Registered backend app {} for project {}", app.app_id, config.project_id);
        Ok(app)
    }

    fn data_service(&self, app: &RestApp) -> Result<DataService> {
        let config = &app.config;
        Ok(DataService {
            client: app.client.clone(),
            documents_url: format!(
                "{}/v1/projects/{}/databases/(default)/documents",
                config.data_endpoint.trim_end_matches('/'),
                config.project_id
            ),
            cache_path: config.offline_cache_path.as_ref().map(PathBuf::from),
            cache: Arc::new(OnceLock::new()),
        })
    }

    fn identity_service(&self, app: &RestApp) -> Result<IdentityService> {
        Ok(IdentityService {
            client: app.client.clone(),
            endpoint: app.config.identity_endpoint.trim_end_matches('/').to_string(),
            api_key: app.config.api_key.clone(),
        })
    }

    async fn enable_offline_cache(&self, data: &DataService) -> std::result::Result<(), CacheError> {
        if data.cache.get().is_some() {
            return Ok(());
        }

        let path = data.cache_path.clone().ok_or(CacheError::Unsupported)?;
        // Opening takes the file lock and creates the schema; keep it off the workers
        let cache = tokio::task::spawn_blocking(move || OfflineCache::open(path))
            .await
            .map_err(|e| CacheError::Other(format!("Offline cache open task failed: {}", e)))??;
        // A racing enable keeps the first cache; the second connection closes
        let _ = data.cache.set(cache);
        Ok(())
    }
}
