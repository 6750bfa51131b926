//! Static application configuration
//!
//! The configuration record is supplied once at startup. It is stored as JSON
//! and falls back to defaults when the file is missing or blank.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime the backend connection is built for
///
/// The offline cache is only attempted on [`RuntimeTarget::Web`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeTarget {
    /// Browser-style runtime with a persistent offline cache
    Web,
    /// Native runtime (the SDK manages its own persistence)
    Native,
}

/// Backend project identifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Public API key sent with identity requests
    pub api_key: String,
    /// Identity domain
    pub auth_domain: String,
    /// Project the document database belongs to
    pub project_id: String,
    /// Object storage bucket
    pub storage_bucket: String,
    /// Messaging sender identifier
    pub messaging_sender_id: String,
    /// Application identifier
    pub app_id: String,
    /// Runtime target
    pub runtime: RuntimeTarget,
    /// Location of the offline document cache; `None` means unsupported
    pub offline_cache_path: Option<String>,
    /// Base URL of the document service
    pub data_endpoint: String,
    /// Base URL of the identity service
    pub identity_endpoint: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            auth_domain: String::new(),
            project_id: String::new(),
            storage_bucket: String::new(),
            messaging_sender_id: String::new(),
            app_id: String::new(),
            runtime: RuntimeTarget::Web,
            offline_cache_path: Some("./app_data/offline_cache.db".to_string()),
            data_endpoint: "https://firestore.googleapis.com".to_string(),
            identity_endpoint: "https://identitytoolkit.googleapis.com".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Routes and timing used by the session gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Delay before a scheduled navigation is dispatched, in milliseconds
    pub navigation_delay_ms: u64,
    /// First route segment of the login flow
    pub login_group: String,
    /// Route replaced in when the user must sign in
    pub login_route: String,
    /// Route replaced in after a successful sign-in
    pub landing_route: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            navigation_delay_ms: 100,
            login_group: "(auth)".to_string(),
            login_route: "/(auth)/login".to_string(),
            landing_route: "/(tabs)".to_string(),
        }
    }
}

/// Local persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file backing the key-value store
    pub db_path: String,
    /// Key prefix of the identity namespace (opaque, non-JSON values)
    pub identity_namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "./app_data/stockkeep.db".to_string(),
            identity_namespace: "identity".to_string(),
        }
    }
}

/// Complete startup configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend connection
    pub backend: BackendConfig,
    /// Session gate
    pub gate: GateConfig,
    /// Local storage
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from a JSON file
    ///
    /// Returns the defaults if the file doesn't exist or is blank.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a JSON file, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Check that the record is usable for backend initialization and routing
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("backend.api_key", &self.backend.api_key),
            ("backend.project_id", &self.backend.project_id),
            ("backend.app_id", &self.backend.app_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", name)));
            }
        }

        if self.gate.login_group.is_empty() {
            return Err(Error::Config("gate.login_group must not be empty".to_string()));
        }
        for (name, route) in [
            ("gate.login_route", &self.gate.login_route),
            ("gate.landing_route", &self.gate.landing_route),
        ] {
            if !route.starts_with('/') {
                return Err(Error::Config(format!("{} must start with '/': {}", name, route)));
            }
        }

        // The gate only recognizes the login flow by its route group
        if route_group(&self.gate.login_route) != Some(self.gate.login_group.as_str()) {
            return Err(Error::Config(format!(
                "gate.login_route must be inside gate.login_group {:?}: {}",
                self.gate.login_group, self.gate.login_route
            )));
        }
        if route_group(&self.gate.landing_route) == Some(self.gate.login_group.as_str()) {
            return Err(Error::Config(format!(
                "gate.landing_route must be outside gate.login_group {:?}: {}",
                self.gate.login_group, self.gate.landing_route
            )));
        }

        if self.storage.identity_namespace.is_empty() || self.storage.identity_namespace.contains(':') {
            return Err(Error::Config(format!(
                "storage.identity_namespace must be a non-empty name without ':': {:?}",
                self.storage.identity_namespace
            )));
        }

        Ok(())
    }
}

fn route_group(route: &str) -> Option<&str> {
    route.split('/').find(|segment| !segment.is_empty())
}
