//! Persisted authentication state
//!
//! The identity token lives in the identity namespace of the local store and
//! the session profile under [`PROFILE_KEY`]. [`AuthSession::restore`] resolves
//! the startup state; sign-in and sign-out update the store first and then
//! publish the new [`AuthSnapshot`].

use super::gate::AuthSnapshot;
use crate::backend::IdentityService;
use crate::storage::{KeyValueStore, SafeStore};
use crate::{Error, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

/// Name of the token entry inside the identity namespace
pub const TOKEN_NAME: &str = "token";

/// Key of the JSON session profile
pub const PROFILE_KEY: &str = "session:profile";

/// Who is signed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProfile {
    /// Backend user identifier
    pub user_id: String,
    /// Account email
    pub email: String,
    /// When the session started
    pub signed_in_at: DateTime<Utc>,
}

impl SessionProfile {
    /// Profile for a session starting now
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            signed_in_at: Utc::now(),
        }
    }
}

/// Expiry encoded in a JWT-shaped token
///
/// Returns `None` for opaque tokens or tokens without an `exp` claim.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    Utc.timestamp_opt(exp, 0).single()
}

/// Source of the authentication flag
pub struct AuthSession<S> {
    store: SafeStore<S>,
    token_key: String,
    profile: RwLock<Option<SessionProfile>>,
    tx: watch::Sender<AuthSnapshot>,
}

impl<S: KeyValueStore> AuthSession<S> {
    /// Create a session in the loading state
    pub fn new(store: SafeStore<S>) -> Self {
        let token_key = store.identity_key(TOKEN_NAME);
        let (tx, _rx) = watch::channel(AuthSnapshot::loading());
        Self {
            store,
            token_key,
            profile: RwLock::new(None),
            tx,
        }
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.tx.subscribe()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> AuthSnapshot {
        *self.tx.borrow()
    }

    /// Profile of the signed-in user
    pub async fn profile(&self) -> Option<SessionProfile> {
        self.profile.read().await.clone()
    }

    /// Resolve the startup state from the local store
    ///
    /// A missing, corrupted or expired token resolves to signed out.
    pub async fn restore(&self) -> AuthSnapshot {
        let token = self.store.read(&self.token_key).await;

        let is_authenticated = match token {
            Some(token) => match token_expiry(&token) {
                Some(expiry) if expiry <= Utc::now() => {
                    info!("Stored session expired at {}, signing out", expiry);
                    self.clear().await;
                    false
                }
                _ => {
                    let profile = self.store.read_json::<SessionProfile>(PROFILE_KEY).await;
                    *self.profile.write().await = profile;
                    true
                }
            },
            None => false,
        };

        info!("Restored session (authenticated: {})", is_authenticated);
        self.publish(AuthSnapshot::resolved(is_authenticated))
    }

    /// Persist a new session and publish it
    ///
    /// Returns false, publishing nothing, if the token can't be stored.
    pub async fn sign_in(&self, token: &str, profile: SessionProfile) -> bool {
        if !self.store.write(&self.token_key, token).await {
            warn!("Failed to persist identity token, staying signed out");
            return false;
        }

        if !self.store.write_json(PROFILE_KEY, &profile).await {
            warn!("Failed to persist session profile for {}", profile.user_id);
        }
        info!("Signed in as {}", profile.email);
        *self.profile.write().await = Some(profile);

        self.publish(AuthSnapshot::resolved(true));
        true
    }

    /// Sign in through the identity service and persist the result
    pub async fn sign_in_with_password(
        &self,
        identity: &IdentityService,
        email: &str,
        password: &str,
    ) -> Result<SessionProfile> {
        let token = identity.sign_in_with_password(email, password).await?;
        let profile = SessionProfile::new(token.local_id, email);

        if !self.sign_in(&token.id_token, profile.clone()).await {
            return Err(Error::Storage("Failed to persist identity token".to_string()));
        }
        Ok(profile)
    }

    /// Forget the session and publish signed out
    pub async fn sign_out(&self) {
        self.clear().await;
        info!("Signed out");
        self.publish(AuthSnapshot::resolved(false));
    }

    async fn clear(&self) {
        self.store.remove(&self.token_key).await;
        self.store.remove(PROFILE_KEY).await;
        *self.profile.write().await = None;
    }

    fn publish(&self, snapshot: AuthSnapshot) -> AuthSnapshot {
        self.tx.send_replace(snapshot);
        snapshot
    }
}
