//! Corruption-tolerant access to the local key-value store
//!
//! The local store is shared across app versions and can hold leftovers from
//! failed writes or older serialization bugs. Every value is validated on
//! write and again on every read; a value that fails validation on read is
//! evicted so it cannot be observed twice.
//!
//! Keys in the identity namespace (`identity` or `identity:*` by default) hold
//! an opaque token and are exempt from the JSON check. Every other key must
//! hold JSON text.

use super::kv::KeyValueStore;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default key prefix of the identity namespace
pub const DEFAULT_IDENTITY_NAMESPACE: &str = "identity";

/// Literal tokens left behind by writes of missing or unserialized values
const POISON_TOKENS: &[&str] = &["undefined", "null", "object"];

/// Marker of an object that was converted to text instead of serialized
const STRINGIFIED_OBJECT_MARKER: &str = "[object ";

/// Reason a stored or submitted value was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    /// Zero-length value
    Empty,
    /// Value made of whitespace only
    Blank,
    /// Undecodable bytes or binary control characters
    NotText,
    /// Literal `undefined` / `null` / `object` token
    PoisonToken,
    /// Stringified-object artifact such as `[object Object]`
    StringifiedObject,
    /// Not parseable as JSON (non-identity keys only)
    InvalidJson,
}

impl Corruption {
    /// Short machine-friendly reason, used in log lines
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Blank => "blank",
            Self::NotText => "not-text",
            Self::PoisonToken => "poison-token",
            Self::StringifiedObject => "stringified-object",
            Self::InvalidJson => "invalid-json",
        }
    }
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// A named validation step; `detect` returns true when the value is bad
struct Check {
    kind: Corruption,
    detect: fn(raw: &str, is_identity: bool) -> bool,
}

/// Validation order. The first matching check names the corruption.
const CHECKS: [Check; 6] = [
    Check { kind: Corruption::Empty, detect: is_empty },
    Check { kind: Corruption::Blank, detect: is_blank },
    Check { kind: Corruption::NotText, detect: is_not_text },
    Check { kind: Corruption::PoisonToken, detect: is_poison_token },
    Check { kind: Corruption::StringifiedObject, detect: is_stringified_object },
    Check { kind: Corruption::InvalidJson, detect: is_invalid_json },
];

fn is_empty(raw: &str, _is_identity: bool) -> bool {
    raw.is_empty()
}

fn is_blank(raw: &str, _is_identity: bool) -> bool {
    raw.trim().is_empty()
}

fn is_not_text(raw: &str, _is_identity: bool) -> bool {
    raw.chars()
        .any(|c| c == char::REPLACEMENT_CHARACTER || (c.is_control() && !c.is_whitespace()))
}

fn is_poison_token(raw: &str, _is_identity: bool) -> bool {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    POISON_TOKENS.iter().any(|token| unquoted.eq_ignore_ascii_case(token))
}

fn is_stringified_object(raw: &str, _is_identity: bool) -> bool {
    raw.contains(STRINGIFIED_OBJECT_MARKER)
}

fn is_invalid_json(raw: &str, is_identity: bool) -> bool {
    !is_identity && serde_json::from_str::<serde::de::IgnoredAny>(raw.trim()).is_err()
}

/// Validate-then-trust wrapper around a [`KeyValueStore`]
///
/// None of the operations return errors. Expected failures resolve to `None`
/// or `false` and a log line.
///
/// # Example
/// ```rust,no_run
/// use stockkeep::storage::{MemoryStore, SafeStore};
///
/// # async fn example() {
/// let store = SafeStore::new(MemoryStore::new());
///
/// assert!(store.write("settings:scanner", r#"{"beep":true}"#).await);
/// assert!(!store.write("settings:scanner", "{not json").await);
///
/// // Identity values are opaque tokens
/// assert!(store.write("identity:token", "abc123").await);
/// assert_eq!(store.read("identity:token").await.as_deref(), Some("abc123"));
/// # }
/// ```
pub struct SafeStore<S> {
    store: Arc<S>,
    identity_namespace: String,
}

impl<S> Clone for SafeStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            identity_namespace: self.identity_namespace.clone(),
        }
    }
}

impl<S: KeyValueStore> SafeStore<S> {
    /// Wrap a store using the default identity namespace
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    /// Wrap a store that is shared with other owners
    pub fn from_shared(store: Arc<S>) -> Self {
        Self {
            store,
            identity_namespace: DEFAULT_IDENTITY_NAMESPACE.to_string(),
        }
    }

    /// Use a different identity namespace prefix
    pub fn with_identity_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.identity_namespace = namespace.into();
        self
    }

    /// The underlying store
    pub fn inner(&self) -> &Arc<S> {
        &self.store
    }

    /// Key of `name` inside the identity namespace
    pub fn identity_key(&self, name: &str) -> String {
        format!("{}:{}", self.identity_namespace, name)
    }

    /// Whether `key` holds an opaque identity value rather than JSON
    pub fn is_identity_key(&self, key: &str) -> bool {
        match key.strip_prefix(self.identity_namespace.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(':'),
            None => false,
        }
    }

    /// Run the validation checks in order
    ///
    /// Returns the trimmed text if the value is acceptable for `key`.
    pub fn classify<'a>(&self, key: &str, raw: &'a str) -> Result<&'a str, Corruption> {
        let is_identity = self.is_identity_key(key);
        match CHECKS.iter().find(|check| (check.detect)(raw, is_identity)) {
            Some(check) => Err(check.kind),
            None => Ok(raw.trim()),
        }
    }

    /// Read and validate the value stored under `key`
    ///
    /// Returns `None` if the key is missing, the store fails, or the value is
    /// corrupted. Corrupted values are evicted before returning.
    pub async fn read(&self, key: &str) -> Option<String> {
        if key.is_empty() {
            warn!("Refusing to read an empty key");
            return None;
        }

        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read '{}' from local store: {}", key, e);
                return None;
            }
        };

        match self.classify(key, &raw) {
            Ok(text) => Some(text.to_string()),
            Err(corruption) => {
                warn!("Evicting corrupted value under '{}' ({})", key, corruption);
                self.remove(key).await;
                None
            }
        }
    }

    /// Validate and store `text` under `key`
    ///
    /// Returns false, leaving the store untouched, if the value is rejected.
    /// Also returns false if the store itself fails.
    pub async fn write(&self, key: &str, text: &str) -> bool {
        if key.is_empty() {
            warn!("Refusing to write an empty key");
            return false;
        }

        if let Err(corruption) = self.classify(key, text) {
            warn!("Rejected write to '{}' ({})", key, corruption);
            return false;
        }

        match self.store.set(key, text).await {
            Ok(()) => {
                debug!("Stored '{}' ({} bytes)", key, text.len());
                true
            }
            Err(e) => {
                warn!("Failed to write '{}' to local store: {}", key, e);
                false
            }
        }
    }

    /// Store raw bytes, rejecting anything that is not UTF-8 text
    pub async fn write_bytes(&self, key: &str, bytes: &[u8]) -> bool {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.write(key, text).await,
            Err(e) => {
                warn!("Rejected non-text write to '{}': {}", key, e);
                false
            }
        }
    }

    /// Delete `key`, logging (never returning) failures
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            warn!("Failed to remove '{}' from local store: {}", key, e);
        }
    }

    /// Read a JSON value and deserialize it
    ///
    /// A value that is valid JSON but doesn't match `T` is reported as absent
    /// and left in place; it may have been written by a newer schema.
    pub async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let text = self.read(key).await?;
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Stored value under '{}' has an unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Serialize `value` to JSON and store it
    pub async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(text) => self.write(key, &text).await,
            Err(e) => {
                warn!("Failed to serialize value for '{}': {}", key, e);
                false
            }
        }
    }
}
