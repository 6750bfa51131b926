//! SQLite mirror of remote documents used while offline

use super::types::CacheError;
use crate::{Error, Result};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Local copy of documents read from the backend
///
/// The cache file is opened in exclusive locking mode, so only one execution
/// context can hold it at a time.
pub struct OfflineCache {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for OfflineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineCache").finish_non_exhaustive()
    }
}

impl OfflineCache {
    /// Open the cache file and take the exclusive lock
    pub fn open<P: AsRef<Path>>(path: P) -> std::result::Result<Self, CacheError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CacheError::Other(e.to_string()))?;
            }
        }

        let conn = Connection::open(path).map_err(classify)?;
        conn.busy_timeout(Duration::ZERO).map_err(classify)?;
        conn.query_row("PRAGMA locking_mode = EXCLUSIVE", [], |row| row.get::<_, String>(0))
            .map_err(classify)?;

        // The first write transaction takes the lock and keeps it
        conn.execute_batch(
            "BEGIN EXCLUSIVE;
             CREATE TABLE IF NOT EXISTS documents (
                path TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                cached_at INTEGER NOT NULL
             );
             COMMIT;",
        )
        .map_err(classify)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Store the latest copy of a document
    pub fn put(&self, path: &str, document: &serde_json::Value) -> Result<()> {
        let body = serde_json::to_string(document)?;
        let now = chrono::Utc::now().timestamp_millis();
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO documents (path, body, cached_at) VALUES (?1, ?2, ?3)",
            params![path, body, now],
        )?;
        Ok(())
    }

    /// Cached copy of a document, if any
    pub fn get(&self, path: &str) -> Result<Option<serde_json::Value>> {
        let body: Option<String> = {
            let conn = self.lock()?;
            conn.query_row("SELECT body FROM documents WHERE path = ?1", params![path], |row| row.get(0))
                .optional()?
        };

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    /// Number of cached documents
    pub fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Whether the cache holds no documents
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("Offline cache lock poisoned".to_string()))
    }
}

fn classify(error: rusqlite::Error) -> CacheError {
    match error.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => CacheError::Contended,
        _ => CacheError::Other(error.to_string()),
    }
}
