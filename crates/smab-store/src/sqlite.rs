//! SQLite-backed replay-nonce store.
//!
//! Consumed nonces survive restarts, so a token applied once stays spent
//! until it expires. The check and the insert run as one statement under
//! the connection mutex.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use smab_core::FileId;
use smab_perms::{NonceStore, TokenError, TokenNonce};

use crate::error::{Result, StoreError};
use crate::migration;

/// Persistent [`NonceStore`].
pub struct SqliteNonceStore {
    conn: Mutex<Connection>,
}

impl SqliteNonceStore {
    /// Open a SQLite database at the given path, creating and migrating it
    /// as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }

    /// Prune expired entries, then record `nonce` unless already present.
    ///
    /// Returns `true` when the nonce was fresh.
    pub fn record(
        &self,
        file_id: FileId,
        nonce: &TokenNonce,
        expires_at: i64,
        now: i64,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            prune(conn, now)?;
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO consumed_nonces (file_id, nonce, expires_at, consumed_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![&file_id.as_bytes()[..], &nonce.as_bytes()[..], expires_at, now],
            )?;
            if inserted == 0 {
                tracing::warn!(%file_id, nonce = %nonce.to_hex(), "replayed update token nonce");
            }
            Ok(inserted == 1)
        })
    }

    /// Delete entries whose expiry is at or before `now`.
    pub fn prune_expired(&self, now: i64) -> Result<usize> {
        self.with_conn(|conn| prune(conn, now))
    }

    /// Number of stored entries.
    pub fn count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 =
                conn.query_row("SELECT COUNT(*) FROM consumed_nonces", [], |row| row.get(0))?;
            Ok(n as u64)
        })
    }
}

fn prune(conn: &Connection, now: i64) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM consumed_nonces WHERE expires_at <= ?1",
        params![now],
    )?;
    if removed > 0 {
        tracing::debug!(removed, "pruned expired token nonces");
    }
    Ok(removed)
}

impl NonceStore for SqliteNonceStore {
    fn check_and_record(
        &self,
        file_id: FileId,
        nonce: &TokenNonce,
        expires_at: i64,
        now: i64,
    ) -> std::result::Result<bool, TokenError> {
        self.record(file_id, nonce, expires_at, now)
            .map_err(|e| TokenError::Store(e.to_string()))
    }
}
