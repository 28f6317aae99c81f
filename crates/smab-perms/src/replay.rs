//! Replay protection for update tokens.
//!
//! Every token carries a random nonce. A nonce is consumed the first time a
//! token bearing it is applied to a file and stays consumed until the token
//! expires; after that the expiry check rejects the token on its own.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use rand::RngCore;
use smab_core::FileId;

use crate::error::{Result, TokenError};

/// Length of a token nonce in bytes.
pub const TOKEN_NONCE_LEN: usize = 16;

/// A single-use token nonce.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenNonce(pub [u8; TOKEN_NONCE_LEN]);

impl TokenNonce {
    /// Generate a random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; TOKEN_NONCE_LEN] = bytes.try_into().map_err(|_| {
            TokenError::Malformed(format!(
                "nonce must be {TOKEN_NONCE_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub const fn as_bytes(&self) -> &[u8; TOKEN_NONCE_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for TokenNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenNonce({})", self.to_hex())
    }
}

/// Shared record of consumed token nonces, scoped per file id.
///
/// Implementations must make the check and the insert one atomic step:
/// two concurrent calls with the same `(file_id, nonce)` must not both
/// return `true`.
pub trait NonceStore: Send + Sync {
    /// Record `nonce` for `file_id` unless already present.
    ///
    /// Returns `Ok(true)` if the nonce was fresh and is now recorded,
    /// `Ok(false)` if it had already been consumed. Entries whose expiry is
    /// at or before `now` may be pruned.
    fn check_and_record(
        &self,
        file_id: FileId,
        nonce: &TokenNonce,
        expires_at: i64,
        now: i64,
    ) -> Result<bool>;
}

/// In-memory nonce store behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryNonceStore {
    seen: Mutex<HashMap<(FileId, TokenNonce), i64>>,
}

impl MemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NonceStore for MemoryNonceStore {
    fn check_and_record(
        &self,
        file_id: FileId,
        nonce: &TokenNonce,
        expires_at: i64,
        now: i64,
    ) -> Result<bool> {
        let mut seen = self
            .seen
            .lock()
            .map_err(|_| TokenError::Store("nonce store lock poisoned".into()))?;

        seen.retain(|_, expiry| *expiry > now);

        let key = (file_id, *nonce);
        if seen.contains_key(&key) {
            return Ok(false);
        }
        seen.insert(key, expires_at);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_second_use_rejected() {
        let store = MemoryNonceStore::new();
        let file = FileId::generate();
        let nonce = TokenNonce::generate();

        assert!(store.check_and_record(file, &nonce, 100, 0).unwrap());
        assert!(!store.check_and_record(file, &nonce, 100, 1).unwrap());
    }

    #[test]
    fn test_scope_is_per_file() {
        let store = MemoryNonceStore::new();
        let nonce = TokenNonce::generate();

        assert!(store.check_and_record(FileId::generate(), &nonce, 100, 0).unwrap());
        assert!(store.check_and_record(FileId::generate(), &nonce, 100, 0).unwrap());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_expired_entries_pruned() {
        let store = MemoryNonceStore::new();
        let file = FileId::generate();

        store.check_and_record(file, &TokenNonce::generate(), 10, 0).unwrap();
        store.check_and_record(file, &TokenNonce::generate(), 50, 0).unwrap();
        assert_eq!(store.len(), 2);

        store.check_and_record(file, &TokenNonce::generate(), 90, 20).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_concurrent_same_nonce_single_winner() {
        let store = Arc::new(MemoryNonceStore::new());
        let file = FileId::generate();
        let nonce = TokenNonce::generate();
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let wins = Arc::clone(&wins);
                std::thread::spawn(move || {
                    if store.check_and_record(file, &nonce, 1_000, 0).unwrap() {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_nonce_length_checked() {
        assert!(TokenNonce::from_slice(&[0u8; 16]).is_ok());
        assert!(matches!(
            TokenNonce::from_slice(&[0u8; 15]),
            Err(TokenError::Malformed(_))
        ));
    }
}
