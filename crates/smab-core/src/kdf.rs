//! Password-based key derivation.
//!
//! Two values come out of a file password:
//!
//! - the **key-verification hash**, `PBKDF2-HMAC-SHA256(password, salt)`,
//!   stored in the header so a typed-in password can be checked quickly;
//! - the **file secret**, `BLAKE3-derive-key(PBKDF2-HMAC-SHA256(password,
//!   salt || label))`, which keys the AEAD and is never stored.
//!
//! The PBKDF2 runs use different salt inputs and the second result passes
//! through a BLAKE3 derivation with its own context, so the stored hash
//! cannot be turned into the encryption key. Both runs pay the full
//! iteration cost. The iteration count is not persisted; the same value
//! must be supplied when creating and when opening a file.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CoreError, Result};

/// Default PBKDF2 iteration count.
pub const DEFAULT_KDF_ITERATIONS: u32 = 150_000;

/// Length of a header salt in bytes.
pub const SALT_LEN: usize = 32;

/// Length of the key-verification hash in bytes.
pub const KEY_HASH_LEN: usize = 32;

/// Suffix appended to the salt for the file-secret PBKDF2 run.
const FILE_SECRET_SALT_LABEL: &[u8] = b"smab/file-secret/v1";

/// BLAKE3 derive-key context for the file secret.
const FILE_SECRET_CONTEXT: &str = "smab 2024-06 actor base file secret v1";

/// Derive `output_len` bytes from a password with PBKDF2-HMAC-SHA256.
///
/// Deterministic in `(password, salt, output_len, iterations)`. The returned
/// buffer is cleared when dropped.
pub fn derive_key_hash(
    password: &[u8],
    salt: &[u8],
    output_len: usize,
    iterations: u32,
) -> Result<Zeroizing<Vec<u8>>> {
    if output_len == 0 {
        return Err(CoreError::KeyDerivationError(
            "output length must be non-zero".into(),
        ));
    }
    if iterations == 0 {
        return Err(CoreError::KeyDerivationError(
            "iteration count must be non-zero".into(),
        ));
    }

    let mut out = Zeroizing::new(vec![0u8; output_len]);
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
    Ok(out)
}

/// Derive the symmetric file secret for a password and header salt.
pub fn derive_file_secret(password: &[u8], salt: &Salt, iterations: u32) -> Result<FileSecret> {
    let mut secret_salt = Zeroizing::new(Vec::with_capacity(SALT_LEN + FILE_SECRET_SALT_LABEL.len()));
    secret_salt.extend_from_slice(salt.as_bytes());
    secret_salt.extend_from_slice(FILE_SECRET_SALT_LABEL);

    let stretched = derive_key_hash(password, &secret_salt, 32, iterations)?;

    let mut hasher = blake3::Hasher::new_derive_key(FILE_SECRET_CONTEXT);
    hasher.update(&stretched);
    Ok(FileSecret(*hasher.finalize().as_bytes()))
}

/// Check a password against a stored verification hash.
///
/// The comparison runs in constant time, and the candidate derived from
/// `password` is cleared before returning.
pub fn verify_key_hash(password: &[u8], salt: &Salt, iterations: u32, expected: &KeyHash) -> Result<bool> {
    let candidate = derive_key_hash(password, salt.as_bytes(), KEY_HASH_LEN, iterations)?;
    // blake3::Hash equality with a byte slice is constant-time.
    Ok(blake3::Hash::from(expected.0) == *candidate.as_slice())
}

/// A random per-file salt.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Salt(pub [u8; SALT_LEN]);

impl Salt {
    /// Generate a new random salt.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; SALT_LEN] = bytes.try_into().map_err(|_| CoreError::InvalidLength {
            what: "salt",
            expected: SALT_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", &hex::encode(self.0)[..16])
    }
}

/// The stored key-verification hash.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyHash(pub [u8; KEY_HASH_LEN]);

impl KeyHash {
    /// Derive the verification hash for a password.
    pub fn derive(password: &[u8], salt: &Salt, iterations: u32) -> Result<Self> {
        let out = derive_key_hash(password, salt.as_bytes(), KEY_HASH_LEN, iterations)?;
        let mut arr = [0u8; KEY_HASH_LEN];
        arr.copy_from_slice(&out);
        Ok(Self(arr))
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_HASH_LEN] = bytes.try_into().map_err(|_| CoreError::InvalidLength {
            what: "key hash",
            expected: KEY_HASH_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; KEY_HASH_LEN] {
        &self.0
    }
}

impl fmt::Debug for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyHash({}...)", &hex::encode(self.0)[..8])
    }
}

/// A 256-bit symmetric key for the payload AEAD.
///
/// Zeroized on drop. Never serialized.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FileSecret([u8; 32]);

impl FileSecret {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for FileSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSecret")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
