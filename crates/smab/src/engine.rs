//! The facade: create, open and amend actor base files.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use smab_aggregate::{AggregationReport, Aggregator, ModdedState, OwnedObject};
use smab_core::{
    derive_file_secret, open, seal, verify_key_hash, AllowList, ContentHash, KeyHash, Keypair,
    OwnerPublicKey, Salt,
};
use smab_format::{ActorBaseFileData, Container, SmabHeader};
use smab_perms::{Clock, MemoryNonceStore, NonceStore, SystemClock, UpdateToken};
use smab_store::{read_container_file, write_container_file};

use crate::config::SmabConfig;
use crate::error::{Result, SmabError};
use crate::view::ActorBaseData;

/// Entry point for all file operations.
///
/// Holds the configuration, the replay-nonce store consulted when update
/// tokens are applied, and the clock used for token expiry. All operations
/// are synchronous; the nonce store does its own locking.
pub struct Smab<N: NonceStore = MemoryNonceStore> {
    config: SmabConfig,
    nonces: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl Smab<MemoryNonceStore> {
    /// Create with an in-memory nonce store.
    pub fn in_memory(config: SmabConfig) -> Result<Self> {
        Self::new(config, MemoryNonceStore::new())
    }
}

impl<N: NonceStore> Smab<N> {
    /// Create with the given nonce store and the system clock.
    pub fn new(config: SmabConfig, nonces: N) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            nonces: Arc::new(nonces),
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SmabConfig {
        &self.config
    }

    pub fn nonce_store(&self) -> &N {
        &self.nonces
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Container Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt `payload` into a new container with an empty allow-list.
    pub fn create_container(
        &self,
        password: &[u8],
        owner: &Keypair,
        payload: &ActorBaseFileData,
    ) -> Result<Vec<u8>> {
        self.create_container_with(password, owner, payload, AllowList::new())
    }

    /// Encrypt `payload` into a new container with an initial allow-list.
    ///
    /// The initial list is also the sealed list bound into the ciphertext.
    pub fn create_container_with(
        &self,
        password: &[u8],
        owner: &Keypair,
        payload: &ActorBaseFileData,
        allowed: AllowList,
    ) -> Result<Vec<u8>> {
        let iterations = self.config.kdf_iterations;
        let salt = Salt::generate();
        let key_hash = KeyHash::derive(password, &salt, iterations)?;
        let secret = derive_file_secret(password, &salt, iterations)?;

        let header = SmabHeader::create(owner, salt, key_hash, allowed);

        let plaintext = payload.to_bytes()?;
        if plaintext.len() > self.config.max_payload_len {
            return Err(SmabError::PayloadTooLarge {
                len: plaintext.len(),
                max: self.config.max_payload_len,
            });
        }
        let sealed = seal(&plaintext, &secret, Some(header.associated_data().as_slice()))?;
        drop(plaintext);

        let file_id = header.id();
        let bytes = Container::new(header, sealed).encode()?;
        info!(
            %file_id,
            files = payload.files.len(),
            swaps = payload.file_swaps.len(),
            len = bytes.len(),
            "created actor base container"
        );
        Ok(bytes)
    }

    /// Aggregate `object` from `state` and encrypt the result.
    ///
    /// Returns the container bytes and the report of skipped groups.
    pub fn export_object(
        &self,
        password: &[u8],
        owner: &Keypair,
        aggregator: &Aggregator<'_>,
        state: &ModdedState,
        object: OwnedObject,
        description: &str,
    ) -> Result<(Vec<u8>, AggregationReport)> {
        let aggregation = aggregator.aggregate(state, object, description)?;
        let bytes = self.create_container(password, owner, &aggregation.data)?;
        Ok((bytes, aggregation.report))
    }

    /// Decrypt and verify a container.
    ///
    /// Order: parse, password check, decryption, header signature. A wrong
    /// password fails with [`SmabError::PasswordMismatch`] before any
    /// decryption is attempted.
    pub fn open_container(&self, bytes: &[u8], password: &[u8]) -> Result<ActorBaseData> {
        let container = Container::decode_with_limit(bytes, self.config.max_payload_len)?;
        self.open_decoded(&container, password)
    }

    /// As [`open_container`](Self::open_container), additionally requiring
    /// the file to be owned by `expected_owner`.
    pub fn open_container_with_owner(
        &self,
        bytes: &[u8],
        password: &[u8],
        expected_owner: &OwnerPublicKey,
    ) -> Result<ActorBaseData> {
        let container = Container::decode_with_limit(bytes, self.config.max_payload_len)?;
        let owner = container.header().owner();
        if owner != expected_owner {
            return Err(SmabError::OwnerMismatch {
                expected: expected_owner.to_hex(),
                found: owner.to_hex(),
            });
        }
        self.open_decoded(&container, password)
    }

    fn open_decoded(&self, container: &Container, password: &[u8]) -> Result<ActorBaseData> {
        let header = container.header();
        let iterations = self.config.kdf_iterations;

        if !verify_key_hash(password, header.salt(), iterations, header.key_hash())? {
            debug!(file_id = %header.id(), "password mismatch");
            return Err(SmabError::PasswordMismatch);
        }

        let secret = derive_file_secret(password, header.salt(), iterations)?;
        let plaintext = open(
            container.ciphertext(),
            container.nonce(),
            container.tag(),
            &secret,
            Some(header.associated_data().as_slice()),
        )
        .map_err(|e| {
            warn!(file_id = %header.id(), "container failed authentication");
            e
        })?;

        header.verify().map_err(|e| {
            warn!(file_id = %header.id(), "header signature invalid");
            e
        })?;

        let payload = ActorBaseFileData::from_bytes(&plaintext)?;
        drop(plaintext);

        let view = ActorBaseData::new(header.clone(), payload)?;
        debug!(
            file_id = %view.file_id(),
            replacements = view.replacements().len(),
            allowed = view.valid_hashes().len(),
            "opened actor base container"
        );
        Ok(view)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Update Tokens
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a token amending `header`'s allow-list.
    ///
    /// `ttl` defaults to the configured lifetime and may not exceed the
    /// configured maximum.
    pub fn issue_update_token(
        &self,
        owner: &Keypair,
        header: &SmabHeader,
        add: impl IntoIterator<Item = ContentHash>,
        remove: impl IntoIterator<Item = ContentHash>,
        ttl: Option<Duration>,
    ) -> Result<UpdateToken> {
        let ttl_secs = ttl
            .map(|d| d.as_secs())
            .unwrap_or(self.config.default_token_ttl_secs);
        if ttl_secs == 0 || ttl_secs > self.config.max_token_ttl_secs {
            return Err(SmabError::InvalidTtl {
                ttl_secs,
                max_secs: self.config.max_token_ttl_secs,
            });
        }

        let ttl_millis = i64::try_from(ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        let expires_at = self.clock.now_millis().saturating_add(ttl_millis);
        let token = UpdateToken::issue(owner, header, add, remove, expires_at)?;

        info!(
            file_id = %header.id(),
            add = token.payload().add.len(),
            remove = token.payload().remove.len(),
            expires_at,
            "issued update token"
        );
        Ok(token)
    }

    /// Verify `token` against `header`, consume its nonce, and return the
    /// successor header. `header` itself is never modified.
    pub fn apply_update_token(&self, header: &SmabHeader, token: &UpdateToken) -> Result<SmabHeader> {
        let next = token
            .apply(header, self.nonces.as_ref(), self.clock.as_ref())
            .map_err(|e| {
                warn!(file_id = %header.id(), error = %e, "update token rejected");
                e
            })?;

        info!(
            file_id = %next.id(),
            allowed = next.allowed_hashes().len(),
            "applied update token"
        );
        Ok(next)
    }

    /// Apply `token` to the header inside a container, keeping the sealed
    /// payload byte-for-byte. Needs neither the password nor the owner key.
    pub fn amend_container(&self, bytes: &[u8], token: &UpdateToken) -> Result<Vec<u8>> {
        let container = Container::decode_with_limit(bytes, self.config.max_payload_len)?;
        container.header().verify()?;

        let next = self.apply_update_token(container.header(), token)?;
        Ok(container.with_header(next)?.encode()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────

    /// Atomically write container bytes to `path` after checking they parse.
    pub fn save_container(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        Container::decode_with_limit(bytes, self.config.max_payload_len)?;
        write_container_file(path, bytes)?;
        Ok(())
    }

    /// Read and open the container at `path`.
    pub fn load_container(&self, path: &Path, password: &[u8]) -> Result<ActorBaseData> {
        let container = read_container_file(path, self.config.max_payload_len)?;
        self.open_decoded(&container, password)
    }
}
