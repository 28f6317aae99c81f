//! Update tokens: signed, expiring, single-use allow-list deltas.
//!
//! The owner issues a token against a specific header. The token carries two
//! signatures:
//!
//! - `signature` over the canonical [`UpdateTokenPayload`] encoding
//! - `header_signature` over the successor header, i.e. the current header
//!   with its allow-list replaced by `(allowed ∪ add) \ remove`
//!
//! Applying a token needs only the header and the token. No password and no
//! private key are involved, and a token minted against a different
//! allow-list state cannot produce a verifying header.

use std::collections::BTreeSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use smab_core::{AllowList, CanonicalWriter, ContentHash, FileId, Keypair, OwnerSignature};
use smab_format::SmabHeader;

use crate::clock::Clock;
use crate::error::{Result, TokenError};
use crate::replay::{NonceStore, TokenNonce};

/// Domain label for token payload signatures.
pub const TOKEN_SIGN_DOMAIN: &[u8] = b"smab/update-token/v1";

/// The signed body of an update token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTokenPayload {
    /// File whose header this token amends.
    pub file_id: FileId,
    /// Hashes to add to the allow-list.
    pub add: BTreeSet<ContentHash>,
    /// Hashes to remove. Removal wins over addition.
    pub remove: BTreeSet<ContentHash>,
    /// Expiry, Unix milliseconds. The token is valid strictly before this.
    pub expires_at: i64,
    /// Single-use nonce.
    pub nonce: TokenNonce,
}

impl UpdateTokenPayload {
    /// Canonical bytes covered by the token signature.
    ///
    /// **CRITICAL**: FROZEN. Layout: domain | file id (16) | add (count, each
    /// length-prefixed) | remove (same) | expires_at (i64 BE) | nonce (16).
    pub fn signing_message(&self) -> Vec<u8> {
        CanonicalWriter::new(TOKEN_SIGN_DOMAIN)
            .fixed(self.file_id.as_bytes())
            .strs(self.add.iter().map(ContentHash::as_str))
            .strs(self.remove.iter().map(ContentHash::as_str))
            .i64(self.expires_at)
            .fixed(self.nonce.as_bytes())
            .finish()
    }

    /// The allow-list this token turns `allowed` into.
    pub fn apply_to(&self, allowed: &AllowList) -> AllowList {
        allowed.apply_delta(&self.add, &self.remove)
    }

    /// Whether the token has expired at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// An update token as issued by the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateToken {
    payload: UpdateTokenPayload,
    signature: OwnerSignature,
    header_signature: OwnerSignature,
}

impl UpdateToken {
    /// Issue a token amending `header`.
    ///
    /// `owner` must be the keypair whose public key the header carries, and
    /// `header` must verify under it.
    pub fn issue(
        owner: &Keypair,
        header: &SmabHeader,
        add: impl IntoIterator<Item = ContentHash>,
        remove: impl IntoIterator<Item = ContentHash>,
        expires_at: i64,
    ) -> Result<Self> {
        if owner.public_key() != *header.owner() {
            return Err(TokenError::NotOwner);
        }
        header.verify().map_err(|_| TokenError::InvalidSignature)?;

        let payload = UpdateTokenPayload {
            file_id: header.id(),
            add: add.into_iter().collect(),
            remove: remove.into_iter().collect(),
            expires_at,
            nonce: TokenNonce::generate(),
        };

        let signature = owner.sign(&payload.signing_message());
        let next_allowed = payload.apply_to(header.allowed_hashes());
        let header_signature = owner.sign(&header.signing_message_for(&next_allowed));

        Ok(Self {
            payload,
            signature,
            header_signature,
        })
    }

    pub fn payload(&self) -> &UpdateTokenPayload {
        &self.payload
    }

    pub fn signature(&self) -> &OwnerSignature {
        &self.signature
    }

    pub fn header_signature(&self) -> &OwnerSignature {
        &self.header_signature
    }

    /// Run every stateless check against `header` and return the successor
    /// header. The nonce is not consumed.
    ///
    /// Checks, in order: target id, token signature, expiry, successor
    /// header signature. A token whose own signature is good but whose
    /// successor signature does not match `header` is [`TokenError::StaleHeader`].
    pub fn verify(&self, header: &SmabHeader, now: i64) -> Result<SmabHeader> {
        let payload = &self.payload;

        if payload.file_id != header.id() {
            return Err(TokenError::TargetMismatch {
                expected: header.id(),
                found: payload.file_id,
            });
        }

        header
            .owner()
            .verify(&payload.signing_message(), &self.signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        if payload.is_expired(now) {
            return Err(TokenError::Expired {
                expires_at: payload.expires_at,
                now,
            });
        }

        header
            .with_allowed_hashes(payload.apply_to(header.allowed_hashes()), self.header_signature)
            .map_err(|_| TokenError::StaleHeader)
    }

    /// Verify against `header`, consume the nonce, and return the successor
    /// header.
    ///
    /// The nonce is recorded only once every other check has passed, so a
    /// rejected token leaves the store untouched.
    pub fn apply(
        &self,
        header: &SmabHeader,
        store: &dyn NonceStore,
        clock: &dyn Clock,
    ) -> Result<SmabHeader> {
        let now = clock.now_millis();
        let next = self.verify(header, now)?;

        let fresh = store.check_and_record(
            self.payload.file_id,
            &self.payload.nonce,
            self.payload.expires_at,
            now,
        )?;
        if !fresh {
            return Err(TokenError::Replayed);
        }

        Ok(next)
    }

    /// Encode as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let wire = TokenWire {
            file_id: self.payload.file_id,
            add: self.payload.add.clone(),
            remove: self.payload.remove.clone(),
            expires_at: self.payload.expires_at,
            nonce: BASE64.encode(self.payload.nonce.as_bytes()),
            signature: BASE64.encode(self.signature.as_bytes()),
            header_signature: BASE64.encode(self.header_signature.as_bytes()),
        };
        serde_json::to_vec(&wire).map_err(|e| TokenError::Malformed(e.to_string()))
    }

    /// Decode from JSON. Signatures are not checked here.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let wire: TokenWire =
            serde_json::from_slice(bytes).map_err(|e| TokenError::Malformed(e.to_string()))?;

        let nonce = TokenNonce::from_slice(&decode_b64("nonce", &wire.nonce)?)?;
        let signature = decode_signature("signature", &wire.signature)?;
        let header_signature = decode_signature("headerSignature", &wire.header_signature)?;

        Ok(Self {
            payload: UpdateTokenPayload {
                file_id: wire.file_id,
                add: wire.add,
                remove: wire.remove,
                expires_at: wire.expires_at,
                nonce,
            },
            signature,
            header_signature,
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TokenWire {
    file_id: FileId,
    add: BTreeSet<ContentHash>,
    remove: BTreeSet<ContentHash>,
    expires_at: i64,
    nonce: String,
    signature: String,
    header_signature: String,
}

fn decode_b64(field: &str, text: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(text)
        .map_err(|e| TokenError::Malformed(format!("{field}: {e}")))
}

fn decode_signature(field: &str, text: &str) -> Result<OwnerSignature> {
    OwnerSignature::from_slice(&decode_b64(field, text)?)
        .map_err(|e| TokenError::Malformed(format!("{field}: {e}")))
}
