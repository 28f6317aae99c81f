//! The plaintext payload of an actor base file.
//!
//! Encoded as CBOR. Field names are camelCase and stable; the encoding is
//! only ever read back after AEAD authentication, so it is not used for
//! signatures.

use std::collections::{BTreeSet, HashSet};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use smab_core::ContentHash;

use crate::error::{FormatError, Result};

/// Normalize an in-game logical path: lower-case, forward slashes.
pub fn normalize_game_path(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

/// A real mod file: new bytes identified by their content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileModData {
    /// Logical paths this file replaces.
    pub game_paths: BTreeSet<String>,
    /// Byte length of the physical file.
    pub length: u64,
    /// Content hash of the physical file.
    pub hash: ContentHash,
}

/// A vanilla redirection: logical paths served by another game path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSwap {
    /// Logical paths being redirected.
    pub game_paths: BTreeSet<String>,
    /// Game path they are redirected to.
    pub swap_path: String,
}

/// The payload sealed inside a container.
///
/// The three state blobs are opaque serialized state owned by other
/// systems; they are carried byte-for-byte.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorBaseFileData {
    pub description: String,
    pub appearance: Bytes,
    pub body_shape: Bytes,
    pub manipulation: Bytes,
    pub files: Vec<FileModData>,
    pub file_swaps: Vec<FileSwap>,
}

impl ActorBaseFileData {
    /// A payload carrying only a description.
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Check record invariants.
    ///
    /// - every entry names at least one game path, all normalized
    /// - no content hash appears in two `files` entries
    /// - no game path is claimed by more than one entry, so a path is either
    ///   a mod file or a swap but never both
    pub fn validate(&self) -> Result<()> {
        let mut hashes = HashSet::new();
        let mut paths = HashSet::new();

        for file in &self.files {
            if !hashes.insert(&file.hash) {
                return Err(FormatError::InvalidPayload(format!(
                    "content hash {} listed twice",
                    file.hash
                )));
            }
            claim_paths(&file.game_paths, &mut paths)?;
        }

        for swap in &self.file_swaps {
            if swap.swap_path.is_empty() {
                return Err(FormatError::InvalidPayload("empty swap target".into()));
            }
            claim_paths(&swap.game_paths, &mut paths)?;
        }

        Ok(())
    }

    /// Validate and encode as CBOR into a buffer that is wiped on drop.
    pub fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.validate()?;
        let mut buf = Zeroizing::new(Vec::new());
        ciborium::ser::into_writer(self, &mut *buf)
            .map_err(|e| FormatError::PayloadEncoding(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR and validate.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let data: Self = ciborium::de::from_reader(bytes)
            .map_err(|e| FormatError::PayloadEncoding(e.to_string()))?;
        data.validate()?;
        Ok(data)
    }
}

fn claim_paths<'a>(game_paths: &'a BTreeSet<String>, seen: &mut HashSet<&'a str>) -> Result<()> {
    if game_paths.is_empty() {
        return Err(FormatError::InvalidPayload("entry without game paths".into()));
    }
    for path in game_paths {
        if path.is_empty() || normalize_game_path(path) != *path {
            return Err(FormatError::InvalidPayload(format!(
                "game path not normalized: {path:?}"
            )));
        }
        if !seen.insert(path.as_str()) {
            return Err(FormatError::InvalidPayload(format!(
                "game path claimed twice: {path}"
            )));
        }
    }
    Ok(())
}
