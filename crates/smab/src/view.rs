//! Read-only runtime view of an opened file.

use std::collections::BTreeMap;

use bytes::Bytes;

use smab_core::{AllowList, ContentHash, FileId, OwnerPublicKey};
use smab_format::{normalize_game_path, ActorBaseFileData, FormatError, SmabHeader};

use crate::error::Result;

/// What a game path is replaced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// New bytes, identified by content hash.
    Modded { hash: ContentHash, length: u64 },
    /// Redirect to another vanilla game path.
    Swap { target: String },
}

/// A verified header combined with its decrypted payload.
///
/// Only constructed from a header whose owner signature verifies. The
/// allow-list is always read through the header.
#[derive(Debug, Clone)]
pub struct ActorBaseData {
    header: SmabHeader,
    description: String,
    appearance: Bytes,
    body_shape: Bytes,
    manipulation: Bytes,
    replacements: BTreeMap<String, Replacement>,
}

impl ActorBaseData {
    /// Build the view. Fails if the header signature does not verify or the
    /// payload breaks a record invariant.
    pub fn new(header: SmabHeader, payload: ActorBaseFileData) -> Result<Self> {
        header.verify()?;
        payload.validate()?;

        let mut replacements = BTreeMap::new();
        for file in &payload.files {
            for path in &file.game_paths {
                replacements.insert(
                    path.clone(),
                    Replacement::Modded {
                        hash: file.hash.clone(),
                        length: file.length,
                    },
                );
            }
        }
        for swap in &payload.file_swaps {
            for path in &swap.game_paths {
                replacements.insert(
                    path.clone(),
                    Replacement::Swap {
                        target: swap.swap_path.clone(),
                    },
                );
            }
        }

        Ok(Self {
            header,
            description: payload.description,
            appearance: payload.appearance,
            body_shape: payload.body_shape,
            manipulation: payload.manipulation,
            replacements,
        })
    }

    pub fn header(&self) -> &SmabHeader {
        &self.header
    }

    pub fn file_id(&self) -> FileId {
        self.header.id()
    }

    pub fn owner(&self) -> &OwnerPublicKey {
        self.header.owner()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn appearance(&self) -> &Bytes {
        &self.appearance
    }

    pub fn body_shape(&self) -> &Bytes {
        &self.body_shape
    }

    pub fn manipulation(&self) -> &Bytes {
        &self.manipulation
    }

    /// Game path to replacement, keyed by normalized path.
    pub fn replacements(&self) -> &BTreeMap<String, Replacement> {
        &self.replacements
    }

    /// Look up a game path in any spelling.
    pub fn replacement_for(&self, game_path: &str) -> Option<&Replacement> {
        self.replacements.get(&normalize_game_path(game_path))
    }

    /// Content hashes of the mod files carried by this base.
    pub fn modded_hashes(&self) -> impl Iterator<Item = &ContentHash> {
        self.replacements.values().filter_map(|r| match r {
            Replacement::Modded { hash, .. } => Some(hash),
            Replacement::Swap { .. } => None,
        })
    }

    /// The live allow-list.
    pub fn valid_hashes(&self) -> &AllowList {
        self.header.allowed_hashes()
    }

    pub fn is_hash_allowed(&self, hash: &ContentHash) -> bool {
        self.header.allowed_hashes().contains(hash)
    }

    /// Rebuild with a newer header for the same file.
    ///
    /// The header must verify and describe the same sealed file.
    pub fn with_updated_header(&self, header: SmabHeader) -> Result<Self> {
        header.verify()?;
        if header.id() != self.header.id() {
            return Err(FormatError::HeaderMismatch("file id").into());
        }
        if header.owner() != self.header.owner() {
            return Err(FormatError::HeaderMismatch("owner public key").into());
        }
        if header.sealed_hashes() != self.header.sealed_hashes() {
            return Err(FormatError::HeaderMismatch("sealed hashes").into());
        }

        Ok(Self {
            header,
            ..self.clone()
        })
    }
}
