//! Strong type definitions for header fields.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

/// Unique identifier of one actor base file.
///
/// Serializes as the canonical hyphenated UUID text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub Uuid);

impl FileId {
    /// Generate a new random (v4) id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A content hash identifying a physical resource's bytes.
///
/// Opaque to this crate. Must be non-empty and free of commas and
/// whitespace, because allow-lists are joined with commas to form
/// associated data.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Validate and wrap a hash string.
    pub fn new(hash: impl Into<String>) -> Result<Self, CoreError> {
        let hash = hash.into();
        if hash.is_empty() {
            return Err(CoreError::InvalidContentHash("empty hash".into()));
        }
        if hash.chars().any(|c| c == ',' || c.is_whitespace() || c.is_control()) {
            return Err(CoreError::InvalidContentHash(hash));
        }
        Ok(Self(hash))
    }

    /// The hash text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl FromStr for ContentHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The set of content hashes a base file permits to be layered onto it.
///
/// Kept sorted, so its textual form is canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList(BTreeSet<ContentHash>);

impl AllowList {
    /// Create an empty allow-list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `hash` is permitted.
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.0.contains(hash)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in canonical (sorted) order.
    pub fn iter(&self) -> std::collections::btree_set::Iter<'_, ContentHash> {
        self.0.iter()
    }

    /// Compute `(self ∪ add) \ remove`.
    ///
    /// A hash present in both `add` and `remove` ends up absent.
    pub fn apply_delta<'a>(
        &self,
        add: impl IntoIterator<Item = &'a ContentHash>,
        remove: impl IntoIterator<Item = &'a ContentHash>,
    ) -> Self {
        let mut next = self.0.clone();
        next.extend(add.into_iter().cloned());
        for hash in remove {
            next.remove(hash);
        }
        Self(next)
    }

    /// Comma-joined form used as AEAD associated data.
    pub fn to_associated_data(&self) -> Vec<u8> {
        let joined = self
            .0
            .iter()
            .map(ContentHash::as_str)
            .collect::<Vec<_>>()
            .join(",");
        joined.into_bytes()
    }
}

impl FromIterator<ContentHash> for AllowList {
    fn from_iter<I: IntoIterator<Item = ContentHash>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AllowList {
    type Item = &'a ContentHash;
    type IntoIter = std::collections::btree_set::Iter<'a, ContentHash>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
