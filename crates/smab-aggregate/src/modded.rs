//! Snapshot of modded files per owned object.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use smab_core::ContentHash;
use smab_format::normalize_game_path;

use crate::error::{AggregateError, Result};

/// An in-game actor slot whose appearance can be packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OwnedObject {
    Player,
    MinionOrMount,
    Pet,
    Companion,
}

impl OwnedObject {
    pub const ALL: [OwnedObject; 4] = [
        OwnedObject::Player,
        OwnedObject::MinionOrMount,
        OwnedObject::Pet,
        OwnedObject::Companion,
    ];
}

/// One physical resource backing one or more logical game paths.
///
/// Identity is the content hash. Files without a hash are vanilla swaps and
/// are identified by their resolved path instead.
#[derive(Debug, Clone)]
pub struct ModdedFile {
    game_paths: BTreeSet<String>,
    resolved_path: String,
    hash: Option<ContentHash>,
}

impl ModdedFile {
    /// Create a file without a hash. Game paths are normalized.
    pub fn new<I, S>(game_paths: I, resolved_path: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let game_paths: BTreeSet<String> = game_paths
            .into_iter()
            .map(|p| normalize_game_path(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();
        if game_paths.is_empty() {
            return Err(AggregateError::EmptyGamePaths);
        }
        Ok(Self {
            game_paths,
            resolved_path: resolved_path.into(),
            hash: None,
        })
    }

    /// Attach the content hash once it has been computed.
    pub fn with_hash(mut self, hash: ContentHash) -> Self {
        self.hash = Some(hash);
        self
    }

    pub fn game_paths(&self) -> &BTreeSet<String> {
        &self.game_paths
    }

    pub fn resolved_path(&self) -> &str {
        &self.resolved_path
    }

    pub fn hash(&self) -> Option<&ContentHash> {
        self.hash.as_ref()
    }

    /// Whether this is a vanilla swap rather than new bytes.
    pub fn is_swap(&self) -> bool {
        self.hash.is_none()
    }

    fn merge(&mut self, other: &ModdedFile) {
        self.game_paths.extend(other.game_paths.iter().cloned());
    }
}

impl PartialEq for ModdedFile {
    fn eq(&self, other: &Self) -> bool {
        match (&self.hash, &other.hash) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.resolved_path == other.resolved_path,
            _ => false,
        }
    }
}

impl Eq for ModdedFile {}

impl Hash for ModdedFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.hash {
            Some(hash) => {
                0u8.hash(state);
                hash.hash(state);
            }
            None => {
                1u8.hash(state);
                self.resolved_path.hash(state);
            }
        }
    }
}

/// Insert `file`, folding its game paths into an equal entry if present.
fn merge_into(set: &mut HashSet<ModdedFile>, file: &ModdedFile) {
    match set.take(file) {
        Some(mut existing) => {
            existing.merge(file);
            set.insert(existing);
        }
        None => {
            set.insert(file.clone());
        }
    }
}

/// All modded files, partitioned by owned object, plus their union.
#[derive(Debug, Clone, Default)]
pub struct ModdedState {
    per_object: BTreeMap<OwnedObject, HashSet<ModdedFile>>,
    all: HashSet<ModdedFile>,
}

impl ModdedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file for `object`. The union is extended in place.
    pub fn insert(&mut self, object: OwnedObject, file: ModdedFile) {
        merge_into(&mut self.all, &file);
        merge_into(self.per_object.entry(object).or_default(), &file);
    }

    /// Add several files for `object`.
    pub fn extend(&mut self, object: OwnedObject, files: impl IntoIterator<Item = ModdedFile>) {
        for file in files {
            self.insert(object, file);
        }
    }

    /// Drop everything recorded for `object`.
    pub fn remove_object(&mut self, object: OwnedObject) -> Option<HashSet<ModdedFile>> {
        let removed = self.per_object.remove(&object);
        if removed.is_some() {
            self.recompute_union();
        }
        removed
    }

    /// Drop one file from `object`. Returns whether it was present.
    pub fn remove_file(&mut self, object: OwnedObject, file: &ModdedFile) -> bool {
        let Some(files) = self.per_object.get_mut(&object) else {
            return false;
        };
        let removed = files.remove(file);
        if files.is_empty() {
            self.per_object.remove(&object);
        }
        if removed {
            self.recompute_union();
        }
        removed
    }

    /// Files recorded for `object`.
    pub fn files_for(&self, object: OwnedObject) -> impl Iterator<Item = &ModdedFile> {
        self.per_object.get(&object).into_iter().flatten()
    }

    /// Union across all objects.
    pub fn all_files(&self) -> &HashSet<ModdedFile> {
        &self.all
    }

    /// Objects with at least one file.
    pub fn objects(&self) -> impl Iterator<Item = OwnedObject> + '_ {
        self.per_object.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.per_object.is_empty()
    }

    fn recompute_union(&mut self) {
        let mut all = HashSet::new();
        for file in self.per_object.values().flatten() {
            merge_into(&mut all, file);
        }
        self.all = all;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hashed(paths: &[&str], hash: &str) -> ModdedFile {
        ModdedFile::new(paths.iter().copied(), format!("/cache/{hash}"))
            .unwrap()
            .with_hash(ContentHash::new(hash).unwrap())
    }

    fn swap(paths: &[&str], target: &str) -> ModdedFile {
        ModdedFile::new(paths.iter().copied(), target).unwrap()
    }

    fn union_paths(state: &ModdedState) -> BTreeSet<String> {
        state
            .all_files()
            .iter()
            .flat_map(|f| f.game_paths().iter().cloned())
            .collect()
    }

    #[test]
    fn test_paths_normalized() {
        let file = swap(&["Chara\\Human\\A.MDL"], "chara/x.mdl");
        assert!(file.game_paths().contains("chara/human/a.mdl"));
        assert!(ModdedFile::new(Vec::<&str>::new(), "x").is_err());
        assert!(ModdedFile::new([""], "x").is_err());
    }

    #[test]
    fn test_identity_by_hash() {
        let a = hashed(&["chara/a.mdl"], "h1");
        let b = ModdedFile::new(["chara/b.mdl"], "/elsewhere")
            .unwrap()
            .with_hash(ContentHash::new("h1").unwrap());
        assert_eq!(a, b);

        let s1 = swap(&["chara/a.mdl"], "chara/t.mdl");
        let s2 = swap(&["chara/b.mdl"], "chara/t.mdl");
        assert_eq!(s1, s2);
        assert_ne!(s1, swap(&["chara/a.mdl"], "chara/u.mdl"));
        assert_ne!(a, s1);
    }

    #[test]
    fn test_same_hash_merges_paths() {
        let mut state = ModdedState::new();
        state.insert(OwnedObject::Player, hashed(&["chara/a.mdl"], "h1"));
        state.insert(OwnedObject::Player, hashed(&["chara/b.mdl"], "h1"));

        let files: Vec<_> = state.files_for(OwnedObject::Player).collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].game_paths().len(), 2);
    }

    #[test]
    fn test_union_tracks_insert_and_remove() {
        let mut state = ModdedState::new();
        state.insert(OwnedObject::Player, hashed(&["chara/a.mdl"], "h1"));
        state.insert(OwnedObject::Pet, hashed(&["chara/b.mdl"], "h1"));
        state.insert(OwnedObject::Pet, hashed(&["chara/c.mdl"], "h2"));

        assert_eq!(state.all_files().len(), 2);
        assert_eq!(union_paths(&state).len(), 3);

        state.remove_object(OwnedObject::Pet);
        assert_eq!(state.all_files().len(), 1);
        assert_eq!(
            union_paths(&state),
            ["chara/a.mdl".to_string()].into_iter().collect()
        );
    }

    #[test]
    fn test_remove_file() {
        let mut state = ModdedState::new();
        let file = hashed(&["chara/a.mdl"], "h1");
        state.insert(OwnedObject::Companion, file.clone());

        assert!(!state.remove_file(OwnedObject::Player, &file));
        assert!(state.remove_file(OwnedObject::Companion, &file));
        assert!(state.is_empty());
        assert!(state.all_files().is_empty());
        assert_eq!(state.files_for(OwnedObject::Companion).count(), 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert { object: usize, hash: u8, path: u8 },
        Remove { object: usize, hash: u8 },
        RemoveObject { object: usize },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0usize..4, 0u8..3, 0u8..6).prop_map(|(object, hash, path)| Op::Insert { object, hash, path }),
            1 => (0usize..4, 0u8..3).prop_map(|(object, hash)| Op::Remove { object, hash }),
            1 => (0usize..4).prop_map(|object| Op::RemoveObject { object }),
        ]
    }

    proptest! {
        #[test]
        fn test_union_is_always_union_of_objects(ops in proptest::collection::vec(op(), 0..40)) {
            let mut state = ModdedState::new();
            for op in ops {
                match op {
                    Op::Insert { object, hash, path } => state.insert(
                        OwnedObject::ALL[object],
                        hashed(&[&format!("chara/p{path}.mdl")], &format!("h{hash}")),
                    ),
                    Op::Remove { object, hash } => {
                        let probe = hashed(&["chara/probe.mdl"], &format!("h{hash}"));
                        state.remove_file(OwnedObject::ALL[object], &probe);
                    }
                    Op::RemoveObject { object } => {
                        state.remove_object(OwnedObject::ALL[object]);
                    }
                }
            }

            let per_object_paths: BTreeSet<String> = OwnedObject::ALL
                .iter()
                .flat_map(|o| state.files_for(*o))
                .flat_map(|f| f.game_paths().iter().cloned())
                .collect();
            let per_object_hashes: BTreeSet<_> = OwnedObject::ALL
                .iter()
                .flat_map(|o| state.files_for(*o))
                .filter_map(|f| f.hash().cloned())
                .collect();
            let union_hashes: BTreeSet<_> =
                state.all_files().iter().filter_map(|f| f.hash().cloned()).collect();

            prop_assert_eq!(union_paths(&state), per_object_paths);
            prop_assert_eq!(union_hashes, per_object_hashes);
        }
    }
}
