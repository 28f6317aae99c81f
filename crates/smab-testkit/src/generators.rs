//! Proptest generators for property-based testing.

use std::collections::BTreeSet;

use bytes::Bytes;
use proptest::prelude::*;

use smab_core::{AllowList, ContentHash, Keypair};
use smab_format::{ActorBaseFileData, FileModData, FileSwap};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a hex content hash.
pub fn content_hash() -> impl Strategy<Value = ContentHash> {
    "[0-9a-f]{8,40}".prop_filter_map("invalid content hash", |s| ContentHash::new(s).ok())
}

/// Hashes from a tiny alphabet, so independent draws collide often.
pub fn colliding_hash() -> impl Strategy<Value = ContentHash> {
    "[a-c][0-2]".prop_filter_map("invalid content hash", |s| ContentHash::new(s).ok())
}

/// Generate an allow-list.
pub fn allow_list(max_len: usize) -> impl Strategy<Value = AllowList> {
    prop::collection::btree_set(content_hash(), 0..=max_len)
        .prop_map(|set| set.into_iter().collect())
}

/// Generate a normalized game path.
pub fn game_path() -> impl Strategy<Value = String> {
    "chara/(equipment|human|monster)/[a-z0-9_]{1,12}/[a-z0-9_]{1,12}\\.(tex|mdl|mtrl)"
        .prop_map(String::from)
}

/// Generate payload bytes of specified max length.
pub fn blob(max_len: usize) -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..=max_len).prop_map(Bytes::from)
}

/// Generate a valid payload.
///
/// Every game path is claimed once: paths are split between swaps and mod
/// files, and mod files share theirs out round-robin.
pub fn actor_base_payload() -> impl Strategy<Value = ActorBaseFileData> {
    (
        ".{0,48}",
        blob(256),
        blob(64),
        blob(64),
        prop::collection::btree_set(content_hash(), 0..4),
        prop::collection::btree_set(game_path(), 0..10),
        0usize..4,
    )
        .prop_map(
            |(description, appearance, body_shape, manipulation, hashes, paths, swap_count)| {
                let paths: Vec<String> = paths.into_iter().collect();
                let (swap_paths, file_paths) = paths.split_at(swap_count.min(paths.len()));

                let mut files: Vec<FileModData> = hashes
                    .into_iter()
                    .take(file_paths.len())
                    .enumerate()
                    .map(|(i, hash)| FileModData {
                        game_paths: BTreeSet::new(),
                        length: (i as u64 + 1) * 1024,
                        hash,
                    })
                    .collect();
                if !files.is_empty() {
                    let n = files.len();
                    for (i, path) in file_paths.iter().enumerate() {
                        files[i % n].game_paths.insert(path.clone());
                    }
                }

                let file_swaps = swap_paths
                    .iter()
                    .enumerate()
                    .map(|(i, path)| FileSwap {
                        game_paths: BTreeSet::from([path.clone()]),
                        swap_path: format!("chara/vanilla/{i}.tex"),
                    })
                    .collect();

                ActorBaseFileData {
                    description,
                    appearance,
                    body_shape,
                    manipulation,
                    files,
                    file_swaps,
                }
            },
        )
}

/// A current allow-list and a delta to apply to it.
#[derive(Debug, Clone)]
pub struct AllowListDelta {
    pub current: AllowList,
    pub add: BTreeSet<ContentHash>,
    pub remove: BTreeSet<ContentHash>,
}

impl AllowListDelta {
    /// `(current ∪ add) \ remove`, computed independently of [`AllowList`].
    pub fn expected(&self) -> AllowList {
        self.current
            .iter()
            .chain(self.add.iter())
            .filter(|h| !self.remove.contains(*h))
            .cloned()
            .collect()
    }
}

impl Arbitrary for AllowListDelta {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::btree_set(colliding_hash(), 0..6),
            prop::collection::btree_set(colliding_hash(), 0..6),
            prop::collection::btree_set(colliding_hash(), 0..6),
        )
            .prop_map(|(current, add, remove)| AllowListDelta {
                current: current.into_iter().collect(),
                add,
                remove,
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_generated_payloads_validate(data in actor_base_payload()) {
            prop_assert!(data.validate().is_ok());

            let decoded = ActorBaseFileData::from_bytes(&data.to_bytes().unwrap()).unwrap();
            prop_assert_eq!(decoded, data);
        }

        #[test]
        fn test_delta_removal_wins(delta: AllowListDelta) {
            let next = delta.current.apply_delta(&delta.add, &delta.remove);

            prop_assert_eq!(&next, &delta.expected());
            for hash in &delta.remove {
                prop_assert!(!next.contains(hash));
            }
        }

        #[test]
        fn test_content_hash_usable_in_associated_data(list in allow_list(8)) {
            let ad = list.to_associated_data();
            let parts = if ad.is_empty() { 0 } else { ad.split(|b| *b == b',').count() };
            prop_assert_eq!(parts, list.len());
        }
    }
}
