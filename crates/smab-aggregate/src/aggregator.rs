//! Turns one owned object's modded files into a payload.
//!
//! Files are grouped by content hash. Each hash group becomes a single
//! [`FileModData`] carrying the union of its game paths; files without a
//! hash become [`FileSwap`]s. Groups whose hash has no local file are
//! skipped and reported. A group is dropped whole if any of its paths is
//! excluded, so a declared path set is never a strict subset of the paths
//! the physical file actually serves.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use regex::Regex;
use tracing::{debug, info, warn};

use smab_core::ContentHash;
use smab_format::{normalize_game_path, ActorBaseFileData, FileModData, FileSwap};

use crate::error::{AggregateError, Result};
use crate::modded::{ModdedFile, ModdedState, OwnedObject};

/// A physical file found for a content hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub length: u64,
}

/// Maps content hashes to local files.
pub trait HashResolver {
    fn resolve(&self, hash: &ContentHash) -> Option<ResolvedFile>;
}

/// Resolver over a fixed table.
#[derive(Debug, Clone, Default)]
pub struct MemoryResolver {
    entries: HashMap<ContentHash, ResolvedFile>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hash: ContentHash, path: impl Into<PathBuf>, length: u64) {
        self.entries.insert(
            hash,
            ResolvedFile {
                path: path.into(),
                length,
            },
        );
    }
}

impl HashResolver for MemoryResolver {
    fn resolve(&self, hash: &ContentHash) -> Option<ResolvedFile> {
        self.entries.get(hash).cloned()
    }
}

/// Resolver that reads lengths from disk at resolve time.
///
/// A registered path that no longer exists, or is not a regular file,
/// resolves to nothing.
#[derive(Debug, Clone, Default)]
pub struct FsResolver {
    paths: HashMap<ContentHash, PathBuf>,
}

impl FsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hash: ContentHash, path: impl Into<PathBuf>) {
        self.paths.insert(hash, path.into());
    }

    /// Register every regular file in `dir` whose file name is a valid hash.
    pub fn scan_dir(dir: &Path) -> std::io::Result<Self> {
        let mut resolver = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Ok(hash) = ContentHash::new(name) {
                resolver.register(hash, entry.path());
            }
        }
        Ok(resolver)
    }
}

impl HashResolver for FsResolver {
    fn resolve(&self, hash: &ContentHash) -> Option<ResolvedFile> {
        let path = self.paths.get(hash)?;
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => Some(ResolvedFile {
                path: path.clone(),
                length: meta.len(),
            }),
            Ok(_) => None,
            Err(e) => {
                debug!(%hash, path = %path.display(), error = %e, "cached file unavailable");
                None
            }
        }
    }
}

/// Decides which game paths must not be exported.
pub trait ExclusionFilter {
    fn is_excluded(&self, game_path: &str) -> bool;
}

/// Excludes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExclusion;

impl ExclusionFilter for NoExclusion {
    fn is_excluded(&self, _game_path: &str) -> bool {
        false
    }
}

/// Excludes body and leg 3-D models, both equipment and bare human bodies.
#[derive(Debug, Clone)]
pub struct BodyLegModelFilter {
    pattern: Regex,
}

impl BodyLegModelFilter {
    pub const PATTERN: &'static str = r"^chara/(equipment/e\d{4}/model/c\d{4}e\d{4}_(top|dwn)|human/c\d{4}/obj/body/b\d{4}/model/c\d{4}b\d{4}_(top|dwn))\.mdl$";

    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(Self::PATTERN)?,
        })
    }
}

impl ExclusionFilter for BodyLegModelFilter {
    fn is_excluded(&self, game_path: &str) -> bool {
        self.pattern.is_match(game_path)
    }
}

/// Opaque appearance state for one owned object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    pub appearance: Bytes,
    pub body_shape: Bytes,
    pub manipulation: Bytes,
}

/// Point-in-time source of appearance state.
pub trait StateSource {
    fn snapshot(&self, object: OwnedObject) -> Option<StateSnapshot>;
}

impl StateSource for HashMap<OwnedObject, StateSnapshot> {
    fn snapshot(&self, object: OwnedObject) -> Option<StateSnapshot> {
        self.get(&object).cloned()
    }
}

/// What was left out of an export and why.
#[derive(Debug, Default)]
pub struct AggregationReport {
    /// Groups skipped for lack of a local file, as
    /// [`AggregateError::UnresolvedContentHash`].
    pub skipped: Vec<AggregateError>,
    /// Hash groups dropped because a path matched the exclusion filter.
    pub excluded_hashes: Vec<ContentHash>,
    /// Swap targets dropped because a path matched the exclusion filter.
    pub excluded_swaps: Vec<String>,
}

impl AggregationReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.excluded_hashes.is_empty() && self.excluded_swaps.is_empty()
    }
}

/// Payload plus the report of what was dropped.
#[derive(Debug)]
pub struct Aggregation {
    pub data: ActorBaseFileData,
    pub report: AggregationReport,
}

/// Builds payloads from a [`ModdedState`].
pub struct Aggregator<'a> {
    resolver: &'a dyn HashResolver,
    filter: &'a dyn ExclusionFilter,
    states: &'a dyn StateSource,
}

impl<'a> Aggregator<'a> {
    pub fn new(
        resolver: &'a dyn HashResolver,
        filter: &'a dyn ExclusionFilter,
        states: &'a dyn StateSource,
    ) -> Self {
        Self {
            resolver,
            filter,
            states,
        }
    }

    /// Aggregate the files of `object` into a validated payload.
    pub fn aggregate(
        &self,
        state: &ModdedState,
        object: OwnedObject,
        description: impl Into<String>,
    ) -> Result<Aggregation> {
        let mut groups: BTreeMap<&ContentHash, BTreeSet<String>> = BTreeMap::new();
        let mut swaps: Vec<&ModdedFile> = Vec::new();

        for file in state.files_for(object) {
            match file.hash() {
                Some(hash) => groups
                    .entry(hash)
                    .or_default()
                    .extend(file.game_paths().iter().cloned()),
                None => swaps.push(file),
            }
        }
        swaps.sort_by(|a, b| a.resolved_path().cmp(b.resolved_path()));

        let mut report = AggregationReport::default();
        let mut data = ActorBaseFileData {
            description: description.into(),
            ..ActorBaseFileData::default()
        };

        for swap in swaps {
            if self.any_excluded(swap.game_paths()) {
                report.excluded_swaps.push(swap.resolved_path().to_string());
                continue;
            }
            data.file_swaps.push(FileSwap {
                game_paths: swap.game_paths().clone(),
                swap_path: normalize_game_path(swap.resolved_path()),
            });
        }

        for (hash, game_paths) in groups {
            let Some(resolved) = self.resolver.resolve(hash) else {
                warn!(%hash, ?object, "no local file for content hash, skipping group");
                report
                    .skipped
                    .push(AggregateError::UnresolvedContentHash(hash.clone()));
                continue;
            };
            if self.any_excluded(&game_paths) {
                debug!(%hash, paths = game_paths.len(), "hash group excluded");
                report.excluded_hashes.push(hash.clone());
                continue;
            }
            data.files.push(FileModData {
                game_paths,
                length: resolved.length,
                hash: hash.clone(),
            });
        }

        match self.states.snapshot(object) {
            Some(snapshot) => {
                data.appearance = snapshot.appearance;
                data.body_shape = snapshot.body_shape;
                data.manipulation = snapshot.manipulation;
            }
            None => debug!(?object, "no cached state, exporting empty blobs"),
        }

        data.validate()?;

        info!(
            ?object,
            files = data.files.len(),
            swaps = data.file_swaps.len(),
            skipped = report.skipped.len(),
            excluded = report.excluded_hashes.len() + report.excluded_swaps.len(),
            "aggregated actor base payload"
        );

        Ok(Aggregation { data, report })
    }

    fn any_excluded(&self, game_paths: &BTreeSet<String>) -> bool {
        game_paths.iter().any(|p| self.filter.is_excluded(p))
    }
}
