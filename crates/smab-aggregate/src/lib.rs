//! # SMAB Aggregate
//!
//! Collects the modded files of one owned object into an
//! [`ActorBaseFileData`](smab_format::ActorBaseFileData) payload.
//!
//! ## Key Types
//!
//! - [`ModdedFile`] / [`ModdedState`] - snapshot of modded files per [`OwnedObject`]
//! - [`Aggregator`] - grouping by content hash, swap detection, exclusion
//! - [`HashResolver`] / [`ExclusionFilter`] / [`StateSource`] - collaborators
//!   supplied by the host
//!
//! Missing local files never fail an export: the affected group is skipped
//! and listed in the [`AggregationReport`].

pub mod aggregator;
pub mod error;
pub mod modded;

pub use aggregator::{
    Aggregation, AggregationReport, Aggregator, BodyLegModelFilter, ExclusionFilter, FsResolver,
    HashResolver, MemoryResolver, NoExclusion, ResolvedFile, StateSnapshot, StateSource,
};
pub use error::{AggregateError, Result};
pub use modded::{ModdedFile, ModdedState, OwnedObject};
