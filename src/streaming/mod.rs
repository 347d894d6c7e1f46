//! Stream resolution and probing
//!
//! - [`manifest`] turns adaptive URLs into concrete playable locations
//! - [`resolution_cache`] memoizes successful resolutions for a TTL
//! - [`batch`] fans operations out in bounded, cancellable slices
//! - [`liveness`] probes channels for reachability

pub mod batch;
pub mod liveness;
pub mod manifest;
pub mod resolution_cache;

pub use batch::{BatchOutcome, BatchRunner};
pub use liveness::{LivenessProber, LivenessResult};
pub use manifest::{
    ChannelResolution, ManifestResolver, ManifestVariant, ResolutionKind, ResolutionResult,
    parse_master_variants,
};
pub use resolution_cache::ResolutionCache;
