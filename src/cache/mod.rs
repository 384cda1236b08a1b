//! Query cache: keyed results, request coalescing, tag invalidation.
//!
//! The engine in this module owns all cache entries and the tag index.
//! Queries subscribe to entries; mutations invalidate tags; invalidation
//! re-fires affected queries. No other component writes this state.

pub mod engine;

pub use engine::{QueryCacheEngine, QueryState, QueryStatus, QuerySubscription};
