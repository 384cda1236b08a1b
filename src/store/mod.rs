//! Normalized entity storage and derived views.
//!
//! A fulfilled list query caches an `EntityStore` snapshot: an id-keyed
//! map plus an explicit id ordering, so no entity is duplicated across
//! nested copies. `StoreSelectors` derives `all` / `byId` / `ids` views
//! from a snapshot with memoization keyed on the snapshot's identity.

pub mod entity;
pub mod selectors;

pub use entity::{EntityStore, SortComparer};
pub use selectors::StoreSelectors;
