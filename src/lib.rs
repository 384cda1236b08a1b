//! notecache - client-side data layer for the notes service API.
//!
//! This crate is the piece of the client that talks to the server so the
//! rest of the application never has to: a cache of fetched results keyed
//! by endpoint and argument, invalidated by semantic tags instead of
//! timers, sitting on top of a transport that transparently refreshes an
//! expired access token and retries.
//!
//! The moving parts, leaf first:
//! - [`auth::TokenStore`]: the in-memory access token, with claim decoding
//! - [`api::Transport`] / [`api::HttpTransport`]: one request, one result
//! - [`api::ReauthGuard`]: single-flight refresh-then-retry on expiry
//! - [`api::Registry`]: declarative query/mutation endpoint definitions
//! - [`store::EntityStore`] / [`store::StoreSelectors`]: normalized
//!   entities with ordered ids and memoized views
//! - [`cache::QueryCacheEngine`]: the cache itself - request coalescing,
//!   reference counting, tag index, invalidation re-fetch
//! - [`client::ApiClient`]: the facade that wires it all together

pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod models;
pub mod store;

pub use api::endpoint::{Endpoint, EndpointKind, Registry, Tag, TagId};
pub use api::error::ApiError;
pub use api::reauth::ReauthGuard;
pub use api::transport::{HttpTransport, Method, RequestDescriptor, Transport};
pub use auth::claims::UserClaims;
pub use auth::token::TokenStore;
pub use cache::engine::{QueryCacheEngine, QueryState, QueryStatus, QuerySubscription};
pub use client::ApiClient;
pub use config::Config;
pub use store::entity::EntityStore;
pub use store::selectors::StoreSelectors;
