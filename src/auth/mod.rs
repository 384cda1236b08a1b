//! Authentication state for the data layer.
//!
//! This module provides:
//! - `TokenStore`: the in-memory slot holding the short-lived access token
//! - `UserClaims`: the identity claims decoded (never verified) from it
//!
//! The token is deliberately not persisted; a process restart drops it and
//! the client re-authenticates through the refresh endpoint or a login.

pub mod claims;
pub mod token;

pub use claims::UserClaims;
pub use token::TokenStore;
