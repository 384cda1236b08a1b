//! Request plumbing for the notes API.
//!
//! This module provides:
//! - `RequestDescriptor` / `Transport`: one request in, one structured
//!   result out, with the bearer token attached from the `TokenStore`
//! - `ReauthGuard`: transparent single-flight token refresh and retry
//! - `Endpoint` / `Registry`: declarative query and mutation definitions
//!   with the cache tags they provide or invalidate
//! - `ApiError`: the error taxonomy everything above speaks

pub mod endpoint;
pub mod error;
pub mod reauth;
pub mod transport;

pub use endpoint::{Endpoint, EndpointKind, Registry, Tag, TagId};
pub use error::ApiError;
pub use reauth::ReauthGuard;
pub use transport::{HttpTransport, Method, RequestDescriptor, Transport};
