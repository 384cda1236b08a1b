//! Declarative endpoint registry.
//!
//! Endpoints describe the server surface the way the cache wants to see
//! it: how to build a request from an argument, how to reshape the raw
//! response before caching, and which cache tags a query result provides
//! or a mutation invalidates. Nothing here touches the network; the cache
//! engine interprets these definitions.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use tracing::warn;

use crate::api::error::ApiError;
use crate::api::transport::RequestDescriptor;

/// Sentinel-or-id half of a tag. `List` invalidation sweeps whole list
/// results regardless of which entities they contain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagId {
    List,
    Id(String),
}

/// A (type, id-or-LIST) label attached to cached results. Invalidating a
/// tag is the sole mechanism for cache refresh; cached entries never
/// reference each other directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: &'static str,
    pub id: TagId,
}

impl Tag {
    pub fn list(kind: &'static str) -> Self {
        Self {
            kind,
            id: TagId::List,
        }
    }

    pub fn id(kind: &'static str, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: TagId::Id(id.into()),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            TagId::List => write!(f, "{}:LIST", self.kind),
            TagId::Id(id) => write!(f, "{}:{}", self.kind, id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Cacheable read.
    Query,
    /// Write; never cached itself.
    Mutation,
}

/// Build the request for an argument.
pub type RequestFn = fn(&Value) -> RequestDescriptor;
/// Reshape a raw response payload before it is cached.
pub type TransformFn = fn(Value) -> Result<Value, ApiError>;
/// Compute tags from (transformed result, argument).
pub type TagsFn = fn(&Value, &Value) -> Vec<Tag>;

pub struct Endpoint {
    pub name: &'static str,
    pub kind: EndpointKind,
    pub request: RequestFn,
    pub transform: Option<TransformFn>,
    /// Tags a fulfilled query registers in the tag index.
    pub provides: Option<TagsFn>,
    /// Tags a successful mutation invalidates.
    pub invalidates: Option<TagsFn>,
}

impl Endpoint {
    pub fn query(name: &'static str, request: RequestFn) -> Self {
        Self {
            name,
            kind: EndpointKind::Query,
            request,
            transform: None,
            provides: None,
            invalidates: None,
        }
    }

    pub fn mutation(name: &'static str, request: RequestFn) -> Self {
        Self {
            name,
            kind: EndpointKind::Mutation,
            request,
            transform: None,
            provides: None,
            invalidates: None,
        }
    }

    pub fn transform(mut self, transform: TransformFn) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn provides(mut self, provides: TagsFn) -> Self {
        self.provides = Some(provides);
        self
    }

    pub fn invalidates(mut self, invalidates: TagsFn) -> Self {
        self.invalidates = Some(invalidates);
        self
    }
}

/// All endpoints the client knows, keyed by name.
#[derive(Default)]
pub struct Registry {
    endpoints: HashMap<&'static str, Endpoint>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, endpoint: Endpoint) {
        let name = endpoint.name;
        if self.endpoints.insert(name, endpoint).is_some() {
            warn!(endpoint = name, "endpoint redefined");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Endpoint> {
        self.endpoints.get(name)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_display() {
        assert_eq!(Tag::list("Note").to_string(), "Note:LIST");
        assert_eq!(Tag::id("Note", "n1").to_string(), "Note:n1");
    }

    #[test]
    fn test_tags_compare_by_kind_and_id() {
        assert_eq!(Tag::id("Note", "1"), Tag::id("Note", "1"));
        assert_ne!(Tag::id("Note", "1"), Tag::id("User", "1"));
        assert_ne!(Tag::id("Note", "1"), Tag::list("Note"));
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = Registry::new();
        registry.register(Endpoint::query("getThings", |_| {
            RequestDescriptor::get("/things")
        }));
        assert_eq!(registry.len(), 1);

        let endpoint = registry.get("getThings").expect("missing endpoint");
        assert_eq!(endpoint.kind, EndpointKind::Query);
        assert!(endpoint.transform.is_none());
        assert!(registry.get("nope").is_none());
    }
}
