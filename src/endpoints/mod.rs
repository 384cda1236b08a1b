//! Endpoint definitions for the notes API.
//!
//! Each submodule registers its endpoints against the shared registry:
//! list queries normalize their responses into an entity-store snapshot
//! and provide one tag per entity plus the list sentinel; mutations
//! invalidate the tags their argument names.

use serde_json::Value;
use tracing::warn;

use crate::api::endpoint::{Registry, Tag};
use crate::api::error::ApiError;
use crate::store::entity::{EntityStore, SortComparer};

pub mod auth;
pub mod notes;
pub mod users;

/// Every endpoint the client ships with.
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    notes::register(&mut registry);
    users::register(&mut registry);
    registry
}

/// Turn a raw list response into a normalized `{ids, entities}` snapshot.
/// The server's `_id` moves to `id`, which the store keys by; `_id` is
/// removed so typed records (which alias it) never see the field twice.
pub(crate) fn normalize_list(
    raw: Value,
    comparer: Option<SortComparer>,
) -> Result<Value, ApiError> {
    let Value::Array(records) = raw else {
        return Err(ApiError::InvalidResponse(
            "expected a JSON array".to_string(),
        ));
    };

    let records = records
        .into_iter()
        .map(|mut record| {
            if let Some(fields) = record.as_object_mut() {
                if let Some(id) = fields.remove("_id") {
                    fields.insert("id".to_string(), id);
                }
            }
            record
        })
        .collect();

    let store = match comparer {
        Some(comparer) => EntityStore::with_comparer(comparer),
        None => EntityStore::new(),
    };
    serde_json::to_value(store.set_all(records))
        .map_err(|err| ApiError::InvalidResponse(err.to_string()))
}

/// Tags for a normalized list result: the list sentinel plus one tag per
/// entity id, so updating a single entity re-fires only the lists that
/// contain it.
pub(crate) fn list_tags(kind: &'static str, result: &Value) -> Vec<Tag> {
    let mut tags = vec![Tag::list(kind)];
    match result.get("ids").and_then(Value::as_array) {
        Some(ids) => {
            for id in ids {
                if let Some(id) = id.as_str() {
                    tags.push(Tag::id(kind, id));
                }
            }
        }
        None => warn!(kind, "normalized result has no ids, providing list tag only"),
    }
    tags
}

/// Tags for a mutation on one entity: the id from the argument when
/// present, otherwise the list sentinel (a create has no id yet).
pub(crate) fn one_tag(kind: &'static str, arg: &Value) -> Vec<Tag> {
    match arg.get("id").and_then(Value::as_str) {
        Some(id) => vec![Tag::id(kind, id)],
        None => vec![Tag::list(kind)],
    }
}
