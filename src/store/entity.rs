//! Normalized entity store.
//!
//! Operations are pure: each returns a new store and leaves the input
//! untouched, so downstream memoization can rely on reference identity to
//! detect "nothing changed". Invariant throughout: every id in `ids` has
//! an entry in `entities` and vice versa.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Orders entities within a store, e.g. incomplete notes before complete
/// ones. Plain function pointer so stores stay `Clone` and comparable.
pub type SortComparer = fn(&Value, &Value) -> Ordering;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntityStore {
    /// Iteration order, recomputed by the comparator on bulk replace.
    pub ids: Vec<String>,
    pub entities: HashMap<String, Value>,
    #[serde(skip)]
    comparer: Option<SortComparer>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comparer(comparer: SortComparer) -> Self {
        Self {
            comparer: Some(comparer),
            ..Self::default()
        }
    }

    /// Entity id as a string, from the record's `id` field.
    fn id_of(record: &Value) -> Option<String> {
        match record.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        }
    }

    /// Replace the whole store. Records without an `id` are dropped with a
    /// warning; a later duplicate id replaces the earlier record.
    pub fn set_all(&self, records: Vec<Value>) -> Self {
        let mut next = Self {
            ids: Vec::with_capacity(records.len()),
            entities: HashMap::with_capacity(records.len()),
            comparer: self.comparer,
        };
        for record in records {
            match Self::id_of(&record) {
                Some(id) => {
                    if next.entities.insert(id.clone(), record).is_none() {
                        next.ids.push(id);
                    }
                }
                None => warn!("dropping record without an id"),
            }
        }
        next.resort();
        next
    }

    /// Insert or replace one entity, keeping comparator order.
    pub fn upsert_one(&self, record: Value) -> Self {
        let Some(id) = Self::id_of(&record) else {
            warn!("ignoring upsert of record without an id");
            return self.clone();
        };
        let mut next = self.clone();
        if next.entities.insert(id.clone(), record).is_none() {
            next.ids.push(id);
        }
        next.resort();
        next
    }

    pub fn remove_one(&self, id: &str) -> Self {
        let mut next = self.clone();
        if next.entities.remove(id).is_some() {
            next.ids.retain(|existing| existing != id);
        }
        next
    }

    fn resort(&mut self) {
        if let Some(comparer) = self.comparer {
            let entities = &self.entities;
            // Stable sort: ties keep response order.
            self.ids.sort_by(|a, b| match (entities.get(a), entities.get(b)) {
                (Some(left), Some(right)) => comparer(left, right),
                _ => Ordering::Equal,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.entities.get(id)
    }

    /// Entities in stored id order.
    pub fn iter_ordered(&self) -> impl Iterator<Item = &Value> + '_ {
        self.ids.iter().filter_map(|id| self.entities.get(id))
    }
}
