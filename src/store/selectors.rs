//! Memoized views over a cached normalized snapshot.
//!
//! Recomputation is keyed on the identity of the source `Arc`: the same
//! snapshot yields the same output references, so consumers comparing by
//! reference see "unchanged" without deep equality. Store operations copy
//! on write, which is what makes pointer identity a valid change signal.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::warn;

use crate::api::error::ApiError;
use crate::store::entity::EntityStore;

struct View {
    source: Arc<Value>,
    store: Arc<EntityStore>,
    all: Arc<Vec<Value>>,
    ids: Arc<Vec<String>>,
}

#[derive(Default)]
pub struct StoreSelectors {
    memo: Mutex<Option<Arc<View>>>,
}

impl StoreSelectors {
    pub fn new() -> Self {
        Self::default()
    }

    fn view(&self, source: &Arc<Value>) -> Arc<View> {
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(view) = memo.as_ref() {
            if Arc::ptr_eq(&view.source, source) {
                return Arc::clone(view);
            }
        }

        let store = match serde_json::from_value::<EntityStore>((**source).clone()) {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "snapshot is not a normalized store");
                EntityStore::new()
            }
        };
        let all: Vec<Value> = store.iter_ordered().cloned().collect();
        let ids = store.ids.clone();
        let view = Arc::new(View {
            source: Arc::clone(source),
            store: Arc::new(store),
            all: Arc::new(all),
            ids: Arc::new(ids),
        });
        *memo = Some(Arc::clone(&view));
        view
    }

    /// All entities in stored order. The same snapshot returns the same
    /// `Arc`.
    pub fn select_all(&self, source: &Arc<Value>) -> Arc<Vec<Value>> {
        Arc::clone(&self.view(source).all)
    }

    /// The stored id order.
    pub fn select_ids(&self, source: &Arc<Value>) -> Arc<Vec<String>> {
        Arc::clone(&self.view(source).ids)
    }

    pub fn select_by_id(&self, source: &Arc<Value>, id: &str) -> Option<Value> {
        self.view(source).store.get(id).cloned()
    }

    /// Like `select_by_id`, but absence is an `ApiError::NotFound` - the
    /// entity was not in the fetched store, which is not a network error.
    pub fn select_by_id_required(&self, source: &Arc<Value>, id: &str) -> Result<Value, ApiError> {
        self.select_by_id(source, id)
            .ok_or_else(|| ApiError::NotFound(format!("entity {id} not in store")))
    }
}
