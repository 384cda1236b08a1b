//! The query cache engine.
//!
//! Maps (endpoint, serialized argument) to a cached result with reference
//! counting, coalescing of concurrent identical requests, and tag-based
//! invalidation through a bidirectional index (tag to keys, entry to
//! provided tags). Invalidation cost is proportional to the affected
//! entries, never to the total cache size.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::endpoint::{Endpoint, EndpointKind, Registry, Tag};
use crate::api::error::ApiError;
use crate::api::transport::Transport;

/// Identifies one cached query result: endpoint name plus the argument in
/// canonical serialized form. serde_json serializes object keys sorted, so
/// arguments that differ only in construction order share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: String,
    pub arg: String,
}

impl CacheKey {
    fn new(endpoint: &str, arg: &Value) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            arg: arg.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Uninitialized,
    Pending,
    Fulfilled,
    Rejected,
}

type FetchResult = Result<Arc<Value>, ApiError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

struct CacheEntry {
    status: QueryStatus,
    /// Original argument, kept so invalidation can re-issue the query.
    arg: Value,
    data: Option<Arc<Value>>,
    error: Option<ApiError>,
    provides: Vec<Tag>,
    subscribers: usize,
    inflight: Option<SharedFetch>,
}

impl CacheEntry {
    fn new(arg: Value) -> Self {
        Self {
            status: QueryStatus::Uninitialized,
            arg,
            data: None,
            error: None,
            provides: Vec::new(),
            subscribers: 0,
            inflight: None,
        }
    }
}

/// Point-in-time view of one cache entry.
#[derive(Debug, Clone)]
pub struct QueryState {
    pub status: QueryStatus,
    pub data: Option<Arc<Value>>,
    pub error: Option<ApiError>,
}

#[derive(Default)]
struct EngineState {
    entries: HashMap<CacheKey, CacheEntry>,
    tag_index: HashMap<Tag, HashSet<CacheKey>>,
}

pub struct QueryCacheEngine {
    state: Mutex<EngineState>,
    transport: Arc<dyn Transport>,
    registry: Arc<Registry>,
}

impl QueryCacheEngine {
    pub fn new(transport: Arc<dyn Transport>, registry: Arc<Registry>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(EngineState::default()),
            transport,
            registry,
        })
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn endpoint(&self, name: &str, kind: EndpointKind) -> Result<&Endpoint, ApiError> {
        let endpoint = self
            .registry
            .get(name)
            .ok_or_else(|| ApiError::Endpoint(format!("unknown endpoint {name}")))?;
        if endpoint.kind != kind {
            return Err(ApiError::Endpoint(format!(
                "endpoint {name} is a {:?}, expected {kind:?}",
                endpoint.kind
            )));
        }
        Ok(endpoint)
    }

    /// Subscribe to a query, fetching if there is no usable cached result.
    ///
    /// Concurrent callers with the same key share a single in-flight
    /// request. Fetch failures are recorded on the entry (`Rejected`)
    /// rather than returned; `Err` here only means the endpoint itself is
    /// unknown or not a query. A rejected entry fetches again on the next
    /// `query` call - there is no automatic background retry.
    pub async fn query(
        self: &Arc<Self>,
        endpoint: &str,
        arg: Value,
    ) -> Result<QuerySubscription, ApiError> {
        let definition = self.endpoint(endpoint, EndpointKind::Query)?;
        let key = CacheKey::new(endpoint, &arg);

        let join = {
            let mut state = self.lock();
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(arg.clone()));
            entry.subscribers += 1;
            match entry.status {
                QueryStatus::Fulfilled => {
                    debug!(endpoint, "cache hit");
                    None
                }
                QueryStatus::Pending => {
                    debug!(endpoint, "joining in-flight request");
                    entry.inflight.clone()
                }
                QueryStatus::Uninitialized | QueryStatus::Rejected => {
                    debug!(endpoint, "cache miss, fetching");
                    let fetch = self.make_fetch(&key, definition, arg.clone());
                    entry.status = QueryStatus::Pending;
                    entry.error = None;
                    entry.inflight = Some(fetch.clone());
                    Some(fetch)
                }
            }
        };

        if let Some(fetch) = join {
            let _ = fetch.await;
        }
        Ok(QuerySubscription {
            engine: Arc::clone(self),
            key,
        })
    }

    /// Issue a mutation. Never cached; on success the endpoint's
    /// invalidation tags are applied, which is what re-fires affected
    /// queries - no entry knows about the mutation that invalidated it.
    pub async fn mutate(
        self: &Arc<Self>,
        endpoint: &str,
        arg: Value,
    ) -> Result<Arc<Value>, ApiError> {
        let definition = self.endpoint(endpoint, EndpointKind::Mutation)?;
        let desc = (definition.request)(&arg);
        let raw = self.transport.send(&desc).await?;
        let data = match definition.transform {
            Some(transform) => transform(raw)?,
            None => raw,
        };
        let data = Arc::new(data);

        if let Some(invalidates) = definition.invalidates {
            let tags = invalidates(&data, &arg);
            if !tags.is_empty() {
                debug!(endpoint, count = tags.len(), "mutation invalidating tags");
                self.invalidate_tags(&tags);
            }
        }
        Ok(data)
    }

    /// Invalidate every cached query whose provided-tag set intersects
    /// `tags`.
    ///
    /// Entries with live subscribers re-fetch with their original
    /// (endpoint, argument); entries nobody watches are evicted instead.
    /// Entries already pending are left alone - the in-flight result is
    /// installed when it arrives.
    pub fn invalidate_tags(self: &Arc<Self>, tags: &[Tag]) {
        let mut refetches = Vec::new();
        {
            let mut state = self.lock();
            let affected: HashSet<CacheKey> = tags
                .iter()
                .filter_map(|tag| state.tag_index.get(tag))
                .flat_map(|keys| keys.iter().cloned())
                .collect();

            for key in affected {
                let (status, subscribers, arg) = match state.entries.get(&key) {
                    Some(entry) => (entry.status, entry.subscribers, entry.arg.clone()),
                    None => continue,
                };
                if status == QueryStatus::Pending {
                    debug!(endpoint = %key.endpoint, "invalidation skipped, fetch already in flight");
                    continue;
                }
                if subscribers == 0 {
                    debug!(endpoint = %key.endpoint, "evicting unwatched entry");
                    Self::evict(&mut state, &key);
                    continue;
                }
                let Some(definition) = self.registry.get(&key.endpoint) else {
                    continue;
                };
                info!(endpoint = %key.endpoint, "re-fetching invalidated query");
                let fetch = self.make_fetch(&key, definition, arg);
                if let Some(entry) = state.entries.get_mut(&key) {
                    entry.status = QueryStatus::Pending;
                    entry.inflight = Some(fetch.clone());
                }
                refetches.push(fetch);
            }
        }
        // Drive re-fetches even when no subscriber is currently awaiting;
        // the stale data stays visible until the replacement lands.
        for fetch in refetches {
            tokio::spawn(async move {
                let _ = fetch.await;
            });
        }
    }

    /// Drop every entry and the whole tag index. Used at logout and for
    /// test isolation.
    pub fn reset(&self) {
        let mut state = self.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        state.tag_index.clear();
        info!(dropped, "cache reset");
    }

    /// Build the shared fetch future for one key. The future itself
    /// installs the outcome into the entry, so whichever subscriber polls
    /// it to completion finishes the bookkeeping exactly once.
    fn make_fetch(self: &Arc<Self>, key: &CacheKey, definition: &Endpoint, arg: Value) -> SharedFetch {
        let engine = Arc::clone(self);
        let key = key.clone();
        let name = definition.name;
        let request = definition.request;
        let transform = definition.transform;
        let provides = definition.provides;

        async move {
            let desc = (request)(&arg);
            let outcome = match engine.transport.send(&desc).await {
                Ok(raw) => match transform {
                    Some(transform) => transform(raw),
                    None => Ok(raw),
                },
                Err(err) => Err(err),
            };
            match outcome {
                Ok(data) => {
                    let data = Arc::new(data);
                    let tags = provides
                        .map(|provides| provides(&data, &arg))
                        .unwrap_or_default();
                    engine.install_fulfilled(&key, Arc::clone(&data), tags);
                    Ok(data)
                }
                Err(err) => {
                    warn!(endpoint = name, error = %err, "query failed");
                    engine.install_rejected(&key, err.clone());
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }

    fn install_fulfilled(&self, key: &CacheKey, data: Arc<Value>, tags: Vec<Tag>) {
        let mut state = self.lock();
        let EngineState { entries, tag_index } = &mut *state;
        // The entry can be gone if the cache was reset mid-flight; the
        // result is simply dropped.
        let Some(entry) = entries.get_mut(key) else {
            return;
        };

        for tag in entry.provides.drain(..) {
            if let Some(keys) = tag_index.get_mut(&tag) {
                keys.remove(key);
                if keys.is_empty() {
                    tag_index.remove(&tag);
                }
            }
        }
        for tag in &tags {
            tag_index.entry(tag.clone()).or_default().insert(key.clone());
        }

        entry.status = QueryStatus::Fulfilled;
        entry.data = Some(data);
        entry.error = None;
        entry.provides = tags;
        entry.inflight = None;
    }

    fn install_rejected(&self, key: &CacheKey, err: ApiError) {
        let mut state = self.lock();
        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };
        // A first fetch has no tags to register; a failed re-fetch keeps
        // its previous data and registration alongside the error.
        entry.status = QueryStatus::Rejected;
        entry.error = Some(err);
        entry.inflight = None;
    }

    fn evict(state: &mut EngineState, key: &CacheKey) {
        if let Some(entry) = state.entries.remove(key) {
            for tag in entry.provides {
                if let Some(keys) = state.tag_index.get_mut(&tag) {
                    keys.remove(key);
                    if keys.is_empty() {
                        state.tag_index.remove(&tag);
                    }
                }
            }
        }
    }

    fn unsubscribe(&self, key: &CacheKey) {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get_mut(key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            // The entry stays cached: the next subscriber gets a hit, and
            // the next invalidation touching its tags evicts it.
        }
    }

    fn snapshot(&self, key: &CacheKey) -> QueryState {
        let state = self.lock();
        match state.entries.get(key) {
            Some(entry) => QueryState {
                status: entry.status,
                data: entry.data.clone(),
                error: entry.error.clone(),
            },
            None => QueryState {
                status: QueryStatus::Uninitialized,
                data: None,
                error: None,
            },
        }
    }

    fn inflight(&self, key: &CacheKey) -> Option<SharedFetch> {
        self.lock().entries.get(key).and_then(|entry| entry.inflight.clone())
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.lock().entries.len()
    }

    #[cfg(test)]
    fn tag_count(&self) -> usize {
        self.lock().tag_index.len()
    }

    #[cfg(test)]
    fn subscriber_count(&self, key: &CacheKey) -> usize {
        self.lock()
            .entries
            .get(key)
            .map(|entry| entry.subscribers)
            .unwrap_or(0)
    }
}

/// Live interest in one cached query. Dropping it releases the
/// subscription; the cached entry itself stays until an invalidation
/// touches it.
pub struct QuerySubscription {
    engine: Arc<QueryCacheEngine>,
    key: CacheKey,
}

impl QuerySubscription {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn state(&self) -> QueryState {
        self.engine.snapshot(&self.key)
    }

    pub fn data(&self) -> Option<Arc<Value>> {
        self.state().data
    }

    pub fn error(&self) -> Option<ApiError> {
        self.state().error
    }

    /// Wait for any outstanding fetch or re-fetch on this key to finish.
    pub async fn settled(&self) {
        if let Some(fetch) = self.engine.inflight(&self.key) {
            let _ = fetch.await;
        }
    }
}

impl fmt::Debug for QuerySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySubscription")
            .field("key", &self.key)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for QuerySubscription {
    fn drop(&mut self) {
        self.engine.unsubscribe(&self.key);
    }
}
