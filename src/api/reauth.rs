//! Transparent credential refresh.
//!
//! `ReauthGuard` wraps any `Transport`. When a request comes back with the
//! authorization-expired signal (401), the guard performs a single-flight
//! refresh call and retries the original request exactly once. Requests
//! that hit expiry while a refresh is already running wait for it and
//! consume its outcome instead of starting their own; with N concurrent
//! expired requests the server sees exactly one refresh.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::error::ApiError;
use crate::api::transport::{RequestDescriptor, Transport};
use crate::auth::token::TokenStore;

/// Field in the login/refresh response payload that carries the token.
const ACCESS_TOKEN_FIELD: &str = "accessToken";

/// Pull the access token out of a login or refresh response payload.
pub(crate) fn access_token_from(payload: &Value) -> Result<String, ApiError> {
    payload
        .get(ACCESS_TOKEN_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::InvalidResponse(format!("response payload missing {ACCESS_TOKEN_FIELD}"))
        })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Succeeded,
    Failed,
}

/// Result of the most recent refresh attempt. The generation counts
/// attempts, not token values, so a waiter can tell "a refresh ran while I
/// waited" apart from "nothing happened" even when the token itself did
/// not change (no token held, or the server reissued the same string).
struct RefreshState {
    generation: u64,
    outcome: RefreshOutcome,
}

pub struct ReauthGuard {
    inner: Arc<dyn Transport>,
    tokens: TokenStore,
    refresh: RequestDescriptor,
    /// Held for the full duration of a refresh call. Lock held means
    /// refresh in flight; that is the whole state machine.
    refresh_state: Mutex<RefreshState>,
}

impl ReauthGuard {
    pub fn new(inner: Arc<dyn Transport>, tokens: TokenStore, refresh: RequestDescriptor) -> Self {
        Self {
            inner,
            tokens,
            refresh,
            refresh_state: Mutex::new(RefreshState {
                generation: 0,
                outcome: RefreshOutcome::Failed,
            }),
        }
    }

    async fn refresh_and_retry(
        &self,
        desc: &RequestDescriptor,
        seen: u64,
    ) -> Result<Value, ApiError> {
        let mut state = self.refresh_state.lock().await;

        if state.generation != seen {
            // A refresh finished while we waited on the lock; consume its
            // outcome rather than running another.
            let outcome = state.outcome;
            drop(state);
            return match outcome {
                RefreshOutcome::Succeeded => {
                    debug!(path = %desc.path, "token already refreshed, retrying");
                    self.inner.send(desc).await
                }
                RefreshOutcome::Failed => Err(ApiError::Unauthenticated),
            };
        }

        debug!("access token expired, refreshing");
        let refreshed = match self.inner.send(&self.refresh).await {
            Ok(payload) => match access_token_from(&payload) {
                Ok(token) => {
                    self.tokens.set(token);
                    info!("access token refreshed");
                    true
                }
                Err(err) => {
                    warn!(error = %err, "refresh response unusable, clearing credential");
                    false
                }
            },
            Err(err) => {
                warn!(error = %err, "refresh failed, clearing credential");
                false
            }
        };

        state.generation += 1;
        if refreshed {
            state.outcome = RefreshOutcome::Succeeded;
            drop(state);
            // Retry the original request exactly once; a second failure
            // surfaces unchanged.
            self.inner.send(desc).await
        } else {
            state.outcome = RefreshOutcome::Failed;
            self.tokens.clear();
            drop(state);
            Err(ApiError::Unauthenticated)
        }
    }
}

#[async_trait]
impl Transport for ReauthGuard {
    async fn send(&self, desc: &RequestDescriptor) -> Result<Value, ApiError> {
        let seen = self.refresh_state.lock().await.generation;
        match self.inner.send(desc).await {
            Err(err) if err.is_expired_credential() => self.refresh_and_retry(desc, seen).await,
            other => other,
        }
    }
}
