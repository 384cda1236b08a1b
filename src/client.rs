//! The client facade.
//!
//! `ApiClient` wires the stack together: an HTTP transport wrapped in the
//! re-authentication guard, the endpoint registry, the query cache engine,
//! and memoized selectors over cached snapshots. Auth flows (login,
//! refresh, logout) bypass the cache and manage the token store directly.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::error::ApiError;
use crate::api::reauth::{access_token_from, ReauthGuard};
use crate::api::transport::{HttpTransport, Transport};
use crate::auth::claims::UserClaims;
use crate::auth::token::TokenStore;
use crate::cache::engine::{QueryCacheEngine, QuerySubscription, QueryStatus};
use crate::config::Config;
use crate::endpoints::{self, auth, notes, users};
use crate::models::{NewNote, NewUser, Note, UpdateNote, UpdateUser, User};
use crate::store::selectors::StoreSelectors;

/// How long cached data stays visible after logout before the cache is
/// dropped, so a signing-out view does not flash empty mid-transition.
const LOGOUT_RESET_DELAY_MS: u64 = 1000;

pub struct ApiClient {
    engine: Arc<QueryCacheEngine>,
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    note_views: StoreSelectors,
    user_views: StoreSelectors,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let tokens = TokenStore::new();
        let inner = HttpTransport::new(config, tokens.clone())?;
        Ok(Self::assemble(Arc::new(inner), tokens))
    }

    /// Build over a caller-supplied transport instead of HTTP. The guard
    /// and engine still wrap it, so the full stack is exercised.
    pub fn with_transport(inner: Arc<dyn Transport>, tokens: TokenStore) -> Self {
        Self::assemble(inner, tokens)
    }

    fn assemble(inner: Arc<dyn Transport>, tokens: TokenStore) -> Self {
        let guard: Arc<dyn Transport> = Arc::new(ReauthGuard::new(
            inner,
            tokens.clone(),
            auth::refresh_request(),
        ));
        let registry = Arc::new(endpoints::registry());
        let engine = QueryCacheEngine::new(Arc::clone(&guard), registry);
        Self {
            engine,
            transport: guard,
            tokens,
            note_views: StoreSelectors::new(),
            user_views: StoreSelectors::new(),
        }
    }

    pub fn engine(&self) -> &Arc<QueryCacheEngine> {
        &self.engine
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Claims from the current access token, when one is held.
    pub fn current_user(&self) -> Option<UserClaims> {
        self.tokens.claims()
    }

    /// Exchange credentials for an access token. The refresh token travels
    /// in an http-only cookie the transport never sees.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserClaims, ApiError> {
        let payload = self
            .transport
            .send(&auth::login_request(username, password))
            .await?;
        let token = access_token_from(&payload)?;
        self.tokens.set(token.clone());
        info!(username, "logged in");
        UserClaims::decode(&token)
            .map_err(|err| ApiError::InvalidResponse(format!("access token claims: {err}")))
    }

    /// Explicitly refresh the access token, e.g. to restore a session at
    /// startup. The guard also does this implicitly on expiry mid-request.
    pub async fn refresh(&self) -> Result<UserClaims, ApiError> {
        let payload = self.transport.send(&auth::refresh_request()).await?;
        let token = access_token_from(&payload)?;
        self.tokens.set(token.clone());
        UserClaims::decode(&token)
            .map_err(|err| ApiError::InvalidResponse(format!("access token claims: {err}")))
    }

    /// End the session. Local state clears even when the server call
    /// fails; the cache is dropped after a short delay so views rendering
    /// the sign-out can finish with their data intact. The delayed reset
    /// runs on a detached task and is skipped if the runtime shuts down
    /// within the grace window - the cache dies with the process anyway.
    pub async fn logout(&self) {
        let result = self.transport.send(&auth::logout_request()).await;
        self.tokens.clear();
        if let Err(err) = result {
            warn!(error = %err, "logout request failed, clearing local session anyway");
        }
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(LOGOUT_RESET_DELAY_MS)).await;
            engine.reset();
        });
    }

    /// Subscribe to any registered query by name.
    pub async fn query(&self, endpoint: &str, arg: Value) -> Result<QuerySubscription, ApiError> {
        self.engine.query(endpoint, arg).await
    }

    /// Run any registered mutation by name.
    pub async fn mutate(&self, endpoint: &str, arg: Value) -> Result<Arc<Value>, ApiError> {
        self.engine.mutate(endpoint, arg).await
    }

    pub async fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
        let sub = self.engine.query(notes::GET_NOTES, Value::Null).await?;
        let data = fulfilled_data(&sub)?;
        decode_records(&self.note_views.select_all(&data))
    }

    pub async fn note_by_id(&self, id: &str) -> Result<Note, ApiError> {
        let sub = self.engine.query(notes::GET_NOTES, Value::Null).await?;
        let data = fulfilled_data(&sub)?;
        decode_record(self.note_views.select_by_id_required(&data, id)?)
    }

    pub async fn add_note(&self, note: &NewNote) -> Result<Arc<Value>, ApiError> {
        self.engine.mutate(notes::ADD_NOTE, to_arg(note)?).await
    }

    pub async fn update_note(&self, note: &UpdateNote) -> Result<Arc<Value>, ApiError> {
        self.engine.mutate(notes::UPDATE_NOTE, to_arg(note)?).await
    }

    pub async fn delete_note(&self, id: &str) -> Result<Arc<Value>, ApiError> {
        self.engine
            .mutate(notes::DELETE_NOTE, serde_json::json!({ "id": id }))
            .await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let sub = self.engine.query(users::GET_USERS, Value::Null).await?;
        let data = fulfilled_data(&sub)?;
        decode_records(&self.user_views.select_all(&data))
    }

    pub async fn user_by_id(&self, id: &str) -> Result<User, ApiError> {
        let sub = self.engine.query(users::GET_USERS, Value::Null).await?;
        let data = fulfilled_data(&sub)?;
        decode_record(self.user_views.select_by_id_required(&data, id)?)
    }

    pub async fn add_user(&self, user: &NewUser) -> Result<Arc<Value>, ApiError> {
        self.engine.mutate(users::ADD_USER, to_arg(user)?).await
    }

    pub async fn update_user(&self, user: &UpdateUser) -> Result<Arc<Value>, ApiError> {
        self.engine.mutate(users::UPDATE_USER, to_arg(user)?).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<Arc<Value>, ApiError> {
        self.engine
            .mutate(users::DELETE_USER, serde_json::json!({ "id": id }))
            .await
    }
}

/// Cached data for a settled subscription, or the stored error. `query`
/// only returns once the fetch has settled, so the entry is never pending
/// here.
fn fulfilled_data(sub: &QuerySubscription) -> Result<Arc<Value>, ApiError> {
    let state = sub.state();
    match state.status {
        QueryStatus::Fulfilled => state.data.ok_or_else(|| {
            ApiError::InvalidResponse("fulfilled query holds no data".to_string())
        }),
        _ => Err(state
            .error
            .unwrap_or_else(|| ApiError::InvalidResponse("query never settled".to_string()))),
    }
}

fn to_arg(body: &impl Serialize) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|err| ApiError::Endpoint(format!("bad argument: {err}")))
}

fn decode_record<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|err| ApiError::InvalidResponse(err.to_string()))
}

fn decode_records<T: DeserializeOwned>(values: &[Value]) -> Result<Vec<T>, ApiError> {
    values.iter().cloned().map(decode_record).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::transport::mock::{init_tracing, MockTransport};
    use crate::api::transport::{Method, RequestDescriptor};
    use crate::auth::claims::test_token;

    fn server(desc: &RequestDescriptor, _token: Option<&str>) -> Result<Value, ApiError> {
        match (desc.method, desc.path.as_str()) {
            (Method::Post, "/auth") => {
                let username = desc
                    .body
                    .as_ref()
                    .and_then(|b| b["username"].as_str())
                    .unwrap_or_default();
                if username == "hank" {
                    Ok(json!({ "accessToken": test_token("hank", &["Employee", "Manager"], None) }))
                } else {
                    Err(ApiError::from_status(401, r#"{"message":"Unauthorized"}"#))
                }
            }
            (Method::Get, "/auth/refresh") => {
                Ok(json!({ "accessToken": test_token("hank", &["Employee"], None) }))
            }
            (Method::Post, "/auth/logout") => Ok(json!({ "message": "Cookie cleared" })),
            (Method::Get, "/notes") => Ok(json!([
                { "_id": "n2", "user": "u1", "title": "done", "text": "t", "completed": true, "ticket": 2 },
                { "_id": "n1", "user": "u1", "title": "open", "text": "t", "completed": false, "ticket": 1 },
            ])),
            (Method::Patch, "/notes") => Ok(json!({ "message": "updated" })),
            (Method::Get, "/users") => Ok(json!([
                { "_id": "u1", "username": "hank", "roles": ["Employee"], "active": true },
            ])),
            _ => Err(ApiError::NotFound(desc.path.clone())),
        }
    }

    fn client_with(
        handler: impl Fn(&RequestDescriptor, Option<&str>) -> Result<Value, ApiError>
            + Send
            + Sync
            + 'static,
    ) -> (ApiClient, Arc<MockTransport>, TokenStore) {
        init_tracing();
        let tokens = TokenStore::new();
        let transport = Arc::new(MockTransport::new(tokens.clone(), handler));
        let client = ApiClient::with_transport(transport.clone(), tokens.clone());
        (client, transport, tokens)
    }

    #[tokio::test]
    async fn test_login_stores_token_and_returns_claims() {
        let (client, _transport, tokens) = client_with(server);

        let claims = client.login("hank", "pw").await.unwrap();
        assert_eq!(claims.username, "hank");
        assert!(claims.is_manager());
        assert!(tokens.is_present());
        assert_eq!(client.current_user().unwrap().username, "hank");
    }

    #[tokio::test]
    async fn test_login_with_bad_credentials_fails_unauthenticated() {
        let (client, _transport, tokens) = client_with(|desc, _| {
            if desc.path == "/auth/refresh" {
                Err(ApiError::from_status(401, "no cookie"))
            } else {
                server(desc, None)
            }
        });

        let err = client.login("intruder", "pw").await.unwrap_err();
        assert_eq!(err, ApiError::Unauthenticated);
        assert!(!tokens.is_present());
        assert!(client.current_user().is_none());
    }

    #[tokio::test]
    async fn test_typed_note_reads_share_one_fetch() {
        let (client, transport, tokens) = client_with(server);
        tokens.set(test_token("hank", &["Employee"], None));

        let notes = client.list_notes().await.unwrap();
        assert_eq!(notes.len(), 2);
        // Open notes sort first.
        assert_eq!(notes[0].id, "n1");
        assert!(!notes[0].completed);

        let n2 = client.note_by_id("n2").await.unwrap();
        assert!(n2.completed);
        assert_eq!(n2.ticket, Some(2));

        let err = client.note_by_id("ghost").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // Both reads and the failed lookup hit the same cached entry.
        assert_eq!(transport.count_path("/notes"), 1);
    }

    #[tokio::test]
    async fn test_update_note_evicts_the_unwatched_list() {
        let (client, _transport, tokens) = client_with(server);
        tokens.set(test_token("hank", &["Employee"], None));

        let _ = client.list_notes().await.unwrap();
        assert_eq!(client.engine().entry_count(), 1);

        let outcome = client
            .update_note(&UpdateNote {
                id: "n1".into(),
                user: "u1".into(),
                title: "open".into(),
                text: "t".into(),
                completed: true,
            })
            .await
            .unwrap();
        assert_eq!(outcome["message"], "updated");
        // Nobody held the subscription, so invalidation evicts instead of
        // re-fetching.
        assert_eq!(client.engine().entry_count(), 0);
    }

    #[tokio::test]
    async fn test_users_flow() {
        let (client, _transport, tokens) = client_with(server);
        tokens.set(test_token("hank", &["Admin"], None));

        let all = client.list_users().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].username, "hank");
        let one = client.user_by_id("u1").await.unwrap();
        assert!(one.active);
    }

    #[tokio::test]
    async fn test_expired_token_with_failed_refresh_surfaces_unauthenticated() {
        let (client, transport, tokens) = client_with(|desc, _token| {
            if desc.path == "/auth/refresh" {
                Err(ApiError::from_status(403, r#"{"message":"Forbidden"}"#))
            } else {
                Err(ApiError::from_status(401, "expired"))
            }
        });
        tokens.set(test_token("hank", &["Employee"], None));

        let err = client.list_notes().await.unwrap_err();
        assert_eq!(err, ApiError::Unauthenticated);
        assert!(!tokens.is_present());
        assert_eq!(transport.count_path("/auth/refresh"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_clears_session_and_resets_cache_after_delay() {
        let (client, transport, tokens) = client_with(server);
        tokens.set(test_token("hank", &["Employee"], None));

        let _ = client.list_notes().await.unwrap();
        assert_eq!(client.engine().entry_count(), 1);

        client.logout().await;
        assert!(!tokens.is_present());
        assert_eq!(transport.count_path("/auth/logout"), 1);
        // Cached data survives the sign-out transition window.
        assert_eq!(client.engine().entry_count(), 1);

        tokio::time::sleep(Duration::from_millis(LOGOUT_RESET_DELAY_MS + 100)).await;
        assert_eq!(client.engine().entry_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_clears_locally_even_when_the_server_call_fails() {
        let (client, _transport, tokens) =
            client_with(|_, _| Err(ApiError::Network("connection refused".to_string())));
        tokens.set(test_token("hank", &["Employee"], None));

        client.logout().await;
        assert!(!tokens.is_present());
    }
}
