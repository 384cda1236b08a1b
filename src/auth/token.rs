use std::sync::{Arc, PoisonError, RwLock};

use crate::auth::claims::UserClaims;

/// In-memory store for the short-lived access token.
///
/// Clone is cheap - handles share one slot, so the transport, the
/// re-authentication guard, and the client all observe the same token.
/// Set on login or refresh, cleared on logout or refresh failure.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current token, if any.
    pub fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, token: String) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_present(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Claims decoded from the current token. `None` when there is no
    /// token or its payload does not decode.
    pub fn claims(&self) -> Option<UserClaims> {
        self.get().and_then(|token| UserClaims::decode(&token).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let tokens = TokenStore::new();
        assert_eq!(tokens.get(), None);
        assert!(!tokens.is_present());

        tokens.set("abc".to_string());
        assert_eq!(tokens.get().as_deref(), Some("abc"));
        assert!(tokens.is_present());

        tokens.clear();
        assert_eq!(tokens.get(), None);
    }

    #[test]
    fn test_clones_share_the_slot() {
        let tokens = TokenStore::new();
        let handle = tokens.clone();
        tokens.set("shared".to_string());
        assert_eq!(handle.get().as_deref(), Some("shared"));
        handle.clear();
        assert_eq!(tokens.get(), None);
    }

    #[test]
    fn test_claims_none_for_garbage_token() {
        let tokens = TokenStore::new();
        tokens.set("not-a-jwt".to_string());
        assert!(tokens.claims().is_none());
    }
}
