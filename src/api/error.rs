use thiserror::Error;

/// Maximum length for error response bodies kept in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Errors surfaced by the data layer.
///
/// Cloneable on purpose: a failed fetch shared by several coalesced
/// subscribers hands each of them the same error, and rejected cache
/// entries keep a copy for later inspection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Non-2xx response that does not fit a more specific category.
    #[error("request failed with status {status}: {body}")]
    Transport { status: u16, body: String },

    /// Token refresh failed. The credential has been cleared and the user
    /// must log in again. The one error with a side effect beyond the
    /// request that produced it.
    #[error("not authenticated - please log in again")]
    Unauthenticated,

    /// A mutation was rejected by server-side validation, e.g. a duplicate
    /// title.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing resource, either a 404 from the server or an entity id
    /// absent from a fetched store.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Unknown endpoint name, or a query/mutation kind mismatch.
    #[error("endpoint error: {0}")]
    Endpoint(String),
}

impl ApiError {
    /// Truncate a response body to avoid carrying excessive data around.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        // Walk back to a char boundary: the cap is in bytes and may land
        // inside a multi-byte character.
        let mut cut = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..cut],
            body.len()
        )
    }

    /// The server wraps human-readable errors as `{"message": "..."}`;
    /// pull that out when present, otherwise keep the (truncated) body.
    fn message_from(body: &str) -> String {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .and_then(|message| message.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| Self::truncate_body(body))
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            400 | 409 => ApiError::Validation(Self::message_from(body)),
            404 => ApiError::NotFound(Self::message_from(body)),
            _ => ApiError::Transport {
                status,
                body: Self::truncate_body(body),
            },
        }
    }

    /// True for the authorization-expired signal that triggers a token
    /// refresh.
    pub fn is_expired_credential(&self) -> bool {
        matches!(self, ApiError::Transport { status: 401, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}
