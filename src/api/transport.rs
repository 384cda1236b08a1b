//! Request descriptors and the HTTP transport.
//!
//! `Transport` is the seam between the cache layer and the wire: the
//! re-authentication guard wraps one, the engine sends through one, and
//! tests substitute a scripted mock. `HttpTransport` is the production
//! implementation over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::api::error::ApiError;
use crate::auth::token::TokenStore;
use crate::config::Config;

/// HTTP methods the notes API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Everything needed to issue one request, independent of any HTTP
/// library. Endpoint definitions build these from their argument.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Patch, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Delete, path).with_body(body)
    }
}

/// One request in, one structured result out. No caching, no retries -
/// those belong to the layers above.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, desc: &RequestDescriptor) -> Result<Value, ApiError>;
}

/// reqwest-backed transport against a base URL, attaching the current
/// access token as a bearer header.
/// Clone is cheap - reqwest::Client uses Arc internally for connection
/// pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    tokens: TokenStore,
}

impl HttpTransport {
    pub fn new(config: &Config, tokens: TokenStore) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, desc: &RequestDescriptor) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, desc.path);
        let mut request = self.client.request(desc.method.into(), &url);

        if let Some(token) = self.tokens.get() {
            request = request.bearer_auth(token);
        }
        for (name, value) in &desc.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &desc.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!(method = desc.method.as_str(), path = %desc.path, status, "request completed");

        if (200..300).contains(&status) {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text).map_err(|err| {
                ApiError::InvalidResponse(format!("bad JSON from {}: {}", desc.path, err))
            })
        } else {
            Err(ApiError::from_status(status, &text))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_constructors() {
        let get = RequestDescriptor::get("/notes");
        assert_eq!(get.method, Method::Get);
        assert_eq!(get.path, "/notes");
        assert!(get.body.is_none());

        let post = RequestDescriptor::post("/notes", json!({"title": "t"}));
        assert_eq!(post.method, Method::Post);
        assert_eq!(post.body, Some(json!({"title": "t"})));

        let patched = RequestDescriptor::patch("/notes", json!({"id": "1"}))
            .with_header("x-trace", "abc");
        assert_eq!(patched.headers, vec![("x-trace".into(), "abc".into())]);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Delete.as_str(), "DELETE");
        assert_eq!(reqwest::Method::from(Method::Patch), reqwest::Method::PATCH);
    }
}
