//! Auth endpoints. These never go through the query cache - the client
//! drives them directly and manages the token store itself - so they are
//! plain request builders rather than registry entries.

use serde_json::json;

use crate::api::transport::{Method, RequestDescriptor};

pub const AUTH_PATH: &str = "/auth";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const REFRESH_PATH: &str = "/auth/refresh";

pub fn login_request(username: &str, password: &str) -> RequestDescriptor {
    RequestDescriptor::post(
        AUTH_PATH,
        json!({ "username": username, "password": password }),
    )
}

pub fn logout_request() -> RequestDescriptor {
    RequestDescriptor::new(Method::Post, LOGOUT_PATH)
}

/// The refresh endpoint reads the http-only refresh cookie server-side;
/// no body or token goes with it.
pub fn refresh_request() -> RequestDescriptor {
    RequestDescriptor::get(REFRESH_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_carries_credentials() {
        let desc = login_request("hank", "pw");
        assert_eq!(desc.method, Method::Post);
        assert_eq!(desc.path, AUTH_PATH);
        assert_eq!(desc.body, Some(json!({"username": "hank", "password": "pw"})));
    }

    #[test]
    fn test_logout_and_refresh_have_no_body() {
        assert!(logout_request().body.is_none());
        let refresh = refresh_request();
        assert_eq!(refresh.method, Method::Get);
        assert_eq!(refresh.path, REFRESH_PATH);
    }
}
