use serde::{Deserialize, Serialize};

fn default_active() -> bool {
    true
}

/// An account as served by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Body for the create-user mutation.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub roles: Vec<String>,
}

/// Body for the update-user mutation. Password is only sent when changed.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateUser {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub roles: Vec<String>,
    pub active: bool,
}
