use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A work note as served by the API. The server's storage id `_id` is
/// exposed as `id` after normalization; both spellings deserialize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    #[serde(alias = "_id")]
    pub id: String,
    /// Id of the user the note is assigned to.
    pub user: String,
    /// Assignee's username, when the server joins it in.
    #[serde(default)]
    pub username: Option<String>,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    /// Sequential ticket number assigned by the server.
    #[serde(default)]
    pub ticket: Option<i64>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for the create-note mutation.
#[derive(Debug, Clone, Serialize)]
pub struct NewNote {
    pub user: String,
    pub title: String,
    pub text: String,
}

/// Body for the update-note mutation.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateNote {
    pub id: String,
    pub user: String,
    pub title: String,
    pub text: String,
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_server_shape() {
        let note: Note = serde_json::from_value(json!({
            "_id": "63f7a1",
            "user": "63f000",
            "username": "hank",
            "title": "Fix the register",
            "text": "Drawer sticks",
            "completed": false,
            "ticket": 501,
            "createdAt": "2023-02-23T18:05:44.000Z",
            "updatedAt": "2023-02-24T09:12:00.000Z"
        }))
        .expect("note should deserialize");

        assert_eq!(note.id, "63f7a1");
        assert_eq!(note.username.as_deref(), Some("hank"));
        assert_eq!(note.ticket, Some(501));
        assert!(!note.completed);
        assert!(note.created_at.is_some());
    }

    #[test]
    fn test_deserializes_normalized_shape_with_defaults() {
        let note: Note = serde_json::from_value(json!({
            "id": "n1",
            "user": "u1",
            "title": "t",
            "text": "x"
        }))
        .expect("note should deserialize");
        assert_eq!(note.id, "n1");
        assert!(!note.completed);
        assert!(note.ticket.is_none());
    }
}
