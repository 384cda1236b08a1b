//! Notes endpoints.

use std::cmp::Ordering;

use serde_json::Value;

use crate::api::endpoint::{Endpoint, Registry, Tag};
use crate::api::error::ApiError;
use crate::api::transport::RequestDescriptor;

use super::{list_tags, normalize_list, one_tag};

pub const TAG_NOTE: &str = "Note";

pub const GET_NOTES: &str = "getNotes";
pub const ADD_NOTE: &str = "addNote";
pub const UPDATE_NOTE: &str = "updateNote";
pub const DELETE_NOTE: &str = "deleteNote";

const NOTES_PATH: &str = "/notes";

pub(crate) fn register(registry: &mut Registry) {
    registry.register(
        Endpoint::query(GET_NOTES, |_| RequestDescriptor::get(NOTES_PATH))
            .transform(transform_notes)
            .provides(provides_notes),
    );
    registry.register(
        Endpoint::mutation(ADD_NOTE, |arg| {
            RequestDescriptor::post(NOTES_PATH, arg.clone())
        })
        .invalidates(invalidates_note),
    );
    registry.register(
        Endpoint::mutation(UPDATE_NOTE, |arg| {
            RequestDescriptor::patch(NOTES_PATH, arg.clone())
        })
        .invalidates(invalidates_note),
    );
    registry.register(
        Endpoint::mutation(DELETE_NOTE, |arg| {
            RequestDescriptor::delete(NOTES_PATH, arg.clone())
        })
        .invalidates(invalidates_note),
    );
}

/// Incomplete notes sort ahead of completed ones; ties keep server order.
fn open_first(a: &Value, b: &Value) -> Ordering {
    let done = |v: &Value| v.get("completed").and_then(Value::as_bool).unwrap_or(false);
    done(a).cmp(&done(b))
}

fn transform_notes(raw: Value) -> Result<Value, ApiError> {
    normalize_list(raw, Some(open_first))
}

fn provides_notes(result: &Value, _arg: &Value) -> Vec<Tag> {
    list_tags(TAG_NOTE, result)
}

fn invalidates_note(_result: &Value, arg: &Value) -> Vec<Tag> {
    one_tag(TAG_NOTE, arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoint::TagId;
    use crate::api::transport::Method;
    use serde_json::json;

    #[test]
    fn test_requests_hit_the_notes_path() {
        let mut registry = Registry::new();
        register(&mut registry);

        let get = (registry.get(GET_NOTES).unwrap().request)(&Value::Null);
        assert_eq!((get.method, get.path.as_str()), (Method::Get, NOTES_PATH));

        let arg = json!({"user": "u1", "title": "t", "text": "x"});
        let add = (registry.get(ADD_NOTE).unwrap().request)(&arg);
        assert_eq!(add.method, Method::Post);
        assert_eq!(add.body, Some(arg));

        let del = (registry.get(DELETE_NOTE).unwrap().request)(&json!({"id": "n1"}));
        assert_eq!(del.method, Method::Delete);
    }

    #[test]
    fn test_transform_sorts_open_notes_first() {
        let data = transform_notes(json!([
            { "_id": "n2", "title": "done", "completed": true },
            { "_id": "n1", "title": "open", "completed": false },
            { "_id": "n3", "title": "also done", "completed": true },
        ]))
        .unwrap();
        assert_eq!(data["ids"], json!(["n1", "n2", "n3"]));
    }

    #[test]
    fn test_update_invalidates_only_its_note() {
        let tags = invalidates_note(&Value::Null, &json!({"id": "n7", "completed": true}));
        assert_eq!(tags, vec![Tag::id(TAG_NOTE, "n7")]);
    }

    #[test]
    fn test_add_invalidates_the_list() {
        let tags = invalidates_note(&Value::Null, &json!({"title": "new"}));
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, TagId::List);
    }
}
