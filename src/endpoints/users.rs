//! Users endpoints. Same shape as notes but with no sort comparator:
//! accounts keep the order the server returns.

use serde_json::Value;

use crate::api::endpoint::{Endpoint, Registry, Tag};
use crate::api::error::ApiError;
use crate::api::transport::RequestDescriptor;

use super::{list_tags, normalize_list, one_tag};

pub const TAG_USER: &str = "User";

pub const GET_USERS: &str = "getUsers";
pub const ADD_USER: &str = "addUser";
pub const UPDATE_USER: &str = "updateUser";
pub const DELETE_USER: &str = "deleteUser";

const USERS_PATH: &str = "/users";

pub(crate) fn register(registry: &mut Registry) {
    registry.register(
        Endpoint::query(GET_USERS, |_| RequestDescriptor::get(USERS_PATH))
            .transform(transform_users)
            .provides(provides_users),
    );
    registry.register(
        Endpoint::mutation(ADD_USER, |arg| {
            RequestDescriptor::post(USERS_PATH, arg.clone())
        })
        .invalidates(invalidates_user),
    );
    registry.register(
        Endpoint::mutation(UPDATE_USER, |arg| {
            RequestDescriptor::patch(USERS_PATH, arg.clone())
        })
        .invalidates(invalidates_user),
    );
    registry.register(
        Endpoint::mutation(DELETE_USER, |arg| {
            RequestDescriptor::delete(USERS_PATH, arg.clone())
        })
        .invalidates(invalidates_user),
    );
}

fn transform_users(raw: Value) -> Result<Value, ApiError> {
    normalize_list(raw, None)
}

fn provides_users(result: &Value, _arg: &Value) -> Vec<Tag> {
    list_tags(TAG_USER, result)
}

fn invalidates_user(_result: &Value, arg: &Value) -> Vec<Tag> {
    one_tag(TAG_USER, arg)
}
