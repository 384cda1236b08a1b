//! Typed records for the notes API.
//!
//! The cache itself stores normalized JSON snapshots; these types are the
//! shapes consumers work with, deserialized at the edge by the client's
//! convenience methods.

pub mod note;
pub mod user;

pub use note::{NewNote, Note, UpdateNote};
pub use user::{NewUser, UpdateUser, User};
