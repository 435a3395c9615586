//! Data models shared across the client
//!
//! These mirror the backend's wire shapes: the current-user record behind
//! `GET /auth/me` and the dictionary entries behind `GET /dictionaries`.

pub mod dictionary;
pub mod user;

pub use dictionary::{CachedDictionary, DictionaryItem, DictionaryType};
pub use user::{Role, UserIdentity};
