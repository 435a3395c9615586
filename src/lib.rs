//! Prokat client - SDK for the Prokat rental marketplace REST API
//!
//! Provides the session/authentication layer (password and one-time-code
//! login flows, token ownership, identity resolution) and a durable TTL
//! cache for backend reference data, over a shared envelope-unwrapping
//! HTTP client.

pub mod client;
pub mod config;
pub mod http;
pub mod i18n;
pub mod models;
pub mod services;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ProkatClient;
pub use config::Config;
pub use http::{ApiClient, ApiError};
pub use i18n::{Locale, LocalizedText};
pub use models::{DictionaryItem, DictionaryType, Role, UserIdentity};
pub use services::{
    DictionaryService, FlowError, LoginFlow, Phase, Secret, SecretKind, SessionError,
    SessionManager,
};
