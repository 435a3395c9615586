//! Durable client-side storage
//!
//! The browser original keeps its session token, display locale and
//! dictionary cache in `localStorage`. This module is that contract as a
//! trait: a flat string key/value store with prefix operations, behind
//! `Arc<dyn KeyValueStore>` so services stay testable.
//!
//! Two backends are provided:
//! - [`MemoryStore`] - process-local, for tests and throwaway sessions
//! - [`FileStore`] - a single JSON file with atomic write-through

pub mod file;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{StorageConfig, StorageDriver};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Fixed storage keys shared by the whole client.
///
/// These names are a compatibility contract: values must be readable by
/// any other implementation of this client against the same store.
pub mod keys {
    /// Bearer token, stored as a raw string
    pub const TOKEN: &str = "token";
    /// Active display locale (`ru`/`kk`/`en`), stored as a raw string
    pub const LANG: &str = "lang";
    /// Prefix of every dictionary cache entry
    pub const DICT_PREFIX: &str = "dict_";
}

/// String key/value store with durable semantics.
///
/// Values are raw strings; callers JSON-encode structured values
/// themselves (the dictionary cache does, the token does not).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value under `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;

    /// List every key starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Delete every key starting with `prefix`.
    async fn remove_prefix(&self, prefix: &str) -> Result<()>;

    /// Delete everything.
    async fn clear(&self) -> Result<()>;
}

/// Create a store instance based on configuration.
///
/// - `StorageDriver::Memory` - in-process map, nothing survives a restart
/// - `StorageDriver::File` - JSON file at `config.path`
pub async fn create_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.driver {
        StorageDriver::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageDriver::File => {
            let store = FileStore::open(&config.path).await?;
            Ok(Arc::new(store))
        }
    }
}
