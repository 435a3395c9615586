//! Reference data ("dictionary") cache
//!
//! Dictionaries change rarely, so every successful fetch is memoized in
//! durable storage for one hour under a `(type, parent_id)` key. Reads go
//! cache-first; a fresh entry is served with zero network calls.
//!
//! This is a best-effort cache, not a consistency-critical store:
//! concurrent fetches for the same key are not deduplicated (last write
//! wins) and a fetch failure degrades to an empty list instead of an error,
//! leaving the cache untouched so the next call retries.

use chrono::Utc;
use std::sync::Arc;

use crate::http::ApiClient;
use crate::models::{CachedDictionary, DictionaryItem, DictionaryType};
use crate::storage::{keys, KeyValueStore};

/// How long a cached dictionary stays fresh (one hour, in millis).
const DICT_TTL_MILLIS: i64 = 60 * 60 * 1000;

/// Read-through cache over `GET /dictionaries`.
pub struct DictionaryService {
    api: ApiClient,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for DictionaryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryService").finish_non_exhaustive()
    }
}

impl DictionaryService {
    pub fn new(api: ApiClient, store: Arc<dyn KeyValueStore>) -> Self {
        Self { api, store }
    }

    /// Storage key for one dictionary scope.
    ///
    /// The parent id is part of the key, so hierarchical dependencies
    /// (models of a make) can never serve entries of a stale parent.
    fn cache_key(ty: DictionaryType, parent_id: Option<i64>) -> String {
        match parent_id {
            Some(parent) => format!("{}{}_{}", keys::DICT_PREFIX, ty.as_str(), parent),
            None => format!("{}{}", keys::DICT_PREFIX, ty.as_str()),
        }
    }

    /// Entries for `ty`, scoped to `parent_id` when the type is
    /// hierarchical.
    ///
    /// Serves a fresh cached copy without touching the network; otherwise
    /// performs exactly one fetch and overwrites the entry wholesale. A
    /// failed fetch is non-fatal: it is logged and an empty list returned,
    /// the UI is expected to render an empty/disabled control.
    pub async fn get(&self, ty: DictionaryType, parent_id: Option<i64>) -> Vec<DictionaryItem> {
        let key = Self::cache_key(ty, parent_id);

        match self.store.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<CachedDictionary>(&raw) {
                Ok(entry) => {
                    if entry.is_fresh(Utc::now().timestamp_millis(), DICT_TTL_MILLIS) {
                        tracing::debug!(key = %key, "dictionary cache hit");
                        return entry.data;
                    }
                }
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "discarding corrupt dictionary cache entry")
                }
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(key = %key, error = %err, "dictionary cache read failed"),
        }

        self.fetch_and_store(ty, parent_id, &key).await
    }

    /// Warm several top-level dictionaries concurrently.
    ///
    /// Best-effort: failures degrade to empty lists per key, exactly as in
    /// `get`.
    pub async fn prefetch(&self, types: &[DictionaryType]) {
        futures::future::join_all(types.iter().map(|ty| self.get(*ty, None))).await;
    }

    /// Drop every cached dictionary.
    ///
    /// Entry names are localized server-side, so this runs whenever the
    /// display locale changes.
    pub async fn invalidate_all(&self) {
        if let Err(err) = self.store.remove_prefix(keys::DICT_PREFIX).await {
            tracing::warn!(error = %err, "failed to clear dictionary cache");
        }
    }

    async fn fetch_and_store(
        &self,
        ty: DictionaryType,
        parent_id: Option<i64>,
        key: &str,
    ) -> Vec<DictionaryItem> {
        let mut query = vec![("type", ty.as_str().to_string())];
        if let Some(parent) = parent_id {
            query.push(("parent_id", parent.to_string()));
        }

        let items = match self.api.get::<Vec<DictionaryItem>>("/dictionaries", &query).await {
            Ok(items) => items,
            Err(err) => {
                // Non-fatal; nothing is cached, the next call retries
                tracing::warn!(dictionary = %ty, error = %err, "dictionary fetch failed");
                return Vec::new();
            }
        };

        let entry = CachedDictionary {
            data: items.clone(),
            timestamp: Utc::now().timestamp_millis(),
        };
        match serde_json::to_string(&entry) {
            Ok(raw) => {
                if let Err(err) = self.store.set(key, &raw).await {
                    tracing::warn!(key = %key, error = %err, "failed to cache dictionary");
                }
            }
            Err(err) => tracing::warn!(key = %key, error = %err, "failed to encode dictionary"),
        }

        items
    }
}
