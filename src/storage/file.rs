//! File-backed storage backend
//!
//! A single JSON object on disk, loaded once on open and rewritten on every
//! mutation. Writes go through a temp file in the same directory followed by
//! an atomic rename, so a crash mid-write leaves the previous state intact.
//!
//! The values stored here (token, locale, dictionary snapshots) are tiny,
//! so rewriting the whole file is cheaper than anything smarter.

use super::KeyValueStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Durable key/value store persisted as one JSON file.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("path", &self.path).finish()
    }
}

impl FileStore {
    /// Open (or create) the store at `path`.
    ///
    /// A missing file starts empty; parent directories are created.
    /// A corrupt file is an error rather than silent data loss.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("corrupt store file {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Serialize `entries` and atomically replace the file on disk.
    ///
    /// The temp-file write and rename are blocking syscalls, so they run
    /// on the blocking thread pool rather than the async executor.
    async fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let json =
            serde_json::to_vec_pretty(entries).context("failed to serialize store contents")?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let mut tmp = tempfile::NamedTempFile::new_in(dir)
                .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
            tmp.write_all(&json).context("failed to write store file")?;
            tmp.persist(&path)
                .with_context(|| format!("failed to replace {}", path.display()))?;
            Ok(())
        })
        .await
        .context("store flush task failed")?
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.flush(&entries).await?;
        }
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        if entries.len() != before {
            self.flush(&entries).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.clear();
        self.flush(&entries).await
    }
}
