//! In-memory storage, used for tests and throwaway sessions.

use std::collections::BTreeMap;
use async_trait::async_trait;
use tokio::sync::Mutex;
use super::trait_::check_key;
use super::{KeyValueStore, Result, StorageError};

#[derive(Debug, Default)]
struct Inner {
    values: BTreeMap<String, String>,
    revisions: BTreeMap<String, u64>,
}

/// Key-value store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    quota: Option<u64>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of stored keys and values, in bytes.
    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota = Some(bytes);
        self
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        Ok(self.inner.lock().await.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        check_key(key)?;
        let mut inner = self.inner.lock().await;

        if let Some(limit) = self.quota {
            let used: usize = inner
                .values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let size = (used + key.len() + value.len()) as u64;
            if size > limit {
                return Err(StorageError::QuotaExceeded { key: key.to_string(), size, limit });
            }
        }

        inner.values.insert(key.to_string(), value.to_string());
        *inner.revisions.entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        check_key(key)?;
        let mut inner = self.inner.lock().await;
        inner.values.remove(key);
        inner.revisions.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.inner.lock().await.values.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.values.clear();
        inner.revisions.clear();
        Ok(())
    }

    async fn revision(&self, key: &str) -> Result<u64> {
        check_key(key)?;
        Ok(self.inner.lock().await.revisions.get(key).copied().unwrap_or(0))
    }
}
