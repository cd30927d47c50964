//! JSON file storage implementation.
//!
//! Stores each key as a small JSON document under `entries/` and keeps a
//! per-key meta marker (version + updated_at) under `meta/`. Values are written
//! to a temporary file and renamed into place so a crash never leaves a
//! half-written entry behind.

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};
use super::trait_::check_key;
use super::{KeyValueStore, Result, StorageError};

/// On-disk entry document.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    value: String,
}

/// File-based key-value store rooted at a directory.
pub struct JsonFileStore {
    root: PathBuf,
    quota: Option<u64>,
}

impl JsonFileStore {
    /// Open (and create if needed) a store under `root`.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("entries")).await.map_err(|e| unavailable(&root, e))?;
        fs::create_dir_all(root.join("meta")).await.map_err(|e| unavailable(&root, e))?;

        Ok(Self { root, quota: None })
    }

    /// Limit the total size of stored keys and values, in bytes.
    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join("entries").join(format!("{}.json", encode_key(key)))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join("meta").join(format!("{}.meta.json", encode_key(key)))
    }

    /// Read an entry file. A file that does not decode is treated as absent.
    async fn read_entry(&self, path: &Path) -> Result<Option<StoredEntry>> {
        let json = match fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&json) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable entry, treating as absent");
                Ok(None)
            }
        }
    }

    /// Total bytes currently held, excluding `skip_key`.
    async fn used_bytes(&self, skip_key: &str) -> Result<u64> {
        let mut total = 0u64;
        let mut rd = fs::read_dir(self.root.join("entries")).await?;
        while let Some(entry) = rd.next_entry().await? {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Ok(Some(stored)) = self.read_entry(&entry.path()).await {
                if stored.key != skip_key {
                    total += (stored.key.len() + stored.value.len()) as u64;
                }
            }
        }
        Ok(total)
    }

    /// Read and increment the per-key version, return the new version.
    async fn bump_version(&self, key: &str) -> Result<u64> {
        let version = self.revision(key).await? + 1;
        let meta = serde_json::json!({"version": version, "updated_at": chrono::Utc::now()});
        write_atomic(&self.meta_path(key), serde_json::to_string_pretty(&meta)?.as_bytes()).await?;
        Ok(version)
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        Ok(self.read_entry(&self.entry_path(key)).await?.map(|e| e.value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        check_key(key)?;

        if let Some(limit) = self.quota {
            let size = self.used_bytes(key).await? + (key.len() + value.len()) as u64;
            if size > limit {
                return Err(StorageError::QuotaExceeded { key: key.to_string(), size, limit });
            }
        }

        let entry = StoredEntry { key: key.to_string(), value: value.to_string() };
        let json = serde_json::to_string(&entry)?;
        write_atomic(&self.entry_path(key), json.as_bytes())
            .await
            .map_err(|e| unavailable(&self.root, e))?;

        let version = self.bump_version(key).await?;
        debug!(key, version, bytes = value.len(), "stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        check_key(key)?;
        for path in [self.entry_path(key), self.meta_path(key)] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut rd = fs::read_dir(self.root.join("entries")).await?;
        while let Some(entry) = rd.next_entry().await? {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Ok(Some(stored)) = self.read_entry(&entry.path()).await {
                keys.push(stored.key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self) -> Result<()> {
        for dir in ["entries", "meta"] {
            let path = self.root.join(dir);
            match fs::remove_dir_all(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            fs::create_dir_all(&path).await?;
        }
        debug!(root = %self.root.display(), "cleared store");
        Ok(())
    }

    async fn revision(&self, key: &str) -> Result<u64> {
        check_key(key)?;
        match fs::read_to_string(self.meta_path(key)).await {
            Ok(s) => {
                // An unreadable marker counts as never written.
                let version = serde_json::from_str::<serde_json::Value>(&s)
                    .ok()
                    .and_then(|json| json.get("version").and_then(|v| v.as_u64()));
                Ok(version.unwrap_or(0))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await
}

fn unavailable(root: &Path, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        StorageError::Unavailable(format!("{}: {}", root.display(), e))
    } else {
        StorageError::Io(e)
    }
}

/// Turn a key into a file-name-safe stem. Unreserved characters pass through,
/// everything else is percent-encoded byte by byte.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}
