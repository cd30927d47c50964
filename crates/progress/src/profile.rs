//! Learner name, data export and full reset.

use std::sync::Arc;
use chrono::{NaiveDate, Utc};
use defenders_core::Time;
use defenders_storage::KeyValueStore;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use crate::error::{ProgressError, Result};
use crate::{NAME_KEY, PROGRESS_KEY, SETTINGS_KEY};

/// Everything exported for the learner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataExport {
    /// Persisted progress, as stored
    pub progress: Option<Value>,
    /// Persisted settings, as stored
    pub settings: Option<Value>,
    /// Learner display name
    pub name: Option<String>,
    /// When the export was produced
    pub export_date: Time,
}

/// Profile-wide operations over the shared store.
pub struct Profile<S: KeyValueStore> {
    store: Arc<S>,
}

impl<S: KeyValueStore> Profile<S> {
    /// Create a profile handle.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Learner display name, if set.
    pub async fn name(&self) -> Result<Option<String>> {
        Ok(self.store.get(NAME_KEY).await?)
    }

    /// Set the learner display name.
    pub async fn set_name(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProgressError::InvalidValue("name is empty".into()));
        }
        self.store.set(NAME_KEY, name).await?;
        Ok(())
    }

    /// Snapshot of progress, settings and name.
    ///
    /// Stored values that are not valid JSON are exported as `null`.
    pub async fn export(&self) -> Result<UserDataExport> {
        Ok(UserDataExport {
            progress: self.raw_json(PROGRESS_KEY).await?,
            settings: self.raw_json(SETTINGS_KEY).await?,
            name: self.name().await?,
            export_date: Utc::now(),
        })
    }

    /// Wipe every stored key: progress, settings, name and quiz history.
    pub async fn reset_all(&self) -> Result<()> {
        let keys = self.store.keys().await?;
        self.store.clear().await?;
        info!(removed = keys.len(), "all learner data reset");
        Ok(())
    }

    async fn raw_json(&self, key: &str) -> Result<Option<Value>> {
        Ok(self
            .store
            .get(key)
            .await?
            .and_then(|raw| serde_json::from_str(&raw).ok()))
    }
}

/// Default file name for an export taken on `day`.
pub fn export_file_name(day: NaiveDate) -> String {
    format!("digital-defenders-data-{}.json", day.format("%Y-%m-%d"))
}
