//! User settings store.

use std::sync::Arc;
use defenders_core::{SettingsPatch, UserSettings};
use defenders_storage::KeyValueStore;
use tracing::warn;
use crate::error::Result;
use crate::SETTINGS_KEY;

/// Persists `UserSettings` under a single key.
pub struct SettingsStore<S: KeyValueStore> {
    store: Arc<S>,
}

impl<S: KeyValueStore> SettingsStore<S> {
    /// Create a settings store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Stored settings merged onto the defaults. Corrupt data yields defaults.
    pub async fn read(&self) -> Result<UserSettings> {
        let Some(raw) = self.store.get(SETTINGS_KEY).await? else {
            return Ok(UserSettings::default());
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!(error = %e, "stored settings are unreadable, using defaults");
                Ok(UserSettings::default())
            }
        }
    }

    /// Merge `patch` into the stored settings and persist them.
    pub async fn save(&self, patch: SettingsPatch) -> Result<UserSettings> {
        let mut settings = self.read().await?;
        settings.apply(patch);
        self.store
            .set(SETTINGS_KEY, &serde_json::to_string(&settings)?)
            .await?;
        Ok(settings)
    }
}
