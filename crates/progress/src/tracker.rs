//! Progress tracking service.
//!
//! The tracker owns the persisted `UserProgress` aggregate. Pages and commands
//! receive a tracker instance instead of touching storage directly.
//!
//! Read-modify-write operations on one tracker are serialized. Writers in other
//! processes sharing the same storage are not coordinated: the last write wins,
//! and a `warn!` is logged when the stored revision moved underneath a write.

use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use defenders_core::{
    GamePatch, Mission, ProgressPatch, Stage, UserProgress, PROGRESS_SCHEMA_VERSION,
};
use defenders_storage::KeyValueStore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::error::{ProgressError, Result};
use crate::schema::decode_progress;
use crate::PROGRESS_KEY;

/// Progress tracking service.
#[async_trait]
pub trait ProgressTracker: Send + Sync {
    /// Current aggregate. Missing or corrupt data yields the defaults.
    async fn read(&self) -> Result<UserProgress>;

    /// Shallow-merge `patch` over the stored aggregate and persist it.
    async fn write(&self, patch: ProgressPatch) -> Result<()>;

    /// Record a stage submission and apply the completion rules.
    async fn update_game_progress(
        &self,
        mission: Mission,
        stage: Stage,
        patch: GamePatch,
    ) -> Result<UserProgress>;

    /// Mark the certificate as issued under `title`.
    async fn issue_certificate(&self, title: &str) -> Result<UserProgress>;

    /// Same as `update_game_progress`, with string identifiers.
    async fn update_game_progress_by_key(
        &self,
        mission: &str,
        stage: &str,
        patch: GamePatch,
    ) -> Result<UserProgress> {
        let mission: Mission = mission.parse()?;
        let stage: Stage = stage.parse()?;
        self.update_game_progress(mission, stage, patch).await
    }

    /// Completion percentage of one mission.
    async fn mission_progress_percent(&self, mission: Mission) -> Result<u8> {
        Ok(self.read().await?.mission_progress_percent(mission))
    }

    /// Mean completion percentage over all missions.
    async fn overall_progress_percent(&self) -> Result<u8> {
        Ok(self.read().await?.overall_progress_percent())
    }
}

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Storage key holding the aggregate
    pub key: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            key: PROGRESS_KEY.to_string(),
        }
    }
}

/// Progress tracker over any key-value store.
pub struct BasicProgressTracker<S: KeyValueStore> {
    store: Arc<S>,
    config: TrackerConfig,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> BasicProgressTracker<S> {
    /// Create a new progress tracker.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            config: TrackerConfig::default(),
            write_lock: Mutex::new(()),
        }
    }

    /// Set configuration.
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the aggregate together with the storage revision it was read at.
    async fn load(&self) -> Result<(UserProgress, u64)> {
        let revision = self.store.revision(&self.config.key).await?;
        let mut progress = match self.store.get(&self.config.key).await? {
            Some(raw) => decode_progress(&raw).unwrap_or_default(),
            None => UserProgress::default(),
        };

        // Derived on every read; a stored flag is never trusted.
        progress.certificate_unlocked = progress.all_missions_completed();

        Ok((progress, revision))
    }

    async fn persist(&self, progress: &mut UserProgress, read_revision: u64) -> Result<()> {
        progress.schema_version = PROGRESS_SCHEMA_VERSION;
        progress.last_activity = Utc::now();

        let current = self.store.revision(&self.config.key).await?;
        if current != read_revision {
            warn!(
                key = %self.config.key,
                read_revision,
                current,
                "progress was written elsewhere since it was read; overwriting"
            );
        }

        let json = serde_json::to_string(progress)?;
        self.store.set(&self.config.key, &json).await?;
        Ok(())
    }
}

#[async_trait]
impl<S: KeyValueStore + 'static> ProgressTracker for BasicProgressTracker<S> {
    async fn read(&self) -> Result<UserProgress> {
        Ok(self.load().await?.0)
    }

    async fn write(&self, patch: ProgressPatch) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let (mut progress, revision) = self.load().await?;
        progress.apply(patch);

        // Derived fields always follow the stage records.
        progress.certificate_unlocked = progress.all_missions_completed();
        progress.total_score = progress.compute_total_score();

        self.persist(&mut progress, revision).await
    }

    async fn update_game_progress(
        &self,
        mission: Mission,
        stage: Stage,
        patch: GamePatch,
    ) -> Result<UserProgress> {
        let _guard = self.write_lock.lock().await;
        let (mut progress, revision) = self.load().await?;
        let now = Utc::now();

        let was_completed = progress.mission(mission).completed;
        let record = progress.mission_mut(mission);

        let game = record.stage_mut(stage);
        if let Some(score) = patch.score {
            game.score = score;
        }
        match patch.completed {
            Some(true) => game.completed = true,
            Some(false) if game.completed => {
                debug!(%mission, %stage, "ignoring attempt to un-complete a stage");
            }
            _ => {}
        }
        if game.completed {
            game.completed_at = Some(now);
        }
        game.attempts = game.attempts.saturating_add(1);

        if !was_completed && record.all_stages_completed() {
            record.completed = true;
            record.completed_at = Some(now);
            record.badge = Some(mission.badge().to_string());
            info!(%mission, badge = mission.badge(), "mission completed");
        }

        if let Some(badge) = record.badge.clone() {
            if progress.add_badge(&badge) {
                debug!(%badge, "badge awarded");
            }
        }

        // Never unset here once true.
        if progress.all_missions_completed() && !progress.certificate_unlocked {
            progress.certificate_unlocked = true;
            info!("certificate unlocked");
        }

        progress.total_score = progress.compute_total_score();

        self.persist(&mut progress, revision).await?;
        Ok(progress)
    }

    async fn issue_certificate(&self, title: &str) -> Result<UserProgress> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ProgressError::InvalidValue("certificate title is empty".into()));
        }

        let _guard = self.write_lock.lock().await;
        let (mut progress, revision) = self.load().await?;
        if !progress.certificate_unlocked {
            return Err(ProgressError::CertificateLocked);
        }

        progress.certificate_generated = true;
        if progress.add_certificate(title) {
            info!(%title, "certificate issued");
        }

        self.persist(&mut progress, revision).await?;
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use defenders_core::MissionProgress;
    use defenders_storage::{JsonFileStore, MemoryStore, StorageError};

    fn tracker() -> (Arc<MemoryStore>, BasicProgressTracker<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), BasicProgressTracker::new(store))
    }

    async fn complete_mission(t: &impl ProgressTracker, mission: Mission, score: u32) {
        for stage in Stage::ALL {
            t.update_game_progress(mission, stage, GamePatch::completed_with_score(score))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_read_defaults_without_persisting() {
        let (store, t) = tracker();
        let p = t.read().await.unwrap();
        assert!(!p.certificate_unlocked);
        assert_eq!(p.total_score, 0);
        assert!(store.get(PROGRESS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_storage_recovers_to_defaults() {
        let (store, t) = tracker();
        store.set(PROGRESS_KEY, "{\"mindfog\": tru").await.unwrap();

        let p = t.read().await.unwrap();
        assert_eq!(p.mindfog, MissionProgress::default());
        assert!(p.badges.is_empty());

        // The next write replaces the corrupt blob.
        t.update_game_progress(Mission::Mindfog, Stage::Intro, GamePatch::completed())
            .await
            .unwrap();
        assert!(t.read().await.unwrap().mindfog.intro.completed);
    }

    #[tokio::test]
    async fn test_phisher_scenario() {
        let (_, t) = tracker();
        t.update_game_progress(Mission::Phisher, Stage::Intro, GamePatch::completed())
            .await
            .unwrap();
        t.update_game_progress(Mission::Phisher, Stage::Game1, GamePatch::completed_with_score(150))
            .await
            .unwrap();
        t.update_game_progress(Mission::Phisher, Stage::Game2, GamePatch::completed_with_score(90))
            .await
            .unwrap();
        t.update_game_progress(Mission::Phisher, Stage::Boss, GamePatch::completed_with_score(200))
            .await
            .unwrap();
        let p = t
            .update_game_progress(Mission::Phisher, Stage::Debrief, GamePatch::completed_with_score(100))
            .await
            .unwrap();

        assert!(p.phisher.completed);
        assert!(p.phisher.completed_at.is_some());
        assert_eq!(p.phisher.badge.as_deref(), Some("Scam Spotter"));
        assert_eq!(p.badges, vec!["Scam Spotter".to_string()]);
        assert_eq!(p.total_score, 150 + 90 + 200 + 100);
        assert!(!p.certificate_unlocked);
        assert!(!p.mindfog.completed);
        assert!(!p.aitruth.completed);

        assert_eq!(t.read().await.unwrap(), p);
    }

    #[tokio::test]
    async fn test_badge_append_is_idempotent() {
        let (_, t) = tracker();
        complete_mission(&t, Mission::Mindfog, 10).await;
        for _ in 0..3 {
            t.update_game_progress(Mission::Mindfog, Stage::Boss, GamePatch::completed())
                .await
                .unwrap();
        }
        let p = t.read().await.unwrap();
        assert_eq!(p.badges, vec!["Focus Champion".to_string()]);
    }

    #[tokio::test]
    async fn test_completing_one_mission_touches_only_it() {
        let (_, t) = tracker();
        complete_mission(&t, Mission::Aitruth, 0).await;
        let p = t.read().await.unwrap();

        assert!(p.aitruth.completed);
        assert_eq!(p.aitruth.badge.as_deref(), Some("Truth Detective"));
        assert!(!p.mindfog.completed && p.mindfog.badge.is_none());
        assert!(!p.phisher.completed && p.phisher.badge.is_none());
        assert_eq!(p.badges, vec!["Truth Detective".to_string()]);
    }

    #[tokio::test]
    async fn test_certificate_unlock_requires_all_three() {
        let (_, t) = tracker();
        complete_mission(&t, Mission::Mindfog, 10).await;
        complete_mission(&t, Mission::Phisher, 10).await;
        assert!(!t.read().await.unwrap().certificate_unlocked);

        complete_mission(&t, Mission::Aitruth, 10).await;
        let p = t.read().await.unwrap();
        assert!(p.certificate_unlocked);
        assert_eq!(p.badges.len(), 3);
        assert_eq!(p.total_score, 150);
    }

    #[tokio::test]
    async fn test_certificate_unlock_all_combinations() {
        for mask in 0u8..8 {
            let (_, t) = tracker();
            for (i, mission) in Mission::ALL.into_iter().enumerate() {
                if mask & (1 << i) != 0 {
                    complete_mission(&t, mission, 1).await;
                }
            }
            let p = t.read().await.unwrap();
            assert_eq!(p.certificate_unlocked, mask == 0b111, "mask {mask:03b}");
        }
    }

    #[tokio::test]
    async fn test_score_resubmission_overwrites() {
        let (_, t) = tracker();
        for _ in 0..2 {
            t.update_game_progress(Mission::Mindfog, Stage::Game1, GamePatch::completed_with_score(80))
                .await
                .unwrap();
        }
        let p = t.read().await.unwrap();
        assert_eq!(p.total_score, 80);
        assert_eq!(p.mindfog.game1.attempts, 2);
    }

    #[tokio::test]
    async fn test_stage_completion_is_one_directional() {
        let (_, t) = tracker();
        complete_mission(&t, Mission::Phisher, 5).await;

        let p = t
            .update_game_progress(
                Mission::Phisher,
                Stage::Boss,
                GamePatch { completed: Some(false), score: Some(7) },
            )
            .await
            .unwrap();

        assert!(p.phisher.boss.completed);
        assert_eq!(p.phisher.boss.score, 7);
        assert!(p.phisher.completed);
        assert_eq!(p.badges, vec!["Scam Spotter".to_string()]);
    }

    #[tokio::test]
    async fn test_incomplete_submission_keeps_completed_at_unset() {
        let (_, t) = tracker();
        let p = t
            .update_game_progress(
                Mission::Aitruth,
                Stage::Game2,
                GamePatch { completed: Some(false), score: Some(30) },
            )
            .await
            .unwrap();
        assert!(!p.aitruth.game2.completed);
        assert!(p.aitruth.game2.completed_at.is_none());
        assert_eq!(p.total_score, 30);
    }

    #[tokio::test]
    async fn test_invalid_keys_fail_fast() {
        let (store, t) = tracker();
        let err = t
            .update_game_progress_by_key("phishing", "intro", GamePatch::completed())
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::InvalidKey(_)));

        let err = t
            .update_game_progress_by_key("phisher", "completed", GamePatch::completed())
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::InvalidKey(_)));
        assert!(store.get(PROGRESS_KEY).await.unwrap().is_none());

        t.update_game_progress_by_key("phisher", "game-1", GamePatch::completed())
            .await
            .unwrap();
        assert!(t.read().await.unwrap().phisher.game1.completed);
    }

    #[tokio::test]
    async fn test_write_roundtrip_preserves_untouched_fields() {
        let (_, t) = tracker();
        t.update_game_progress(Mission::Mindfog, Stage::Intro, GamePatch::completed_with_score(25))
            .await
            .unwrap();
        let before = t.read().await.unwrap();
        let started = before.started_at - chrono::Duration::days(3);

        t.write(ProgressPatch {
            badges: Some(vec!["Early Bird".into()]),
            certificates: Some(vec!["Pilot Cohort".into()]),
            started_at: Some(started),
            ..Default::default()
        })
        .await
        .unwrap();

        let after = t.read().await.unwrap();
        assert_eq!(after.badges, vec!["Early Bird".to_string()]);
        assert_eq!(after.certificates, vec!["Pilot Cohort".to_string()]);
        assert_eq!(after.started_at, started);
        assert_eq!(after.mindfog, before.mindfog);
        assert_eq!(after.phisher, before.phisher);
        assert_eq!(after.total_score, before.total_score);
        assert!(after.last_activity >= before.last_activity);
    }

    #[tokio::test]
    async fn test_write_recomputes_derived_fields_before_persisting() {
        let (store, t) = tracker();
        t.update_game_progress(Mission::Phisher, Stage::Game1, GamePatch::completed_with_score(80))
            .await
            .unwrap();

        t.write(ProgressPatch {
            certificate_unlocked: Some(true),
            total_score: Some(999),
            ..Default::default()
        })
        .await
        .unwrap();

        let raw = store.get(PROGRESS_KEY).await.unwrap().unwrap();
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored["certificateUnlocked"], false);
        assert_eq!(stored["totalScore"], 80);

        let export = crate::Profile::new(store.clone()).export().await.unwrap();
        assert_eq!(export.progress.unwrap()["certificateUnlocked"], false);
    }

    #[tokio::test]
    async fn test_read_recomputes_certificate_flag() {
        let (_, t) = tracker();
        t.write(ProgressPatch {
            certificate_unlocked: Some(true),
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(!t.read().await.unwrap().certificate_unlocked);
    }

    #[tokio::test]
    async fn test_percentages() {
        let (_, t) = tracker();
        assert_eq!(t.overall_progress_percent().await.unwrap(), 0);

        for (k, stage) in Stage::ALL.into_iter().enumerate() {
            t.update_game_progress(Mission::Mindfog, stage, GamePatch::completed())
                .await
                .unwrap();
            let pct = t.mission_progress_percent(Mission::Mindfog).await.unwrap();
            assert_eq!(pct as usize, 20 * (k + 1));
        }
        assert_eq!(t.overall_progress_percent().await.unwrap(), 33);

        complete_mission(&t, Mission::Phisher, 0).await;
        complete_mission(&t, Mission::Aitruth, 0).await;
        assert_eq!(t.overall_progress_percent().await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_issue_certificate() {
        let (_, t) = tracker();
        let err = t.issue_certificate("Digital Defender").await.unwrap_err();
        assert!(matches!(err, ProgressError::CertificateLocked));

        for mission in Mission::ALL {
            complete_mission(&t, mission, 1).await;
        }
        t.issue_certificate("Digital Defender").await.unwrap();
        let p = t.issue_certificate("  Digital Defender ").await.unwrap();

        assert!(p.certificate_generated);
        assert_eq!(p.certificates, vec!["Digital Defender".to_string()]);
        assert!(matches!(
            t.issue_certificate("   ").await,
            Err(ProgressError::InvalidValue(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_serialized() {
        let (_, t) = tracker();
        let t = Arc::new(t);

        let handles: Vec<_> = Stage::ALL
            .into_iter()
            .map(|stage| {
                let t = t.clone();
                tokio::spawn(async move {
                    t.update_game_progress(Mission::Phisher, stage, GamePatch::completed_with_score(10))
                        .await
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let p = t.read().await.unwrap();
        assert!(p.phisher.completed);
        assert_eq!(p.total_score, 50);
    }

    #[tokio::test]
    async fn test_quota_error_propagates() {
        let store = Arc::new(MemoryStore::new().with_quota(64));
        let t = BasicProgressTracker::new(store);
        let err = t
            .update_game_progress(Mission::Mindfog, Stage::Intro, GamePatch::completed())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Storage(StorageError::QuotaExceeded { .. })
        ));
    }

    #[tokio::test]
    async fn test_truncated_progress_file_recovers_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path()).await.unwrap());
        let t = BasicProgressTracker::new(store);
        t.update_game_progress(Mission::Mindfog, Stage::Intro, GamePatch::completed_with_score(10))
            .await
            .unwrap();

        let entry = dir.path().join("entries").join(format!("{}.json", PROGRESS_KEY));
        let raw = std::fs::read_to_string(&entry).unwrap();
        std::fs::write(&entry, &raw[..raw.len() / 2]).unwrap();

        let p = t.read().await.unwrap();
        assert_eq!(p.mindfog, MissionProgress::default());
        assert_eq!(p.total_score, 0);

        let p = t
            .update_game_progress(Mission::Phisher, Stage::Intro, GamePatch::completed())
            .await
            .unwrap();
        assert!(p.phisher.intro.completed);
        assert!(t.read().await.unwrap().phisher.intro.completed);
    }

    #[tokio::test]
    async fn test_custom_key_and_file_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path()).await.unwrap());
        let t = BasicProgressTracker::new(store.clone()).with_config(TrackerConfig {
            key: "profile-a".into(),
        });

        t.update_game_progress(Mission::Aitruth, Stage::Boss, GamePatch::completed_with_score(40))
            .await
            .unwrap();

        assert!(store.get(PROGRESS_KEY).await.unwrap().is_none());
        let reopened = BasicProgressTracker::new(Arc::new(JsonFileStore::new(dir.path()).await.unwrap()))
            .with_config(TrackerConfig { key: "profile-a".into() });
        assert_eq!(reopened.read().await.unwrap().total_score, 40);
    }
}
