//! Learner progress model - stages, missions and the root aggregate.

use serde::{Deserialize, Serialize};
use crate::mission::{Mission, Stage};
use crate::Time;

/// Version of the persisted `UserProgress` layout.
///
/// Blobs written before versioning was introduced carry no `schemaVersion`
/// field and are treated as version 0.
pub const PROGRESS_SCHEMA_VERSION: u32 = 1;

/// Progress of a single stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameProgress {
    /// Whether the stage has been finished
    #[serde(default)]
    pub completed: bool,

    /// Last submitted score (overwritten, never accumulated)
    #[serde(default)]
    pub score: u32,

    /// When the stage was last submitted as completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Time>,

    /// Number of submissions for this stage
    #[serde(default)]
    pub attempts: u32,
}

/// Progress of one mission: five stages plus the derived completion latch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionProgress {
    /// Briefing stage
    #[serde(default)]
    pub intro: GameProgress,
    /// First mini-game
    #[serde(default)]
    pub game1: GameProgress,
    /// Second mini-game
    #[serde(default)]
    pub game2: GameProgress,
    /// Boss challenge
    #[serde(default)]
    pub boss: GameProgress,
    /// Wrap-up
    #[serde(default)]
    pub debrief: GameProgress,

    /// Set the first time all five stages are completed
    #[serde(default)]
    pub completed: bool,

    /// Badge earned with the mission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,

    /// When the mission was completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Time>,
}

impl MissionProgress {
    /// Stage record by identifier.
    pub fn stage(&self, stage: Stage) -> &GameProgress {
        match stage {
            Stage::Intro => &self.intro,
            Stage::Game1 => &self.game1,
            Stage::Game2 => &self.game2,
            Stage::Boss => &self.boss,
            Stage::Debrief => &self.debrief,
        }
    }

    /// Mutable stage record by identifier.
    pub fn stage_mut(&mut self, stage: Stage) -> &mut GameProgress {
        match stage {
            Stage::Intro => &mut self.intro,
            Stage::Game1 => &mut self.game1,
            Stage::Game2 => &mut self.game2,
            Stage::Boss => &mut self.boss,
            Stage::Debrief => &mut self.debrief,
        }
    }

    /// Iterate over `(stage, record)` pairs in play order.
    pub fn stages(&self) -> impl Iterator<Item = (Stage, &GameProgress)> {
        Stage::ALL.into_iter().map(move |s| (s, self.stage(s)))
    }

    /// Number of stages with `completed = true`.
    pub fn completed_stage_count(&self) -> usize {
        self.stages().filter(|(_, g)| g.completed).count()
    }

    /// Whether every stage is completed.
    pub fn all_stages_completed(&self) -> bool {
        self.stages().all(|(_, g)| g.completed)
    }

    /// Completion percentage, in steps of 20.
    pub fn progress_percent(&self) -> u8 {
        let total = Stage::ALL.len();
        let pct = (self.completed_stage_count() * 100 + total / 2) / total;
        pct as u8
    }

    /// Sum of stage scores.
    pub fn score(&self) -> u64 {
        self.stages().map(|(_, g)| u64::from(g.score)).sum()
    }
}

/// The root aggregate: everything tracked for one learner on one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// Persisted layout version
    #[serde(default)]
    pub schema_version: u32,

    /// Screen-time mission
    pub mindfog: MissionProgress,
    /// Phishing mission
    pub phisher: MissionProgress,
    /// AI truth mission
    pub aitruth: MissionProgress,

    /// All three missions completed
    #[serde(default)]
    pub certificate_unlocked: bool,

    /// A certificate has been issued at least once
    #[serde(default)]
    pub certificate_generated: bool,

    /// Sum of every stage score across all missions
    #[serde(default)]
    pub total_score: u64,

    /// Earned badges, distinct, in award order
    #[serde(default)]
    pub badges: Vec<String>,

    /// Issued certificate titles, distinct, in issue order
    #[serde(default)]
    pub certificates: Vec<String>,

    /// First time the profile was created
    pub started_at: Time,

    /// Last write
    pub last_activity: Time,
}

impl Default for UserProgress {
    fn default() -> Self {
        let now = chrono::Utc::now();
        Self {
            schema_version: PROGRESS_SCHEMA_VERSION,
            mindfog: MissionProgress::default(),
            phisher: MissionProgress::default(),
            aitruth: MissionProgress::default(),
            certificate_unlocked: false,
            certificate_generated: false,
            total_score: 0,
            badges: Vec::new(),
            certificates: Vec::new(),
            started_at: now,
            last_activity: now,
        }
    }
}

impl UserProgress {
    /// Mission record by identifier.
    pub fn mission(&self, mission: Mission) -> &MissionProgress {
        match mission {
            Mission::Mindfog => &self.mindfog,
            Mission::Phisher => &self.phisher,
            Mission::Aitruth => &self.aitruth,
        }
    }

    /// Mutable mission record by identifier.
    pub fn mission_mut(&mut self, mission: Mission) -> &mut MissionProgress {
        match mission {
            Mission::Mindfog => &mut self.mindfog,
            Mission::Phisher => &mut self.phisher,
            Mission::Aitruth => &mut self.aitruth,
        }
    }

    /// Whether all three missions carry `completed = true`.
    pub fn all_missions_completed(&self) -> bool {
        Mission::ALL.iter().all(|m| self.mission(*m).completed)
    }

    /// Full recomputation of the score over every stage of every mission.
    pub fn compute_total_score(&self) -> u64 {
        Mission::ALL.iter().map(|m| self.mission(*m).score()).sum()
    }

    /// Completion percentage of one mission (0..=100).
    pub fn mission_progress_percent(&self, mission: Mission) -> u8 {
        self.mission(mission).progress_percent()
    }

    /// Mean of the three mission percentages, rounded.
    pub fn overall_progress_percent(&self) -> u8 {
        let sum: f64 = Mission::ALL
            .iter()
            .map(|m| f64::from(self.mission_progress_percent(*m)))
            .sum();
        (sum / Mission::ALL.len() as f64).round() as u8
    }

    /// Append a badge unless already present. Returns true when added.
    pub fn add_badge(&mut self, badge: &str) -> bool {
        if badge.is_empty() || self.badges.iter().any(|b| b == badge) {
            return false;
        }
        self.badges.push(badge.to_string());
        true
    }

    /// Append a certificate title unless already present. Returns true when added.
    pub fn add_certificate(&mut self, title: &str) -> bool {
        if self.certificates.iter().any(|c| c == title) {
            return false;
        }
        self.certificates.push(title.to_string());
        true
    }

    /// Shallow-merge a partial update over this aggregate.
    pub fn apply(&mut self, patch: ProgressPatch) {
        let ProgressPatch {
            mindfog,
            phisher,
            aitruth,
            certificate_unlocked,
            certificate_generated,
            total_score,
            badges,
            certificates,
            started_at,
            last_activity,
        } = patch;

        if let Some(v) = mindfog {
            self.mindfog = v;
        }
        if let Some(v) = phisher {
            self.phisher = v;
        }
        if let Some(v) = aitruth {
            self.aitruth = v;
        }
        if let Some(v) = certificate_unlocked {
            self.certificate_unlocked = v;
        }
        if let Some(v) = certificate_generated {
            self.certificate_generated = v;
        }
        if let Some(v) = total_score {
            self.total_score = v;
        }
        if let Some(v) = badges {
            self.badges = v;
        }
        if let Some(v) = certificates {
            self.certificates = v;
        }
        if let Some(v) = started_at {
            self.started_at = v;
        }
        if let Some(v) = last_activity {
            self.last_activity = v;
        }
    }
}

/// Partial update of a stage record.
///
/// Callers only ever submit completion and score; `completed_at` and
/// `attempts` are maintained by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePatch {
    /// New completion flag
    pub completed: Option<bool>,
    /// New score
    pub score: Option<u32>,
}

impl GamePatch {
    /// Mark the stage completed.
    pub fn completed() -> Self {
        Self { completed: Some(true), score: None }
    }

    /// Mark the stage completed with a score.
    pub fn completed_with_score(score: u32) -> Self {
        Self { completed: Some(true), score: Some(score) }
    }

    /// Set the score.
    pub fn with_score(mut self, score: u32) -> Self {
        self.score = Some(score);
        self
    }
}

/// Partial update of the root aggregate. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressPatch {
    /// Replacement mindfog record
    pub mindfog: Option<MissionProgress>,
    /// Replacement phisher record
    pub phisher: Option<MissionProgress>,
    /// Replacement aitruth record
    pub aitruth: Option<MissionProgress>,
    /// Certificate unlock flag
    pub certificate_unlocked: Option<bool>,
    /// Certificate generated flag
    pub certificate_generated: Option<bool>,
    /// Total score
    pub total_score: Option<u64>,
    /// Badge list
    pub badges: Option<Vec<String>>,
    /// Certificate list
    pub certificates: Option<Vec<String>>,
    /// Start timestamp
    pub started_at: Option<Time>,
    /// Last activity (always overwritten by the store)
    pub last_activity: Option<Time>,
}

impl ProgressPatch {
    /// Patch that replaces every field with the values from `progress`.
    pub fn full(progress: UserProgress) -> Self {
        Self {
            mindfog: Some(progress.mindfog),
            phisher: Some(progress.phisher),
            aitruth: Some(progress.aitruth),
            certificate_unlocked: Some(progress.certificate_unlocked),
            certificate_generated: Some(progress.certificate_generated),
            total_score: Some(progress.total_score),
            badges: Some(progress.badges),
            certificates: Some(progress.certificates),
            started_at: Some(progress.started_at),
            last_activity: Some(progress.last_activity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shape() {
        let p = UserProgress::default();
        assert_eq!(p.schema_version, PROGRESS_SCHEMA_VERSION);
        assert!(!p.certificate_unlocked);
        assert_eq!(p.total_score, 0);
        assert!(p.badges.is_empty());
        for mission in Mission::ALL {
            assert!(!p.mission(mission).completed);
            assert_eq!(p.mission_progress_percent(mission), 0);
        }
    }

    #[test]
    fn test_progress_percent_steps_of_twenty() {
        let mut m = MissionProgress::default();
        for (k, stage) in Stage::ALL.into_iter().enumerate() {
            assert_eq!(m.progress_percent() as usize, 20 * k);
            m.stage_mut(stage).completed = true;
        }
        assert_eq!(m.progress_percent(), 100);
    }

    #[test]
    fn test_overall_progress_rounds_mean() {
        let mut p = UserProgress::default();
        p.mindfog.intro.completed = true;
        // (20 + 0 + 0) / 3 = 6.67
        assert_eq!(p.overall_progress_percent(), 7);

        p.phisher.intro.completed = true;
        // (20 + 20 + 0) / 3 = 13.33
        assert_eq!(p.overall_progress_percent(), 13);
    }

    #[test]
    fn test_add_badge_dedup() {
        let mut p = UserProgress::default();
        assert!(p.add_badge("Scam Spotter"));
        assert!(!p.add_badge("Scam Spotter"));
        assert!(!p.add_badge(""));
        assert_eq!(p.badges, vec!["Scam Spotter".to_string()]);
    }

    #[test]
    fn test_apply_only_touches_set_fields() {
        let mut p = UserProgress::default();
        let before = p.clone();
        p.apply(ProgressPatch {
            total_score: Some(42),
            badges: Some(vec!["Focus Champion".into()]),
            ..Default::default()
        });
        assert_eq!(p.total_score, 42);
        assert_eq!(p.badges, vec!["Focus Champion".to_string()]);
        assert_eq!(p.mindfog, before.mindfog);
        assert_eq!(p.started_at, before.started_at);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(UserProgress::default()).unwrap();
        assert!(json.get("certificateUnlocked").is_some());
        assert!(json.get("schemaVersion").is_some());
        assert!(json["mindfog"]["game1"].get("attempts").is_some());
        assert!(json["mindfog"].get("badge").is_none());
    }

    #[test]
    fn test_deserializes_browser_timestamps() {
        let json = r#"{"completed":true,"score":80,"completedAt":"2024-05-01T10:20:30.123Z"}"#;
        let g: GameProgress = serde_json::from_str(json).unwrap();
        assert!(g.completed);
        assert_eq!(g.score, 80);
        assert!(g.completed_at.is_some());
        assert_eq!(g.attempts, 0);
    }
}
