//! Digital Defenders core data models.
//!
//! Missions, stages, the learner progress aggregate and user settings.
//! Nothing in this crate performs I/O.

#![warn(missing_docs)]

mod mission;
mod progress;
pub mod settings;

pub use mission::{KeyError, Mission, Stage};
pub use progress::{
    GamePatch, GameProgress, MissionProgress, ProgressPatch, UserProgress,
    PROGRESS_SCHEMA_VERSION,
};
pub use settings::{
    AccessibilityPatch, AccessibilitySettings, FontSize, Language, SettingsPatch, Theme,
    UserSettings,
};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
