//! Progress Tracking
//!
//! Mission progress, badges and certificate unlock, plus the settings, daily
//! quiz and profile stores that share the same key-value storage.

#![warn(missing_docs)]

pub mod error;
pub mod tracker;
pub mod settings;
pub mod quiz;
pub mod profile;
mod schema;

pub use error::{ProgressError, Result};
pub use tracker::{ProgressTracker, BasicProgressTracker, TrackerConfig};
pub use settings::SettingsStore;
pub use quiz::DailyQuiz;
pub use profile::{Profile, UserDataExport, export_file_name};

/// Storage key of the progress aggregate.
pub const PROGRESS_KEY: &str = "digital-defenders-progress";

/// Storage key of the user settings.
pub const SETTINGS_KEY: &str = "digital-defenders-settings";

/// Storage key of the learner display name.
pub const NAME_KEY: &str = "digital-defenders-name";
