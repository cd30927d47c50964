//! User settings model.

use serde::{Deserialize, Serialize};

/// Base font size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontSize {
    /// Smaller than default
    Small,
    /// Default size
    #[default]
    Medium,
    /// Larger than default
    Large,
    /// Largest size
    ExtraLarge,
}

/// Interface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    #[default]
    En,
    /// Spanish
    Es,
    /// French
    Fr,
}

/// Colour theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme
    Light,
    /// Dark theme
    Dark,
    /// Follow the operating system
    #[default]
    System,
}

/// Accessibility preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessibilitySettings {
    /// Base font size
    pub font_size: FontSize,
    /// High-contrast colours
    pub high_contrast: bool,
    /// Suppress animations
    pub reduced_motion: bool,
    /// Screen-reader friendly layout
    pub screen_reader_mode: bool,
    /// Keyboard navigation hints
    pub keyboard_navigation: bool,
    /// Sound effects and narration
    pub audio_enabled: bool,
    /// Autoplay videos
    pub autoplay: bool,
}

impl Default for AccessibilitySettings {
    fn default() -> Self {
        Self {
            font_size: FontSize::Medium,
            high_contrast: false,
            reduced_motion: false,
            screen_reader_mode: false,
            keyboard_navigation: true,
            audio_enabled: true,
            autoplay: false,
        }
    }
}

/// All user-facing preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    /// Accessibility preferences
    pub accessibility: AccessibilitySettings,
    /// Interface language
    pub language: Language,
    /// Colour theme
    pub theme: Theme,
    /// Reminder notifications
    pub notifications: bool,
    /// Anonymous usage data collection
    pub data_collection: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            accessibility: AccessibilitySettings::default(),
            language: Language::En,
            theme: Theme::System,
            notifications: true,
            data_collection: false,
        }
    }
}

/// Partial update of the accessibility block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessibilityPatch {
    /// Base font size
    pub font_size: Option<FontSize>,
    /// High-contrast colours
    pub high_contrast: Option<bool>,
    /// Suppress animations
    pub reduced_motion: Option<bool>,
    /// Screen-reader friendly layout
    pub screen_reader_mode: Option<bool>,
    /// Keyboard navigation hints
    pub keyboard_navigation: Option<bool>,
    /// Sound effects and narration
    pub audio_enabled: Option<bool>,
    /// Autoplay videos
    pub autoplay: Option<bool>,
}

/// Partial update of the settings. The accessibility block is merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    /// Accessibility preferences
    pub accessibility: Option<AccessibilityPatch>,
    /// Interface language
    pub language: Option<Language>,
    /// Colour theme
    pub theme: Option<Theme>,
    /// Reminder notifications
    pub notifications: Option<bool>,
    /// Anonymous usage data collection
    pub data_collection: Option<bool>,
}

impl AccessibilitySettings {
    /// Merge a patch into these settings.
    pub fn apply(&mut self, patch: AccessibilityPatch) {
        if let Some(v) = patch.font_size {
            self.font_size = v;
        }
        if let Some(v) = patch.high_contrast {
            self.high_contrast = v;
        }
        if let Some(v) = patch.reduced_motion {
            self.reduced_motion = v;
        }
        if let Some(v) = patch.screen_reader_mode {
            self.screen_reader_mode = v;
        }
        if let Some(v) = patch.keyboard_navigation {
            self.keyboard_navigation = v;
        }
        if let Some(v) = patch.audio_enabled {
            self.audio_enabled = v;
        }
        if let Some(v) = patch.autoplay {
            self.autoplay = v;
        }
    }
}

impl UserSettings {
    /// Merge a patch into these settings.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(a11y) = patch.accessibility {
            self.accessibility.apply(a11y);
        }
        if let Some(v) = patch.language {
            self.language = v;
        }
        if let Some(v) = patch.theme {
            self.theme = v;
        }
        if let Some(v) = patch.notifications {
            self.notifications = v;
        }
        if let Some(v) = patch.data_collection {
            self.data_collection = v;
        }
    }
}
