//! Mission and stage identifiers.

use serde::{Deserialize, Serialize};

/// Error raised when a string does not name a known mission or stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// Unknown mission identifier
    #[error("unknown mission: {0:?} (expected one of mindfog, phisher, aitruth)")]
    Mission(String),

    /// Unknown stage identifier
    #[error("unknown stage: {0:?} (expected one of intro, game1, game2, boss, debrief)")]
    Stage(String),
}

/// One of the three training missions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mission {
    /// Screen-time balance
    Mindfog,
    /// Phishing detection
    Phisher,
    /// AI and misinformation detection
    Aitruth,
}

impl Mission {
    /// All missions, in display order.
    pub const ALL: [Mission; 3] = [Mission::Mindfog, Mission::Phisher, Mission::Aitruth];

    /// Storage identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mission::Mindfog => "mindfog",
            Mission::Phisher => "phisher",
            Mission::Aitruth => "aitruth",
        }
    }

    /// Badge awarded when every stage of the mission is completed.
    pub fn badge(&self) -> &'static str {
        match self {
            Mission::Mindfog => "Focus Champion",
            Mission::Phisher => "Scam Spotter",
            Mission::Aitruth => "Truth Detective",
        }
    }
}

impl std::fmt::Display for Mission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mission {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mindfog" => Ok(Mission::Mindfog),
            "phisher" => Ok(Mission::Phisher),
            "aitruth" => Ok(Mission::Aitruth),
            other => Err(KeyError::Mission(other.to_string())),
        }
    }
}

/// A stage within a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Briefing
    Intro,
    /// First mini-game
    Game1,
    /// Second mini-game
    Game2,
    /// Boss challenge
    Boss,
    /// Wrap-up
    Debrief,
}

impl Stage {
    /// All stages, in play order.
    pub const ALL: [Stage; 5] = [
        Stage::Intro,
        Stage::Game1,
        Stage::Game2,
        Stage::Boss,
        Stage::Debrief,
    ];

    /// Storage identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Intro => "intro",
            Stage::Game1 => "game1",
            Stage::Game2 => "game2",
            Stage::Boss => "boss",
            Stage::Debrief => "debrief",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Route segments use "game-1"; stored records use "game1".
        match s {
            "intro" => Ok(Stage::Intro),
            "game1" | "game-1" => Ok(Stage::Game1),
            "game2" | "game-2" => Ok(Stage::Game2),
            "boss" => Ok(Stage::Boss),
            "debrief" => Ok(Stage::Debrief),
            other => Err(KeyError::Stage(other.to_string())),
        }
    }
}
