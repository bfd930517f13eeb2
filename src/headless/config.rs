//! JSON configuration parsing for headless mode
//!
//! Parses JSON fight configurations and resolves them against the boss roster.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::combat::components::ChallengerSettings;
use crate::config::{BossKind, BossRoster, BOSS_CONFIG_PATH};

/// Headless fight configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessFightConfig {
    /// Boss to fight (default: "Golem")
    #[serde(default = "default_boss")]
    pub boss: String,
    /// Maximum fight duration in seconds (default: 180)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Random seed for deterministic fight reproduction
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Scripted challenger tuning
    #[serde(default)]
    pub challenger: ChallengerSettings,
    /// Custom output path for the fight log (optional)
    #[serde(default)]
    pub output_path: Option<String>,
    /// Custom output path for the JSON fight result (optional)
    #[serde(default)]
    pub result_path: Option<String>,
    /// Boss roster RON file (default: assets/config/bosses.ron)
    #[serde(default)]
    pub roster_path: Option<String>,
}

fn default_boss() -> String {
    "Golem".to_string()
}

fn default_max_duration() -> f32 {
    180.0
}

impl Default for HeadlessFightConfig {
    fn default() -> Self {
        Self {
            boss: default_boss(),
            max_duration_secs: default_max_duration(),
            random_seed: None,
            challenger: ChallengerSettings::default(),
            output_path: None,
            result_path: None,
            roster_path: None,
        }
    }
}

impl HeadlessFightConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_json(&contents)
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(contents: &str) -> Result<Self, String> {
        let config: HeadlessFightConfig = serde_json::from_str(contents)
            .map_err(|e| format!("Failed to parse JSON: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.boss_kind()?;

        if self.max_duration_secs <= 0.0 {
            return Err("max_duration_secs must be positive".to_string());
        }

        let challenger = &self.challenger;
        if challenger.max_hp <= 0.0 {
            return Err("challenger.max_hp must be positive".to_string());
        }
        if challenger.dps < 0.0 {
            return Err("challenger.dps must not be negative".to_string());
        }
        if challenger.speed <= 0.0 {
            return Err("challenger.speed must be positive".to_string());
        }
        if challenger.reach < challenger.preferred_distance {
            return Err(format!(
                "challenger.reach {} is shorter than preferred_distance {}",
                challenger.reach, challenger.preferred_distance
            ));
        }

        Ok(())
    }

    pub fn boss_kind(&self) -> Result<BossKind, String> {
        BossKind::parse(&self.boss)
    }

    /// Load the roster this fight uses, falling back to the built-in tuning
    pub fn roster(&self) -> BossRoster {
        let path = self.roster_path.as_deref().unwrap_or(BOSS_CONFIG_PATH);
        BossRoster::load_or_default(path)
    }
}
