//! Encounter logging
//!
//! Records encounter events for display and post-fight analysis.

use bevy::prelude::*;
use std::fmt::Write as _;

/// A single entry in the encounter log
#[derive(Debug, Clone)]
pub struct EncounterLogEntry {
    /// Timestamp in fight time (seconds since the fight started)
    pub timestamp: f32,
    /// The type of event
    pub event_type: EncounterLogEventType,
    /// Human-readable description of the event
    pub message: String,
}

impl EncounterLogEntry {
    /// `[  12.35] Command: Golem chose Dash`
    pub fn format(&self) -> String {
        format!(
            "[{:7.2}] {}: {}",
            self.timestamp,
            self.event_type.name(),
            self.message
        )
    }
}

/// Types of encounter log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterLogEventType {
    /// Activation, defeat, reset
    Lifecycle,
    /// Command started or finished
    Command,
    /// Damage to the boss or the challenger
    Damage,
    /// Funnel or projectile state changes
    SubActor,
    /// Sound, animation and summon cues
    Cue,
    /// Fight event (start, end, etc.)
    MatchEvent,
}

impl EncounterLogEventType {
    pub fn name(&self) -> &'static str {
        match self {
            EncounterLogEventType::Lifecycle => "Lifecycle",
            EncounterLogEventType::Command => "Command",
            EncounterLogEventType::Damage => "Damage",
            EncounterLogEventType::SubActor => "SubActor",
            EncounterLogEventType::Cue => "Cue",
            EncounterLogEventType::MatchEvent => "MatchEvent",
        }
    }
}

/// The encounter log resource storing all events
#[derive(Resource, Default)]
pub struct EncounterLog {
    /// All log entries in chronological order
    pub entries: Vec<EncounterLogEntry>,
    /// Current fight time
    pub match_time: f32,
}

impl EncounterLog {
    /// Clear the log for a new fight
    pub fn clear(&mut self) {
        self.entries.clear();
        self.match_time = 0.0;
    }

    /// Add a new entry to the log
    pub fn log(&mut self, event_type: EncounterLogEventType, message: String) {
        self.entries.push(EncounterLogEntry {
            timestamp: self.match_time,
            event_type,
            message,
        });
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: EncounterLogEventType) -> Vec<&EncounterLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&EncounterLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    /// Every entry formatted one per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "{}", entry.format());
        }
        out
    }

    /// Write the log to `path`, or to a timestamped file under `fight_logs/`.
    ///
    /// Returns the path written.
    pub fn save_to_file(&self, header: &str, path: Option<&str>) -> Result<String, String> {
        let filename = match path {
            Some(p) => p.to_string(),
            None => {
                std::fs::create_dir_all("fight_logs")
                    .map_err(|e| format!("Failed to create fight_logs directory: {}", e))?;
                let stamp = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default();
                format!("fight_logs/fight_{}.txt", stamp)
            }
        };

        let mut contents = String::new();
        let _ = writeln!(contents, "{}", header);
        let _ = writeln!(contents);
        contents.push_str(&self.render());

        std::fs::write(&filename, contents)
            .map_err(|e| format!("Failed to write {}: {}", filename, e))?;
        Ok(filename)
    }
}
