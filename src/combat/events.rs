//! Encounter events
//!
//! Emitted by the encounter systems for logging, audio and the HUD.

use bevy::prelude::*;

use crate::config::BossKind;
use crate::encounter::command::Command;
use crate::encounter::services::Cue;
use crate::encounter::tag::HitboxId;

/// Event fired when a dormant boss notices the challenger
#[derive(Event, Debug, Clone)]
pub struct EncounterActivated {
    pub boss: Entity,
    pub kind: BossKind,
}

/// Event fired when the boss's HP changes
#[derive(Event, Debug, Clone)]
pub struct BossHpChanged {
    pub boss: Entity,
    pub current: f32,
    pub max: f32,
    /// Damage that caused the change
    pub amount: f32,
}

/// Event fired once when the boss is defeated
#[derive(Event, Debug, Clone)]
pub struct BossDefeated {
    pub boss: Entity,
    pub kind: BossKind,
}

/// Event fired when the boss starts a command
#[derive(Event, Debug, Clone)]
pub struct CommandStarted {
    pub boss: Entity,
    pub command: Command,
}

/// Event fired when a command's script ends
#[derive(Event, Debug, Clone)]
pub struct CommandFinished {
    pub boss: Entity,
    pub command: Command,
    /// The script was abandoned on a wait timeout
    pub timed_out: bool,
}

/// Fire-and-forget cue requested by an encounter
#[derive(Event, Debug, Clone)]
pub struct CueEvent {
    pub boss: Entity,
    pub cue: Cue,
}

/// Event fired when a boss hitbox hurts the challenger
#[derive(Event, Debug, Clone)]
pub struct ChallengerHit {
    pub boss: Entity,
    pub challenger: Entity,
    pub hitbox: HitboxId,
    pub damage: f32,
}
