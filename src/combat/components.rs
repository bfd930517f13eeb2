//! Encounter components and resources
//!
//! ECS-side implementations of the services an [`Encounter`](crate::encounter::Encounter)
//! consumes: health, play-area bounds, the kinematic body and the cue sink.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::encounter::services::{BodyDriver, Cue, CueSink, HealthProvider, PlayArea};

/// The boss's hit points.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct BossHealth {
    pub current: f32,
    pub max: f32,
}

impl BossHealth {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Apply damage. A boss that is not active (dormant or already defeated) takes none.
    ///
    /// Returns the damage actually applied.
    pub fn apply_damage(&mut self, amount: f32, active: bool) -> f32 {
        if !active || amount <= 0.0 {
            return 0.0;
        }
        let applied = amount.min(self.current);
        self.current -= applied;
        applied
    }

    pub fn reset(&mut self) {
        self.current = self.max;
    }
}

impl HealthProvider for BossHealth {
    fn current_hp(&self) -> f32 {
        self.current
    }

    fn max_hp(&self) -> f32 {
        self.max
    }
}

/// Velocity of a kinematic body, in units per second.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity(pub Vec2);

/// Cues emitted by an encounter this tick, drained into [`CueEvent`](super::events::CueEvent)s.
#[derive(Component, Debug, Clone, Default)]
pub struct CueBuffer(pub Vec<Cue>);

impl CueSink for CueBuffer {
    fn emit(&mut self, cue: Cue) {
        self.0.push(cue);
    }
}

/// Position read from the transform, velocity written to the [`Velocity`] component.
pub struct KinematicBody<'a> {
    pub position: Vec2,
    pub velocity: &'a mut Velocity,
}

impl BodyDriver for KinematicBody<'_> {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity.0 = velocity;
    }
}

/// Tuning of the scripted challenger that fights the boss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengerSettings {
    pub max_hp: f32,
    /// Damage per second dealt to the boss while in reach
    pub dps: f32,
    pub speed: f32,
    /// Horizontal distance the challenger tries to keep from the boss
    pub preferred_distance: f32,
    /// Reach of the challenger's own attacks
    pub reach: f32,
    pub radius: f32,
    /// Seconds of invulnerability after being hit
    pub invulnerability: f32,
}

impl Default for ChallengerSettings {
    fn default() -> Self {
        Self {
            max_hp: 300.0,
            dps: 25.0,
            speed: 6.0,
            preferred_distance: 4.0,
            reach: 6.0,
            radius: 0.5,
            invulnerability: 1.0,
        }
    }
}

/// The player stand-in the boss targets.
#[derive(Component, Debug, Clone)]
pub struct Challenger {
    pub settings: ChallengerSettings,
    pub hp: f32,
    /// Remaining invulnerability after the last hit
    pub invulnerable_for: f32,
    pub hits_taken: u32,
    pub damage_taken: f32,
    pub damage_dealt: f32,
}

impl Challenger {
    pub fn new(settings: ChallengerSettings) -> Self {
        Self {
            hp: settings.max_hp,
            settings,
            invulnerable_for: 0.0,
            hits_taken: 0,
            damage_taken: 0.0,
            damage_dealt: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Take a hit unless still invulnerable from the previous one.
    pub fn take_hit(&mut self, damage: f32) -> bool {
        if !self.is_alive() || self.invulnerable_for > 0.0 || damage <= 0.0 {
            return false;
        }
        let applied = damage.min(self.hp);
        self.hp -= applied;
        self.damage_taken += applied;
        self.hits_taken += 1;
        self.invulnerable_for = self.settings.invulnerability;
        true
    }
}

/// The rectangle funnels and projectiles may occupy.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct ArenaBounds(pub Rect);

impl Default for ArenaBounds {
    fn default() -> Self {
        Self(Rect::new(-20.0, -2.0, 20.0, 30.0))
    }
}

impl PlayArea for ArenaBounds {
    fn bounds(&self) -> Rect {
        self.0
    }
}
