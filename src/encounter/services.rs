//! Collaborator contracts
//!
//! The engine never reaches into global state. Everything it needs from the surrounding
//! game is passed into [`Encounter::tick`](super::Encounter::tick) through an
//! [`EncounterEnv`], so the same engine runs under the ECS glue and under scripted fakes
//! in tests.

use bevy::math::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A displayed body pose (animation frame marker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pose(pub u16);

/// Animation clips the engine may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clip {
    Idle,
    Spawn,
    Swing,
    Walk,
    Dash,
    Throw,
    Summon,
    HammerReady,
    Slam,
    Howl,
    ChargedHowl,
}

/// Sound effects the engine may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sound {
    Swing,
    FunnelLaunch,
    RockThrow,
    Slam,
    ChargeLoop,
    Shoot,
    Rain,
    Howl,
}

/// Fire-and-forget requests emitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cue {
    Sound(Sound),
    Animation(Clip),
    /// Spawn minions near the given point. Minion behaviour lives outside the engine.
    Summon { count: u32, at: Vec2 },
}

/// Source of the boss's hit points.
pub trait HealthProvider {
    fn current_hp(&self) -> f32;
    fn max_hp(&self) -> f32;

    fn is_defeated(&self) -> bool {
        self.current_hp() <= 0.0
    }

    /// HP as a ratio in 0.0..=1.0
    fn hp_ratio(&self) -> f32 {
        let max = self.max_hp();
        if max > 0.0 {
            (self.current_hp() / max).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Global pause service. While paused nothing advances and no velocity is written.
pub trait PauseQuery {
    fn is_paused(&self) -> bool;
}

/// Spatial bounds of the active play area.
pub trait PlayArea {
    fn bounds(&self) -> Rect;

    fn contains(&self, point: Vec2) -> bool {
        self.bounds().contains(point)
    }
}

/// Read-only view of the animation system.
pub trait PoseSource {
    fn current_pose(&self) -> Option<Pose>;
}

/// Audio and animation cue playback.
pub trait CueSink {
    fn emit(&mut self, cue: Cue);
}

/// The boss's kinematic body.
pub trait BodyDriver {
    fn position(&self) -> Vec2;
    fn set_velocity(&mut self, velocity: Vec2);
}

/// Where the player currently is, if anywhere.
pub trait TargetQuery {
    fn target_position(&self) -> Option<Vec2>;
}

/// Everything one tick of an encounter may consult or drive.
pub struct EncounterEnv<'a> {
    pub health: &'a dyn HealthProvider,
    pub pause: &'a dyn PauseQuery,
    pub area: &'a dyn PlayArea,
    pub poses: &'a dyn PoseSource,
    pub target: &'a dyn TargetQuery,
    pub cues: &'a mut dyn CueSink,
    pub body: &'a mut dyn BodyDriver,
}

impl CueSink for Vec<Cue> {
    fn emit(&mut self, cue: Cue) {
        self.push(cue);
    }
}

impl PlayArea for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

impl PauseQuery for bool {
    fn is_paused(&self) -> bool {
        *self
    }
}

impl PoseSource for Option<Pose> {
    fn current_pose(&self) -> Option<Pose> {
        *self
    }
}

impl TargetQuery for Option<Vec2> {
    fn target_position(&self) -> Option<Vec2> {
        *self
    }
}
