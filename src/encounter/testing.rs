//! Scripted fakes of the encounter services.
//!
//! Used by unit tests and by the integration tests under `tests/`.

use bevy::math::{Rect, Vec2};

use super::services::{BodyDriver, Clip, Cue, EncounterEnv, HealthProvider, Pose};
use super::{Encounter, TickReport};
use crate::combat::animation::PoseAnimator;
use crate::config::EncounterSettings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FakeHealth {
    pub current: f32,
    pub max: f32,
}

impl HealthProvider for FakeHealth {
    fn current_hp(&self) -> f32 {
        self.current
    }

    fn max_hp(&self) -> f32 {
        self.max
    }
}

/// Kinematic body that counts velocity writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeBody {
    pub position: Vec2,
    pub velocity: Vec2,
    pub writes: u32,
}

impl BodyDriver for FakeBody {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
        self.writes += 1;
    }
}

/// A whole fake world around one encounter.
pub struct FakeWorld {
    pub health: FakeHealth,
    pub paused: bool,
    pub area: Rect,
    pub pose: Option<Pose>,
    pub target: Option<Vec2>,
    pub cues: Vec<Cue>,
    pub body: FakeBody,
    /// When set, poses follow animation cues instead of `pose` being scripted by hand.
    pub animator: Option<PoseAnimator>,
}

impl Default for FakeWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWorld {
    pub fn new() -> Self {
        Self {
            health: FakeHealth {
                current: 1000.0,
                max: 1000.0,
            },
            paused: false,
            area: Rect::new(-20.0, -2.0, 20.0, 30.0),
            pose: None,
            target: None,
            cues: Vec::new(),
            body: FakeBody::default(),
            animator: None,
        }
    }

    /// A world whose poses are played from the encounter's clip timelines.
    pub fn animated(settings: &EncounterSettings) -> Self {
        let animator = PoseAnimator::new(settings);
        Self {
            health: FakeHealth {
                current: settings.max_hp,
                max: settings.max_hp,
            },
            pose: Some(animator.current_pose()),
            animator: Some(animator),
            ..Self::new()
        }
    }

    pub fn set_hp_ratio(&mut self, ratio: f32) {
        self.health.current = self.health.max * ratio;
    }

    pub fn env(&mut self) -> EncounterEnv<'_> {
        EncounterEnv {
            health: &self.health,
            pause: &self.paused,
            area: &self.area,
            poses: &self.pose,
            target: &self.target,
            cues: &mut self.cues,
            body: &mut self.body,
        }
    }

    /// Move the body by its velocity.
    pub fn integrate(&mut self, dt: f32) {
        self.body.position += self.body.velocity * dt;
    }

    /// One full step: animation, encounter, cue playback, physics.
    pub fn tick(&mut self, encounter: &mut Encounter, dt: f32) -> TickReport {
        if !self.paused {
            if let Some(animator) = self.animator.as_mut() {
                animator.advance(dt);
                self.pose = Some(animator.current_pose());
            }
        }

        let seen = self.cues.len();
        let report = {
            let mut env = self.env();
            encounter.tick(dt, &mut env)
        };

        if let Some(animator) = self.animator.as_mut() {
            let clips: Vec<Clip> = self.cues[seen..]
                .iter()
                .filter_map(|cue| match cue {
                    Cue::Animation(clip) => Some(*clip),
                    _ => None,
                })
                .collect();
            for clip in clips {
                animator.play(clip);
            }
            self.pose = Some(animator.current_pose());
        }

        if !self.paused {
            self.integrate(dt);
        }
        report
    }

    /// Tick at 60 Hz for `secs` seconds, collecting every report.
    pub fn run(&mut self, encounter: &mut Encounter, secs: f32) -> Vec<TickReport> {
        let dt = 1.0 / 60.0;
        let ticks = (secs / dt).round() as usize;
        (0..ticks).map(|_| self.tick(encounter, dt)).collect()
    }
}
