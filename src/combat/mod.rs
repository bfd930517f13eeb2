//! Encounter glue
//!
//! Runs [`Encounter`]s inside the ECS:
//! - Boss and challenger components, and the resources backing the engine's services
//! - The fixed-step system chain (animation, encounter tick, movement, damage)
//! - Encounter events and the encounter log

use bevy::prelude::*;

pub mod animation;
pub mod components;
pub mod events;
pub mod log;
pub mod systems;

use crate::config::{BossKind, BossRoster};
use crate::encounter::rng::GameRng;
use crate::encounter::services::PauseQuery;
use crate::encounter::Encounter;

use animation::PoseAnimator;
use components::*;
use events::*;
use systems::*;

/// Fixed simulation rate the encounter systems step at
pub const SIMULATION_HZ: f64 = 60.0;

/// Plugin for the encounter systems
pub struct EncounterPlugin;

impl Plugin for EncounterPlugin {
    fn build(&self, app: &mut App) {
        app
            // Encounter events
            .add_event::<EncounterActivated>()
            .add_event::<BossHpChanged>()
            .add_event::<BossDefeated>()
            .add_event::<CommandStarted>()
            .add_event::<CommandFinished>()
            .add_event::<CueEvent>()
            .add_event::<ChallengerHit>()
            // Resources
            .init_resource::<log::EncounterLog>()
            .init_resource::<SimulationSpeed>()
            .init_resource::<ArenaBounds>()
            .insert_resource(Time::<Fixed>::from_hz(SIMULATION_HZ))
            // Systems
            .add_systems(FixedUpdate, (
                advance_fight_clock,
                advance_animations,
                tick_encounters,
                integrate_velocity,
                drive_challengers,
                apply_contact_damage,
                log_boss_hp,
            ).chain());
    }
}

/// Controls the speed of the encounter simulation
#[derive(Resource)]
pub struct SimulationSpeed {
    /// Speed multiplier (0.0 = paused, 0.5 = half speed, 1.0 = normal, 2.0 = double, 3.0 = triple)
    pub multiplier: f32,
}

impl Default for SimulationSpeed {
    fn default() -> Self {
        Self { multiplier: 1.0 }
    }
}

impl SimulationSpeed {
    pub fn pause(&mut self) {
        self.multiplier = 0.0;
    }

    pub fn half_speed(&mut self) {
        self.multiplier = 0.5;
    }

    pub fn normal_speed(&mut self) {
        self.multiplier = 1.0;
    }

    pub fn double_speed(&mut self) {
        self.multiplier = 2.0;
    }

    pub fn triple_speed(&mut self) {
        self.multiplier = 3.0;
    }

    pub fn is_paused(&self) -> bool {
        self.multiplier == 0.0
    }
}

impl PauseQuery for SimulationSpeed {
    fn is_paused(&self) -> bool {
        SimulationSpeed::is_paused(self)
    }
}

/// Spawn a dormant boss at `position`.
pub fn spawn_boss(
    commands: &mut Commands,
    kind: BossKind,
    roster: &BossRoster,
    position: Vec2,
    rng: GameRng,
) -> Entity {
    let settings = roster.encounter(kind);
    commands
        .spawn((
            Name::new(kind.name()),
            Encounter::for_boss(kind, roster, rng),
            BossHealth::new(settings.max_hp),
            PoseAnimator::new(settings),
            Velocity::default(),
            CueBuffer::default(),
            Transform::from_xyz(position.x, position.y, 0.0),
        ))
        .id()
}

/// Spawn the scripted challenger at `position`.
pub fn spawn_challenger(
    commands: &mut Commands,
    settings: ChallengerSettings,
    position: Vec2,
) -> Entity {
    commands
        .spawn((
            Name::new("Challenger"),
            Challenger::new(settings),
            Velocity::default(),
            Transform::from_xyz(position.x, position.y, 0.0),
        ))
        .id()
}

/// Put a boss back to its dormant starting state for a retry.
pub fn reset_boss(
    encounter: &mut Encounter,
    health: &mut BossHealth,
    animator: &mut PoseAnimator,
    transform: &mut Transform,
    home: Vec2,
) {
    encounter.reset_state();
    health.reset();
    animator.stop();
    transform.translation = home.extend(transform.translation.z);
}
