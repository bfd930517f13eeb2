//! Boss encounter engine
//!
//! An [`Encounter`] is one boss's complete behavioural state: lifecycle, the active command
//! and its running [`Sequencer`], HP-derived latches, the funnel ring and loose projectiles.
//! It is framework-independent: [`Encounter::tick`] advances everything once per simulation
//! step against the services bundled in an [`EncounterEnv`].
//!
//! ## Tick order
//!
//! 1. Paused: nothing advances, nothing is written.
//! 2. Dormant: check the activation cone, nothing else.
//! 3. Defeat check (terminal, cancels everything in the same tick).
//! 4. Sub-actors advance (funnels, projectiles).
//! 5. The running script advances, or the cooldown counts down, or the boss behaviour picks
//!    the next command.
//! 6. If no command drove the body this tick, the idle routine stops it.
//!
//! The body velocity therefore has exactly one writer per tick.

pub mod command;
pub mod funnels;
pub mod phase;
pub mod projectiles;
pub mod rng;
pub mod selector;
pub mod sequencer;
pub mod services;
pub mod tag;
pub mod testing;

use bevy::prelude::*;
use smallvec::SmallVec;

use crate::bosses::{get_boss_behavior, BossBehavior};
use crate::config::{BossKind, BossRoster, EncounterSettings, DEFAULT_READY_TIME};

use command::Command;
use funnels::FunnelRing;
use phase::{Latches, PhaseSnapshot};
use projectiles::ProjectilePool;
use rng::GameRng;
use selector::Selector;
use sequencer::{Script, Sequencer, SequencerStatus, StepContext};
use services::{Clip, Cue, EncounterEnv};
use tag::{DamageTag, HitboxId, HitboxTable};

/// Encounter lifecycle. `Defeated` is terminal until [`Encounter::reset_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Dormant,
    Active,
    Defeated,
}

/// Selection state a boss behaviour may read and update while choosing.
#[derive(Debug)]
pub struct SelectionState {
    pub latches: Latches,
    /// Actions since the last counter reset (golem charge, wolf ultimate).
    pub total_actions: u32,
    pub selector: Selector,
    /// Seconds the funnels must have circled before the next volley.
    pub ready_time: f32,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            latches: Latches::default(),
            total_actions: 0,
            selector: Selector::default(),
            ready_time: DEFAULT_READY_TIME,
        }
    }
}

/// Snapshot of the world a behaviour decides against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionContext {
    pub hp_ratio: f32,
    pub origin: Vec2,
    pub target: Option<Vec2>,
    pub bounds: Rect,
    pub facing: f32,
    pub last_command: Command,
    pub funnels_in_circle: bool,
    pub since_funnels_returned: f32,
    pub funnel_count: usize,
    pub predicate_timeout: Option<f32>,
}

impl DecisionContext {
    /// Horizontal distance to the target.
    pub fn target_dx(&self) -> Option<f32> {
        self.target.map(|t| (t.x - self.origin.x).abs())
    }
}

/// A chosen command and the script that performs it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub command: Command,
    pub script: Script,
}

impl Decision {
    pub fn new(command: Command, script: Script) -> Self {
        Self { command, script }
    }
}

/// What happened during one tick, for logging and events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub activated: bool,
    pub defeated: bool,
    pub started: Option<Command>,
    pub finished: Option<(Command, SequencerStatus)>,
    pub funnels_left_bounds: SmallVec<[usize; 8]>,
    pub cues: SmallVec<[Cue; 4]>,
}

/// A damaging hitbox as seen by the collision system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitZone {
    pub id: HitboxId,
    pub center: Vec2,
    pub radius: f32,
    pub damage: f32,
}

/// One boss's behavioural state.
#[derive(Component)]
pub struct Encounter {
    behavior: Box<dyn BossBehavior>,
    settings: EncounterSettings,
    lifecycle: Lifecycle,
    command: Command,
    last_command: Command,
    selection: SelectionState,
    sequencer: Option<Sequencer>,
    cooldown: f32,
    hitboxes: HitboxTable,
    funnels: FunnelRing,
    projectiles: ProjectilePool,
    rng: GameRng,
    facing: f32,
}

impl Encounter {
    pub fn new(behavior: Box<dyn BossBehavior>, settings: EncounterSettings, rng: GameRng) -> Self {
        let parts: SmallVec<[tag::Part; 3]> = settings.parts.iter().map(|p| p.part).collect();
        let funnels = FunnelRing::new(behavior.funnel_settings().unwrap_or_else(|| {
            funnels::FunnelSettings {
                count: 0,
                ..Default::default()
            }
        }));
        let facing = facing_sign(settings.start_facing);
        Self {
            behavior,
            lifecycle: Lifecycle::Dormant,
            command: Command::None,
            last_command: Command::None,
            selection: SelectionState::default(),
            sequencer: None,
            cooldown: 0.0,
            hitboxes: HitboxTable::new(&parts),
            funnels,
            projectiles: ProjectilePool::default(),
            rng,
            facing,
            settings,
        }
    }

    /// Build the encounter for a boss from the roster.
    pub fn for_boss(kind: BossKind, roster: &BossRoster, rng: GameRng) -> Self {
        Self::new(
            get_boss_behavior(kind, roster),
            roster.encounter(kind).clone(),
            rng,
        )
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn kind(&self) -> BossKind {
        self.behavior.kind()
    }

    pub fn behavior(&self) -> &dyn BossBehavior {
        self.behavior.as_ref()
    }

    pub fn settings(&self) -> &EncounterSettings {
        &self.settings
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Whether the boss HUD should be shown.
    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    pub fn is_defeated(&self) -> bool {
        self.lifecycle == Lifecycle::Defeated
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn last_command(&self) -> Command {
        self.last_command
    }

    pub fn total_actions(&self) -> u32 {
        self.selection.total_actions
    }

    pub fn latches(&self) -> &Latches {
        &self.selection.latches
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown
    }

    pub fn facing(&self) -> f32 {
        self.facing
    }

    pub fn sequencer(&self) -> Option<&Sequencer> {
        self.sequencer.as_ref()
    }

    pub fn has_running_script(&self) -> bool {
        self.sequencer.is_some()
    }

    pub fn hitboxes(&self) -> &HitboxTable {
        &self.hitboxes
    }

    pub fn funnels(&self) -> &FunnelRing {
        &self.funnels
    }

    pub fn projectiles(&self) -> &ProjectilePool {
        &self.projectiles
    }

    /// Current tag of a hitbox, or `None` if the encounter owns no such hitbox.
    pub fn hitbox_tag(&self, id: HitboxId) -> Option<DamageTag> {
        match id {
            HitboxId::Body => Some(self.hitboxes.body()),
            HitboxId::Part(part) => self.hitboxes.part(part).map(|p| p.tag),
            HitboxId::Funnel(index) => self.funnels.funnel(index).map(|f| f.tag),
            HitboxId::Projectile(id) => self.projectiles.get(id).map(|p| p.tag),
        }
    }

    /// Every hitbox currently able to hurt the player.
    pub fn damaging_hitboxes(&self, origin: Vec2) -> Vec<HitZone> {
        let mut zones = Vec::new();
        if self.lifecycle != Lifecycle::Active {
            return zones;
        }

        if self.hitboxes.body().is_damageable() && self.settings.contact_damage > 0.0 {
            zones.push(HitZone {
                id: HitboxId::Body,
                center: origin,
                radius: self.settings.body_radius,
                damage: self.settings.contact_damage,
            });
        }

        for state in self.hitboxes.parts() {
            if !(state.visible && state.tag.is_damageable()) {
                continue;
            }
            let Some(part) = self.settings.part(state.part) else {
                continue;
            };
            if part.damage <= 0.0 {
                continue;
            }
            zones.push(HitZone {
                id: HitboxId::Part(state.part),
                center: origin + Vec2::new(part.offset[0] * self.facing, part.offset[1]),
                radius: part.radius,
                damage: part.damage,
            });
        }

        let funnel_radius = self.funnels.settings().radius;
        for funnel in self.funnels.funnels() {
            if funnel.active && funnel.tag.is_damageable() && funnel.damage > 0.0 {
                zones.push(HitZone {
                    id: HitboxId::Funnel(funnel.index),
                    center: funnel.position,
                    radius: funnel_radius,
                    damage: funnel.damage,
                });
            }
        }

        for shot in self.projectiles.iter() {
            if shot.tag.is_damageable() && shot.damage > 0.0 {
                zones.push(HitZone {
                    id: HitboxId::Projectile(shot.id),
                    center: shot.position,
                    radius: shot.radius,
                    damage: shot.damage,
                });
            }
        }

        zones
    }

    /// One-shot flags for the save system.
    pub fn snapshot_flags(&self) -> PhaseSnapshot {
        self.selection.latches.snapshot()
    }

    pub fn restore_flags(&mut self, snapshot: &PhaseSnapshot) {
        self.selection.latches.restore(snapshot);
    }

    // ------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------

    /// An attacking funnel left the play area.
    pub fn notify_sub_actor_left_bounds(&mut self, index: usize) -> bool {
        if self.lifecycle != Lifecycle::Active {
            return false;
        }
        self.funnels.notify_left_bounds(index)
    }

    /// Return to `Dormant` for a retry: latches, counters and sub-actors are cleared.
    pub fn reset_state(&mut self) {
        self.lifecycle = Lifecycle::Dormant;
        self.command = Command::None;
        self.last_command = Command::None;
        self.sequencer = None;
        self.cooldown = 0.0;
        self.selection = SelectionState::default();
        self.funnels.clear();
        self.projectiles.clear();
        self.hitboxes.disarm_all();
        self.facing = facing_sign(self.settings.start_facing);
        info!("{} encounter reset", self.kind().name());
    }

    /// Enter the terminal `Defeated` state. Repeated calls do nothing.
    pub fn defeat(&mut self) -> bool {
        if self.lifecycle == Lifecycle::Defeated {
            return false;
        }
        if let Some(sequencer) = self.sequencer.take() {
            debug!(
                "Cancelling '{}' at step {}",
                sequencer.name(),
                sequencer.step_index()
            );
        }
        self.lifecycle = Lifecycle::Defeated;
        self.command = Command::None;
        self.cooldown = 0.0;
        self.funnels.deactivate_all();
        self.projectiles.clear();
        self.hitboxes.disarm_all();
        info!("{} defeated", self.kind().name());
        true
    }

    /// Advance the encounter by one simulation step.
    pub fn tick(&mut self, dt: f32, env: &mut EncounterEnv) -> TickReport {
        let mut report = TickReport::default();

        if env.pause.is_paused() {
            return report;
        }

        match self.lifecycle {
            Lifecycle::Defeated => return report,
            Lifecycle::Dormant => {
                if self.check_activation(env) {
                    self.activate(env, &mut report);
                }
                return report;
            }
            Lifecycle::Active => {}
        }

        if env.health.is_defeated() {
            self.defeat();
            env.body.set_velocity(Vec2::ZERO);
            report.defeated = true;
            return report;
        }

        let origin = env.body.position();
        if self.command.is_none() {
            self.face_target(origin, env.target.target_position());
        }

        let area = env.area.bounds();
        let left = self.funnels.update(dt, origin, area);
        for &index in &left {
            self.funnels.notify_left_bounds(index);
        }
        report.funnels_left_bounds = left;
        self.projectiles.update(dt, area);

        let velocity_written = if self.sequencer.is_some() {
            self.advance_script(dt, env, &mut report)
        } else if self.cooldown > 0.0 {
            self.cooldown = (self.cooldown - dt).max(0.0);
            false
        } else {
            self.select(env, &mut report)
        };

        if self.command.is_none() && !velocity_written {
            env.body.set_velocity(Vec2::ZERO);
        }

        report
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn check_activation(&self, env: &EncounterEnv) -> bool {
        let Some(target) = env.target.target_position() else {
            return false;
        };
        let origin = env.body.position();
        let offset = target - origin;
        if offset.length() > self.settings.activation_range {
            return false;
        }
        let Some(direction) = offset.try_normalize() else {
            return true;
        };
        let cone = self.settings.activation_half_angle_deg.to_radians().cos();
        direction.dot(Vec2::new(self.facing, 0.0)) >= cone
    }

    fn activate(&mut self, env: &mut EncounterEnv, report: &mut TickReport) {
        self.lifecycle = Lifecycle::Active;
        self.hitboxes.set_body(self.behavior.active_body_tag());
        let origin = env.body.position();
        self.funnels.spawn(origin);

        let spawn = Cue::Animation(Clip::Spawn);
        env.cues.emit(spawn);
        report.cues.push(spawn);
        report.activated = true;

        // Hold still while the spawn animation plays.
        self.cooldown = self
            .settings
            .timeline(Clip::Spawn)
            .map_or(0.0, |t| t.duration());
        info!(
            "{} encounter activated with {} funnels",
            self.kind().name(),
            self.funnels.len()
        );
    }

    fn face_target(&mut self, origin: Vec2, target: Option<Vec2>) {
        if let Some(target) = target {
            let dx = target.x - origin.x;
            if dx != 0.0 {
                self.facing = dx.signum();
            }
        }
    }

    /// Returns whether the script wrote the body velocity.
    fn advance_script(&mut self, dt: f32, env: &mut EncounterEnv, report: &mut TickReport) -> bool {
        let Some(sequencer) = self.sequencer.as_mut() else {
            return false;
        };
        let mut ctx = StepContext {
            hitboxes: &mut self.hitboxes,
            funnels: &mut self.funnels,
            projectiles: &mut self.projectiles,
            rng: &mut self.rng,
            env,
            facing: self.facing,
            velocity_written: false,
            emitted: SmallVec::new(),
        };
        let status = sequencer.advance(dt, &mut ctx);
        let velocity_written = ctx.velocity_written;
        report.cues.extend(ctx.emitted);

        if status != SequencerStatus::Running {
            self.finish(status, report);
        }
        velocity_written
    }

    fn finish(&mut self, status: SequencerStatus, report: &mut TickReport) {
        let cooldown = self.sequencer.take().map_or(0.0, |s| s.cooldown());
        self.hitboxes.stow_parts();
        report.finished = Some((self.command, status));
        self.last_command = self.command;
        self.command = Command::None;
        self.cooldown = cooldown;
    }

    /// Ask the behaviour for the next command. Returns whether the new script wrote the
    /// body velocity.
    fn select(&mut self, env: &mut EncounterEnv, report: &mut TickReport) -> bool {
        let ctx = DecisionContext {
            hp_ratio: env.health.hp_ratio(),
            origin: env.body.position(),
            target: env.target.target_position(),
            bounds: env.area.bounds(),
            facing: self.facing,
            last_command: self.last_command,
            funnels_in_circle: !self.funnels.is_empty() && self.funnels.all_in_circle(),
            since_funnels_returned: self.funnels.since_returned(),
            funnel_count: self.funnels.len(),
            predicate_timeout: self.settings.predicate_timeout,
        };

        let Some(decision) = self
            .behavior
            .decide(&ctx, &mut self.selection, &mut self.rng)
        else {
            return false;
        };
        if decision.command.is_none() {
            return false;
        }

        debug!(
            "{} chose {} at {:.0}% HP",
            self.kind().name(),
            decision.command.label(),
            ctx.hp_ratio * 100.0
        );
        self.command = decision.command;
        self.sequencer = Some(Sequencer::new(decision.script));
        report.started = Some(decision.command);

        // Instant leading steps run in the tick the command is chosen.
        self.advance_script(0.0, env, report)
    }
}

fn facing_sign(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::funnels::FunnelState;
    use crate::encounter::testing::FakeWorld;

    fn golem() -> Encounter {
        Encounter::for_boss(BossKind::Golem, &BossRoster::default(), GameRng::from_seed(7))
    }

    #[test]
    fn test_dormant_until_target_in_cone() {
        let mut world = FakeWorld::new();
        let mut encounter = golem();

        // Behind the boss (it faces left).
        world.target = Some(Vec2::new(3.0, 0.0));
        world.tick(&mut encounter, 1.0 / 60.0);
        assert_eq!(encounter.lifecycle(), Lifecycle::Dormant);

        // Too far.
        world.target = Some(Vec2::new(-30.0, 0.0));
        world.tick(&mut encounter, 1.0 / 60.0);
        assert_eq!(encounter.lifecycle(), Lifecycle::Dormant);

        world.target = Some(Vec2::new(-5.0, 0.0));
        let report = world.tick(&mut encounter, 1.0 / 60.0);
        assert!(report.activated);
        assert!(encounter.is_active());
        assert!(report.cues.contains(&Cue::Animation(Clip::Spawn)));
    }

    #[test]
    fn test_paused_tick_changes_nothing() {
        let mut world = FakeWorld::new();
        let mut encounter = golem();
        world.target = Some(Vec2::new(-5.0, 0.0));
        world.paused = true;

        for _ in 0..30 {
            world.tick(&mut encounter, 1.0 / 60.0);
        }
        assert_eq!(encounter.lifecycle(), Lifecycle::Dormant);
        assert_eq!(world.body.writes, 0);
    }

    #[test]
    fn test_defeat_is_terminal_and_idempotent() {
        let mut world = FakeWorld::new();
        let mut encounter = golem();
        world.target = Some(Vec2::new(-5.0, 0.0));
        world.run(&mut encounter, 2.0);
        assert!(encounter.is_active());

        world.health.current = 0.0;
        let report = world.tick(&mut encounter, 1.0 / 60.0);
        assert!(report.defeated);
        assert!(encounter.is_defeated());
        assert!(encounter.hitboxes().all_immune());
        assert!(!encounter.has_running_script());

        assert!(!encounter.defeat());
        let writes = world.body.writes;
        world.health.current = 500.0;
        world.run(&mut encounter, 1.0);
        assert!(encounter.is_defeated());
        assert_eq!(world.body.writes, writes);
    }

    #[test]
    fn test_reset_restores_dormant() {
        let mut world = FakeWorld::new();
        let mut encounter = Encounter::for_boss(
            BossKind::Swordsman,
            &BossRoster::default(),
            GameRng::from_seed(3),
        );
        world.target = Some(Vec2::new(-4.0, 0.0));
        world.run(&mut encounter, 1.0);
        assert!(!encounter.funnels().is_empty());

        encounter.defeat();
        encounter.reset_state();

        assert_eq!(encounter.lifecycle(), Lifecycle::Dormant);
        assert!(encounter.latches().is_empty());
        assert_eq!(encounter.funnels().active_count(), 0);
        assert_eq!(encounter.total_actions(), 0);
        assert_eq!(encounter.funnels().count_in(FunnelState::Waiting), 0);
    }

    #[test]
    fn test_command_implies_running_script() {
        let mut world = FakeWorld::new();
        let mut encounter = golem();
        world.target = Some(Vec2::new(-6.0, 0.0));

        for _ in 0..(60 * 20) {
            world.tick(&mut encounter, 1.0 / 60.0);
            assert_eq!(encounter.command().is_none(), !encounter.has_running_script());
        }
    }

    #[test]
    fn test_flags_round_trip_through_snapshot() {
        let mut encounter = golem();
        let mut snapshot = PhaseSnapshot::default();
        snapshot.fired.push(phase::Latch::Summoned);
        encounter.restore_flags(&snapshot);
        assert_eq!(encounter.snapshot_flags(), snapshot);
    }
}
