//! Attack sequencer
//!
//! An attack is a [`Script`]: an ordered list of [`Step`]s authored by a boss behaviour.
//! The [`Sequencer`] runs one script as an explicit resumable state object (a step index
//! plus the reason it is currently suspended), so the encounter can advance it once per
//! tick and drop it at any suspension point.
//!
//! ## Step kinds
//!
//! - `Wait`: fixed duration
//! - `WaitUntil`: poll a [`Predicate`] every tick, with an optional timeout
//! - `WaitFor`: a [`Barrier`] over the funnel ring, with an optional timeout
//! - `Drive`: write a velocity every tick until a predicate holds
//! - `Do`: an instantaneous [`Action`]
//! - `Launch`: release waiting funnels one per stagger interval
//!
//! Consecutive instantaneous steps all run in the same tick. A timer entered in one tick
//! starts counting on the next; predicates and barriers are checked as soon as they are
//! entered.
//!
//! ## Child watchers
//!
//! `Action::BindPose` attaches a watcher that maps the displayed body pose to a part's
//! visibility and tag. Watchers belong to the sequencer and disappear with it.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::funnels::{FunnelPattern, FunnelRing, RingState};
use super::projectiles::{Motion, ProjectileKind, ProjectilePool, ProjectileSpec};
use super::rng::GameRng;
use super::services::{Clip, Cue, EncounterEnv, Pose, Sound};
use super::tag::{DamageTag, HitboxTable, Part};

/// Remaining time below which a timer counts as elapsed.
const TIMER_EPSILON: f32 = 1e-6;

/// External conditions a script can wait on.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// The displayed body pose equals this one.
    PoseIs(Pose),
    /// The target is within this horizontal distance of the body.
    TargetWithin(f32),
    /// The body is within `tolerance` of `x`.
    ReachedX { x: f32, tolerance: f32 },
}

/// Conditions over the whole funnel ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Barrier {
    /// No funnel is still moving to its waiting spot.
    FunnelsSettled,
    /// Every funnel is back in the circle.
    FunnelsInCircle,
}

/// Where a driven move heads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Heading {
    Target,
    X(f32),
}

/// A velocity request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Movement {
    Stop,
    /// Horizontal move toward the target at `speed`.
    TowardTarget(f32),
}

/// Where a lobbed shot comes down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Landing {
    AtX(f32),
    AtTarget,
}

/// How a shot's launch velocity is derived when it spawns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aim {
    /// Slide along the ground toward the target.
    Crawl { speed: f32 },
    /// Ballistic arc peaking `peak` above the launch point and landing back at launch height.
    Lob { landing: Landing, peak: f32, gravity: f32 },
    /// Drop from the top of the play area near the target.
    Rain { spread: f32, speed: f32 },
    /// Descend `drop` units while moving `forward`, then fly level.
    LevelOff { forward: f32, drop: f32, speed: f32 },
    /// Shot at `degrees` from the facing direction (0 = straight ahead, 90 = up). Falls
    /// under `gravity` when it is positive, flies straight otherwise.
    Fan { degrees: f32, speed: f32, gravity: f32 },
}

/// A projectile to spawn, resolved against the world at spawn time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotPlan {
    pub kind: ProjectileKind,
    /// Spawn offset from the boss origin. `x` is mirrored to the facing side.
    pub offset: Vec2,
    pub aim: Aim,
    pub damage: f32,
    pub radius: f32,
    pub lifetime: Option<f32>,
}

/// Maps displayed poses to a part's visibility and, optionally, its tag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoseBinding {
    pub visible_on: SmallVec<[Pose; 4]>,
    /// Poses on which the part is Damageable. `None` leaves the tag alone.
    pub damageable_on: Option<SmallVec<[Pose; 4]>>,
}

/// Instantaneous state mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetTag(Part, DamageTag),
    SetBodyTag(DamageTag),
    Show(Part),
    Hide(Part),
    BindPose(Part, PoseBinding),
    Unbind(Part),
    Move(Movement),
    Spawn(ShotPlan),
    Sound(Sound),
    Animate(Clip),
    Summon { count: u32 },
    PositionFunnels(FunnelPattern),
}

/// One step of a script.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Wait(f32),
    WaitUntil {
        until: Predicate,
        timeout: Option<f32>,
    },
    WaitFor {
        barrier: Barrier,
        timeout: Option<f32>,
    },
    Drive {
        heading: Heading,
        speed: f32,
        until: Predicate,
        timeout: Option<f32>,
    },
    Do(Action),
    Launch {
        stagger: f32,
        damage: f32,
    },
}

/// An authored attack.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub name: &'static str,
    pub steps: Vec<Step>,
    /// Cooldown started when the script ends.
    pub cooldown: f32,
}

impl Script {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
            cooldown: 0.0,
        }
    }

    pub fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn act(self, action: Action) -> Self {
        self.then(Step::Do(action))
    }

    pub fn wait(self, secs: f32) -> Self {
        self.then(Step::Wait(secs))
    }

    pub fn wait_until(self, until: Predicate, timeout: Option<f32>) -> Self {
        self.then(Step::WaitUntil { until, timeout })
    }

    pub fn wait_for(self, barrier: Barrier, timeout: Option<f32>) -> Self {
        self.then(Step::WaitFor { barrier, timeout })
    }

    pub fn cooldown(mut self, secs: f32) -> Self {
        self.cooldown = secs;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Mutable view of the encounter handed to a running script.
pub struct StepContext<'a, 'e> {
    pub hitboxes: &'a mut HitboxTable,
    pub funnels: &'a mut FunnelRing,
    pub projectiles: &'a mut ProjectilePool,
    pub rng: &'a mut GameRng,
    pub env: &'a mut EncounterEnv<'e>,
    /// +1.0 facing right, -1.0 facing left.
    pub facing: f32,
    /// Set once anything wrote the body velocity this tick.
    pub velocity_written: bool,
    /// Cues emitted this tick, mirrored for logging.
    pub emitted: SmallVec<[Cue; 4]>,
}

impl StepContext<'_, '_> {
    fn origin(&self) -> Vec2 {
        self.env.body.position()
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.env.body.set_velocity(velocity);
        self.velocity_written = true;
    }

    fn emit(&mut self, cue: Cue) {
        self.env.cues.emit(cue);
        self.emitted.push(cue);
    }

    fn check(&self, predicate: &Predicate) -> bool {
        let origin = self.origin();
        match predicate {
            Predicate::PoseIs(pose) => self.env.poses.current_pose() == Some(*pose),
            Predicate::TargetWithin(distance) => self
                .env
                .target
                .target_position()
                .is_some_and(|t| (t.x - origin.x).abs() <= *distance),
            Predicate::ReachedX { x, tolerance } => (origin.x - x).abs() <= *tolerance,
        }
    }

    fn barrier_open(&self, barrier: Barrier) -> bool {
        match barrier {
            Barrier::FunnelsSettled => self.funnels.state() != RingState::Positioning,
            Barrier::FunnelsInCircle => self.funnels.all_in_circle(),
        }
    }

    fn drive_velocity(&self, heading: Heading, speed: f32) -> Vec2 {
        let origin = self.origin();
        let goal_x = match heading {
            Heading::Target => self.env.target.target_position().map(|t| t.x),
            Heading::X(x) => Some(x),
        };
        match goal_x {
            Some(x) if x != origin.x => Vec2::new((x - origin.x).signum() * speed, 0.0),
            _ => Vec2::ZERO,
        }
    }

    fn resolve_shot(&mut self, plan: &ShotPlan) -> ProjectileSpec {
        let body = self.origin();
        let origin = body + Vec2::new(plan.offset.x * self.facing, plan.offset.y);
        let target = self.env.target.target_position();
        let bounds = self.env.area.bounds();

        let (origin, velocity, motion) = match plan.aim {
            Aim::Crawl { speed } => {
                let dir = match target {
                    Some(t) if t.x < origin.x => -1.0,
                    Some(_) => 1.0,
                    None => self.facing,
                };
                (origin, Vec2::new(dir * speed, 0.0), Motion::Linear)
            }
            Aim::Lob {
                landing,
                peak,
                gravity,
            } => {
                let landing_x = match landing {
                    Landing::AtX(x) => x,
                    Landing::AtTarget => target.map_or(origin.x, |t| t.x),
                };
                let vy = (2.0 * gravity.max(0.0) * peak.max(0.0)).sqrt();
                let flight = if gravity > 0.0 { 2.0 * vy / gravity } else { 0.0 };
                let vx = if flight > 0.0 {
                    (landing_x - origin.x) / flight
                } else {
                    0.0
                };
                (origin, Vec2::new(vx, vy), Motion::Ballistic { gravity })
            }
            Aim::Rain { spread, speed } => {
                let center = target.map_or(origin.x, |t| t.x);
                let x = (center + self.rng.random_range(-spread, spread))
                    .clamp(bounds.min.x, bounds.max.x);
                (Vec2::new(x, bounds.max.y), Vec2::new(0.0, -speed), Motion::Linear)
            }
            Aim::LevelOff {
                forward,
                drop,
                speed,
            } => {
                let dir = Vec2::new(forward * self.facing, -drop)
                    .try_normalize()
                    .unwrap_or(Vec2::X * self.facing);
                (
                    origin,
                    dir * speed,
                    Motion::LevelOff {
                        height: origin.y - drop,
                        speed,
                    },
                )
            }
            Aim::Fan {
                degrees,
                speed,
                gravity,
            } => {
                let radians = degrees.to_radians();
                let dir = Vec2::new(radians.cos() * self.facing, radians.sin());
                let motion = if gravity > 0.0 {
                    Motion::Ballistic { gravity }
                } else {
                    Motion::Linear
                };
                (origin, dir * speed, motion)
            }
        };

        ProjectileSpec {
            kind: plan.kind,
            origin,
            velocity,
            motion,
            damage: plan.damage,
            radius: plan.radius,
            lifetime: plan.lifetime,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Suspension {
    Timer { remaining: f32 },
    Predicate { waited: f32 },
    Barrier { waited: f32 },
    Drive { waited: f32 },
    Launch {
        queue: SmallVec<[usize; 8]>,
        until_next: f32,
        shared_point: Vec2,
    },
}

enum Poll {
    Ready,
    Pending(Suspension),
    TimedOut,
}

/// Outcome of one tick of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerStatus {
    Running,
    Finished,
    /// A bounded wait expired; the script was abandoned.
    TimedOut,
}

/// Runs one script.
#[derive(Debug, Clone)]
pub struct Sequencer {
    script: Script,
    index: usize,
    suspension: Option<Suspension>,
    watchers: SmallVec<[(Part, PoseBinding); 2]>,
    elapsed: f32,
}

impl Sequencer {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            index: 0,
            suspension: None,
            watchers: SmallVec::new(),
            elapsed: 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.script.name
    }

    pub fn cooldown(&self) -> f32 {
        self.script.cooldown
    }

    pub fn step_index(&self) -> usize {
        self.index
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Human-readable suspension reason, for debugging overlays.
    pub fn suspended_on(&self) -> &'static str {
        match self.suspension {
            None => "running",
            Some(Suspension::Timer { .. }) => "timer",
            Some(Suspension::Predicate { .. }) => "predicate",
            Some(Suspension::Barrier { .. }) => "barrier",
            Some(Suspension::Drive { .. }) => "drive",
            Some(Suspension::Launch { .. }) => "launch",
        }
    }

    /// Advance the script by one tick.
    pub fn advance(&mut self, dt: f32, ctx: &mut StepContext) -> SequencerStatus {
        self.elapsed += dt;

        if let Some(suspension) = self.suspension.take() {
            match self.resume(suspension, dt, ctx) {
                Poll::Ready => self.index += 1,
                Poll::Pending(suspension) => {
                    self.suspension = Some(suspension);
                    self.run_watchers(ctx);
                    return SequencerStatus::Running;
                }
                Poll::TimedOut => return self.time_out(ctx),
            }
        }

        loop {
            let Some(step) = self.script.steps.get(self.index).cloned() else {
                return SequencerStatus::Finished;
            };
            match self.enter(&step, ctx) {
                Poll::Ready => self.index += 1,
                Poll::Pending(suspension) => {
                    self.suspension = Some(suspension);
                    break;
                }
                Poll::TimedOut => return self.time_out(ctx),
            }
        }

        self.run_watchers(ctx);
        SequencerStatus::Running
    }

    fn time_out(&mut self, ctx: &mut StepContext) -> SequencerStatus {
        warn!(
            "Attack '{}' abandoned: step {} waited past its timeout",
            self.script.name, self.index
        );
        if matches!(self.script.steps.get(self.index), Some(Step::Drive { .. })) {
            ctx.set_velocity(Vec2::ZERO);
        }
        SequencerStatus::TimedOut
    }

    fn enter(&mut self, step: &Step, ctx: &mut StepContext) -> Poll {
        match step {
            Step::Wait(secs) => {
                if *secs <= 0.0 {
                    Poll::Ready
                } else {
                    Poll::Pending(Suspension::Timer { remaining: *secs })
                }
            }
            Step::WaitUntil { until, .. } => {
                if ctx.check(until) {
                    Poll::Ready
                } else {
                    Poll::Pending(Suspension::Predicate { waited: 0.0 })
                }
            }
            Step::WaitFor { barrier, .. } => {
                if ctx.barrier_open(*barrier) {
                    Poll::Ready
                } else {
                    Poll::Pending(Suspension::Barrier { waited: 0.0 })
                }
            }
            Step::Drive {
                heading,
                speed,
                until,
                ..
            } => {
                if ctx.check(until) {
                    ctx.set_velocity(Vec2::ZERO);
                    Poll::Ready
                } else {
                    let velocity = ctx.drive_velocity(*heading, *speed);
                    ctx.set_velocity(velocity);
                    Poll::Pending(Suspension::Drive { waited: 0.0 })
                }
            }
            Step::Do(action) => {
                self.apply(action, ctx);
                Poll::Ready
            }
            Step::Launch { stagger, damage } => {
                let mut queue = ctx.funnels.waiting_indices();
                if queue.is_empty() {
                    return Poll::Ready;
                }
                queue.reverse();
                let origin = ctx.origin();
                let bounds = ctx.env.area.bounds();
                let shared_point = Vec2::new(ctx.rng.random_range(bounds.min.x, bounds.max.x), origin.y);
                let mut until_next = 0.0;
                Self::launch_due(&mut queue, &mut until_next, *stagger, *damage, shared_point, ctx);
                if queue.is_empty() {
                    Poll::Ready
                } else {
                    Poll::Pending(Suspension::Launch {
                        queue,
                        until_next,
                        shared_point,
                    })
                }
            }
        }
    }

    fn resume(&mut self, suspension: Suspension, dt: f32, ctx: &mut StepContext) -> Poll {
        let step = self.script.steps.get(self.index).cloned();
        match (suspension, step) {
            (Suspension::Timer { remaining }, _) => {
                let remaining = remaining - dt;
                if remaining <= TIMER_EPSILON {
                    Poll::Ready
                } else {
                    Poll::Pending(Suspension::Timer { remaining })
                }
            }
            (Suspension::Predicate { waited }, Some(Step::WaitUntil { until, timeout })) => {
                let waited = waited + dt;
                if ctx.check(&until) {
                    Poll::Ready
                } else if timeout.is_some_and(|limit| waited >= limit) {
                    Poll::TimedOut
                } else {
                    Poll::Pending(Suspension::Predicate { waited })
                }
            }
            (Suspension::Barrier { waited }, Some(Step::WaitFor { barrier, timeout })) => {
                let waited = waited + dt;
                if ctx.barrier_open(barrier) {
                    Poll::Ready
                } else if timeout.is_some_and(|limit| waited >= limit) {
                    Poll::TimedOut
                } else {
                    Poll::Pending(Suspension::Barrier { waited })
                }
            }
            (
                Suspension::Drive { waited },
                Some(Step::Drive {
                    heading,
                    speed,
                    until,
                    timeout,
                }),
            ) => {
                let waited = waited + dt;
                if ctx.check(&until) {
                    ctx.set_velocity(Vec2::ZERO);
                    Poll::Ready
                } else if timeout.is_some_and(|limit| waited >= limit) {
                    Poll::TimedOut
                } else {
                    let velocity = ctx.drive_velocity(heading, speed);
                    ctx.set_velocity(velocity);
                    Poll::Pending(Suspension::Drive { waited })
                }
            }
            (
                Suspension::Launch {
                    mut queue,
                    until_next,
                    shared_point,
                },
                Some(Step::Launch { stagger, damage }),
            ) => {
                let mut until_next = until_next - dt;
                Self::launch_due(&mut queue, &mut until_next, stagger, damage, shared_point, ctx);
                if queue.is_empty() {
                    Poll::Ready
                } else {
                    Poll::Pending(Suspension::Launch {
                        queue,
                        until_next,
                        shared_point,
                    })
                }
            }
            (suspension, step) => {
                warn!(
                    "Attack '{}' step {} is {:?} but was suspended as {:?}; skipping it",
                    self.script.name, self.index, step, suspension
                );
                Poll::Ready
            }
        }
    }

    /// Launch every queued funnel whose stagger slot has come up. `queue` is in reverse
    /// launch order so the next funnel is popped from the back.
    fn launch_due(
        queue: &mut SmallVec<[usize; 8]>,
        until_next: &mut f32,
        stagger: f32,
        damage: f32,
        shared_point: Vec2,
        ctx: &mut StepContext,
    ) {
        let origin = ctx.origin();
        let target = ctx.env.target.target_position();
        let bounds = ctx.env.area.bounds();
        while *until_next <= TIMER_EPSILON {
            let Some(index) = queue.pop() else {
                break;
            };
            let direction = ctx.funnels.aim(index, origin, target, shared_point, bounds, ctx.rng);
            if ctx.funnels.launch(index, direction, damage) {
                ctx.emit(Cue::Sound(Sound::FunnelLaunch));
            }
            if stagger > 0.0 {
                *until_next += stagger;
            }
        }
    }

    fn apply(&mut self, action: &Action, ctx: &mut StepContext) {
        match action {
            Action::SetTag(part, tag) => {
                if !ctx.hitboxes.set_part_tag(*part, *tag) {
                    debug!("'{}' has no {} to tag", self.script.name, part.name());
                }
            }
            Action::SetBodyTag(tag) => ctx.hitboxes.set_body(*tag),
            Action::Show(part) => {
                ctx.hitboxes.set_part_visible(*part, true);
            }
            Action::Hide(part) => {
                ctx.hitboxes.set_part_visible(*part, false);
            }
            Action::BindPose(part, binding) => {
                self.watchers.retain(|(p, _)| p != part);
                self.watchers.push((*part, binding.clone()));
            }
            Action::Unbind(part) => {
                self.watchers.retain(|(p, _)| p != part);
            }
            Action::Move(movement) => {
                let velocity = match movement {
                    Movement::Stop => Vec2::ZERO,
                    Movement::TowardTarget(speed) => ctx.drive_velocity(Heading::Target, *speed),
                };
                ctx.set_velocity(velocity);
            }
            Action::Spawn(plan) => {
                let spec = ctx.resolve_shot(plan);
                ctx.projectiles.spawn(spec);
            }
            Action::Sound(sound) => ctx.emit(Cue::Sound(*sound)),
            Action::Animate(clip) => ctx.emit(Cue::Animation(*clip)),
            Action::Summon { count } => {
                let at = ctx.origin();
                ctx.emit(Cue::Summon { count: *count, at });
            }
            Action::PositionFunnels(pattern) => {
                let origin = ctx.origin();
                let target = ctx.env.target.target_position();
                let bounds = ctx.env.area.bounds();
                if !ctx.funnels.begin_positioning(*pattern, origin, target, bounds, ctx.rng) {
                    debug!(
                        "'{}' skipped funnel positioning (ring busy or empty)",
                        self.script.name
                    );
                }
            }
        }
    }

    fn run_watchers(&self, ctx: &mut StepContext) {
        let Some(pose) = ctx.env.poses.current_pose() else {
            return;
        };
        for (part, binding) in &self.watchers {
            ctx.hitboxes
                .set_part_visible(*part, binding.visible_on.contains(&pose));
            if let Some(damageable) = &binding.damageable_on {
                let tag = if damageable.contains(&pose) {
                    DamageTag::Damageable
                } else {
                    DamageTag::Immune
                };
                ctx.hitboxes.set_part_tag(*part, tag);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encounter::funnels::FunnelSettings;
    use crate::encounter::testing::FakeWorld;
    use smallvec::smallvec;

    struct Rig {
        world: FakeWorld,
        hitboxes: HitboxTable,
        funnels: FunnelRing,
        projectiles: ProjectilePool,
        rng: GameRng,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                world: FakeWorld::new(),
                hitboxes: HitboxTable::new(&[Part::Sword, Part::Arm]),
                funnels: FunnelRing::new(FunnelSettings::default()),
                projectiles: ProjectilePool::default(),
                rng: GameRng::from_seed(1),
            }
        }

        fn tick(&mut self, seq: &mut Sequencer, dt: f32) -> SequencerStatus {
            let mut env = self.world.env();
            let mut ctx = StepContext {
                hitboxes: &mut self.hitboxes,
                funnels: &mut self.funnels,
                projectiles: &mut self.projectiles,
                rng: &mut self.rng,
                env: &mut env,
                facing: 1.0,
                velocity_written: false,
                emitted: SmallVec::new(),
            };
            seq.advance(dt, &mut ctx)
        }
    }

    #[test]
    fn test_instant_steps_run_in_one_tick() {
        let mut rig = Rig::new();
        let script = Script::new("instant")
            .act(Action::Show(Part::Sword))
            .act(Action::SetTag(Part::Sword, DamageTag::Damageable))
            .act(Action::Sound(Sound::Swing));
        let mut seq = Sequencer::new(script);

        assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::Finished);
        assert!(rig.hitboxes.part(Part::Sword).unwrap().tag.is_damageable());
        assert_eq!(rig.world.cues, vec![Cue::Sound(Sound::Swing)]);
    }

    #[test]
    fn test_wait_blocks_following_steps() {
        let mut rig = Rig::new();
        let script = Script::new("timed")
            .wait(0.5)
            .act(Action::Show(Part::Sword));
        let mut seq = Sequencer::new(script);

        for _ in 0..5 {
            assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::Running);
            assert!(!rig.hitboxes.part(Part::Sword).unwrap().visible);
        }
        assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::Finished);
        assert!(rig.hitboxes.part(Part::Sword).unwrap().visible);
    }

    #[test]
    fn test_pose_wait_resumes_on_pose() {
        let mut rig = Rig::new();
        let script = Script::new("pose")
            .wait_until(Predicate::PoseIs(Pose(3)), None)
            .act(Action::Sound(Sound::Shoot));
        let mut seq = Sequencer::new(script);

        rig.world.pose = Some(Pose(1));
        for _ in 0..100 {
            assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::Running);
        }
        assert_eq!(seq.suspended_on(), "predicate");

        rig.world.pose = Some(Pose(3));
        assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::Finished);
        assert_eq!(rig.world.cues, vec![Cue::Sound(Sound::Shoot)]);
    }

    #[test]
    fn test_pose_wait_times_out() {
        let mut rig = Rig::new();
        let script = Script::new("stalled")
            .wait_until(Predicate::PoseIs(Pose(9)), Some(0.25))
            .act(Action::Sound(Sound::Shoot));
        let mut seq = Sequencer::new(script);

        assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::Running);
        assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::Running);
        assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::Running);
        assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::TimedOut);
        assert!(rig.world.cues.is_empty());
    }

    #[test]
    fn test_pose_binding_drives_visibility_and_tag() {
        let mut rig = Rig::new();
        let binding = PoseBinding {
            visible_on: smallvec![Pose(10), Pose(11)],
            damageable_on: Some(smallvec![Pose(11)]),
        };
        let script = Script::new("arm")
            .act(Action::BindPose(Part::Arm, binding))
            .wait(1.0);
        let mut seq = Sequencer::new(script);

        rig.world.pose = Some(Pose(10));
        rig.tick(&mut seq, 0.1);
        let arm = *rig.hitboxes.part(Part::Arm).unwrap();
        assert!(arm.visible);
        assert_eq!(arm.tag, DamageTag::Immune);

        rig.world.pose = Some(Pose(11));
        rig.tick(&mut seq, 0.1);
        assert!(rig.hitboxes.part(Part::Arm).unwrap().tag.is_damageable());

        rig.world.pose = Some(Pose(0));
        rig.tick(&mut seq, 0.1);
        let arm = *rig.hitboxes.part(Part::Arm).unwrap();
        assert!(!arm.visible);
        assert_eq!(arm.tag, DamageTag::Immune);
        assert_eq!(seq.watcher_count(), 1);
    }

    #[test]
    fn test_drive_stops_within_distance() {
        let mut rig = Rig::new();
        rig.world.target = Some(Vec2::new(6.0, 0.0));
        let script = Script::new("dash").then(Step::Drive {
            heading: Heading::Target,
            speed: 12.0,
            until: Predicate::TargetWithin(1.0),
            timeout: Some(5.0),
        });
        let mut seq = Sequencer::new(script);

        let mut status = SequencerStatus::Running;
        for _ in 0..120 {
            status = rig.tick(&mut seq, 1.0 / 60.0);
            rig.world.integrate(1.0 / 60.0);
            if status != SequencerStatus::Running {
                break;
            }
        }
        assert_eq!(status, SequencerStatus::Finished);
        assert_eq!(rig.world.body.velocity, Vec2::ZERO);
        assert!((rig.world.body.position.x - 6.0).abs() <= 1.0);
    }

    #[test]
    fn test_lob_lands_at_requested_x() {
        let mut rig = Rig::new();
        let plan = ShotPlan {
            kind: ProjectileKind::Rock,
            offset: Vec2::ZERO,
            aim: Aim::Lob {
                landing: Landing::AtX(8.0),
                peak: 5.0,
                gravity: 9.81,
            },
            damage: 1.0,
            radius: 0.5,
            lifetime: None,
        };
        let spec = {
            let mut env = rig.world.env();
            let mut ctx = StepContext {
                hitboxes: &mut rig.hitboxes,
                funnels: &mut rig.funnels,
                projectiles: &mut rig.projectiles,
                rng: &mut rig.rng,
                env: &mut env,
                facing: 1.0,
                velocity_written: false,
                emitted: SmallVec::new(),
            };
            ctx.resolve_shot(&plan)
        };

        let vy = spec.velocity.y;
        let flight = 2.0 * vy / 9.81;
        let landing = spec.origin.x + spec.velocity.x * flight;
        assert!((landing - 8.0).abs() < 1e-3);
        assert!((vy * vy / (2.0 * 9.81) - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_funnel_barrier_times_out() {
        let mut rig = Rig::new();
        let area = rig.world.area;
        rig.funnels.spawn(Vec2::ZERO);
        assert!(rig.funnels.begin_positioning(
            FunnelPattern::StraightDown,
            Vec2::ZERO,
            Some(Vec2::new(-4.0, 0.0)),
            area,
            &mut rig.rng
        ));
        let script = Script::new("stuck volley")
            .wait_for(Barrier::FunnelsInCircle, Some(0.25))
            .act(Action::Sound(Sound::Swing));
        let mut seq = Sequencer::new(script);

        for _ in 0..3 {
            assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::Running);
            assert_eq!(seq.suspended_on(), "barrier");
        }
        assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::TimedOut);
        assert!(rig.world.cues.is_empty());
    }

    #[test]
    fn test_mismatched_suspension_skips_the_step() {
        let mut rig = Rig::new();
        let script = Script::new("drifted")
            .wait_for(Barrier::FunnelsInCircle, None)
            .act(Action::Sound(Sound::Swing));
        let mut seq = Sequencer::new(script);
        seq.suspension = Some(Suspension::Predicate { waited: 0.0 });

        assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::Finished);
        assert_eq!(rig.world.cues, vec![Cue::Sound(Sound::Swing)]);
    }

    #[test]
    fn test_weightless_lob_is_culled() {
        let mut rig = Rig::new();
        let area = rig.world.area;
        let script = Script::new("flat rock").act(Action::Spawn(ShotPlan {
            kind: ProjectileKind::Rock,
            offset: Vec2::new(0.0, 3.0),
            aim: Aim::Lob {
                landing: Landing::AtX(8.0),
                peak: 5.0,
                gravity: 0.0,
            },
            damage: 1.0,
            radius: 0.5,
            lifetime: None,
        }));
        let mut seq = Sequencer::new(script);
        assert_eq!(rig.tick(&mut seq, 0.1), SequencerStatus::Finished);

        let rock = rig.projectiles.iter().next().unwrap();
        assert_eq!(rock.velocity, Vec2::ZERO);
        assert!(area.contains(rock.position));

        let mut secs = 0.0;
        while !rig.projectiles.is_empty() && secs < 60.0 {
            rig.projectiles.update(0.5, area);
            secs += 0.5;
        }
        assert!(rig.projectiles.is_empty());
        assert!(secs <= crate::encounter::projectiles::MAX_LIFETIME);
    }
}
