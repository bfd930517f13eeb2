//! Orbiting sub-actors ("funnels")
//!
//! A [`FunnelRing`] owns every funnel of one encounter and runs two state machines:
//!
//! - the ring as a whole: `Circling → Positioning → Standby → Attacking → Circling`
//! - each funnel: `InCircle → Waiting → Attacking → Returning → InCircle`
//!
//! Positions are composed explicitly every tick from the boss origin plus an offset; funnels
//! are not parented to the boss. Launching follows a fixed protocol: face the travel
//! direction, recoil backwards over the preparation time, then travel at constant velocity.
//! Recoil always completes before travel starts.

use bevy::math::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::rng::GameRng;
use super::tag::DamageTag;

/// Distance from the orbit slot at which a returning funnel snaps back into the circle.
pub const RETURN_EPSILON: f32 = 0.1;

/// How funnels are placed and aimed for a volley.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunnelPattern {
    /// Random placement (optionally clustered over the player), all fired straight down at once.
    StraightDown,
    /// Evenly spaced, all fired at one shared random point.
    Cross,
    /// Evenly spaced, fired one by one at the player's position at launch time.
    TargetPlayer,
    /// Evenly spaced, fired one by one at independent random points.
    Random,
}

impl FunnelPattern {
    pub fn name(&self) -> &'static str {
        match self {
            FunnelPattern::StraightDown => "StraightDown",
            FunnelPattern::Cross => "Cross",
            FunnelPattern::TargetPlayer => "TargetPlayer",
            FunnelPattern::Random => "Random",
        }
    }
}

/// State of the ring as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingState {
    Circling,
    Positioning,
    Standby,
    Attacking,
}

/// State of a single funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunnelState {
    InCircle,
    Waiting,
    Attacking,
    Returning,
}

/// Geometry and timing of a funnel ring. Offsets are relative to the boss origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunnelSettings {
    pub count: usize,
    /// Orbit centre offset from the boss origin.
    pub orbit_center: [f32; 2],
    pub orbit_radius: f32,
    pub seconds_per_revolution: f32,
    /// Pivot for the polar positioning move, offset from the boss origin.
    pub movement_center: [f32; 2],
    /// Height of the wait line above the boss origin.
    pub wait_height: f32,
    /// Margin kept from the side bounds when placing funnels.
    pub funnel_width: f32,
    pub positioning_duration: f32,
    pub preparation_time: f32,
    pub recoil_distance: f32,
    pub launch_speed: f32,
    pub return_speed: f32,
    pub chance_near_player: f32,
    pub near_player_range: f32,
    pub radius: f32,
}

impl Default for FunnelSettings {
    fn default() -> Self {
        Self {
            count: 5,
            orbit_center: [0.0, 4.0],
            orbit_radius: 3.5,
            seconds_per_revolution: 3.0,
            movement_center: [-1.5, 12.0],
            wait_height: 10.0,
            funnel_width: 1.0,
            positioning_duration: 1.0,
            preparation_time: 0.5,
            recoil_distance: 3.0,
            launch_speed: 40.0,
            return_speed: 30.0,
            chance_near_player: 0.3,
            near_player_range: 3.0,
            radius: 0.5,
        }
    }
}

impl FunnelSettings {
    fn orbit_center(&self) -> Vec2 {
        Vec2::from(self.orbit_center)
    }

    fn movement_center(&self) -> Vec2 {
        Vec2::from(self.movement_center)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LaunchPhase {
    Recoil { from: Vec2, elapsed: f32 },
    Travel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    start_angle: f32,
    start_radius: f32,
    target_angle: f32,
    target_radius: f32,
}

/// One orbiting sub-actor.
#[derive(Debug, Clone, PartialEq)]
pub struct Funnel {
    pub index: usize,
    pub position: Vec2,
    pub state: FunnelState,
    pub tag: DamageTag,
    pub damage: f32,
    pub active: bool,
    /// Facing angle in radians.
    pub heading: f32,
    direction: Vec2,
    speed: f32,
    launch: Option<LaunchPhase>,
    placement: Option<Placement>,
}

impl Funnel {
    fn new(index: usize, position: Vec2) -> Self {
        Self {
            index,
            position,
            state: FunnelState::InCircle,
            tag: DamageTag::Immune,
            damage: 0.0,
            active: true,
            heading: 0.0,
            direction: Vec2::ZERO,
            speed: 0.0,
            launch: None,
            placement: None,
        }
    }

    /// Whether this funnel is still in its recoil (true) or already travelling (false).
    pub fn is_recoiling(&self) -> bool {
        matches!(self.launch, Some(LaunchPhase::Recoil { .. }))
    }

    pub fn is_travelling(&self) -> bool {
        matches!(self.launch, Some(LaunchPhase::Travel))
    }

    fn settle(&mut self) {
        self.state = FunnelState::InCircle;
        self.tag = DamageTag::Immune;
        self.launch = None;
        self.placement = None;
        self.direction = Vec2::ZERO;
        self.speed = 0.0;
    }
}

/// All funnels of one encounter.
#[derive(Debug, Clone)]
pub struct FunnelRing {
    settings: FunnelSettings,
    funnels: Vec<Funnel>,
    state: RingState,
    pattern: Option<FunnelPattern>,
    /// Orbit phase in degrees.
    theta: f32,
    positioning_elapsed: f32,
    since_returned: f32,
}

impl FunnelRing {
    pub fn new(settings: FunnelSettings) -> Self {
        Self {
            settings,
            funnels: Vec::new(),
            state: RingState::Circling,
            pattern: None,
            theta: 0.0,
            positioning_elapsed: 0.0,
            since_returned: 0.0,
        }
    }

    pub fn settings(&self) -> &FunnelSettings {
        &self.settings
    }

    pub fn state(&self) -> RingState {
        self.state
    }

    pub fn pattern(&self) -> Option<FunnelPattern> {
        self.pattern
    }

    pub fn funnels(&self) -> &[Funnel] {
        &self.funnels
    }

    pub fn funnel(&self, index: usize) -> Option<&Funnel> {
        self.funnels.get(index)
    }

    pub fn len(&self) -> usize {
        self.funnels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funnels.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.funnels.iter().filter(|f| f.active).count()
    }

    /// Seconds the ring has spent circling since the last volley completed.
    pub fn since_returned(&self) -> f32 {
        self.since_returned
    }

    /// The synchronization barrier: every registered funnel is back in the circle.
    pub fn all_in_circle(&self) -> bool {
        self.funnels.iter().all(|f| f.state == FunnelState::InCircle)
    }

    pub fn count_in(&self, state: FunnelState) -> usize {
        self.funnels.iter().filter(|f| f.state == state).count()
    }

    /// Orbit slot of funnel `index` for the current phase.
    pub fn slot(&self, index: usize, origin: Vec2) -> Vec2 {
        let n = self.funnels.len().max(1) as f32;
        let angle = (self.theta + index as f32 * 360.0 / n).to_radians();
        origin + self.settings.orbit_center() + Vec2::new(self.settings.orbit_radius * angle.cos(), 0.0)
    }

    /// Create the configured number of funnels on their orbit slots.
    pub fn spawn(&mut self, origin: Vec2) {
        self.funnels.clear();
        for index in 0..self.settings.count {
            self.funnels.push(Funnel::new(index, Vec2::ZERO));
        }
        for index in 0..self.funnels.len() {
            let slot = self.slot(index, origin);
            self.funnels[index].position = slot;
        }
        self.state = RingState::Circling;
        self.pattern = None;
        self.since_returned = 0.0;
    }

    /// Release every funnel: inactive, back in the circle, harmless.
    pub fn deactivate_all(&mut self) {
        for funnel in self.funnels.iter_mut() {
            funnel.settle();
            funnel.active = false;
        }
        self.state = RingState::Circling;
        self.pattern = None;
        self.positioning_elapsed = 0.0;
    }

    /// Forget every funnel.
    pub fn clear(&mut self) {
        self.funnels.clear();
        self.state = RingState::Circling;
        self.pattern = None;
        self.theta = 0.0;
        self.positioning_elapsed = 0.0;
        self.since_returned = 0.0;
    }

    /// Move every funnel from the circle to its waiting spot for `pattern`.
    ///
    /// Ignored unless the ring is circling with every funnel in the circle.
    pub fn begin_positioning(
        &mut self,
        pattern: FunnelPattern,
        origin: Vec2,
        target: Option<Vec2>,
        bounds: Rect,
        rng: &mut GameRng,
    ) -> bool {
        if self.state != RingState::Circling || !self.all_in_circle() || self.funnels.is_empty() {
            return false;
        }

        let targets = self.waiting_spots(pattern, origin, target, bounds, rng);
        let center = origin + self.settings.movement_center();

        for (funnel, spot) in self.funnels.iter_mut().zip(targets) {
            let from = funnel.position - center;
            let to = spot - center;
            let start_angle = from.y.atan2(from.x).to_degrees();
            let mut target_angle = to.y.atan2(to.x).to_degrees();
            // Always sweep counter-clockwise.
            if target_angle < start_angle {
                target_angle += 360.0;
            }
            funnel.placement = Some(Placement {
                start_angle,
                start_radius: from.length(),
                target_angle,
                target_radius: to.length(),
            });
            funnel.state = FunnelState::Waiting;
            funnel.tag = DamageTag::Immune;
        }

        self.pattern = Some(pattern);
        self.positioning_elapsed = 0.0;
        self.state = RingState::Positioning;
        true
    }

    fn waiting_spots(
        &self,
        pattern: FunnelPattern,
        origin: Vec2,
        target: Option<Vec2>,
        bounds: Rect,
        rng: &mut GameRng,
    ) -> SmallVec<[Vec2; 8]> {
        let count = self.funnels.len();
        let y = origin.y + self.settings.wait_height;
        let min_x = bounds.min.x + self.settings.funnel_width;
        let max_x = (bounds.max.x - self.settings.funnel_width).max(min_x);

        match pattern {
            FunnelPattern::StraightDown => {
                let near_player = match target {
                    Some(t) if rng.chance(self.settings.chance_near_player) => Some(t.x),
                    _ => None,
                };
                (0..count)
                    .map(|_| {
                        let x = match near_player {
                            Some(px) => {
                                let range = self.settings.near_player_range;
                                (px + rng.random_range(-range, range)).clamp(min_x, max_x)
                            }
                            None => rng.random_range(min_x, max_x),
                        };
                        Vec2::new(x, y)
                    })
                    .collect()
            }
            _ => {
                let spacing = if count > 1 {
                    (max_x - min_x) / (count - 1) as f32
                } else {
                    0.0
                };
                (0..count)
                    .map(|i| Vec2::new(min_x + i as f32 * spacing, y))
                    .collect()
            }
        }
    }

    /// Launch direction for a funnel under the current pattern.
    pub fn aim(
        &self,
        index: usize,
        origin: Vec2,
        target: Option<Vec2>,
        shared_point: Vec2,
        bounds: Rect,
        rng: &mut GameRng,
    ) -> Vec2 {
        let Some(funnel) = self.funnels.get(index) else {
            return Vec2::NEG_Y;
        };
        let toward = |point: Vec2| (point - funnel.position).try_normalize().unwrap_or(Vec2::NEG_Y);
        match self.pattern {
            Some(FunnelPattern::Cross) => toward(shared_point),
            Some(FunnelPattern::TargetPlayer) => match target {
                Some(t) => toward(t),
                None => Vec2::NEG_Y,
            },
            Some(FunnelPattern::Random) => {
                toward(Vec2::new(rng.random_range(bounds.min.x, bounds.max.x), origin.y))
            }
            Some(FunnelPattern::StraightDown) | None => Vec2::NEG_Y,
        }
    }

    /// Indices of funnels still waiting to be launched, in order.
    pub fn waiting_indices(&self) -> SmallVec<[usize; 8]> {
        self.funnels
            .iter()
            .filter(|f| f.state == FunnelState::Waiting)
            .map(|f| f.index)
            .collect()
    }

    /// Launch a waiting funnel.
    ///
    /// A funnel that is not waiting (already launching, returning, or in the circle) ignores
    /// the request.
    pub fn launch(&mut self, index: usize, direction: Vec2, damage: f32) -> bool {
        let speed = self.settings.launch_speed;
        let Some(funnel) = self.funnels.get_mut(index) else {
            return false;
        };
        if funnel.state != FunnelState::Waiting || funnel.launch.is_some() || !funnel.active {
            return false;
        }

        let direction = direction.try_normalize().unwrap_or(Vec2::NEG_Y);
        funnel.direction = direction;
        funnel.speed = speed;
        funnel.damage = damage.max(0.0);
        funnel.tag = DamageTag::Damageable;
        funnel.heading = direction.y.atan2(direction.x);
        funnel.launch = Some(LaunchPhase::Recoil {
            from: funnel.position,
            elapsed: 0.0,
        });
        funnel.placement = None;
        funnel.state = FunnelState::Attacking;
        self.state = RingState::Attacking;
        true
    }

    /// An attacking funnel left the play area: it turns harmless and heads home.
    pub fn notify_left_bounds(&mut self, index: usize) -> bool {
        let Some(funnel) = self.funnels.get_mut(index) else {
            return false;
        };
        if funnel.state != FunnelState::Attacking {
            return false;
        }
        funnel.state = FunnelState::Returning;
        funnel.tag = DamageTag::Immune;
        funnel.launch = None;
        funnel.direction = Vec2::ZERO;
        funnel.speed = 0.0;
        true
    }

    /// Advance one tick. Returns the funnels that left the play area during this tick; the
    /// owner is expected to report each one back through `notify_left_bounds`.
    pub fn update(&mut self, dt: f32, origin: Vec2, area: Rect) -> SmallVec<[usize; 8]> {
        let mut left_bounds = SmallVec::new();

        if self.settings.seconds_per_revolution > 0.0 {
            self.theta = (self.theta + 360.0 / self.settings.seconds_per_revolution * dt) % 360.0;
        }

        if self.state == RingState::Circling {
            self.since_returned += dt;
        } else {
            self.since_returned = 0.0;
        }

        let progress = if self.state == RingState::Positioning {
            self.positioning_elapsed += dt;
            if self.settings.positioning_duration > 0.0 {
                (self.positioning_elapsed / self.settings.positioning_duration).clamp(0.0, 1.0)
            } else {
                1.0
            }
        } else {
            0.0
        };

        let center = origin + self.settings.movement_center();
        let prep = self.settings.preparation_time;
        let recoil = self.settings.recoil_distance;
        let return_step = self.settings.return_speed * dt;

        for index in 0..self.funnels.len() {
            let slot = self.slot(index, origin);
            let funnel = &mut self.funnels[index];
            if !funnel.active {
                continue;
            }

            match funnel.state {
                FunnelState::InCircle => {
                    funnel.position = slot;
                }
                FunnelState::Waiting => {
                    if let (RingState::Positioning, Some(p)) = (self.state, funnel.placement) {
                        let angle = (p.start_angle + (p.target_angle - p.start_angle) * progress).to_radians();
                        let radius = p.start_radius + (p.target_radius - p.start_radius) * progress;
                        let next = center + Vec2::new(angle.cos(), angle.sin()) * radius;
                        let step = next - funnel.position;
                        if step.length_squared() > 1e-4 {
                            funnel.heading = step.y.atan2(step.x);
                        }
                        funnel.position = next;
                    }
                }
                FunnelState::Attacking => match funnel.launch {
                    Some(LaunchPhase::Recoil { from, elapsed }) => {
                        let elapsed = elapsed + dt;
                        let t = if prep > 0.0 { (elapsed / prep).min(1.0) } else { 1.0 };
                        funnel.position = from.lerp(from - funnel.direction * recoil, t);
                        funnel.launch = if t >= 1.0 {
                            Some(LaunchPhase::Travel)
                        } else {
                            Some(LaunchPhase::Recoil { from, elapsed })
                        };
                    }
                    Some(LaunchPhase::Travel) => {
                        funnel.position += funnel.direction * funnel.speed * dt;
                        if !area.contains(funnel.position) {
                            left_bounds.push(index);
                        }
                    }
                    None => {}
                },
                FunnelState::Returning => {
                    funnel.position = move_towards(funnel.position, slot, return_step);
                    if funnel.position.distance(slot) <= RETURN_EPSILON {
                        funnel.position = slot;
                        funnel.settle();
                    }
                }
            }
        }

        match self.state {
            RingState::Positioning if progress >= 1.0 => {
                for funnel in self.funnels.iter_mut() {
                    funnel.heading = 0.0;
                }
                self.state = RingState::Standby;
            }
            RingState::Attacking if self.all_in_circle() => {
                self.state = RingState::Circling;
                self.pattern = None;
                self.since_returned = 0.0;
            }
            _ => {}
        }

        left_bounds
    }
}

fn move_towards(from: Vec2, to: Vec2, max_step: f32) -> Vec2 {
    let delta = to - from;
    let distance = delta.length();
    if distance <= max_step || distance <= f32::EPSILON {
        to
    } else {
        from + delta / distance * max_step
    }
}
