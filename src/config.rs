//! Data-Driven Boss Configuration
//!
//! Boss tuning lives in `assets/config/bosses.ron` instead of being hardcoded. Every struct
//! is `#[serde(default)]`, so a file only needs the values it changes; anything missing
//! falls back to the built-in tuning below.
//!
//! ## Problems are warnings
//!
//! A misconfigured boss must still fight. [`BossRoster::validate`] reports every problem it
//! finds (non-monotonic thresholds, empty pattern tables, missing readiness times, zero
//! damage) and the loader logs each one once with `warn!`. The behaviours then skip or
//! weaken whatever is broken instead of refusing to run.
//!
//! ## Usage
//! ```ignore
//! let roster = BossRoster::load_or_default(BOSS_CONFIG_PATH);
//! let behavior = get_boss_behavior(BossKind::Golem, &roster);
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::encounter::funnels::{FunnelPattern, FunnelSettings};
use crate::encounter::services::{Clip, Pose};
use crate::encounter::tag::Part;

/// Default location of the boss tuning file.
pub const BOSS_CONFIG_PATH: &str = "assets/config/bosses.ron";

/// Readiness time used when a funnel pattern has none configured.
pub const DEFAULT_READY_TIME: f32 = 2.0;

/// Which boss an encounter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BossKind {
    Swordsman,
    Golem,
    Wolf,
}

impl BossKind {
    pub const ALL: [BossKind; 3] = [BossKind::Swordsman, BossKind::Golem, BossKind::Wolf];

    pub fn name(&self) -> &'static str {
        match self {
            BossKind::Swordsman => "Swordsman",
            BossKind::Golem => "Golem",
            BossKind::Wolf => "Wolf",
        }
    }

    /// Parse a boss name (case-insensitive).
    pub fn parse(name: &str) -> Result<Self, String> {
        match name.to_ascii_lowercase().as_str() {
            "swordsman" => Ok(BossKind::Swordsman),
            "golem" => Ok(BossKind::Golem),
            "wolf" => Ok(BossKind::Wolf),
            _ => Err(format!(
                "Unknown boss: '{}'. Valid bosses: Swordsman, Golem, Wolf",
                name
            )),
        }
    }
}

/// Hitbox geometry and damage of a detachable part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSettings {
    pub part: Part,
    /// Offset from the boss origin; `x` is mirrored to the facing side.
    pub offset: [f32; 2],
    pub radius: f32,
    pub damage: f32,
}

/// A timeline of poses played for an animation clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipTimeline {
    pub clip: Clip,
    /// `(pose, seconds)` pairs played in order.
    pub frames: Vec<(Pose, f32)>,
}

impl ClipTimeline {
    /// Total play time in seconds.
    pub fn duration(&self) -> f32 {
        self.frames.iter().map(|(_, secs)| secs.max(0.0)).sum()
    }

    /// Seconds from the start of the clip until `pose` is first displayed.
    pub fn time_until(&self, pose: Pose) -> Option<f32> {
        let mut elapsed = 0.0;
        for (frame, secs) in &self.frames {
            if *frame == pose {
                return Some(elapsed);
            }
            elapsed += secs.max(0.0);
        }
        None
    }
}

/// Settings every encounter shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterSettings {
    pub max_hp: f32,
    pub activation_range: f32,
    /// Half-angle of the facing cone the target must be inside to wake the boss.
    pub activation_half_angle_deg: f32,
    /// +1.0 starts facing right, -1.0 left.
    pub start_facing: f32,
    /// Upper bound on any wait for a pose or for the funnels. `None` waits forever.
    pub predicate_timeout: Option<f32>,
    pub body_radius: f32,
    /// Contact damage of the body while its tag is Damageable.
    pub contact_damage: f32,
    pub parts: Vec<PartSettings>,
    pub idle_pose: Pose,
    pub animations: Vec<ClipTimeline>,
}

impl Default for EncounterSettings {
    fn default() -> Self {
        Self {
            max_hp: 1000.0,
            activation_range: 10.0,
            activation_half_angle_deg: 90.0,
            start_facing: -1.0,
            predicate_timeout: Some(6.0),
            body_radius: 1.5,
            contact_damage: 10.0,
            parts: Vec::new(),
            idle_pose: Pose(0),
            animations: Vec::new(),
        }
    }
}

impl EncounterSettings {
    pub fn part(&self, part: Part) -> Option<&PartSettings> {
        self.parts.iter().find(|p| p.part == part)
    }

    pub fn timeline(&self, clip: Clip) -> Option<&ClipTimeline> {
        self.animations.iter().find(|t| t.clip == clip)
    }
}

fn timeline(clip: Clip, frames: &[(u16, f32)]) -> ClipTimeline {
    ClipTimeline {
        clip,
        frames: frames.iter().map(|&(p, secs)| (Pose(p), secs)).collect(),
    }
}

// ============================================================================
// Swordsman
// ============================================================================

/// Funnel-wielding swordsman.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwordsmanConfig {
    pub encounter: EncounterSettings,
    pub funnels: FunnelSettings,
    pub melee_range: f32,
    pub swing_time: f32,
    pub melee_cooldown: f32,
    /// Body pose on which the funnels are sent to their waiting spots.
    pub funnel_trigger_pose: Pose,
    /// Body poses on which the sword is drawn.
    pub sword_poses: Vec<Pose>,
    /// HP ratio at or below which the below-half table applies for good.
    pub half_hp_ratio: f32,
    pub weights_above_half: Vec<(FunnelPattern, f32)>,
    pub weights_below_half: Vec<(FunnelPattern, f32)>,
    /// Seconds the funnels must circle before this pattern may fire again.
    pub ready_times: Vec<(FunnelPattern, f32)>,
    pub funnel_damage: f32,
    pub target_damage_above_half: f32,
    pub target_damage_below_half: f32,
    pub target_stagger: f32,
    pub random_stagger: f32,
}

impl Default for SwordsmanConfig {
    fn default() -> Self {
        Self {
            encounter: EncounterSettings {
                max_hp: 1200.0,
                contact_damage: 0.0,
                parts: vec![PartSettings {
                    part: Part::Sword,
                    offset: [1.8, 0.5],
                    radius: 1.4,
                    damage: 20.0,
                }],
                animations: vec![
                    timeline(Clip::Spawn, &[(20, 0.5)]),
                    timeline(Clip::Swing, &[(1, 0.2), (2, 0.2), (3, 0.2), (4, 0.2), (5, 0.2)]),
                ],
                ..default()
            },
            funnels: FunnelSettings::default(),
            melee_range: 5.0,
            swing_time: 1.0,
            melee_cooldown: 1.5,
            funnel_trigger_pose: Pose(3),
            sword_poses: vec![Pose(3), Pose(4), Pose(5)],
            half_hp_ratio: 0.5,
            weights_above_half: vec![
                (FunnelPattern::StraightDown, 0.5),
                (FunnelPattern::Cross, 0.3),
                (FunnelPattern::TargetPlayer, 0.2),
            ],
            weights_below_half: vec![
                (FunnelPattern::Cross, 0.4),
                (FunnelPattern::TargetPlayer, 0.4),
                (FunnelPattern::Random, 0.2),
            ],
            ready_times: vec![
                (FunnelPattern::StraightDown, 2.0),
                (FunnelPattern::Cross, 2.5),
                (FunnelPattern::TargetPlayer, 3.0),
                (FunnelPattern::Random, 2.0),
            ],
            funnel_damage: 15.0,
            target_damage_above_half: 12.0,
            target_damage_below_half: 18.0,
            target_stagger: 0.5,
            random_stagger: 0.3,
        }
    }
}

impl SwordsmanConfig {
    /// Readiness time of a pattern, falling back to [`DEFAULT_READY_TIME`].
    pub fn ready_time(&self, pattern: FunnelPattern) -> f32 {
        self.ready_times
            .iter()
            .find(|(p, _)| *p == pattern)
            .map(|(_, secs)| *secs)
            .unwrap_or(DEFAULT_READY_TIME)
    }

    fn problems(&self, out: &mut Vec<String>) {
        if self.funnels.count == 0 {
            out.push("swordsman: no funnels configured; volleys will be skipped".to_string());
        }
        if !(0.0..=1.0).contains(&self.half_hp_ratio) {
            out.push(format!(
                "swordsman: half_hp_ratio {} is outside 0.0..=1.0",
                self.half_hp_ratio
            ));
        }
        for (name, table) in [
            ("weights_above_half", &self.weights_above_half),
            ("weights_below_half", &self.weights_below_half),
        ] {
            if table.iter().all(|(_, w)| *w <= 0.0) {
                out.push(format!("swordsman: {} has no positive weight", name));
            }
            for (pattern, _) in table {
                if !self.ready_times.iter().any(|(p, _)| p == pattern) {
                    out.push(format!(
                        "swordsman: no ready time for {}; using {}s",
                        pattern.name(),
                        DEFAULT_READY_TIME
                    ));
                }
            }
        }
        for (name, damage) in [
            ("funnel_damage", self.funnel_damage),
            ("target_damage_above_half", self.target_damage_above_half),
            ("target_damage_below_half", self.target_damage_below_half),
        ] {
            if damage <= 0.0 {
                out.push(format!("swordsman: {} is not positive; treated as zero", name));
            }
        }
        for (name, speed) in [
            ("funnels.launch_speed", self.funnels.launch_speed),
            ("funnels.return_speed", self.funnels.return_speed),
        ] {
            if speed <= 0.0 {
                out.push(format!("swordsman: {} must be positive", name));
            }
        }
        if self.encounter.part(Part::Sword).is_none() {
            out.push("swordsman: no Sword part configured; melee swings deal no damage".to_string());
        }
    }
}

// ============================================================================
// Golem
// ============================================================================

/// Hammer-and-rock golem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GolemConfig {
    pub encounter: EncounterSettings,
    pub dash_hp_ratio: f32,
    pub charge_hp_ratio: f32,
    pub summon_hp_ratio: f32,
    pub strong_attack_count: u32,
    pub attack_range: f32,
    pub walk_speed: f32,
    pub walk_step_distance: f32,
    pub dash_speed: f32,
    pub dash_stop_distance: f32,
    pub dash_probability: f32,
    pub charge_dash_speed: f32,
    pub swing_time: f32,
    /// Fraction of the swing at which the swing sound plays.
    pub swing_sound_at: f32,
    /// Body poses of the swing; the arm is harmless on the first.
    pub arm_poses: Vec<Pose>,
    pub melee_cooldown: f32,
    pub ranged_cooldown: f32,
    pub crawling_rock_speed: f32,
    pub crawling_rock_damage: f32,
    pub crawling_rock_offset: [f32; 2],
    pub summon_count: u32,
    pub summon_cooldown: f32,
    pub hammer_ready_time: f32,
    pub hammer_charge_time: f32,
    pub hammer_slam_time: f32,
    pub hammer_cooldown: f32,
    pub rock_waves: u32,
    pub rocks_per_wave: u32,
    pub rock_wave_interval: f32,
    /// Rocks land between this far beyond the golem and the far wall.
    pub rock_offset_x: f32,
    pub rock_peak_height: f32,
    pub rock_damage: f32,
    pub gravity: f32,
}

impl Default for GolemConfig {
    fn default() -> Self {
        Self {
            encounter: EncounterSettings {
                max_hp: 1500.0,
                activation_range: 12.0,
                contact_damage: 8.0,
                body_radius: 1.8,
                parts: vec![
                    PartSettings {
                        part: Part::Arm,
                        offset: [1.6, 0.0],
                        radius: 1.2,
                        damage: 18.0,
                    },
                    PartSettings {
                        part: Part::Hammer,
                        offset: [2.2, -0.5],
                        radius: 1.6,
                        damage: 30.0,
                    },
                ],
                animations: vec![
                    timeline(Clip::Spawn, &[(20, 0.5)]),
                    timeline(Clip::Swing, &[(1, 0.25), (2, 0.25), (3, 0.25)]),
                    timeline(Clip::Throw, &[(4, 0.375), (5, 0.375)]),
                    timeline(Clip::Summon, &[(8, 0.5)]),
                    timeline(Clip::HammerReady, &[(6, 0.333)]),
                    timeline(Clip::Slam, &[(7, 0.25)]),
                ],
                ..default()
            },
            dash_hp_ratio: 0.7,
            charge_hp_ratio: 0.4,
            summon_hp_ratio: 0.5,
            strong_attack_count: 5,
            attack_range: 3.0,
            walk_speed: 5.0,
            walk_step_distance: 2.0,
            dash_speed: 12.0,
            dash_stop_distance: 1.0,
            dash_probability: 1.0 / 3.0,
            charge_dash_speed: 30.0,
            swing_time: 0.75,
            swing_sound_at: 0.7,
            arm_poses: vec![Pose(1), Pose(2), Pose(3)],
            melee_cooldown: 1.0,
            ranged_cooldown: 1.5,
            crawling_rock_speed: 15.0,
            crawling_rock_damage: 12.0,
            crawling_rock_offset: [1.5, -1.0],
            summon_count: 3,
            summon_cooldown: 1.0,
            hammer_ready_time: 0.333,
            hammer_charge_time: 4.0,
            hammer_slam_time: 0.25,
            hammer_cooldown: 1.0,
            rock_waves: 5,
            rocks_per_wave: 5,
            rock_wave_interval: 0.75,
            rock_offset_x: 2.0,
            rock_peak_height: 10.0,
            rock_damage: 10.0,
            gravity: 9.81,
        }
    }
}

impl GolemConfig {
    fn problems(&self, out: &mut Vec<String>) {
        if !(self.charge_hp_ratio < self.dash_hp_ratio) {
            out.push(format!(
                "golem: charge_hp_ratio {} must be below dash_hp_ratio {}",
                self.charge_hp_ratio, self.dash_hp_ratio
            ));
        }
        for (name, speed) in [
            ("walk_speed", self.walk_speed),
            ("dash_speed", self.dash_speed),
            ("charge_dash_speed", self.charge_dash_speed),
            ("crawling_rock_speed", self.crawling_rock_speed),
        ] {
            if speed <= 0.0 {
                out.push(format!("golem: {} must be positive", name));
            }
        }
        for (name, damage) in [
            ("crawling_rock_damage", self.crawling_rock_damage),
            ("rock_damage", self.rock_damage),
        ] {
            if damage <= 0.0 {
                out.push(format!("golem: {} is not positive; treated as zero", name));
            }
        }
        if self.arm_poses.is_empty() {
            out.push("golem: arm_poses is empty; the arm never shows".to_string());
        }
        if self.gravity <= 0.0 {
            out.push("golem: gravity must be positive".to_string());
        }
    }
}

// ============================================================================
// Wolf
// ============================================================================

/// Spectral wolf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WolfConfig {
    pub encounter: EncounterSettings,
    /// HP band breakpoints, highest first. Exactly hitting a breakpoint stays in the upper band.
    pub band_ratios: Vec<f32>,
    pub escalation_ratio: f32,
    pub attacks_before_ultimate: u32,
    pub howl_pose: Pose,
    pub shot_offset: [f32; 2],
    pub shot_radius: f32,
    pub gravity: f32,
    pub arc_peak: f32,
    pub arc_damage: f32,
    pub triple_gap: (f32, f32),
    pub rain_drops: (u32, u32),
    pub rain_gap: (f32, f32),
    pub rain_spread: f32,
    pub rain_speed: f32,
    pub rain_damage: f32,
    pub flat_shots: (u32, u32),
    pub flat_gap: (f32, f32),
    pub flat_forward: f32,
    pub flat_drop: f32,
    pub flat_speed: f32,
    pub flat_damage: f32,
    pub ultimate_shots: u32,
    pub ultimate_spread_deg: f32,
    pub ultimate_speed: f32,
    pub ultimate_damage: f32,
    /// Recovery after each pattern before the next decision.
    pub recovery: Vec<(crate::encounter::command::ShotPattern, f32)>,
}

impl Default for WolfConfig {
    fn default() -> Self {
        use crate::encounter::command::ShotPattern;
        Self {
            encounter: EncounterSettings {
                max_hp: 1000.0,
                activation_range: 14.0,
                activation_half_angle_deg: 180.0,
                contact_damage: 10.0,
                animations: vec![
                    timeline(Clip::Spawn, &[(20, 0.5)]),
                    timeline(Clip::Howl, &[(1, 0.3), (2, 0.3), (3, 0.3)]),
                    timeline(Clip::ChargedHowl, &[(4, 3.0), (2, 0.4), (3, 0.3)]),
                ],
                ..default()
            },
            band_ratios: vec![0.7, 0.4],
            escalation_ratio: 0.5,
            attacks_before_ultimate: 3,
            howl_pose: Pose(2),
            shot_offset: [1.5, 1.5],
            shot_radius: 0.5,
            gravity: 9.81,
            arc_peak: 4.0,
            arc_damage: 12.0,
            triple_gap: (0.5, 1.0),
            rain_drops: (5, 8),
            rain_gap: (0.5, 0.75),
            rain_spread: 4.0,
            rain_speed: 12.0,
            rain_damage: 8.0,
            flat_shots: (3, 5),
            flat_gap: (0.4, 0.8),
            flat_forward: 4.0,
            flat_drop: 1.5,
            flat_speed: 10.0,
            flat_damage: 10.0,
            ultimate_shots: 9,
            ultimate_spread_deg: 140.0,
            ultimate_speed: 9.0,
            ultimate_damage: 14.0,
            recovery: vec![
                (ShotPattern::SingleArc, 1.0),
                (ShotPattern::TripleArc, 1.5),
                (ShotPattern::Rain, 1.5),
                (ShotPattern::FlatShot, 1.5),
                (ShotPattern::ArcUltimate, 2.5),
            ],
        }
    }
}

impl WolfConfig {
    pub fn recovery_for(&self, pattern: crate::encounter::command::ShotPattern) -> f32 {
        self.recovery
            .iter()
            .find(|(p, _)| *p == pattern)
            .map(|(_, secs)| *secs)
            .unwrap_or(1.0)
    }

    fn problems(&self, out: &mut Vec<String>) {
        for pair in self.band_ratios.windows(2) {
            if pair[1] >= pair[0] {
                out.push(format!(
                    "wolf: band_ratios must strictly descend, found {} then {}",
                    pair[0], pair[1]
                ));
            }
        }
        if self.band_ratios.len() != 2 {
            out.push(format!(
                "wolf: expected 2 band ratios, found {}; missing bands reuse the last table",
                self.band_ratios.len()
            ));
        }
        for (name, damage) in [
            ("arc_damage", self.arc_damage),
            ("rain_damage", self.rain_damage),
            ("flat_damage", self.flat_damage),
            ("ultimate_damage", self.ultimate_damage),
        ] {
            if damage <= 0.0 {
                out.push(format!("wolf: {} is not positive; treated as zero", name));
            }
        }
        if self.ultimate_shots == 0 {
            out.push("wolf: ultimate_shots is zero; the ultimate fires nothing".to_string());
        }
        if self.gravity <= 0.0 {
            out.push("wolf: gravity must be positive".to_string());
        }
    }
}

// ============================================================================
// Roster
// ============================================================================

/// All boss tunings, as stored in `bosses.ron`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossRoster {
    pub swordsman: SwordsmanConfig,
    pub golem: GolemConfig,
    pub wolf: WolfConfig,
}

impl BossRoster {
    pub fn encounter(&self, kind: BossKind) -> &EncounterSettings {
        match kind {
            BossKind::Swordsman => &self.swordsman.encounter,
            BossKind::Golem => &self.golem.encounter,
            BossKind::Wolf => &self.wolf.encounter,
        }
    }

    /// Collect every configuration problem. An empty list means the roster is clean.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();
        self.swordsman.problems(&mut problems);
        self.golem.problems(&mut problems);
        self.wolf.problems(&mut problems);

        for kind in BossKind::ALL {
            let settings = self.encounter(kind);
            if settings.max_hp <= 0.0 {
                problems.push(format!("{}: max_hp must be positive", kind.name()));
            }
            if settings.predicate_timeout.is_some_and(|t| t <= 0.0) {
                problems.push(format!(
                    "{}: predicate_timeout must be positive or None",
                    kind.name()
                ));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// Parse a roster from RON text.
    pub fn from_ron(contents: &str) -> Result<Self, String> {
        ron::from_str(contents).map_err(|e| format!("Failed to parse boss roster: {}", e))
    }

    /// Load a roster from a RON file.
    pub fn load(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path, e))?;
        Self::from_ron(&contents).map_err(|e| format!("{} ({})", e, path))
    }

    /// Load a roster, logging problems and falling back to the built-in tuning on failure.
    pub fn load_or_default(path: &str) -> Self {
        let roster = match Self::load(path) {
            Ok(roster) => {
                info!("Loaded boss roster from {}", path);
                roster
            }
            Err(e) => {
                warn!("{}; using built-in boss tuning", e);
                Self::default()
            }
        };
        if let Err(problems) = roster.validate() {
            for problem in &problems {
                warn!("Boss config: {}", problem);
            }
        }
        roster
    }
}
