//! Golem
//!
//! A slow melee brute. Above 70% HP it walks up and swings, or throws a crawling rock
//! rather than walking twice in a row. Below that it dashes instead of walking. The first
//! time HP reaches half it summons minions, and below 40% it periodically charges to a wall
//! and slams its hammer, raining rocks across the arena.

use bevy::math::Vec2;

use crate::config::{BossKind, GolemConfig};
use crate::encounter::command::Command;
use crate::encounter::phase::{Latch, PhaseThresholds, Threshold};
use crate::encounter::projectiles::ProjectileKind;
use crate::encounter::rng::GameRng;
use crate::encounter::selector::{RepetitionGuard, WeightedTable};
use crate::encounter::sequencer::{
    Action, Aim, Heading, Landing, Movement, Predicate, Script, ShotPlan, Step,
};
use crate::encounter::services::{Clip, Sound};
use crate::encounter::tag::{DamageTag, Part};
use crate::encounter::{Decision, DecisionContext, SelectionState};

use super::{strike_on, BossBehavior, Eligible};

const ROCK_RADIUS: f32 = 0.5;

/// Slack allowed when arriving at the charge wall.
const WALL_TOLERANCE: f32 = 0.5;

pub struct Golem {
    config: GolemConfig,
    /// Band 0: healthy, band 1: dashing, band 2: charging.
    thresholds: PhaseThresholds,
    summon_at: Threshold,
    approach: WeightedTable<Command>,
    pursue: WeightedTable<Command>,
}

impl Golem {
    pub fn new(config: GolemConfig) -> Self {
        let dash = config.dash_probability.clamp(0.0, 1.0);
        Self {
            thresholds: PhaseThresholds::new(&[
                Threshold::at_or_below(config.dash_hp_ratio),
                Threshold::at_or_below(config.charge_hp_ratio),
            ]),
            summon_at: Threshold::at_or_below(config.summon_hp_ratio),
            approach: WeightedTable::new(&[(Command::Walk, 1.0)]),
            pursue: WeightedTable::new(&[
                (Command::Dash, dash),
                (Command::RangedAttack, 1.0 - dash),
            ]),
            config,
        }
    }

    pub fn config(&self) -> &GolemConfig {
        &self.config
    }

    fn choose(
        &self,
        ctx: &DecisionContext,
        state: &mut SelectionState,
        rng: &mut GameRng,
    ) -> Option<Command> {
        let hp = ctx.hp_ratio;
        if state
            .latches
            .fire_once(Latch::Summoned, self.summon_at.is_crossed(hp))
        {
            return Some(Command::Summon);
        }

        let band = self.thresholds.band_for(hp);
        // No charge straight out of a Walk or a Dash. The older rule read
        // `last != Walk || last != Dash`, which always holds and so charged after
        // movement too; that variant is not reproduced here.
        if band >= 2
            && state.total_actions >= self.config.strong_attack_count
            && !ctx.last_command.is_movement()
        {
            return Some(Command::ChargeAttack);
        }

        let far = ctx.target_dx()? > self.config.attack_range;
        if !far {
            return Some(Command::MeleeAttack);
        }
        if band >= 1 {
            let guard = RepetitionGuard::new(Command::Dash, Command::RangedAttack);
            state
                .selector
                .draw(&self.pursue, Some(guard), ctx.last_command, rng)
        } else {
            let guard = RepetitionGuard::new(Command::Walk, Command::RangedAttack);
            state
                .selector
                .draw(&self.approach, Some(guard), ctx.last_command, rng)
        }
    }

    pub fn walk_script(&self) -> Script {
        let cfg = &self.config;
        let secs = if cfg.walk_speed > 0.0 {
            cfg.walk_step_distance / cfg.walk_speed
        } else {
            0.0
        };
        Script::new("walk step")
            .act(Action::Animate(Clip::Walk))
            .act(Action::Move(Movement::TowardTarget(cfg.walk_speed)))
            .wait(secs)
            .act(Action::Move(Movement::Stop))
    }

    pub fn dash_script(&self, ctx: &DecisionContext) -> Script {
        let cfg = &self.config;
        let timeout = ctx.bounds.width() / cfg.dash_speed.max(1.0) + 1.0;
        Script::new("dash").act(Action::Animate(Clip::Dash)).then(Step::Drive {
            heading: Heading::Target,
            speed: cfg.dash_speed,
            until: Predicate::TargetWithin(cfg.dash_stop_distance),
            timeout: Some(timeout),
        })
    }

    pub fn melee_script(&self) -> Script {
        let cfg = &self.config;
        let sound_at = cfg.swing_sound_at.clamp(0.0, 1.0);
        Script::new("arm swing")
            .act(Action::Animate(Clip::Swing))
            .act(Action::BindPose(Part::Arm, strike_on(&cfg.arm_poses)))
            .wait(cfg.swing_time * sound_at)
            .act(Action::Sound(Sound::Swing))
            .wait(cfg.swing_time * (1.0 - sound_at))
            .act(Action::Unbind(Part::Arm))
            .act(Action::Hide(Part::Arm))
            .act(Action::SetTag(Part::Arm, DamageTag::Immune))
            .cooldown(cfg.melee_cooldown)
    }

    pub fn ranged_script(&self, ctx: &DecisionContext) -> Script {
        let cfg = &self.config;
        let lifetime = if cfg.crawling_rock_speed > 0.0 {
            Some(ctx.bounds.width() / cfg.crawling_rock_speed)
        } else {
            None
        };
        Script::new("crawling rock")
            .act(Action::Animate(Clip::Throw))
            .wait(cfg.swing_time)
            .act(Action::Sound(Sound::RockThrow))
            .act(Action::Spawn(ShotPlan {
                kind: ProjectileKind::CrawlingRock,
                offset: Vec2::from(cfg.crawling_rock_offset),
                aim: Aim::Crawl {
                    speed: cfg.crawling_rock_speed,
                },
                damage: cfg.crawling_rock_damage.max(0.0),
                radius: ROCK_RADIUS,
                lifetime,
            }))
            .cooldown(cfg.ranged_cooldown)
    }

    pub fn summon_script(&self) -> Script {
        Script::new("summon")
            .act(Action::Animate(Clip::Summon))
            .act(Action::Summon {
                count: self.config.summon_count,
            })
            .cooldown(self.config.summon_cooldown)
    }

    /// Charge to a random wall, slam, and rain rocks toward the far side.
    pub fn charge_script(&self, ctx: &DecisionContext, rng: &mut GameRng) -> Script {
        let cfg = &self.config;
        let bounds = ctx.bounds;
        let margin = cfg.encounter.body_radius.max(0.0);
        let to_left = rng.chance(0.5);
        let wall_x = if to_left {
            bounds.min.x + margin
        } else {
            bounds.max.x - margin
        };
        let (land_min, land_max) = if to_left {
            ((wall_x + cfg.rock_offset_x).min(bounds.max.x), bounds.max.x)
        } else {
            (bounds.min.x, (wall_x - cfg.rock_offset_x).max(bounds.min.x))
        };
        let timeout = bounds.width() / cfg.charge_dash_speed.max(1.0) + 1.0;

        let mut script = Script::new("hammer charge")
            .act(Action::Animate(Clip::Dash))
            .then(Step::Drive {
                heading: Heading::X(wall_x),
                speed: cfg.charge_dash_speed,
                until: Predicate::ReachedX {
                    x: wall_x,
                    tolerance: WALL_TOLERANCE,
                },
                timeout: Some(timeout),
            })
            .act(Action::Show(Part::Hammer))
            .act(Action::SetTag(Part::Hammer, DamageTag::Immune))
            .act(Action::Animate(Clip::HammerReady))
            .wait(cfg.hammer_ready_time)
            .act(Action::Sound(Sound::ChargeLoop))
            .wait(cfg.hammer_charge_time)
            .act(Action::Animate(Clip::Slam))
            .act(Action::SetTag(Part::Hammer, DamageTag::Damageable))
            .act(Action::Sound(Sound::Slam))
            .wait(cfg.hammer_slam_time);

        for wave in 0..cfg.rock_waves {
            for _ in 0..cfg.rocks_per_wave {
                let landing = rng.random_range(land_min, land_max);
                script = script.act(Action::Spawn(ShotPlan {
                    kind: ProjectileKind::Rock,
                    offset: Vec2::new(0.0, ROCK_RADIUS * 1.1),
                    aim: Aim::Lob {
                        landing: Landing::AtX(landing),
                        peak: cfg.rock_peak_height,
                        gravity: cfg.gravity,
                    },
                    damage: cfg.rock_damage.max(0.0),
                    radius: ROCK_RADIUS,
                    lifetime: None,
                }));
            }
            script = script.act(Action::Sound(Sound::RockThrow));
            if wave == 0 {
                script = script.act(Action::SetTag(Part::Hammer, DamageTag::Immune));
            }
            script = script.wait(cfg.rock_wave_interval);
        }

        script
            .act(Action::Hide(Part::Hammer))
            .act(Action::SetTag(Part::Hammer, DamageTag::Immune))
            .cooldown(cfg.hammer_cooldown)
    }
}

impl BossBehavior for Golem {
    fn kind(&self) -> BossKind {
        BossKind::Golem
    }

    fn thresholds(&self) -> &PhaseThresholds {
        &self.thresholds
    }

    fn eligible(&self, hp_ratio: f32) -> Eligible {
        let band = self.thresholds.band_for(hp_ratio);
        let mut commands = Eligible::new();
        commands.push(Command::MeleeAttack);
        commands.push(Command::RangedAttack);
        commands.push(if band == 0 {
            Command::Walk
        } else {
            Command::Dash
        });
        if self.summon_at.is_crossed(hp_ratio) {
            commands.push(Command::Summon);
        }
        if band >= 2 {
            commands.push(Command::ChargeAttack);
        }
        commands
    }

    fn decide(
        &self,
        ctx: &DecisionContext,
        state: &mut SelectionState,
        rng: &mut GameRng,
    ) -> Option<Decision> {
        let command = self.choose(ctx, state, rng)?;
        if command == Command::ChargeAttack {
            state.total_actions = 0;
        } else {
            state.total_actions += 1;
        }

        let script = match command {
            Command::Walk => self.walk_script(),
            Command::Dash => self.dash_script(ctx),
            Command::MeleeAttack => self.melee_script(),
            Command::RangedAttack => self.ranged_script(ctx),
            Command::Summon => self.summon_script(),
            Command::ChargeAttack => self.charge_script(ctx, rng),
            _ => return None,
        };
        Some(Decision::new(command, script))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::Rect;

    fn context(hp_ratio: f32, dx: f32, last: Command) -> DecisionContext {
        DecisionContext {
            hp_ratio,
            origin: Vec2::ZERO,
            target: Some(Vec2::new(dx, 0.0)),
            bounds: Rect::new(-20.0, -2.0, 20.0, 30.0),
            facing: 1.0,
            last_command: last,
            funnels_in_circle: false,
            since_funnels_returned: 0.0,
            funnel_count: 0,
            predicate_timeout: Some(6.0),
        }
    }

    fn decide(golem: &Golem, ctx: &DecisionContext, state: &mut SelectionState) -> Command {
        let mut rng = GameRng::from_seed(11);
        golem.decide(ctx, state, &mut rng).unwrap().command
    }

    #[test]
    fn test_healthy_golem_walks_then_throws() {
        let golem = Golem::new(GolemConfig::default());
        let mut state = SelectionState::default();
        assert_eq!(decide(&golem, &context(0.9, 8.0, Command::None), &mut state), Command::Walk);
        assert_eq!(
            decide(&golem, &context(0.9, 8.0, Command::Walk), &mut state),
            Command::RangedAttack
        );
        assert_eq!(
            decide(&golem, &context(0.9, 1.0, Command::Walk), &mut state),
            Command::MeleeAttack
        );
        assert_eq!(state.total_actions, 3);
    }

    #[test]
    fn test_no_double_dash() {
        let golem = Golem::new(GolemConfig::default());
        let mut state = SelectionState::default();
        for seed in 0..20 {
            let mut rng = GameRng::from_seed(seed);
            let decision = golem
                .decide(&context(0.6, 8.0, Command::Dash), &mut state, &mut rng)
                .unwrap();
            assert_eq!(decision.command, Command::RangedAttack);
        }
    }

    #[test]
    fn test_summon_fires_once() {
        let golem = Golem::new(GolemConfig::default());
        let mut state = SelectionState::default();
        assert_eq!(decide(&golem, &context(0.5, 8.0, Command::None), &mut state), Command::Summon);
        assert_ne!(decide(&golem, &context(0.45, 8.0, Command::Summon), &mut state), Command::Summon);
        assert_ne!(decide(&golem, &context(0.5, 8.0, Command::Dash), &mut state), Command::Summon);
    }

    #[test]
    fn test_charge_needs_actions_and_no_movement() {
        let golem = Golem::new(GolemConfig::default());
        let mut state = SelectionState::default();
        state.latches.fire_once(Latch::Summoned, true);
        state.total_actions = 5;

        assert_ne!(
            decide(&golem, &context(0.3, 8.0, Command::Walk), &mut state),
            Command::ChargeAttack
        );
        state.total_actions = 5;
        assert_eq!(
            decide(&golem, &context(0.3, 8.0, Command::MeleeAttack), &mut state),
            Command::ChargeAttack
        );
        assert_eq!(state.total_actions, 0);
    }

    #[test]
    fn test_charge_script_waves() {
        let golem = Golem::new(GolemConfig::default());
        let mut rng = GameRng::from_seed(4);
        let script = golem.charge_script(&context(0.3, 8.0, Command::None), &mut rng);
        let rocks = script
            .steps
            .iter()
            .filter(|s| matches!(s, Step::Do(Action::Spawn(_))))
            .count();
        assert_eq!(rocks, 25);
        assert!(script
            .steps
            .iter()
            .any(|s| matches!(s, Step::Drive { heading: Heading::X(_), .. })));
    }
}
