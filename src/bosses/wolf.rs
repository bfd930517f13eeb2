//! Wolf
//!
//! Keeps its distance and howls out projectiles. Every attack starts with a howl and fires
//! on the howl pose. The first time HP drops below half it answers with the charged fan
//! ultimate, and below 40% the ultimate comes back every few attacks.

use bevy::math::Vec2;
use smallvec::SmallVec;

use crate::config::{BossKind, WolfConfig};
use crate::encounter::command::{Command, ShotPattern};
use crate::encounter::phase::{Latch, PhaseThresholds, Threshold};
use crate::encounter::projectiles::ProjectileKind;
use crate::encounter::rng::GameRng;
use crate::encounter::selector::WeightedTable;
use crate::encounter::sequencer::{Action, Aim, Landing, Predicate, Script, ShotPlan};
use crate::encounter::services::{Clip, Sound};
use crate::encounter::{Decision, DecisionContext, SelectionState};

use super::{BossBehavior, Eligible};

pub struct Wolf {
    config: WolfConfig,
    thresholds: PhaseThresholds,
    escalation: Threshold,
    tables: SmallVec<[WeightedTable<Command>; 3]>,
}

impl Wolf {
    pub fn new(config: WolfConfig) -> Self {
        let bands: Vec<Threshold> = config
            .band_ratios
            .iter()
            .map(|&ratio| Threshold::below(ratio))
            .collect();
        let howl = |a: ShotPattern, b: ShotPattern| {
            WeightedTable::new(&[(Command::Howl(a), 0.5), (Command::Howl(b), 0.5)])
        };
        let mut tables = SmallVec::new();
        tables.push(howl(ShotPattern::Rain, ShotPattern::SingleArc));
        tables.push(howl(ShotPattern::FlatShot, ShotPattern::TripleArc));
        Self {
            thresholds: PhaseThresholds::new(&bands),
            escalation: Threshold::below(config.escalation_ratio),
            tables,
            config,
        }
    }

    pub fn config(&self) -> &WolfConfig {
        &self.config
    }

    /// Table for a band. Bands past the last table reuse it.
    fn table(&self, band: usize) -> &WeightedTable<Command> {
        &self.tables[band.min(self.tables.len() - 1)]
    }

    fn last_band(&self) -> usize {
        self.thresholds.band_count() - 1
    }

    fn choose(&self, ctx: &DecisionContext, state: &mut SelectionState, rng: &mut GameRng) -> Option<Command> {
        let ultimate = Command::Howl(ShotPattern::ArcUltimate);
        if state
            .latches
            .fire_once(Latch::Escalation, self.escalation.is_crossed(ctx.hp_ratio))
        {
            return Some(ultimate);
        }

        let band = self.thresholds.band_for(ctx.hp_ratio);
        let command = if band >= self.last_band()
            && band > 0
            && state.total_actions >= self.config.attacks_before_ultimate
        {
            state.total_actions = 0;
            ultimate
        } else {
            let command = state
                .selector
                .draw(self.table(band), None, ctx.last_command, rng)?;
            state.total_actions += 1;
            command
        };
        Some(command)
    }

    fn shot(&self, kind: ProjectileKind, aim: Aim, damage: f32) -> Action {
        Action::Spawn(ShotPlan {
            kind,
            offset: Vec2::from(self.config.shot_offset),
            aim,
            damage: damage.max(0.0),
            radius: self.config.shot_radius,
            lifetime: None,
        })
    }

    fn arc(&self) -> Action {
        self.shot(
            ProjectileKind::ArcShot,
            Aim::Lob {
                landing: Landing::AtTarget,
                peak: self.config.arc_peak,
                gravity: self.config.gravity,
            },
            self.config.arc_damage,
        )
    }

    /// The howl every attack opens with.
    fn howl(&self, name: &'static str, clip: Clip, timeout: Option<f32>) -> Script {
        Script::new(name)
            .act(Action::Animate(clip))
            .act(Action::Sound(Sound::Howl))
            .wait_until(Predicate::PoseIs(self.config.howl_pose), timeout)
    }

    pub fn script(&self, pattern: ShotPattern, timeout: Option<f32>, rng: &mut GameRng) -> Script {
        let cfg = &self.config;
        let script = match pattern {
            ShotPattern::SingleArc => self
                .howl("single arc", Clip::Howl, timeout)
                .act(Action::Sound(Sound::Shoot))
                .act(self.arc()),
            ShotPattern::TripleArc => {
                let mut script = self.howl("triple arc", Clip::Howl, timeout);
                for i in 0..3 {
                    if i > 0 {
                        script = script.wait(rng.random_range(cfg.triple_gap.0, cfg.triple_gap.1));
                    }
                    script = script.act(Action::Sound(Sound::Shoot)).act(self.arc());
                }
                script
            }
            ShotPattern::Rain => {
                let drops = rng.random_int(cfg.rain_drops.0, cfg.rain_drops.1);
                let mut script = self
                    .howl("rain", Clip::Howl, timeout)
                    .act(Action::Sound(Sound::Rain));
                for i in 0..drops {
                    if i > 0 {
                        script = script.wait(rng.random_range(cfg.rain_gap.0, cfg.rain_gap.1));
                    }
                    script = script.act(self.shot(
                        ProjectileKind::RainDrop,
                        Aim::Rain {
                            spread: cfg.rain_spread,
                            speed: cfg.rain_speed,
                        },
                        cfg.rain_damage,
                    ));
                }
                script
            }
            ShotPattern::FlatShot => {
                let shots = rng.random_int(cfg.flat_shots.0, cfg.flat_shots.1);
                let mut script = self.howl("flat shot", Clip::Howl, timeout);
                for i in 0..shots {
                    if i > 0 {
                        script = script.wait(rng.random_range(cfg.flat_gap.0, cfg.flat_gap.1));
                    }
                    script = script.act(Action::Sound(Sound::Shoot)).act(self.shot(
                        ProjectileKind::FlatShot,
                        Aim::LevelOff {
                            forward: cfg.flat_forward,
                            drop: cfg.flat_drop,
                            speed: cfg.flat_speed,
                        },
                        cfg.flat_damage,
                    ));
                }
                script
            }
            ShotPattern::ArcUltimate => {
                let mut script = Script::new("arc ultimate")
                    .act(Action::Animate(Clip::ChargedHowl))
                    .act(Action::Sound(Sound::ChargeLoop))
                    .wait_until(Predicate::PoseIs(cfg.howl_pose), timeout)
                    .act(Action::Sound(Sound::Howl))
                    .act(Action::Sound(Sound::Shoot));
                let n = cfg.ultimate_shots;
                let spread = cfg.ultimate_spread_deg;
                for i in 0..n {
                    let t = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.5 };
                    let degrees = 90.0 - spread / 2.0 + spread * t;
                    script = script.act(self.shot(
                        ProjectileKind::ChargedShot,
                        Aim::Fan {
                            degrees,
                            speed: cfg.ultimate_speed,
                            gravity: cfg.gravity,
                        },
                        cfg.ultimate_damage,
                    ));
                }
                script
            }
        };
        script.cooldown(cfg.recovery_for(pattern))
    }
}

impl BossBehavior for Wolf {
    fn kind(&self) -> BossKind {
        BossKind::Wolf
    }

    fn thresholds(&self) -> &PhaseThresholds {
        &self.thresholds
    }

    fn eligible(&self, hp_ratio: f32) -> Eligible {
        let band = self.thresholds.band_for(hp_ratio);
        let mut commands: Eligible = self
            .table(band)
            .entries()
            .iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(c, _)| *c)
            .collect();
        if self.escalation.is_crossed(hp_ratio) || (band > 0 && band >= self.last_band()) {
            commands.push(Command::Howl(ShotPattern::ArcUltimate));
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
        let Command::Howl(pattern) = command else {
            return None;
        };
        let script = self.script(pattern, ctx.predicate_timeout, rng);
        Some(Decision::new(command, script))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::Rect;
    use crate::encounter::sequencer::Step;

    fn context(hp_ratio: f32) -> DecisionContext {
        DecisionContext {
            hp_ratio,
            origin: Vec2::ZERO,
            target: Some(Vec2::new(-8.0, 0.0)),
            bounds: Rect::new(-20.0, -2.0, 20.0, 30.0),
            facing: -1.0,
            last_command: Command::None,
            funnels_in_circle: false,
            since_funnels_returned: 0.0,
            funnel_count: 0,
            predicate_timeout: Some(6.0),
        }
    }

    fn spawns(script: &Script) -> usize {
        script
            .steps
            .iter()
            .filter(|s| matches!(s, Step::Do(Action::Spawn(_))))
            .count()
    }

    #[test]
    fn test_band_tables() {
        let wolf = Wolf::new(WolfConfig::default());
        let mut state = SelectionState::default();
        let mut rng = GameRng::from_seed(5);
        for _ in 0..30 {
            let high = wolf.decide(&context(0.7), &mut state, &mut rng).unwrap().command;
            assert!(matches!(
                high,
                Command::Howl(ShotPattern::Rain) | Command::Howl(ShotPattern::SingleArc)
            ));
        }
    }

    #[test]
    fn test_escalation_then_counter() {
        let wolf = Wolf::new(WolfConfig::default());
        let mut state = SelectionState::default();
        let mut rng = GameRng::from_seed(5);
        let ultimate = Command::Howl(ShotPattern::ArcUltimate);

        assert_eq!(wolf.decide(&context(0.49), &mut state, &mut rng).unwrap().command, ultimate);
        assert_ne!(wolf.decide(&context(0.49), &mut state, &mut rng).unwrap().command, ultimate);

        state.total_actions = 0;
        let picks: Vec<Command> = (0..4)
            .map(|_| wolf.decide(&context(0.3), &mut state, &mut rng).unwrap().command)
            .collect();
        assert_eq!(&picks[3], &ultimate);
        assert!(picks[..3].iter().all(|c| *c != ultimate));
        assert_eq!(state.total_actions, 0);
    }

    #[test]
    fn test_ultimate_fan_spans_the_spread() {
        let wolf = Wolf::new(WolfConfig::default());
        let mut rng = GameRng::from_seed(5);
        let script = wolf.script(ShotPattern::ArcUltimate, Some(6.0), &mut rng);
        assert_eq!(spawns(&script), 9);
        let angles: Vec<f32> = script
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::Do(Action::Spawn(ShotPlan {
                    aim: Aim::Fan { degrees, .. },
                    ..
                })) => Some(*degrees),
                _ => None,
            })
            .collect();
        assert!((angles[0] - 20.0).abs() < 1e-4);
        assert!((angles[8] - 160.0).abs() < 1e-4);
    }

    #[test]
    fn test_rain_drop_count_in_range() {
        let wolf = Wolf::new(WolfConfig::default());
        for seed in 0..10 {
            let mut rng = GameRng::from_seed(seed);
            let script = wolf.script(ShotPattern::Rain, None, &mut rng);
            assert!((5..=8).contains(&spawns(&script)));
        }
    }
}
