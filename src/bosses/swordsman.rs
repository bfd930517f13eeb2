//! Swordsman
//!
//! Fights with a sword and a ring of orbiting funnels. Every decision is a sword swing;
//! once the funnels have circled for the readiness time of the drawn pattern, the swing
//! also sends them out as a volley. Above half HP the volley patterns are the gentler
//! ones; the first time HP reaches half the table switches for good.

use crate::config::{BossKind, SwordsmanConfig};
use crate::encounter::command::Command;
use crate::encounter::funnels::{FunnelPattern, FunnelSettings};
use crate::encounter::phase::{Latch, PhaseThresholds, Threshold};
use crate::encounter::rng::GameRng;
use crate::encounter::selector::WeightedTable;
use crate::encounter::sequencer::{Action, Barrier, Predicate, Script, Step};
use crate::encounter::services::{Clip, Sound};
use crate::encounter::tag::{DamageTag, Part};
use crate::encounter::{Decision, DecisionContext, SelectionState};

use super::{show_on, BossBehavior, Eligible};

pub struct Swordsman {
    config: SwordsmanConfig,
    thresholds: PhaseThresholds,
    above_half: WeightedTable<Command>,
    below_half: WeightedTable<Command>,
}

impl Swordsman {
    pub fn new(config: SwordsmanConfig) -> Self {
        let volleys = |weights: &[(FunnelPattern, f32)]| {
            let entries: Vec<(Command, f32)> = weights
                .iter()
                .map(|&(pattern, weight)| (Command::Volley(pattern), weight))
                .collect();
            WeightedTable::new(&entries)
        };
        Self {
            thresholds: PhaseThresholds::new(&[Threshold::at_or_below(config.half_hp_ratio)]),
            above_half: volleys(&config.weights_above_half),
            below_half: volleys(&config.weights_below_half),
            config,
        }
    }

    pub fn config(&self) -> &SwordsmanConfig {
        &self.config
    }

    fn table(&self, below_half: bool) -> &WeightedTable<Command> {
        if below_half {
            &self.below_half
        } else {
            &self.above_half
        }
    }

    fn launch_profile(&self, pattern: FunnelPattern, below_half: bool) -> (f32, f32) {
        let cfg = &self.config;
        match pattern {
            FunnelPattern::StraightDown | FunnelPattern::Cross => (0.0, cfg.funnel_damage),
            FunnelPattern::TargetPlayer => {
                let damage = if below_half {
                    cfg.target_damage_below_half
                } else {
                    cfg.target_damage_above_half
                };
                (cfg.target_stagger, damage)
            }
            FunnelPattern::Random => (cfg.random_stagger, cfg.funnel_damage),
        }
    }

    fn draw_sword(&self, script: Script) -> Script {
        script
            .act(Action::Animate(Clip::Swing))
            .act(Action::Sound(Sound::Swing))
            .act(Action::SetTag(Part::Sword, DamageTag::Damageable))
            .act(Action::BindPose(Part::Sword, show_on(&self.config.sword_poses)))
    }

    fn sheathe_sword(script: Script) -> Script {
        script
            .act(Action::Unbind(Part::Sword))
            .act(Action::Hide(Part::Sword))
            .act(Action::SetTag(Part::Sword, DamageTag::Immune))
    }

    /// A plain swing.
    pub fn swing_script(&self) -> Script {
        let script = self.draw_sword(Script::new("sword swing")).wait(self.config.swing_time);
        Self::sheathe_sword(script).cooldown(self.config.melee_cooldown)
    }

    /// A swing that sends the funnels out in `pattern`.
    pub fn volley_script(
        &self,
        pattern: FunnelPattern,
        below_half: bool,
        predicate_timeout: Option<f32>,
    ) -> Script {
        let cfg = &self.config;
        let trigger = cfg.funnel_trigger_pose;
        let trigger_at = cfg
            .encounter
            .timeline(Clip::Swing)
            .and_then(|t| t.time_until(trigger))
            .unwrap_or(0.0);
        let (stagger, damage) = self.launch_profile(pattern, below_half);

        let script = self
            .draw_sword(Script::new("funnel volley"))
            .wait_until(Predicate::PoseIs(trigger), predicate_timeout)
            .act(Action::PositionFunnels(pattern))
            .wait((cfg.swing_time - trigger_at).max(0.0));
        Self::sheathe_sword(script)
            .wait_for(Barrier::FunnelsSettled, predicate_timeout)
            .then(Step::Launch { stagger, damage })
            .wait_for(Barrier::FunnelsInCircle, predicate_timeout)
            .cooldown(cfg.melee_cooldown)
    }
}

impl BossBehavior for Swordsman {
    fn kind(&self) -> BossKind {
        BossKind::Swordsman
    }

    fn thresholds(&self) -> &PhaseThresholds {
        &self.thresholds
    }

    fn funnel_settings(&self) -> Option<FunnelSettings> {
        Some(self.config.funnels.clone())
    }

    fn active_body_tag(&self) -> DamageTag {
        DamageTag::Immune
    }

    fn eligible(&self, hp_ratio: f32) -> Eligible {
        let below_half = self.thresholds.band_for(hp_ratio) > 0;
        let mut commands: Eligible = self
            .table(below_half)
            .entries()
            .iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(c, _)| *c)
            .collect();
        commands.push(Command::MeleeAttack);
        commands
    }

    fn decide(
        &self,
        ctx: &DecisionContext,
        state: &mut SelectionState,
        rng: &mut GameRng,
    ) -> Option<Decision> {
        let crossed = self.thresholds.band_for(ctx.hp_ratio) > 0;
        state.latches.fire_once(Latch::BelowHalf, crossed);
        let below_half = state.latches.is_set(Latch::BelowHalf);

        let in_range = ctx
            .target_dx()
            .is_some_and(|dx| dx <= self.config.melee_range);
        let ready = |ready_time: f32| {
            ctx.funnel_count > 0
                && ctx.funnels_in_circle
                && ctx.since_funnels_returned >= ready_time
        };
        if !in_range && !ready(state.ready_time) {
            return None;
        }

        if ctx.funnel_count > 0 {
            let drawn = state
                .selector
                .draw(self.table(below_half), None, ctx.last_command, rng);
            if let Some(Command::Volley(pattern)) = drawn {
                state.ready_time = self.config.ready_time(pattern);
                if ready(state.ready_time) {
                    return Some(Decision::new(
                        Command::Volley(pattern),
                        self.volley_script(pattern, below_half, ctx.predicate_timeout),
                    ));
                }
            }
        }

        Some(Decision::new(Command::MeleeAttack, self.swing_script()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::{Rect, Vec2};

    fn context(hp_ratio: f32, dx: f32, since_returned: f32) -> DecisionContext {
        DecisionContext {
            hp_ratio,
            origin: Vec2::ZERO,
            target: Some(Vec2::new(dx, 0.0)),
            bounds: Rect::new(-20.0, -2.0, 20.0, 30.0),
            facing: 1.0,
            last_command: Command::None,
            funnels_in_circle: true,
            since_funnels_returned: since_returned,
            funnel_count: 5,
            predicate_timeout: Some(6.0),
        }
    }

    #[test]
    fn test_idles_when_far_and_not_ready() {
        let boss = Swordsman::new(SwordsmanConfig::default());
        let mut state = SelectionState::default();
        let mut rng = GameRng::from_seed(1);
        assert!(boss.decide(&context(1.0, 12.0, 0.5), &mut state, &mut rng).is_none());
    }

    #[test]
    fn test_melee_when_close_and_funnels_busy() {
        let boss = Swordsman::new(SwordsmanConfig::default());
        let mut state = SelectionState::default();
        let mut rng = GameRng::from_seed(1);
        let decision = boss
            .decide(&context(1.0, 2.0, 0.0), &mut state, &mut rng)
            .unwrap();
        assert_eq!(decision.command, Command::MeleeAttack);
        assert_eq!(decision.script.cooldown, 1.5);
    }

    #[test]
    fn test_volley_when_ready() {
        let boss = Swordsman::new(SwordsmanConfig::default());
        let mut state = SelectionState::default();
        let mut rng = GameRng::from_seed(1);
        let decision = boss
            .decide(&context(1.0, 12.0, 10.0), &mut state, &mut rng)
            .unwrap();
        assert!(matches!(decision.command, Command::Volley(_)));
        assert!(boss.eligible(1.0).contains(&decision.command));
        assert!(decision
            .script
            .steps
            .iter()
            .any(|s| matches!(s, Step::Launch { .. })));
    }

    #[test]
    fn test_below_half_table_is_sticky() {
        let boss = Swordsman::new(SwordsmanConfig::default());
        let mut state = SelectionState::default();
        let mut rng = GameRng::from_seed(9);

        boss.decide(&context(0.5, 12.0, 10.0), &mut state, &mut rng);
        assert!(state.latches.is_set(Latch::BelowHalf));

        for _ in 0..50 {
            let decision = boss
                .decide(&context(0.9, 12.0, 10.0), &mut state, &mut rng)
                .unwrap();
            assert_ne!(decision.command, Command::Volley(FunnelPattern::StraightDown));
        }
    }

    #[test]
    fn test_target_player_damage_depends_on_half() {
        let boss = Swordsman::new(SwordsmanConfig::default());
        let cfg = boss.config();
        assert_eq!(
            boss.launch_profile(FunnelPattern::TargetPlayer, false),
            (cfg.target_stagger, cfg.target_damage_above_half)
        );
        assert_eq!(
            boss.launch_profile(FunnelPattern::TargetPlayer, true),
            (cfg.target_stagger, cfg.target_damage_below_half)
        );
        assert_eq!(boss.launch_profile(FunnelPattern::Cross, true).0, 0.0);
    }
}
