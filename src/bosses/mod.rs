//! Boss behaviors
//!
//! Each boss decides its next command and authors the script that performs it. The
//! engine owns everything else (lifecycle, sub-actors, running the script), so a boss is
//! just tuning plus a decision routine.
//!
//! ## Adding a new boss
//! 1. Add a variant to [`BossKind`]
//! 2. Add its tuning section to `BossRoster` and `bosses.ron`
//! 3. Create a new file implementing [`BossBehavior`]
//! 4. Register it in [`get_boss_behavior`]

pub mod golem;
pub mod swordsman;
pub mod wolf;

use smallvec::SmallVec;

use crate::config::{BossKind, BossRoster};
use crate::encounter::command::Command;
use crate::encounter::funnels::FunnelSettings;
use crate::encounter::phase::PhaseThresholds;
use crate::encounter::rng::GameRng;
use crate::encounter::sequencer::PoseBinding;
use crate::encounter::services::Pose;
use crate::encounter::tag::DamageTag;
use crate::encounter::{Decision, DecisionContext, SelectionState};

pub use golem::Golem;
pub use swordsman::Swordsman;
pub use wolf::Wolf;

/// Commands a boss may choose in one HP band.
pub type Eligible = SmallVec<[Command; 8]>;

/// Decision routine and script authoring for one boss.
pub trait BossBehavior: Send + Sync {
    fn kind(&self) -> BossKind;

    /// HP bands that gate which commands are eligible.
    fn thresholds(&self) -> &PhaseThresholds;

    /// Funnel ring for bosses that have one.
    fn funnel_settings(&self) -> Option<FunnelSettings> {
        None
    }

    /// Body tag while the encounter is active.
    fn active_body_tag(&self) -> DamageTag {
        DamageTag::Damageable
    }

    /// Every command that can be chosen at `hp_ratio`, regardless of distance or history.
    fn eligible(&self, hp_ratio: f32) -> Eligible;

    /// Choose the next command. `None` idles for this tick.
    fn decide(
        &self,
        ctx: &DecisionContext,
        state: &mut SelectionState,
        rng: &mut GameRng,
    ) -> Option<Decision>;
}

/// Build the behavior for a boss from the roster.
pub fn get_boss_behavior(kind: BossKind, roster: &BossRoster) -> Box<dyn BossBehavior> {
    match kind {
        BossKind::Swordsman => Box::new(Swordsman::new(roster.swordsman.clone())),
        BossKind::Golem => Box::new(Golem::new(roster.golem.clone())),
        BossKind::Wolf => Box::new(Wolf::new(roster.wolf.clone())),
    }
}

/// Part visible on `poses`, never harmful on its own.
pub(crate) fn show_on(poses: &[Pose]) -> PoseBinding {
    PoseBinding {
        visible_on: poses.iter().copied().collect(),
        damageable_on: None,
    }
}

/// Part visible on `poses` and harmful on all of them but the first.
pub(crate) fn strike_on(poses: &[Pose]) -> PoseBinding {
    PoseBinding {
        visible_on: poses.iter().copied().collect(),
        damageable_on: Some(poses.iter().skip(1).copied().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_every_boss() {
        let roster = BossRoster::default();
        for kind in BossKind::ALL {
            let behavior = get_boss_behavior(kind, &roster);
            assert_eq!(behavior.kind(), kind);
            assert!(behavior.thresholds().validate().is_ok());
        }
    }

    #[test]
    fn test_only_swordsman_has_funnels() {
        let roster = BossRoster::default();
        assert!(get_boss_behavior(BossKind::Swordsman, &roster)
            .funnel_settings()
            .is_some());
        assert!(get_boss_behavior(BossKind::Golem, &roster)
            .funnel_settings()
            .is_none());
        assert!(get_boss_behavior(BossKind::Wolf, &roster)
            .funnel_settings()
            .is_none());
    }

    #[test]
    fn test_strike_binding_spares_first_pose() {
        let binding = strike_on(&[Pose(1), Pose(2), Pose(3)]);
        assert_eq!(binding.visible_on.len(), 3);
        let damageable = binding.damageable_on.unwrap();
        assert!(!damageable.contains(&Pose(1)));
        assert!(damageable.contains(&Pose(3)));
    }
}
