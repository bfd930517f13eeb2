//! Damage-eligibility tags
//!
//! Every hitbox the boss owns (body, detachable parts, funnels, projectiles) carries a
//! two-state tag. The collision system only reads tags; the sequencer and the sub-actor
//! controller are the only writers.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Whether a hitbox may transmit damage to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DamageTag {
    #[default]
    Immune,
    Damageable,
}

impl DamageTag {
    pub fn is_damageable(self) -> bool {
        self == DamageTag::Damageable
    }
}

/// Detachable body parts that can be shown, hidden and tagged mid-sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Part {
    Sword,
    Hammer,
    Arm,
}

impl Part {
    pub fn name(&self) -> &'static str {
        match self {
            Part::Sword => "Sword",
            Part::Hammer => "Hammer",
            Part::Arm => "Arm",
        }
    }
}

/// Identifies a single hitbox owned by an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitboxId {
    Body,
    Part(Part),
    Funnel(usize),
    Projectile(u32),
}

/// Visibility and tag of one detachable part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartState {
    pub part: Part,
    pub visible: bool,
    pub tag: DamageTag,
}

/// Tags for the body and the parts a boss was configured with.
///
/// Funnel and projectile tags live on the sub-actors themselves; this table only covers
/// hitboxes attached to the boss.
#[derive(Debug, Clone, Default)]
pub struct HitboxTable {
    body: DamageTag,
    parts: SmallVec<[PartState; 3]>,
}

impl HitboxTable {
    pub fn new(parts: &[Part]) -> Self {
        Self {
            body: DamageTag::Immune,
            parts: parts
                .iter()
                .map(|&part| PartState {
                    part,
                    visible: false,
                    tag: DamageTag::Immune,
                })
                .collect(),
        }
    }

    pub fn body(&self) -> DamageTag {
        self.body
    }

    pub fn set_body(&mut self, tag: DamageTag) {
        self.body = tag;
    }

    pub fn part(&self, part: Part) -> Option<&PartState> {
        self.parts.iter().find(|p| p.part == part)
    }

    pub fn parts(&self) -> impl Iterator<Item = &PartState> {
        self.parts.iter()
    }

    /// Set a part's tag. Returns false when the boss has no such part.
    pub fn set_part_tag(&mut self, part: Part, tag: DamageTag) -> bool {
        match self.parts.iter_mut().find(|p| p.part == part) {
            Some(state) => {
                state.tag = tag;
                true
            }
            None => false,
        }
    }

    /// Show or hide a part. Returns false when the boss has no such part.
    pub fn set_part_visible(&mut self, part: Part, visible: bool) -> bool {
        match self.parts.iter_mut().find(|p| p.part == part) {
            Some(state) => {
                state.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Hide every part and make it Immune. The body tag is left alone.
    pub fn stow_parts(&mut self) {
        for state in self.parts.iter_mut() {
            state.visible = false;
            state.tag = DamageTag::Immune;
        }
    }

    /// Everything Immune, parts hidden.
    pub fn disarm_all(&mut self) {
        self.body = DamageTag::Immune;
        self.stow_parts();
    }

    pub fn all_immune(&self) -> bool {
        self.body == DamageTag::Immune && self.parts.iter().all(|p| p.tag == DamageTag::Immune)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_is_immune_and_hidden() {
        let table = HitboxTable::new(&[Part::Sword]);
        assert!(table.all_immune());
        assert!(!table.part(Part::Sword).unwrap().visible);
    }

    #[test]
    fn test_unknown_part_is_rejected() {
        let mut table = HitboxTable::new(&[Part::Hammer]);
        assert!(!table.set_part_tag(Part::Sword, DamageTag::Damageable));
        assert!(table.part(Part::Sword).is_none());
        assert!(table.all_immune());
    }

    #[test]
    fn test_disarm_all_resets_body_and_parts() {
        let mut table = HitboxTable::new(&[Part::Hammer, Part::Arm]);
        table.set_body(DamageTag::Damageable);
        table.set_part_tag(Part::Arm, DamageTag::Damageable);
        table.set_part_visible(Part::Hammer, true);

        table.disarm_all();

        assert!(table.all_immune());
        assert!(table.parts().all(|p| !p.visible));
    }
}
