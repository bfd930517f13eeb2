use serde::{Deserialize, Serialize};

use super::funnels::FunnelPattern;

/// Shot patterns of the howling boss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShotPattern {
    /// One lobbed shot at the player.
    SingleArc,
    /// Three lobbed shots with a random gap.
    TripleArc,
    /// Drops from the ceiling around the player.
    Rain,
    /// Shots that descend to a line and then fly level.
    FlatShot,
    /// Charged fan of shots.
    ArcUltimate,
}

/// What an encounter is currently doing.
///
/// `None` is the only state from which the selector may choose a new command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Command {
    #[default]
    None,
    Walk,
    Dash,
    MeleeAttack,
    RangedAttack,
    Summon,
    ChargeAttack,
    /// A melee swing that sends the funnels out in the given pattern.
    Volley(FunnelPattern),
    /// A howl followed by a shot pattern.
    Howl(ShotPattern),
}

impl Command {
    pub fn is_none(&self) -> bool {
        *self == Command::None
    }

    /// Commands that only move the body.
    pub fn is_movement(&self) -> bool {
        matches!(self, Command::Walk | Command::Dash)
    }

    pub fn label(&self) -> String {
        match self {
            Command::Volley(pattern) => format!("Volley({})", pattern.name()),
            Command::Howl(pattern) => format!("Howl({:?})", pattern),
            other => format!("{:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_none() {
        assert!(Command::default().is_none());
    }

    #[test]
    fn test_movement_commands() {
        assert!(Command::Walk.is_movement());
        assert!(Command::Dash.is_movement());
        assert!(!Command::RangedAttack.is_movement());
        assert!(!Command::Volley(FunnelPattern::Cross).is_movement());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Command::Volley(FunnelPattern::TargetPlayer).label(), "Volley(TargetPlayer)");
        assert_eq!(Command::Howl(ShotPattern::Rain).label(), "Howl(Rain)");
        assert_eq!(Command::ChargeAttack.label(), "ChargeAttack");
    }
}
