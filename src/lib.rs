//! BossArena - Boss Encounter Orchestration Engine
//!
//! Drives 2D action-game boss fights: HP-phased command selection, timed attack scripts,
//! funnel and projectile sub-actors, and the encounter lifecycle. The engine itself
//! (`encounter`, `bosses`) is framework-independent; `combat` runs it inside bevy.
//!
//! This library exposes the engine and its harnesses for testing and reuse.

pub mod bosses;
pub mod cli;
pub mod combat;
pub mod config;
pub mod encounter;
pub mod headless;
pub mod view;

// Re-export commonly used types
pub use combat::log::{EncounterLog, EncounterLogEventType};
pub use combat::EncounterPlugin;
pub use config::{BossKind, BossRoster};
pub use encounter::{Encounter, Lifecycle};
pub use headless::{FightResult, HeadlessFightConfig};
