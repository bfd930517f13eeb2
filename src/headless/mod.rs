//! Headless mode for automated fights
//!
//! This module runs a boss fight against a scripted challenger without any graphical
//! output, suitable for automated testing and balance sweeps.
//!
//! ## Usage
//!
//! ```bash
//! # Run a headless fight
//! cargo run --release -- --headless fight_config.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "boss": "Swordsman",
//!   "max_duration_secs": 120,
//!   "random_seed": 42,
//!   "challenger": { "dps": 30, "preferred_distance": 3.5 },
//!   "result_path": "fight_result.json"
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::HeadlessFightConfig;
pub use runner::{run_fight, run_headless_fight, FightResult, FightWinner};
