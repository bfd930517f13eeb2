//! Command-line interface for BossArena
//!
//! Supports both the windowed debug view (default) and headless fights.

use clap::Parser;
use std::path::PathBuf;

/// Boss encounter sandbox
#[derive(Parser, Debug)]
#[command(name = "bossarena")]
#[command(about = "Boss encounter sandbox with a scripted challenger")]
#[command(version)]
pub struct Args {
    /// Run in headless mode with the specified JSON config file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub headless: Option<PathBuf>,

    /// Output path for the fight log (headless mode only)
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Write the fight result as JSON (headless mode only)
    #[arg(long, value_name = "RESULT_PATH")]
    pub result: Option<PathBuf>,

    /// Maximum fight duration in seconds (headless mode only, overrides the config)
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Boss to fight: Swordsman, Golem or Wolf (overrides the config)
    #[arg(long)]
    pub boss: Option<String>,

    /// Random seed for a reproducible fight (overrides the config)
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_flags() {
        let args = Args::parse_from([
            "bossarena",
            "--headless",
            "fight.json",
            "--boss",
            "wolf",
            "--seed",
            "7",
            "--max-duration",
            "30",
        ]);
        assert_eq!(args.headless, Some(PathBuf::from("fight.json")));
        assert_eq!(args.boss.as_deref(), Some("wolf"));
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.max_duration, Some(30.0));
        assert!(args.output.is_none());
    }
}
