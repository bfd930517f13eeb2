//! BossArena - Boss Encounter Orchestration Engine
//!
//! Watch a boss fight a scripted challenger, or run the fight headless.

use bevy::prelude::*;
use bevy_egui::EguiPlugin;

use bossarena::cli::{self, Args};
use bossarena::combat::components::ChallengerSettings;
use bossarena::combat::EncounterPlugin;
use bossarena::config::{BossKind, BossRoster, BOSS_CONFIG_PATH};
use bossarena::headless::{run_headless_fight, HeadlessFightConfig};
use bossarena::view::ViewPlugin;

fn main() {
    let args = cli::parse_args();

    if let Some(path) = &args.headless {
        if let Err(e) = run_headless(path, &args) {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        return;
    }

    let boss = match args.boss.as_deref().map(BossKind::parse).transpose() {
        Ok(boss) => boss.unwrap_or(BossKind::Golem),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    App::new()
        // Bevy default plugins with custom window settings
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "BossArena".to_string(),
                resolution: (1280.0, 720.0).into(),
                resizable: true,
                ..default()
            }),
            ..default()
        }))
        .add_plugins((
            EguiPlugin,
            EncounterPlugin,
            ViewPlugin {
                boss,
                roster: BossRoster::load_or_default(BOSS_CONFIG_PATH),
                seed: args.seed,
                challenger: ChallengerSettings::default(),
            },
        ))
        .run();
}

fn run_headless(path: &std::path::Path, args: &Args) -> Result<(), String> {
    let mut config = HeadlessFightConfig::load_from_file(path)?;
    if let Some(boss) = &args.boss {
        config.boss = boss.clone();
    }
    if let Some(secs) = args.max_duration {
        config.max_duration_secs = secs;
    }
    if let Some(seed) = args.seed {
        config.random_seed = Some(seed);
    }
    if let Some(output) = &args.output {
        config.output_path = Some(output.to_string_lossy().into_owned());
    }
    if let Some(result) = &args.result {
        config.result_path = Some(result.to_string_lossy().into_owned());
    }

    run_headless_fight(config).map(|_| ())
}
