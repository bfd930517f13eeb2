//! Integration tests for headless fight execution
//!
//! These tests verify that:
//! - Headless fights run to completion within their time limit
//! - Fight results are accessible programmatically
//! - Seeded RNG produces deterministic results

use bossarena::combat::components::ChallengerSettings;
use bossarena::headless::runner::write_result;
use bossarena::headless::{run_fight, FightWinner, HeadlessFightConfig};
use bossarena::BossKind;

/// Helper to create a short fight config that writes its log to a temp file
fn create_config(boss: &str, seed: Option<u64>, max_duration_secs: f32) -> HeadlessFightConfig {
    let log_path = std::env::temp_dir().join(format!(
        "bossarena_{}_{}_{}.txt",
        boss,
        seed.unwrap_or_default(),
        std::process::id()
    ));
    HeadlessFightConfig {
        boss: boss.to_string(),
        max_duration_secs,
        random_seed: seed,
        output_path: Some(log_path.to_string_lossy().into_owned()),
        ..HeadlessFightConfig::default()
    }
}

// =============================================================================
// Fight Completion Tests
// =============================================================================

#[test]
fn test_fight_completes_within_duration() {
    let config = create_config("Golem", Some(42), 20.0);
    let result = run_fight(config).expect("fight should complete");

    assert_eq!(result.boss, BossKind::Golem);
    assert_eq!(result.random_seed, Some(42));
    assert!(result.duration > 0.0);
    assert!(
        result.duration <= 20.0 + 0.1,
        "Fight ran past its limit: {}s",
        result.duration
    );
    assert!(result.boss_hp <= result.boss_max_hp);
}

#[test]
fn test_passive_challenger_draws() {
    let mut config = create_config("Swordsman", Some(3), 5.0);
    config.challenger = ChallengerSettings {
        max_hp: 1.0e9,
        dps: 0.0,
        ..ChallengerSettings::default()
    };

    let result = run_fight(config).expect("fight should complete");

    assert_eq!(result.winner, FightWinner::Draw);
    assert_eq!(result.boss_hp, result.boss_max_hp);
    assert!(result.challenger_hp > 0.0);
}

#[test]
fn test_overwhelming_challenger_wins() {
    let mut config = create_config("Golem", Some(5), 30.0);
    config.challenger = ChallengerSettings {
        max_hp: 1.0e9,
        dps: 5000.0,
        ..ChallengerSettings::default()
    };

    let result = run_fight(config).expect("fight should complete");

    assert_eq!(result.winner, FightWinner::Challenger);
    assert_eq!(result.boss_hp, 0.0);
    assert!(result.damage_dealt >= result.boss_max_hp - 0.01);
    assert!(result.duration < 30.0);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = create_config("Dragon", None, 10.0);
    assert!(run_fight(config).is_err());

    let mut config = create_config("Wolf", None, 10.0);
    config.challenger.reach = 1.0;
    assert!(run_fight(config).is_err());
}

// =============================================================================
// Determinism Tests
// =============================================================================

#[test]
fn test_same_seed_same_result() {
    let first = run_fight(create_config("Wolf", Some(7), 30.0)).expect("fight should complete");
    let second = run_fight(create_config("Wolf", Some(7), 30.0)).expect("fight should complete");

    assert_eq!(first, second);
    assert!(!first.commands.is_empty(), "Wolf never attacked");
}

// =============================================================================
// Result Output Tests
// =============================================================================

#[test]
fn test_result_json_output() {
    let result_path = std::env::temp_dir().join(format!("bossarena_result_{}.json", std::process::id()));
    let mut config = create_config("Swordsman", Some(11), 10.0);
    config.result_path = Some(result_path.to_string_lossy().into_owned());

    let result = run_fight(config).expect("fight should complete");

    let contents = std::fs::read_to_string(&result_path).expect("result file should exist");
    let json: serde_json::Value = serde_json::from_str(&contents).expect("result should be JSON");
    assert_eq!(json["boss"], "Swordsman");
    assert_eq!(json["random_seed"], 11);
    assert_eq!(
        json["commands"].as_array().map(|c| c.len()),
        Some(result.commands.len())
    );

    let _ = std::fs::remove_file(&result_path);
}

#[test]
fn test_write_result_reports_bad_path() {
    let result = run_fight(create_config("Golem", Some(1), 2.0)).expect("fight should complete");
    let err = write_result(&result, "/nonexistent_dir/result.json").unwrap_err();
    assert!(err.contains("/nonexistent_dir/result.json"));
}

#[test]
fn test_summary_mentions_boss_and_winner() {
    let result = run_fight(create_config("Wolf", Some(2), 3.0)).expect("fight should complete");
    let summary = result.summary();
    assert!(summary.starts_with("Wolf fight:"));
    assert!(summary.contains(&format!("{:?}", result.winner)));
}
