//! Headless fight execution
//!
//! Runs a boss fight against the scripted challenger without any graphical output,
//! suitable for automated testing and tuning sweeps.

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use serde::Serialize;
use std::time::Duration;

use crate::combat::components::{BossHealth, Challenger, ChallengerSettings};
use crate::combat::events::{ChallengerHit, CommandStarted};
use crate::combat::log::{EncounterLog, EncounterLogEventType};
use crate::combat::systems::log_boss_hp;
use crate::combat::{spawn_boss, spawn_challenger, EncounterPlugin, SimulationSpeed, SIMULATION_HZ};
use crate::config::{BossKind, BossRoster};
use crate::encounter::rng::GameRng;
use crate::encounter::Encounter;

use super::config::HeadlessFightConfig;

/// Where the boss stands when the fight starts
const BOSS_SPAWN: Vec2 = Vec2::new(8.0, 0.0);
/// Where the challenger starts, outside every boss's activation range
const CHALLENGER_SPAWN: Vec2 = Vec2::new(-8.0, 0.0);

/// Who won a headless fight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FightWinner {
    Boss,
    Challenger,
    /// Timed out with both sides standing
    Draw,
}

/// Result of a completed headless fight
///
/// This struct provides programmatic access to fight results for testing and analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FightResult {
    pub boss: BossKind,
    pub winner: FightWinner,
    /// Fight duration in seconds
    pub duration: f32,
    pub boss_hp: f32,
    pub boss_max_hp: f32,
    pub challenger_hp: f32,
    /// Every command the boss started, in order
    pub commands: Vec<String>,
    /// Hits the challenger took from boss hitboxes
    pub hits_taken: u32,
    pub damage_dealt: f32,
    pub damage_taken: f32,
    /// Random seed used (if deterministic mode)
    pub random_seed: Option<u64>,
}

impl FightResult {
    /// One-line summary, also used as the fight log header
    pub fn summary(&self) -> String {
        format!(
            "{} fight: {:?} after {:.1}s | boss {:.0}/{:.0} HP | challenger {:.0} HP, {} hits taken | {} commands | seed {:?}",
            self.boss.name(),
            self.winner,
            self.duration,
            self.boss_hp,
            self.boss_max_hp,
            self.challenger_hp,
            self.hits_taken,
            self.commands.len(),
            self.random_seed
        )
    }
}

/// Resource to track headless fight state
#[derive(Resource)]
pub struct HeadlessFightState {
    pub boss: BossKind,
    /// Maximum fight duration before declaring a draw
    pub max_duration: f32,
    /// Elapsed fight time
    pub elapsed_time: f32,
    /// Custom output path for the fight log
    pub output_path: Option<String>,
    /// Custom output path for the JSON result
    pub result_path: Option<String>,
    /// Whether the fight has completed
    pub fight_complete: bool,
    /// Random seed for deterministic simulation (if provided)
    pub random_seed: Option<u64>,
    /// Commands started so far
    pub commands: Vec<String>,
    /// Fight result (populated when the fight completes)
    pub result: Option<FightResult>,
}

/// Roster and challenger the setup system spawns from
#[derive(Resource)]
struct FightSetup {
    roster: BossRoster,
    challenger: ChallengerSettings,
}

/// Plugin for headless fight execution
pub struct HeadlessPlugin {
    pub config: HeadlessFightConfig,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        let boss = self
            .config
            .boss_kind()
            .expect("Invalid fight configuration");

        app.add_plugins(EncounterPlugin)
            .insert_resource(FightSetup {
                roster: self.config.roster(),
                challenger: self.config.challenger.clone(),
            })
            .insert_resource(HeadlessFightState {
                boss,
                max_duration: self.config.max_duration_secs,
                elapsed_time: 0.0,
                output_path: self.config.output_path.clone(),
                result_path: self.config.result_path.clone(),
                fight_complete: false,
                random_seed: self.config.random_seed,
                commands: Vec::new(),
                result: None,
            })
            // One fixed step per frame, independent of wall-clock time
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
                1.0 / SIMULATION_HZ,
            )))
            .add_systems(Startup, headless_setup_fight)
            .add_systems(
                FixedUpdate,
                (
                    headless_track_time,
                    headless_record_commands,
                    headless_check_fight_end,
                )
                    .chain()
                    .after(log_boss_hp),
            )
            .add_systems(PostUpdate, headless_exit_on_complete);
    }
}

/// Setup system for headless fight
fn headless_setup_fight(
    mut commands: Commands,
    setup: Res<FightSetup>,
    state: Res<HeadlessFightState>,
    mut log: ResMut<EncounterLog>,
) {
    log.clear();
    log.log(
        EncounterLogEventType::MatchEvent,
        format!("{} fight started (headless mode)", state.boss.name()),
    );

    commands.insert_resource(SimulationSpeed { multiplier: 1.0 });

    // Initialize GameRng with seed if provided (deterministic mode)
    let mut game_rng = match state.random_seed {
        Some(seed) => {
            info!("Using deterministic RNG with seed: {}", seed);
            GameRng::from_seed(seed)
        }
        None => {
            info!("Using non-deterministic RNG (no seed provided)");
            GameRng::from_entropy()
        }
    };

    spawn_boss(
        &mut commands,
        state.boss,
        &setup.roster,
        BOSS_SPAWN,
        game_rng.fork(),
    );
    spawn_challenger(&mut commands, setup.challenger.clone(), CHALLENGER_SPAWN);
    commands.insert_resource(game_rng);

    info!("Headless fight setup complete: {}", state.boss.name());
}

/// Track elapsed fight time (used for timeout detection)
fn headless_track_time(time: Res<Time>, mut state: ResMut<HeadlessFightState>) {
    if !state.fight_complete {
        state.elapsed_time += time.delta_secs();
    }
}

fn headless_record_commands(
    mut started: EventReader<CommandStarted>,
    mut hits: EventReader<ChallengerHit>,
    mut state: ResMut<HeadlessFightState>,
) {
    for event in started.read() {
        state.commands.push(event.command.label());
    }
    for event in hits.read() {
        debug!("Challenger hit for {:.0}", event.damage);
    }
}

/// Check if the fight has ended (boss defeated, challenger down, or timeout)
fn headless_check_fight_end(
    bosses: Query<(&Encounter, &BossHealth)>,
    challengers: Query<&Challenger>,
    mut log: ResMut<EncounterLog>,
    mut state: ResMut<HeadlessFightState>,
) {
    if state.fight_complete {
        return;
    }

    let boss_down =
        !bosses.is_empty() && bosses.iter().all(|(encounter, _)| encounter.is_defeated());
    let challenger_down =
        !challengers.is_empty() && challengers.iter().all(|c| !c.is_alive());

    let winner = if boss_down {
        info!("Fight ended! The challenger wins!");
        FightWinner::Challenger
    } else if challenger_down {
        info!("Fight ended! The boss wins!");
        FightWinner::Boss
    } else if state.elapsed_time >= state.max_duration {
        info!("Fight timed out after {:.1}s - declaring DRAW", state.elapsed_time);
        FightWinner::Draw
    } else {
        return;
    };

    let (boss_hp, boss_max_hp) = bosses
        .iter()
        .next()
        .map_or((0.0, 0.0), |(_, health)| (health.current, health.max));
    let challenger = challengers.iter().next();

    let result = FightResult {
        boss: state.boss,
        winner,
        duration: state.elapsed_time,
        boss_hp,
        boss_max_hp,
        challenger_hp: challenger.map_or(0.0, |c| c.hp),
        commands: state.commands.clone(),
        hits_taken: challenger.map_or(0, |c| c.hits_taken),
        damage_dealt: challenger.map_or(0.0, |c| c.damage_dealt),
        damage_taken: challenger.map_or(0.0, |c| c.damage_taken),
        random_seed: state.random_seed,
    };

    log.log(
        EncounterLogEventType::MatchEvent,
        format!("Fight ended: {:?}", winner),
    );
    save_fight_output(&log, &result, &state);

    state.result = Some(result);
    state.fight_complete = true;
}

/// Save the fight log and, if requested, the JSON result
fn save_fight_output(log: &EncounterLog, result: &FightResult, state: &HeadlessFightState) {
    match log.save_to_file(&result.summary(), state.output_path.as_deref()) {
        Ok(filename) => {
            println!("Fight complete. Log saved to: {}", filename);
        }
        Err(e) => {
            eprintln!("Failed to save fight log: {}", e);
        }
    }

    if let Some(path) = &state.result_path {
        if let Err(e) = write_result(result, path) {
            eprintln!("{}", e);
        }
    }
}

/// Write a fight result as pretty JSON
pub fn write_result(result: &FightResult, path: &str) -> Result<(), String> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| format!("Failed to serialize fight result: {}", e))?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {}", path, e))
}

/// Exit the app when the fight is complete
fn headless_exit_on_complete(state: Res<HeadlessFightState>, mut exit: EventWriter<AppExit>) {
    if state.fight_complete {
        exit.send(AppExit::Success);
    }
}

/// Build the headless app without running it
pub fn build_headless_app(config: HeadlessFightConfig) -> App {
    let mut app = App::new();
    app
        // Minimal plugins - no window, no rendering
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::ZERO)))
        // Transform and hierarchy plugins needed for entity positions
        .add_plugins(TransformPlugin)
        .add_plugins(HierarchyPlugin)
        .add_plugins(HeadlessPlugin { config });
    app
}

/// Step a headless app frame by frame until the fight completes
///
/// The app is left in its final state so the world (log, entities) can be inspected.
pub fn run_to_completion(app: &mut App) -> Result<FightResult, String> {
    app.finish();
    app.cleanup();

    let max_duration = app
        .world()
        .get_resource::<HeadlessFightState>()
        .map(|s| s.max_duration)
        .ok_or_else(|| "HeadlessPlugin is missing from the app".to_string())?;
    // Startup frame, plus slack for fixed-step rounding
    let max_frames = (max_duration as f64 * SIMULATION_HZ).ceil() as u64 + 120;

    for _ in 0..max_frames {
        app.update();
        let state = app.world().resource::<HeadlessFightState>();
        if let Some(result) = &state.result {
            return Ok(result.clone());
        }
    }
    Err(format!("Fight did not complete within {} frames", max_frames))
}

/// Run a headless fight and return its result
pub fn run_fight(config: HeadlessFightConfig) -> Result<FightResult, String> {
    config.validate()?;
    run_to_completion(&mut build_headless_app(config))
}

/// Run a headless fight with the given configuration, logging to stdout
pub fn run_headless_fight(config: HeadlessFightConfig) -> Result<FightResult, String> {
    config.validate()?;
    println!("Starting headless fight simulation...");
    println!("  Boss: {}", config.boss);
    println!("  Max duration: {:.0}s", config.max_duration_secs);
    if let Some(seed) = config.random_seed {
        println!("  Seed: {}", seed);
    }

    let mut app = build_headless_app(config);
    app.add_plugins(LogPlugin::default());
    let result = run_to_completion(&mut app)?;
    println!("{}", result.summary());
    Ok(result)
}
