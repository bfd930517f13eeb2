//! Debug view
//!
//! Windowed front end for watching an encounter against the scripted challenger:
//! - Gizmo rendering of the arena, bodies, hitboxes, funnels and projectiles
//! - Boss HP bar, shown only while the encounter is active
//! - Encounter log panel
//! - Time controls (`Space` pause, `1`-`4` speed) and `R` to reset the fight

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::combat::animation::PoseAnimator;
use crate::combat::components::{ArenaBounds, BossHealth, Challenger, ChallengerSettings, Velocity};
use crate::combat::log::{EncounterLog, EncounterLogEventType};
use crate::combat::{reset_boss, spawn_boss, spawn_challenger, SimulationSpeed};
use crate::config::{BossKind, BossRoster};
use crate::encounter::funnels::FunnelState;
use crate::encounter::rng::GameRng;
use crate::encounter::tag::DamageTag;
use crate::encounter::Encounter;

const BOSS_HOME: Vec2 = Vec2::new(8.0, 0.0);
const CHALLENGER_HOME: Vec2 = Vec2::new(-8.0, 0.0);
/// World units to pixels
const PIXELS_PER_UNIT: f32 = 20.0;

/// Plugin for the windowed debug view
pub struct ViewPlugin {
    pub boss: BossKind,
    pub roster: BossRoster,
    pub seed: Option<u64>,
    pub challenger: ChallengerSettings,
}

/// Fight setup the view spawns from
#[derive(Resource)]
struct ViewFight {
    boss: BossKind,
    roster: BossRoster,
    challenger: ChallengerSettings,
}

impl Plugin for ViewPlugin {
    fn build(&self, app: &mut App) {
        let rng = match self.seed {
            Some(seed) => GameRng::from_seed(seed),
            None => GameRng::from_entropy(),
        };
        app.insert_resource(ViewFight {
            boss: self.boss,
            roster: self.roster.clone(),
            challenger: self.challenger.clone(),
        })
        .insert_resource(rng)
        .add_systems(Startup, setup_view)
        .add_systems(Update, (handle_time_controls, handle_reset, draw_arena))
        .add_systems(Update, (render_boss_hud, render_log_panel).chain());
    }
}

fn setup_view(
    mut commands: Commands,
    fight: Res<ViewFight>,
    mut rng: ResMut<GameRng>,
    mut log: ResMut<EncounterLog>,
) {
    commands.spawn((
        Camera2d,
        OrthographicProjection {
            scale: 1.0 / PIXELS_PER_UNIT,
            ..OrthographicProjection::default_2d()
        },
        Transform::from_xyz(0.0, 8.0, 0.0),
    ));

    spawn_boss(&mut commands, fight.boss, &fight.roster, BOSS_HOME, rng.fork());
    spawn_challenger(&mut commands, fight.challenger.clone(), CHALLENGER_HOME);

    log.clear();
    log.log(
        EncounterLogEventType::MatchEvent,
        format!("{} fight started", fight.boss.name()),
    );
}

/// Handle time control keyboard input
///
/// - `Space`: pause / resume
/// - `1`: 0.5x speed
/// - `2`: 1x speed (normal)
/// - `3`: 2x speed
/// - `4`: 3x speed
fn handle_time_controls(keyboard: Res<ButtonInput<KeyCode>>, mut sim_speed: ResMut<SimulationSpeed>) {
    let old_multiplier = sim_speed.multiplier;

    if keyboard.just_pressed(KeyCode::Space) {
        if sim_speed.is_paused() {
            sim_speed.normal_speed();
        } else {
            sim_speed.pause();
        }
    }
    if keyboard.just_pressed(KeyCode::Digit1) {
        sim_speed.half_speed();
    }
    if keyboard.just_pressed(KeyCode::Digit2) {
        sim_speed.normal_speed();
    }
    if keyboard.just_pressed(KeyCode::Digit3) {
        sim_speed.double_speed();
    }
    if keyboard.just_pressed(KeyCode::Digit4) {
        sim_speed.triple_speed();
    }

    if sim_speed.multiplier != old_multiplier {
        if sim_speed.is_paused() {
            info!("Simulation PAUSED");
        } else {
            info!("Simulation running at {}x speed", sim_speed.multiplier);
        }
    }
}

#[allow(clippy::type_complexity)]
fn handle_reset(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut bosses: Query<
        (&mut Encounter, &mut BossHealth, &mut PoseAnimator, &mut Transform, &mut Velocity),
        Without<Challenger>,
    >,
    mut challengers: Query<(&mut Challenger, &mut Transform, &mut Velocity), Without<Encounter>>,
    mut log: ResMut<EncounterLog>,
) {
    if !keyboard.just_pressed(KeyCode::KeyR) {
        return;
    }
    for (mut encounter, mut health, mut animator, mut transform, mut velocity) in bosses.iter_mut() {
        reset_boss(&mut encounter, &mut health, &mut animator, &mut transform, BOSS_HOME);
        velocity.0 = Vec2::ZERO;
    }
    for (mut challenger, mut transform, mut velocity) in challengers.iter_mut() {
        *challenger = Challenger::new(challenger.settings.clone());
        transform.translation = CHALLENGER_HOME.extend(0.0);
        velocity.0 = Vec2::ZERO;
    }
    log.clear();
    log.log(EncounterLogEventType::Lifecycle, "Fight reset".to_string());
}

fn tag_color(tag: DamageTag) -> Color {
    match tag {
        DamageTag::Immune => Color::srgb(0.5, 0.5, 0.6),
        DamageTag::Damageable => Color::srgb(0.9, 0.25, 0.2),
    }
}

fn draw_arena(
    mut gizmos: Gizmos,
    bounds: Res<ArenaBounds>,
    bosses: Query<(&Transform, &Encounter)>,
    challengers: Query<(&Transform, &Challenger)>,
) {
    let area = bounds.0;
    gizmos.rect_2d(area.center(), area.size(), Color::srgb(0.3, 0.3, 0.35));
    gizmos.line_2d(
        Vec2::new(area.min.x, 0.0),
        Vec2::new(area.max.x, 0.0),
        Color::srgb(0.4, 0.35, 0.3),
    );

    for (transform, challenger) in challengers.iter() {
        let color = if challenger.invulnerable_for > 0.0 {
            Color::srgb(0.6, 0.8, 1.0)
        } else {
            Color::srgb(0.2, 0.5, 0.9)
        };
        gizmos.circle_2d(transform.translation.truncate(), challenger.settings.radius, color);
    }

    for (transform, encounter) in bosses.iter() {
        let origin = transform.translation.truncate();
        let settings = encounter.settings();
        gizmos.circle_2d(origin, settings.body_radius, tag_color(encounter.hitboxes().body()));

        if !encounter.is_active() {
            // Activation range while dormant
            if !encounter.is_defeated() {
                gizmos.circle_2d(origin, settings.activation_range, Color::srgba(1.0, 1.0, 1.0, 0.1));
            }
            continue;
        }

        for part in encounter.hitboxes().parts() {
            let Some(part_settings) = settings.part(part.part) else {
                continue;
            };
            if part.visible {
                let center = origin
                    + Vec2::new(part_settings.offset[0] * encounter.facing(), part_settings.offset[1]);
                gizmos.circle_2d(center, part_settings.radius, tag_color(part.tag));
            }
        }

        let funnel_radius = encounter.funnels().settings().radius;
        for funnel in encounter.funnels().funnels() {
            if !funnel.active {
                continue;
            }
            let color = match funnel.state {
                FunnelState::Attacking => tag_color(funnel.tag),
                FunnelState::Returning => Color::srgb(0.8, 0.7, 0.2),
                _ => Color::srgb(0.6, 0.6, 0.8),
            };
            gizmos.circle_2d(funnel.position, funnel_radius, color);
        }

        for shot in encounter.projectiles().iter() {
            gizmos.circle_2d(shot.position, shot.radius, tag_color(shot.tag));
        }
    }
}

/// Boss name and HP bar across the top of the screen while the encounter is active
fn render_boss_hud(
    mut contexts: EguiContexts,
    bosses: Query<(&Encounter, &BossHealth)>,
    sim_speed: Res<SimulationSpeed>,
) {
    let Some(ctx) = contexts.try_ctx_mut() else { return; };

    egui::TopBottomPanel::top("boss_hud")
        .frame(egui::Frame::none().fill(egui::Color32::from_black_alpha(160)).inner_margin(egui::Margin::same(8.0)))
        .show(ctx, |ui| {
            for (encounter, health) in bosses.iter() {
                if !encounter.is_active() {
                    continue;
                }
                let ratio = if health.max > 0.0 { health.current / health.max } else { 0.0 };
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(encounter.kind().name())
                            .size(18.0)
                            .color(egui::Color32::from_rgb(230, 204, 153)),
                    );
                    ui.add(
                        egui::ProgressBar::new(ratio)
                            .desired_width(400.0)
                            .fill(egui::Color32::from_rgb(170, 40, 40))
                            .text(format!("{:.0} / {:.0}", health.current, health.max)),
                    );
                    ui.label(
                        egui::RichText::new(encounter.command().label())
                            .size(14.0)
                            .color(egui::Color32::from_rgb(180, 180, 180)),
                    );
                });
            }

            let speed_text = if sim_speed.is_paused() {
                "PAUSED".to_string()
            } else {
                format!("{}x", sim_speed.multiplier)
            };
            ui.label(egui::RichText::new(speed_text).size(12.0));
        });
}

/// Scrollable encounter log, color-coded by event type
fn render_log_panel(mut contexts: EguiContexts, log: Res<EncounterLog>) {
    let Some(ctx) = contexts.try_ctx_mut() else { return; };

    egui::SidePanel::left("encounter_log")
        .default_width(320.0)
        .resizable(true)
        .frame(egui::Frame::side_top_panel(&ctx.style())
            .fill(egui::Color32::from_black_alpha(180))
            .stroke(egui::Stroke::NONE))
        .show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for entry in &log.entries {
                        let color = match entry.event_type {
                            EncounterLogEventType::Damage => egui::Color32::from_rgb(255, 180, 180),
                            EncounterLogEventType::Lifecycle => egui::Color32::from_rgb(200, 200, 100),
                            EncounterLogEventType::Command => egui::Color32::from_rgb(180, 220, 255),
                            EncounterLogEventType::MatchEvent => egui::Color32::from_rgb(200, 200, 100),
                            _ => egui::Color32::from_rgb(200, 200, 200),
                        };
                        ui.label(
                            egui::RichText::new(format!("[{:>5.1}s] {}", entry.timestamp, entry.message))
                                .size(12.0)
                                .color(color),
                        );
                    }
                });
        });
}
