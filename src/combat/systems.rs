//! Encounter systems
//!
//! ECS systems that drive encounters and the scripted challenger. They run chained in
//! `FixedUpdate`, scaled by [`SimulationSpeed`].

use bevy::prelude::*;

use crate::encounter::sequencer::SequencerStatus;
use crate::encounter::services::{Cue, EncounterEnv, HealthProvider};
use crate::encounter::tag::HitboxId;
use crate::encounter::Encounter;

use super::animation::PoseAnimator;
use super::components::*;
use super::events::*;
use super::log::{EncounterLog, EncounterLogEventType};
use super::SimulationSpeed;

/// Advance the fight clock used for log timestamps
pub fn advance_fight_clock(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    mut log: ResMut<EncounterLog>,
) {
    log.match_time += time.delta_secs() * speed.multiplier;
}

/// Play the current clip of every animator
pub fn advance_animations(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    mut animators: Query<&mut PoseAnimator>,
) {
    if speed.is_paused() {
        return;
    }
    let dt = time.delta_secs() * speed.multiplier;
    for mut animator in animators.iter_mut() {
        animator.advance(dt);
    }
}

/// Tick every encounter against the first living challenger
#[allow(clippy::too_many_arguments)]
pub fn tick_encounters(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    bounds: Res<ArenaBounds>,
    mut bosses: Query<
        (
            Entity,
            &mut Encounter,
            &BossHealth,
            &mut PoseAnimator,
            &Transform,
            &mut Velocity,
            &mut CueBuffer,
        ),
        Without<Challenger>,
    >,
    challengers: Query<(&Transform, &Challenger)>,
    mut log: ResMut<EncounterLog>,
    mut activated: EventWriter<EncounterActivated>,
    mut started: EventWriter<CommandStarted>,
    mut finished: EventWriter<CommandFinished>,
    mut defeated: EventWriter<BossDefeated>,
    mut cue_events: EventWriter<CueEvent>,
) {
    let dt = time.delta_secs() * speed.multiplier;
    let target: Option<Vec2> = challengers
        .iter()
        .find(|(_, c)| c.is_alive())
        .map(|(t, _)| t.translation.truncate());

    for (entity, mut encounter, health, mut animator, transform, mut velocity, mut buffer) in
        bosses.iter_mut()
    {
        let report = {
            let mut body = KinematicBody {
                position: transform.translation.truncate(),
                velocity: &mut *velocity,
            };
            let mut env = EncounterEnv {
                health,
                pause: &*speed,
                area: &*bounds,
                poses: &*animator,
                target: &target,
                cues: &mut *buffer,
                body: &mut body,
            };
            encounter.tick(dt, &mut env)
        };
        let name = encounter.kind().name();

        for cue in buffer.0.drain(..) {
            match cue {
                Cue::Animation(clip) => {
                    animator.play(clip);
                }
                Cue::Summon { count, at } => {
                    log.log(
                        EncounterLogEventType::Cue,
                        format!("{} summons {} minions at ({:.1}, {:.1})", name, count, at.x, at.y),
                    );
                }
                Cue::Sound(_) => {}
            }
            cue_events.send(CueEvent { boss: entity, cue });
        }

        if report.activated {
            log.log(
                EncounterLogEventType::Lifecycle,
                format!("{} encounter activated", name),
            );
            activated.send(EncounterActivated {
                boss: entity,
                kind: encounter.kind(),
            });
        }
        if let Some((command, status)) = report.finished {
            let timed_out = status == SequencerStatus::TimedOut;
            let verb = if timed_out { "abandoned" } else { "finished" };
            log.log(
                EncounterLogEventType::Command,
                format!("{} {} {}", name, verb, command.label()),
            );
            finished.send(CommandFinished {
                boss: entity,
                command,
                timed_out,
            });
        }
        if let Some(command) = report.started {
            log.log(
                EncounterLogEventType::Command,
                format!(
                    "{} chose {} at {:.0}% HP",
                    name,
                    command.label(),
                    health.hp_ratio() * 100.0
                ),
            );
            started.send(CommandStarted {
                boss: entity,
                command,
            });
        }
        for index in &report.funnels_left_bounds {
            log.log(
                EncounterLogEventType::SubActor,
                format!("{} funnel {} left the arena and is returning", name, index),
            );
        }
        if report.defeated {
            log.log(EncounterLogEventType::Lifecycle, format!("{} defeated", name));
            defeated.send(BossDefeated {
                boss: entity,
                kind: encounter.kind(),
            });
        }
    }
}

/// Move kinematic bodies by their velocity, keeping them inside the arena
pub fn integrate_velocity(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    bounds: Res<ArenaBounds>,
    mut bodies: Query<(&Velocity, &mut Transform)>,
) {
    if speed.is_paused() {
        return;
    }
    let dt = time.delta_secs() * speed.multiplier;
    for (velocity, mut transform) in bodies.iter_mut() {
        transform.translation.x += velocity.0.x * dt;
        transform.translation.y += velocity.0.y * dt;
        transform.translation.x = transform.translation.x.clamp(bounds.0.min.x, bounds.0.max.x);
    }
}

/// Scripted challenger: keep the preferred distance and chip at the boss while in reach
#[allow(clippy::type_complexity)]
pub fn drive_challengers(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    mut challengers: Query<(&mut Velocity, &Transform, &mut Challenger), Without<Encounter>>,
    mut bosses: Query<(Entity, &Transform, &Encounter, &mut BossHealth), Without<Challenger>>,
    mut hp_events: EventWriter<BossHpChanged>,
) {
    if speed.is_paused() {
        return;
    }
    let dt = time.delta_secs() * speed.multiplier;

    for (mut velocity, transform, mut challenger) in challengers.iter_mut() {
        challenger.invulnerable_for = (challenger.invulnerable_for - dt).max(0.0);
        velocity.0 = Vec2::ZERO;
        if !challenger.is_alive() {
            continue;
        }

        let position = transform.translation.truncate();
        let Some((boss, boss_transform, encounter, mut health)) = bosses
            .iter_mut()
            .find(|(_, _, encounter, _)| !encounter.is_defeated())
        else {
            continue;
        };

        let dx = boss_transform.translation.x - position.x;
        let distance = dx.abs();
        let preferred = challenger.settings.preferred_distance;
        const SLACK: f32 = 0.25;
        if distance > preferred + SLACK {
            velocity.0.x = dx.signum() * challenger.settings.speed;
        } else if distance < preferred - SLACK {
            velocity.0.x = -dx.signum() * challenger.settings.speed;
        }

        if distance <= challenger.settings.reach {
            let applied = health.apply_damage(challenger.settings.dps * dt, encounter.is_active());
            if applied > 0.0 {
                challenger.damage_dealt += applied;
                hp_events.send(BossHpChanged {
                    boss,
                    current: health.current,
                    max: health.max,
                    amount: applied,
                });
            }
        }
    }
}

/// Apply damage from every Damageable boss hitbox touching a challenger
pub fn apply_contact_damage(
    bosses: Query<(Entity, &Transform, &Encounter), Without<Challenger>>,
    mut challengers: Query<(Entity, &Transform, &mut Challenger), Without<Encounter>>,
    mut log: ResMut<EncounterLog>,
    mut hits: EventWriter<ChallengerHit>,
) {
    for (boss, boss_transform, encounter) in bosses.iter() {
        let zones = encounter.damaging_hitboxes(boss_transform.translation.truncate());
        if zones.is_empty() {
            continue;
        }
        for (entity, transform, mut challenger) in challengers.iter_mut() {
            let position = transform.translation.truncate();
            let radius = challenger.settings.radius;
            let Some(zone) = zones
                .iter()
                .find(|z| z.center.distance(position) <= z.radius + radius)
            else {
                continue;
            };
            if challenger.take_hit(zone.damage) {
                log.log(
                    EncounterLogEventType::Damage,
                    format!(
                        "{}'s {} hits the challenger for {:.0} ({:.0} HP left)",
                        encounter.kind().name(),
                        hitbox_name(zone.id),
                        zone.damage,
                        challenger.hp
                    ),
                );
                hits.send(ChallengerHit {
                    boss,
                    challenger: entity,
                    hitbox: zone.id,
                    damage: zone.damage,
                });
            }
        }
    }
}

/// Log boss HP milestones (every 10%)
pub fn log_boss_hp(
    mut events: EventReader<BossHpChanged>,
    bosses: Query<&Encounter>,
    mut log: ResMut<EncounterLog>,
) {
    for event in events.read() {
        if event.max <= 0.0 {
            continue;
        }
        let before = ((event.current + event.amount) / event.max * 10.0).ceil();
        let after = (event.current / event.max * 10.0).ceil();
        if after < before {
            let name = bosses.get(event.boss).map_or("Boss", |e| e.kind().name());
            log.log(
                EncounterLogEventType::Damage,
                format!("{} at {:.0}% HP", name, after * 10.0),
            );
        }
    }
}

fn hitbox_name(id: HitboxId) -> String {
    match id {
        HitboxId::Body => "body".to_string(),
        HitboxId::Part(part) => part.name().to_lowercase(),
        HitboxId::Funnel(index) => format!("funnel {}", index),
        HitboxId::Projectile(id) => format!("projectile #{}", id),
    }
}
