//! Integration tests for the encounter engine
//!
//! Each test drives a real boss through `FakeWorld`, which plays the boss's clip
//! timelines so pose-gated steps resolve the way they do in the ECS.

use bevy::math::{Rect, Vec2};

use bossarena::config::{BossKind, BossRoster};
use bossarena::encounter::command::{Command, ShotPattern};
use bossarena::encounter::funnels::{
    FunnelPattern, FunnelRing, FunnelSettings, FunnelState, RingState, RETURN_EPSILON,
};
use bossarena::encounter::phase::Latch;
use bossarena::encounter::rng::GameRng;
use bossarena::encounter::sequencer::SequencerStatus;
use bossarena::encounter::tag::{DamageTag, Part};
use bossarena::encounter::testing::FakeWorld;
use bossarena::encounter::{Encounter, Lifecycle};

const DT: f32 = 1.0 / 60.0;

fn setup(kind: BossKind, seed: u64) -> (Encounter, FakeWorld) {
    let roster = BossRoster::default();
    let encounter = Encounter::for_boss(kind, &roster, GameRng::from_seed(seed));
    let world = FakeWorld::animated(roster.encounter(kind));
    (encounter, world)
}

fn started(reports: &[bossarena::encounter::TickReport]) -> Vec<Command> {
    reports.iter().filter_map(|r| r.started).collect()
}

#[test]
fn test_chosen_commands_are_eligible_for_their_band() {
    let targets = [
        (BossKind::Golem, Vec2::new(-6.0, 0.0)),
        (BossKind::Swordsman, Vec2::new(-4.0, 0.0)),
        (BossKind::Wolf, Vec2::new(-8.0, 0.0)),
    ];

    for (kind, target) in targets {
        let (mut encounter, mut world) = setup(kind, 21);
        world.target = Some(target);
        let mut chosen = 0;

        // HP only ever goes down, like in a real fight.
        for ratio in [1.0, 0.8, 0.6, 0.45, 0.3, 0.1] {
            world.set_hp_ratio(ratio);
            let commands = started(&world.run(&mut encounter, 15.0));
            let eligible = encounter.behavior().eligible(ratio);
            for command in commands {
                assert!(
                    eligible.contains(&command),
                    "{:?} chose {:?} at {:.0}% HP, eligible: {:?}",
                    kind,
                    command,
                    ratio * 100.0,
                    eligible
                );
                chosen += 1;
            }
        }
        assert!(chosen > 0, "{:?} never chose anything", kind);
    }
}

#[test]
fn test_wolf_escalation_fires_once_across_oscillating_hp() {
    let (mut encounter, mut world) = setup(BossKind::Wolf, 3);
    world.target = Some(Vec2::new(-8.0, 0.0));
    world.run(&mut encounter, 1.0);
    assert!(encounter.is_active());

    let ultimate = Command::Howl(ShotPattern::ArcUltimate);
    let mut ultimates = 0;
    for i in 0..20 {
        world.set_hp_ratio(if i % 2 == 0 { 0.45 } else { 0.6 });
        ultimates += started(&world.run(&mut encounter, 3.0))
            .into_iter()
            .filter(|c| *c == ultimate)
            .count();
    }

    assert_eq!(ultimates, 1);
    assert!(encounter.latches().is_set(Latch::Escalation));
}

#[test]
fn test_golem_summons_once_across_oscillating_hp() {
    let (mut encounter, mut world) = setup(BossKind::Golem, 4);
    world.target = Some(Vec2::new(-6.0, 0.0));
    world.run(&mut encounter, 1.0);

    let mut summons = 0;
    for i in 0..20 {
        world.set_hp_ratio(if i % 2 == 0 { 0.45 } else { 0.6 });
        summons += started(&world.run(&mut encounter, 3.0))
            .into_iter()
            .filter(|c| *c == Command::Summon)
            .count();
    }

    assert_eq!(summons, 1);
    assert!(encounter.latches().is_set(Latch::Summoned));
}

#[test]
fn test_wolf_ultimate_returns_every_few_attacks_in_last_band() {
    let (mut encounter, mut world) = setup(BossKind::Wolf, 8);
    world.target = Some(Vec2::new(-8.0, 0.0));
    world.set_hp_ratio(0.3);

    let ultimate = Command::Howl(ShotPattern::ArcUltimate);
    let commands = started(&world.run(&mut encounter, 90.0));
    let at: Vec<usize> = commands
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == ultimate)
        .map(|(i, _)| i)
        .collect();

    assert!(at.len() >= 3, "commands: {:?}", commands);
    // The first ultimate is the escalation answer, then one per three attacks.
    assert_eq!(at[0], 0);
    for pair in at.windows(2) {
        assert_eq!(pair[1] - pair[0], 4, "commands: {:?}", commands);
    }
}

#[test]
fn test_command_and_script_stay_in_step() {
    for kind in BossKind::ALL {
        let (mut encounter, mut world) = setup(kind, 5);
        world.target = Some(Vec2::new(-5.0, 0.0));

        for second in 0..40 {
            world.set_hp_ratio(1.0 - second as f32 / 50.0);
            for _ in 0..60 {
                world.tick(&mut encounter, DT);
                assert_eq!(
                    encounter.command().is_none(),
                    !encounter.has_running_script(),
                    "{:?} at {}s",
                    kind,
                    second
                );
            }
        }
    }
}

#[test]
fn test_volley_waits_for_every_funnel() {
    let (mut encounter, mut world) = setup(BossKind::Swordsman, 12);
    world.target = Some(Vec2::new(-8.0, 0.0));

    let mut volleys = 0;
    for _ in 0..(60 * 40) {
        let report = world.tick(&mut encounter, DT);
        if let Some((Command::Volley(_), status)) = report.finished {
            assert_eq!(status, SequencerStatus::Finished);
            assert!(encounter.funnels().all_in_circle());
            assert_eq!(encounter.funnels().state(), RingState::Circling);
            volleys += 1;
        }
    }
    assert!(volleys > 0);
}

#[test]
fn test_stuck_volley_is_abandoned_and_selection_resumes() {
    let mut roster = BossRoster::default();
    roster.swordsman.funnels.launch_speed = 0.0;
    roster.swordsman.funnels.return_speed = 0.0;
    assert!(roster.validate().is_err());
    let mut encounter =
        Encounter::for_boss(BossKind::Swordsman, &roster, GameRng::from_seed(12));
    let mut world = FakeWorld::animated(roster.encounter(BossKind::Swordsman));
    world.target = Some(Vec2::new(-8.0, 0.0));

    let mut timed_out = false;
    for _ in 0..(60 * 60) {
        let report = world.tick(&mut encounter, DT);
        if let Some((Command::Volley(_), status)) = report.finished {
            assert_eq!(status, SequencerStatus::TimedOut);
            timed_out = true;
            break;
        }
    }
    assert!(timed_out, "the stuck volley was never abandoned");
    assert!(encounter.command().is_none());
    assert!(!encounter.funnels().all_in_circle());

    // The funnels never come home, but a close target still gets a swing.
    world.target = Some(world.body.position + Vec2::new(-1.0, 0.0));
    let commands = started(&world.run(&mut encounter, 5.0));
    assert!(commands.contains(&Command::MeleeAttack), "{:?}", commands);
}

#[test]
fn test_swordsman_body_is_never_damageable() {
    let (mut encounter, mut world) = setup(BossKind::Swordsman, 2);
    world.target = Some(Vec2::new(-3.0, 0.0));

    for _ in 0..(60 * 20) {
        world.tick(&mut encounter, DT);
        assert_eq!(encounter.hitboxes().body(), DamageTag::Immune);
    }
}

#[test]
fn test_defeat_during_positioning_stops_everything() {
    let (mut encounter, mut world) = setup(BossKind::Swordsman, 5);
    world.target = Some(Vec2::new(-8.0, 0.0));

    let mut positioning = false;
    for _ in 0..(60 * 20) {
        world.tick(&mut encounter, DT);
        if encounter.funnels().state() == RingState::Positioning {
            positioning = true;
            break;
        }
    }
    assert!(positioning, "no volley started");

    world.health.current = 0.0;
    let report = world.tick(&mut encounter, DT);
    assert!(report.defeated);
    assert_eq!(encounter.lifecycle(), Lifecycle::Defeated);

    let funnels = encounter.funnels();
    assert_eq!(funnels.count_in(FunnelState::Waiting), 0);
    assert_eq!(funnels.count_in(FunnelState::Attacking), 0);
    assert_eq!(funnels.active_count(), 0);
    assert!(encounter.hitboxes().all_immune());
    assert!(encounter
        .damaging_hitboxes(world.body.position)
        .is_empty());

    let writes = world.body.writes;
    let positions: Vec<Vec2> = encounter.funnels().funnels().iter().map(|f| f.position).collect();
    let reports = world.run(&mut encounter, 2.0);
    assert!(reports.iter().all(|r| r.started.is_none() && !r.defeated));
    assert_eq!(world.body.writes, writes);
    let after: Vec<Vec2> = encounter.funnels().funnels().iter().map(|f| f.position).collect();
    assert_eq!(positions, after);
}

#[test]
fn test_reset_allows_a_fresh_fight() {
    let (mut encounter, mut world) = setup(BossKind::Swordsman, 6);
    world.target = Some(Vec2::new(-6.0, 0.0));
    world.run(&mut encounter, 3.0);
    world.health.current = 0.0;
    world.tick(&mut encounter, DT);
    assert!(encounter.is_defeated());

    encounter.reset_state();
    world.health.current = world.health.max;
    assert_eq!(encounter.lifecycle(), Lifecycle::Dormant);
    assert!(encounter.funnels().is_empty());
    assert!(encounter.latches().is_empty());

    let report = world.tick(&mut encounter, DT);
    assert!(report.activated);
    assert_eq!(encounter.funnels().active_count(), 5);
    assert!(encounter.funnels().all_in_circle());
}

#[test]
fn test_same_seed_same_choices() {
    let run = |seed: u64| {
        let (mut encounter, mut world) = setup(BossKind::Wolf, seed);
        world.target = Some(Vec2::new(-8.0, 0.0));
        world.set_hp_ratio(0.8);
        started(&world.run(&mut encounter, 40.0))
    };

    let first = run(99);
    assert_eq!(first, run(99));
    assert!(first.len() > 3);
    let allowed = [
        Command::Howl(ShotPattern::Rain),
        Command::Howl(ShotPattern::SingleArc),
    ];
    assert!(first.iter().all(|c| allowed.contains(c)), "{:?}", first);
}

#[test]
fn test_golem_charge_arms_the_hammer() {
    let (mut encounter, mut world) = setup(BossKind::Golem, 14);
    world.target = Some(Vec2::new(-6.0, 0.0));
    world.set_hp_ratio(0.3);

    let mut charged = false;
    let mut hammer_armed = false;
    for _ in 0..(60 * 90) {
        let report = world.tick(&mut encounter, DT);
        charged |= report.started == Some(Command::ChargeAttack);
        if charged
            && encounter
                .hitboxes()
                .part(Part::Hammer)
                .is_some_and(|p| p.tag == DamageTag::Damageable)
        {
            hammer_armed = true;
            break;
        }
    }
    assert!(charged, "golem never charged");
    assert!(hammer_armed);
}

#[test]
fn test_straight_down_funnels_return_to_their_slots() {
    let area = Rect::new(-20.0, -2.0, 20.0, 30.0);
    let origin = Vec2::ZERO;
    let mut ring = FunnelRing::new(FunnelSettings::default());
    ring.spawn(origin);

    let mut rng = GameRng::from_seed(17);
    assert!(ring.begin_positioning(
        FunnelPattern::StraightDown,
        origin,
        Some(Vec2::new(-4.0, 0.0)),
        area,
        &mut rng
    ));
    for _ in 0..120 {
        if ring.state() != RingState::Positioning {
            break;
        }
        ring.update(DT, origin, area);
    }
    assert_eq!(ring.state(), RingState::Standby);

    for index in ring.waiting_indices() {
        assert!(ring.launch(index, Vec2::NEG_Y, 10.0));
    }

    let mut left = 0;
    for _ in 0..600 {
        for index in ring.update(DT, origin, area) {
            let funnel = ring.funnel(index).unwrap();
            assert!(funnel.position.y < area.min.y, "left at {:?}", funnel.position);
            assert!(ring.notify_left_bounds(index));
            left += 1;
        }
        for funnel in ring.funnels() {
            if funnel.state == FunnelState::Returning {
                let slot = ring.slot(funnel.index, origin);
                assert!(funnel.position.distance(slot) > RETURN_EPSILON);
            }
        }
        if ring.state() == RingState::Circling {
            break;
        }
    }

    assert_eq!(left, 5);
    assert_eq!(ring.state(), RingState::Circling);
    for funnel in ring.funnels() {
        assert_eq!(funnel.state, FunnelState::InCircle);
        assert_eq!(funnel.tag, DamageTag::Immune);
        assert!(funnel.position.distance(ring.slot(funnel.index, origin)) < 1e-4);
    }
}
