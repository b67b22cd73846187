//! Integration tests: whole journeys through the public engine API.

use std::sync::Arc;

use line_core::catalog::EventCatalog;
use line_core::config::{Difficulty, GameConfig, PersistenceConfig};
use line_core::persistence::SaveStore;
use line_core::session::Ending;
use line_core::world::RejectReason;
use line_core::{
    Action, Attribute, Direction, Engine, GameState, LineError, LocationId, Perspective, Rejection,
    Session, TurnOutcome, World, flags,
};

fn builtin() -> Engine {
    Engine::builtin(GameConfig::default()).expect("builtin engine")
}

/// Builtin world with an empty catalog.
fn eventless(config: GameConfig) -> Engine {
    let world = World::builtin().expect("world");
    let catalog = EventCatalog::from_toml("", &world).expect("catalog");
    Engine::new(Arc::new(world), Arc::new(catalog), Arc::new(config))
}

/// Answer choices with option 1, otherwise rest.
fn script_step(session: &Session) -> Action {
    if session.pending.is_some() {
        Action::Choose(1)
    } else {
        Action::Rest
    }
}

// ---------------------------------------------------------------------------
// Desert: running dry kills
// ---------------------------------------------------------------------------

#[test]
fn desert_dehydration_ends_in_death() {
    let engine = eventless(GameConfig::default());
    let mut s = engine.new_session(Perspective::Migrant, 1);
    s.character.location = LocationId::from("sonoran_desert");
    s.character.resources.set(Attribute::Water, 10);
    s.character.resources.set(Attribute::Food, 10);

    let first = engine.take_turn(&mut s, Action::Rest);
    assert_eq!(first.turn, 1);
    assert_eq!(first.state, GameState::Active);
    assert_eq!(s.character.get(Attribute::Water), 1);
    assert_eq!(s.character.get(Attribute::Food), 3);
    assert!(s.character.has_flag(flags::WATER_CRITICAL));
    assert!(first.narrative.iter().any(|l| l.key == "decay.dehydration"));

    let second = engine.take_turn(&mut s, Action::Rest);
    assert_eq!(
        second.state,
        GameState::TerminalFailure {
            ending: Ending::Death
        }
    );
    assert!(second.narrative.iter().any(|l| l.key == "ending.death"));
    assert!(engine.take_turn(&mut s, Action::Rest).is_rejected());
}

// ---------------------------------------------------------------------------
// Jurisdiction
// ---------------------------------------------------------------------------

#[test]
fn agent_cannot_walk_into_mexico() {
    let engine = builtin();
    let mut s = engine.new_session(Perspective::Patrol, 2);
    s.character.location = LocationId::from("border_fence");
    let before = s.clone();

    let out = engine.take_turn(&mut s, Action::Move(Direction::South));
    assert!(matches!(
        out.rejected,
        Some(Rejection::Movement {
            reason: RejectReason::PerspectiveForbidden | RejectReason::JurisdictionForbidden { .. }
        })
    ));
    assert_eq!(s, before);
    assert!(!engine.valid_actions(&s).contains(&Action::Move(Direction::South)));
}

#[test]
fn migrant_needs_to_cross_before_entering_the_us() {
    let engine = builtin();
    let mut s = engine.new_session(Perspective::Migrant, 2);
    s.character.location = LocationId::from("border_fence");

    let out = engine.take_turn(&mut s, Action::Move(Direction::North));
    assert_eq!(
        out.rejected,
        Some(Rejection::Movement {
            reason: RejectReason::CrossingRequired
        })
    );
    let valid = engine.valid_actions(&s);
    assert!(valid.contains(&Action::Cross("ladder".into())));
    assert!(!valid.contains(&Action::Cross("wire_cutters".into())));
}

// ---------------------------------------------------------------------------
// Crossing and the forced arrival beat
// ---------------------------------------------------------------------------

#[test]
fn successful_crossing_triggers_first_steps_north() {
    let engine = builtin();
    let mut found = false;
    for seed in 0..200 {
        let mut s = engine.new_session(Perspective::Migrant, seed);
        s.character.location = LocationId::from("border_fence");
        let out = engine.take_turn(&mut s, Action::Cross("tunnel".into()));
        assert!(!out.is_rejected());
        assert_eq!(s.character.get(Attribute::Money), 50);
        if out.location.as_str() == "nogales_us" {
            assert!(out.moved);
            assert!(s.character.has_flag(flags::HAS_CROSSED));
            assert_eq!(out.event.as_ref().map(|e| e.as_str()), Some("first_steps_north"));
            found = true;
            break;
        }
    }
    assert!(found, "no seed in 0..200 crossed with a 70% method");
}

#[test]
fn reaching_tucson_wins() {
    let engine = eventless(GameConfig::default());
    let mut s = engine.new_session(Perspective::Migrant, 3);
    s.character.location = LocationId::from("nogales_us");
    s.character.set_flag(flags::HAS_CROSSED);
    let out = engine.take_turn(&mut s, Action::Move(Direction::North));
    assert_eq!(
        out.state,
        GameState::TerminalSuccess {
            ending: Ending::ReachedDestination
        }
    );
}

// ---------------------------------------------------------------------------
// Agent service arc
// ---------------------------------------------------------------------------

const WORLD_TOML: &str = include_str!("../data/world.toml");

const ROADSIDE_EVENTS: &str = r#"
[[events]]
id = "family_by_the_road"
priority = "forced"
once = true
when = { locations = ["nogales_us"], perspectives = ["patrol"] }

[[events.choices]]
effect = { deltas = { standing = 5, conscience = -5 }, encounters = 1, lives = 3 }

[[events.choices]]
effect = { deltas = { conscience = 10, standing = -5 }, encounters = 1, lives = 3 }
"#;

#[test]
fn agent_conscience_follows_their_choices() {
    let dir = tempfile::tempdir().expect("tempdir");
    let world_path = dir.path().join("world.toml");
    let events_path = dir.path().join("events.toml");
    std::fs::write(&world_path, WORLD_TOML).expect("write world");
    std::fs::write(&events_path, ROADSIDE_EVENTS).expect("write events");

    let mut config = GameConfig::default();
    config.general.world_path = Some(world_path);
    config.general.events_path = Some(events_path);
    let engine = Engine::load(config).expect("load from files");
    assert_eq!(engine.catalog().events().len(), 1);

    let mut s = engine.new_session(Perspective::Patrol, 8);
    let out = engine.take_turn(&mut s, Action::Rest);
    assert_eq!(out.event.as_ref().map(|e| e.as_str()), Some("family_by_the_road"));
    engine.take_turn(&mut s, Action::Choose(2));
    assert_eq!(s.character.get(Attribute::Conscience), 60);
    assert_eq!(s.character.get(Attribute::Standing), 45);
    assert_eq!(s.journey.lives_impacted, 3);

    let out = engine.take_turn(&mut s, Action::Quit);
    let patrol = out
        .narrative
        .iter()
        .find(|l| l.key == "summary.patrol")
        .expect("patrol summary");
    assert_eq!(patrol.args.get("conscience").map(String::as_str), Some("60"));
    assert!(out.narrative.iter().any(|l| l.key == "summary.standing.average"));
}

#[test]
fn missing_data_file_fails_to_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = GameConfig::default();
    config.general.events_path = Some(dir.path().join("absent.toml"));
    assert!(matches!(Engine::load(config), Err(LineError::Io(_))));

    // Unset paths fall back to the shipped data.
    let engine = Engine::load(GameConfig::default()).expect("builtin data");
    assert_eq!(
        engine.catalog().events().len(),
        builtin().catalog().events().len()
    );
}

#[test]
fn agent_reaches_a_terminal_state() {
    let engine = builtin();
    let mut s = engine.new_session(Perspective::Patrol, 21);
    for _ in 0..engine.config().general.max_turns {
        if s.state.is_terminal() {
            break;
        }
        let valid = engine.valid_actions(&s);
        let action = if s.pending.is_some() {
            Action::Choose(1)
        } else if valid.contains(&Action::Apprehend) {
            Action::Apprehend
        } else {
            Action::Patrol
        };
        let out = engine.take_turn(&mut s, action);
        assert!(!out.is_rejected());
        assert_ne!(s.character.location.as_str(), "nogales_mx");
    }
    assert!(s.state.is_terminal());
    assert!(s.state.ending().is_some());
}

// ---------------------------------------------------------------------------
// Determinism and persistence
// ---------------------------------------------------------------------------

fn play(engine: &Engine, session: &mut Session, turns: usize) -> Vec<TurnOutcome> {
    let mut outcomes = Vec::new();
    for _ in 0..turns {
        if session.state.is_terminal() {
            break;
        }
        let action = script_step(session);
        outcomes.push(engine.take_turn(session, action));
    }
    outcomes
}

#[test]
fn same_seed_same_story() {
    let engine = builtin();
    let mut a = engine.new_session(Perspective::Migrant, 777);
    let mut b = engine.new_session(Perspective::Migrant, 777);
    a.character.location = LocationId::from("sonoran_desert");
    b.character.location = LocationId::from("sonoran_desert");
    assert_eq!(play(&engine, &mut a, 12), play(&engine, &mut b, 12));
}

#[test]
fn saved_session_resumes_identically() {
    let engine = builtin();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("saves.db");

    let mut original = engine.new_session(Perspective::Migrant, 4242);
    original.character.location = LocationId::from("sonoran_desert");
    play(&engine, &mut original, 3);

    {
        let store = SaveStore::open(&path, &PersistenceConfig::default()).expect("store");
        store.save_snapshot("slot1", &original.snapshot()).expect("save");
    }

    let store = SaveStore::open(&path, &PersistenceConfig::default()).expect("reopen");
    let snapshot = store.load_snapshot("slot1").expect("load").expect("slot exists");
    let mut restored = engine.restore(snapshot).expect("restore");
    assert_eq!(restored, original);

    assert_eq!(play(&engine, &mut original, 5), play(&engine, &mut restored, 5));
    assert_eq!(restored, original);
}

#[test]
fn hard_difficulty_starts_leaner() {
    let mut config = GameConfig::default();
    config.difficulty.preset = Difficulty::Hard;
    let engine = eventless(config);
    let s = engine.new_session(Perspective::Migrant, 1);
    assert_eq!(s.character.get(Attribute::Water), 70);
    assert_eq!(s.character.get(Attribute::Money), 70);
    assert_eq!(s.character.get(Attribute::Health), 100);
}
