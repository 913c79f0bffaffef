//! Unit tests for buffer curation.
//!
//! Every test drives the curator with explicit instants; nothing sleeps.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use contribute_relay::game::{AnalysisScorer, Move, Player};
use contribute_relay::sessions::curator::game_ended;
use contribute_relay::sessions::{
    synchronize, Curator, CuratorPolicy, SaveTarget, SessionState, SessionStore, TickOutcome,
};
use contribute_relay::sgf::writer::FileSgfWriter;

use contribute_relay::engine::record::AnalysisRecord;

use super::test_helpers::{empty_tree, record, record_value_with, record_with};

const OPENING: [(&str, &str); 3] = [("B", "Q16"), ("W", "D4"), ("B", "Q4")];
const ENDGAME: [(&str, &str); 3] = [("B", "Q16"), ("W", "D4"), ("B", "pass")];

fn curator() -> Curator {
    Curator::with_rng(
        CuratorPolicy::default(),
        Box::new(AnalysisScorer),
        None,
        StdRng::seed_from_u64(7),
    )
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn rewind(store: &mut SessionStore, id: &str) {
    let tree = &mut store.get_mut(id).unwrap().tree;
    let root = tree.root();
    tree.set_current_node(root).unwrap();
}

/// A store holding one game whose engine wants to pass after Black's pass;
/// Black's evaluated lead is -3.2.
fn endgame_store() -> SessionStore {
    let mut store = SessionStore::with_capacity(9);
    synchronize(&mut store, &record_with("end", &ENDGAME, 19, "pass", -3.2)).unwrap();
    store
}

#[test]
fn empty_store_is_idle() {
    let mut store = SessionStore::with_capacity(9);
    let mut curator = curator();

    assert_eq!(curator.tick(&mut store, Instant::now()), TickOutcome::Idle);
    assert_eq!(store.displayed(), None);
}

#[test]
fn a_buffered_game_is_selected() {
    let mut store = SessionStore::with_capacity(9);
    synchronize(&mut store, &record("g1", &OPENING)).unwrap();
    let mut curator = curator();
    let now = Instant::now();

    assert_eq!(curator.tick(&mut store, now), TickOutcome::Selected("g1".into()));
    assert_eq!(store.displayed(), Some("g1"));
    assert_eq!(store.get("g1").unwrap().state, SessionState::Displayed);
    assert_eq!(curator.last_advance(), now);
}

#[test]
fn selection_prefers_a_game_ending_in_a_pass() {
    for seed in 0..8 {
        let mut store = SessionStore::with_capacity(9);
        for id in ["a", "b", "d", "e"] {
            synchronize(&mut store, &record(id, &OPENING)).unwrap();
        }
        synchronize(&mut store, &record("c", &ENDGAME)).unwrap();
        let mut curator = Curator::with_rng(
            CuratorPolicy::default(),
            Box::new(AnalysisScorer),
            None,
            StdRng::seed_from_u64(seed),
        );

        assert_eq!(
            curator.tick(&mut store, Instant::now()),
            TickOutcome::Selected("c".into())
        );
    }
}

#[test]
fn random_selection_is_reproducible_with_a_seed() {
    let pick = |seed| {
        let mut store = SessionStore::with_capacity(9);
        for id in ["a", "b", "c", "d"] {
            synchronize(&mut store, &record(id, &OPENING)).unwrap();
        }
        let mut curator = Curator::with_rng(
            CuratorPolicy::default(),
            Box::new(AnalysisScorer),
            None,
            StdRng::seed_from_u64(seed),
        );
        curator.tick(&mut store, Instant::now())
    };

    assert_eq!(pick(42), pick(42));
    assert!(matches!(pick(42), TickOutcome::Selected(_)));
}

#[test]
fn displayed_game_advances_at_move_interval() {
    let mut store = SessionStore::with_capacity(9);
    synchronize(&mut store, &record("g1", &OPENING)).unwrap();
    rewind(&mut store, "g1");
    let mut curator = curator();
    let t0 = Instant::now();

    curator.tick(&mut store, t0);
    assert_eq!(curator.tick(&mut store, t0 + ms(100)), TickOutcome::Waiting);
    assert_eq!(curator.tick(&mut store, t0 + ms(500)), TickOutcome::Waiting);
    assert_eq!(
        curator.tick(&mut store, t0 + ms(600)),
        TickOutcome::Advanced("g1".into())
    );
    assert_eq!(store.get("g1").unwrap().tree.current().depth(), 1);
    assert_eq!(curator.tick(&mut store, t0 + ms(700)), TickOutcome::Waiting);
    assert_eq!(
        curator.tick(&mut store, t0 + ms(1200)),
        TickOutcome::Advanced("g1".into())
    );
    assert_eq!(store.get("g1").unwrap().tree.current().depth(), 2);
}

#[test]
fn over_occupied_buffer_advances_every_tick() {
    let mut store = SessionStore::with_capacity(9);
    for n in 0..9 {
        let id = format!("g{n}");
        synchronize(&mut store, &record(&id, &OPENING)).unwrap();
        rewind(&mut store, &id);
    }
    let mut curator = curator();
    let t0 = Instant::now();

    let TickOutcome::Selected(id) = curator.tick(&mut store, t0) else {
        panic!("expected a selection");
    };
    assert_eq!(
        curator.tick(&mut store, t0 + ms(1)),
        TickOutcome::Advanced(id.clone())
    );
    assert_eq!(
        curator.tick(&mut store, t0 + ms(2)),
        TickOutcome::Advanced(id)
    );
}

#[test]
fn stuck_game_is_abandoned_after_give_up_threshold() {
    let mut store = SessionStore::with_capacity(9);
    synchronize(&mut store, &record("g1", &OPENING)).unwrap();
    let mut curator = curator();
    let t0 = Instant::now();

    curator.tick(&mut store, t0);
    assert_eq!(curator.tick(&mut store, t0 + ms(1_000)), TickOutcome::Waiting);
    assert_eq!(curator.tick(&mut store, t0 + ms(30_000)), TickOutcome::Waiting);
    assert_eq!(
        curator.tick(&mut store, t0 + ms(30_001)),
        TickOutcome::GaveUp("g1".into())
    );

    assert!(store.is_empty());
    assert_eq!(store.displayed(), None);
    assert!(!store.is_finished("g1"), "abandoned games may come back");
    assert!(matches!(
        synchronize(&mut store, &record("g1", &OPENING)).unwrap(),
        contribute_relay::sessions::SyncOutcome::Created { .. }
    ));
}

#[test]
fn new_moves_reset_the_give_up_clock() {
    let mut store = SessionStore::with_capacity(9);
    synchronize(&mut store, &record("g1", &OPENING[..1])).unwrap();
    let mut curator = curator();
    let t0 = Instant::now();
    curator.tick(&mut store, t0);

    synchronize(&mut store, &record("g1", &OPENING[..2])).unwrap();
    assert_eq!(
        curator.tick(&mut store, t0 + ms(20_000)),
        TickOutcome::Advanced("g1".into())
    );
    assert_eq!(
        curator.tick(&mut store, t0 + ms(45_000)),
        TickOutcome::Waiting
    );
    assert_eq!(
        curator.tick(&mut store, t0 + ms(50_001)),
        TickOutcome::GaveUp("g1".into())
    );
}

#[test]
fn engine_pass_terminates_and_scores_the_game() {
    let mut store = endgame_store();
    let mut curator = curator();
    let t0 = Instant::now();

    assert_eq!(curator.tick(&mut store, t0), TickOutcome::Selected("end".into()));
    let outcome = curator.tick(&mut store, t0 + ms(10));

    assert_eq!(
        outcome,
        TickOutcome::Finished {
            id: "end".into(),
            result: "W+3".into()
        }
    );
    let session = store.get("end").unwrap();
    assert_eq!(session.state, SessionState::FinishedPendingEvict);
    assert_eq!(session.tree.properties().result.as_deref(), Some("W+3"));
    assert!(session.tree.current().is_pass());
    assert_eq!(session.tree.current().mv().unwrap().player, Player::White);
    assert!(store.is_finished("end"));
    assert!(!session.flagged_for_save, "saving is disabled");
}

#[test]
fn finished_game_is_shown_then_evicted() {
    let mut store = endgame_store();
    let mut curator = curator();
    let t0 = Instant::now();
    curator.tick(&mut store, t0);
    curator.tick(&mut store, t0 + ms(10));

    assert!(matches!(
        curator.tick(&mut store, t0 + ms(4_000)),
        TickOutcome::Finished { .. }
    ));
    assert_eq!(
        curator.tick(&mut store, t0 + ms(5_001)),
        TickOutcome::Evicted {
            id: "end".into(),
            saved: None
        }
    );
    assert!(store.is_empty());
    assert!(store.is_finished("end"));
    assert_eq!(
        synchronize(&mut store, &record_with("end", &ENDGAME, 19, "pass", -3.2)).unwrap(),
        contribute_relay::sessions::SyncOutcome::Discarded
    );
    assert_eq!(curator.tick(&mut store, t0 + ms(5_100)), TickOutcome::Idle);
}

#[test]
fn double_pass_without_score_finishes_as_unknown() {
    let mut value = record_value_with(
        "unscored",
        &[("B", "Q16"), ("W", "pass"), ("B", "pass")],
        19,
        "pass",
        0.0,
    );
    value.as_object_mut().unwrap().remove("rootInfo");
    let mut store = SessionStore::with_capacity(9);
    synchronize(&mut store, &AnalysisRecord::from_value(value).unwrap()).unwrap();
    let mut curator = curator();
    let t0 = Instant::now();

    assert_eq!(
        curator.tick(&mut store, t0),
        TickOutcome::Selected("unscored".into())
    );
    assert_eq!(
        curator.tick(&mut store, t0 + ms(1_000)),
        TickOutcome::Finished {
            id: "unscored".into(),
            result: "?".into()
        }
    );
    assert!(store.is_finished("unscored"));
    assert_eq!(
        curator.tick(&mut store, t0 + ms(5_001)),
        TickOutcome::Evicted {
            id: "unscored".into(),
            saved: None
        }
    );
    assert!(store.is_empty());
    assert!(store.is_finished("unscored"));
}

#[test]
fn resignation_finishes_the_game() {
    let mut store = SessionStore::with_capacity(9);
    synchronize(
        &mut store,
        &record("r", &[("B", "Q16"), ("W", "resign")]),
    )
    .unwrap();
    let mut curator = curator();
    let t0 = Instant::now();
    curator.tick(&mut store, t0);

    assert_eq!(
        curator.tick(&mut store, t0 + ms(10)),
        TickOutcome::Finished {
            id: "r".into(),
            result: "B+R".into()
        }
    );
}

#[test]
fn finished_game_is_saved_on_eviction() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = endgame_store();
    let mut curator = Curator::with_rng(
        CuratorPolicy::default(),
        Box::new(AnalysisScorer),
        Some(SaveTarget {
            dir: dir.path().to_path_buf(),
            writer: Arc::new(FileSgfWriter),
        }),
        StdRng::seed_from_u64(7),
    );
    let t0 = Instant::now();
    curator.tick(&mut store, t0);
    curator.tick(&mut store, t0 + ms(10));
    assert!(store.get("end").unwrap().flagged_for_save);

    let TickOutcome::Evicted { saved, .. } = curator.tick(&mut store, t0 + ms(6_000)) else {
        panic!("expected eviction");
    };

    let path = saved.expect("the game should have been written");
    assert_eq!(path, dir.path().join("end.sgf"));
    let sgf = std::fs::read_to_string(path).unwrap();
    assert!(sgf.contains("RE[W+3]"));
}

#[test]
fn engine_pass_check_plays_answering_pass_once() {
    let mut store = endgame_store();
    let tree = &mut store.get_mut("end").unwrap().tree;
    let before = tree.len();

    assert_eq!(game_ended(tree, &AnalysisScorer).as_deref(), Some("W+3"));
    assert_eq!(game_ended(tree, &AnalysisScorer).as_deref(), Some("W+3"));
    assert_eq!(tree.len(), before + 1);
}

#[test]
fn pass_without_engine_agreement_does_not_end_the_game() {
    let mut tree = empty_tree();
    tree.play(Move::at(Player::Black, 3, 3));
    tree.play(Move::pass(Player::White));

    assert_eq!(game_ended(&mut tree, &AnalysisScorer), None);
    assert_eq!(tree.len(), 3);
}

#[test]
fn policy_follows_curator_config() {
    let policy = CuratorPolicy::default();

    assert_eq!(policy.max_buffer_games, 8);
    assert_eq!(policy.move_interval, ms(500));
    assert_eq!(policy.show_result, Duration::from_secs(5));
    assert_eq!(policy.give_up_after, Duration::from_secs(30));
}
