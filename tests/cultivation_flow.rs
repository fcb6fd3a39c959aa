mod common;

use chrono::Duration;
use common::{harness, morning};
use xiuxian::game::{Element, GameError, OutcomeKind, Refusal, ScriptedDice, Stage};

#[test]
fn fresh_character_completes_a_session() {
    let h = harness(ScriptedDice::new([]));
    let (created, fresh) = h.game.enter("qq:1", "Lin Feng").expect("enter");
    assert!(fresh);
    assert_eq!(created.affinities.get(&Element::Metal), Some(&60));

    let started = h.game.start_cultivation("qq:1").expect("start");
    assert_eq!(started.kind, OutcomeKind::SessionStarted);
    h.clock.advance(Duration::minutes(10));
    let finished = h.game.finish_cultivation("qq:1").expect("finish");
    assert_eq!(finished.kind, OutcomeKind::SessionCompleted);

    // 10 x 2^0 x (0.8 + 60/500), calm meditation
    let c = h.load("qq:1");
    assert!((c.cultivation - 9.2).abs() < 1e-9);
    assert!((finished.delta.cultivation - 9.2).abs() < 1e-9);
    assert!(!c.is_cultivating());
    assert_eq!(c.stage, Stage::Early);
    assert_eq!(c.sessions_today, 1);
}

#[test]
fn session_must_elapse_before_finishing() {
    let h = harness(ScriptedDice::new([]));
    h.game.enter("qq:1", "Impatient").expect("enter");
    h.game.start_cultivation("qq:1").expect("start");
    h.clock.advance(Duration::minutes(4) + Duration::seconds(30));

    let err = h.game.finish_cultivation("qq:1").unwrap_err();
    assert_eq!(
        err.refusal(),
        Some(&Refusal::SessionNotElapsed {
            remaining_secs: 330
        })
    );
    assert!(err.player_message().contains("5m 30s"));
    assert!(h.load("qq:1").is_cultivating());
}

#[test]
fn second_start_and_idle_finish_are_refused() {
    let h = harness(ScriptedDice::new([]));
    h.game.enter("qq:1", "Eager").expect("enter");

    assert!(matches!(
        h.game.finish_cultivation("qq:1"),
        Err(GameError::Refused(Refusal::NotCultivating))
    ));
    h.game.start_cultivation("qq:1").expect("start");
    assert!(matches!(
        h.game.start_cultivation("qq:1"),
        Err(GameError::Refused(Refusal::AlreadyInProgress))
    ));
    assert_eq!(h.load("qq:1").sessions_today, 1);
}

#[test]
fn daily_cap_resets_on_the_next_day() {
    let h = harness(ScriptedDice::new([]));
    h.game.enter("qq:1", "Diligent").expect("enter");

    for _ in 0..3 {
        h.game.start_cultivation("qq:1").expect("start");
        h.clock.advance(Duration::minutes(10));
        h.game.finish_cultivation("qq:1").expect("finish");
    }
    let err = h.game.start_cultivation("qq:1").unwrap_err();
    assert_eq!(err.refusal(), Some(&Refusal::DailyLimitReached { cap: 3 }));

    h.clock.set(morning() + Duration::days(1));
    h.game.start_cultivation("qq:1").expect("start after rollover");
    assert_eq!(h.load("qq:1").sessions_today, 1);
}

#[test]
fn unknown_identity_is_not_found() {
    let h = harness(ScriptedDice::new([]));
    assert!(matches!(
        h.game.start_cultivation("qq:nobody"),
        Err(GameError::NotFound(_))
    ));
}
