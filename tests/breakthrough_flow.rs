mod common;

use chrono::Duration;
use common::{harness, Harness};
use xiuxian::game::inventory::{self, graded_item_id};
use xiuxian::game::{GameError, OutcomeKind, Quality, Refusal, ScriptedDice, Stage};

fn perfected(h: &Harness, identity: &str, pills: u32) {
    h.game.enter(identity, "Ready").expect("enter");
    h.edit(identity, |c| {
        c.cultivation = c.tier_threshold();
        c.refresh_stage();
        if pills > 0 {
            inventory::add_item(c, &graded_item_id("foundation_pill", Quality::Common), pills);
        }
    });
}

#[test]
fn cooldown_refusal_draws_no_dice() {
    // failure roll, penalty roll (spared), then the roll the third attempt must see
    let h = harness(ScriptedDice::new([0.95, 0.9, 0.0]));
    perfected(&h, "qq:5", 1);

    let failed = h.game.attempt_breakthrough("qq:5").expect("first attempt");
    assert_eq!(failed.kind, OutcomeKind::BreakthroughFailed);
    assert!(failed.narrative.contains("unharmed"));

    h.clock.advance(Duration::minutes(30));
    let err = h.game.attempt_breakthrough("qq:5").unwrap_err();
    assert_eq!(
        err.refusal(),
        Some(&Refusal::CooldownActive {
            action: "attempt a breakthrough".to_string(),
            remaining_secs: 1800,
        })
    );

    h.clock.advance(Duration::minutes(31));
    let success = h.game.attempt_breakthrough("qq:5").expect("third attempt");
    assert_eq!(success.kind, OutcomeKind::BreakthroughSucceeded);

    let c = h.load("qq:5");
    assert_eq!(c.tier, 1);
    assert_eq!(c.stage, Stage::Early);
    assert_eq!(c.cultivation, 0.0);
    assert_eq!(c.max_health, 120);
    assert_eq!(c.health, 120);
    assert_eq!(c.attack, 15);
    assert_eq!(c.defense, 8);
    assert_eq!(
        inventory::quantity_of_base(&c, "foundation_pill"),
        0,
        "pill consumed"
    );
}

#[test]
fn missing_pill_is_refused_before_rolling() {
    let h = harness(ScriptedDice::new([0.0]));
    perfected(&h, "qq:6", 0);

    let err = h.game.attempt_breakthrough("qq:6").unwrap_err();
    assert_eq!(
        err.refusal(),
        Some(&Refusal::MissingBreakthroughItem {
            item: "Foundation Pill".to_string()
        })
    );
    assert!(h.load("qq:6").last_breakthrough_at.is_none());
}

#[test]
fn unready_character_is_refused() {
    let h = harness(ScriptedDice::new([]));
    h.game.enter("qq:7", "Novice").expect("enter");
    assert!(matches!(
        h.game.attempt_breakthrough("qq:7"),
        Err(GameError::Refused(Refusal::TierRequirementUnmet {
            stage: Stage::Early
        }))
    ));
}

#[test]
fn failed_breakthrough_can_regress() {
    let h = harness(ScriptedDice::new([0.95, 0.1]));
    perfected(&h, "qq:8", 1);

    let failed = h.game.attempt_breakthrough("qq:8").expect("attempt");
    assert_eq!(failed.kind, OutcomeKind::BreakthroughFailed);
    let c = h.load("qq:8");
    assert!(c.cultivation < c.tier_threshold());
    assert_ne!(c.stage, Stage::Perfected);
    assert!(c.last_breakthrough_at.is_some());
    assert_eq!(inventory::quantity_of_base(&c, "foundation_pill"), 1);
}

#[test]
fn final_tier_keeps_the_attempt_timestamp() {
    let h = harness(ScriptedDice::new([0.0]));
    h.game.enter("qq:9", "Peak").expect("enter");
    h.edit("qq:9", |c| {
        c.tier = 7;
        c.cultivation = c.tier_threshold();
        c.refresh_stage();
    });

    let err = h.game.attempt_breakthrough("qq:9").unwrap_err();
    assert_eq!(
        err.refusal(),
        Some(&Refusal::MaxTierReached {
            tier: "Mahayana".to_string()
        })
    );
    let c = h.load("qq:9");
    assert_eq!(c.tier, 7);
    assert!(c.last_breakthrough_at.is_some());

    assert!(matches!(
        h.game.attempt_breakthrough("qq:9"),
        Err(GameError::Refused(Refusal::CooldownActive { .. }))
    ));
}
