mod common;

use common::{harness, Harness};
use xiuxian::game::commands::handle_command;
use xiuxian::game::inventory;
use xiuxian::game::{GameError, OutcomeKind, Refusal, ScriptedDice};

/// Two rookies, each holding the starter five spirit herbs.
fn traders(h: &Harness) {
    h.game.enter("qq:a", "Azure").expect("enter giver");
    h.game.enter("qq:b", "Blaze").expect("enter receiver");
}

fn herbs(h: &Harness, identity: &str) -> u32 {
    inventory::item_quantity(&h.load(identity), "spirit_herb")
}

#[test]
fn gift_moves_items_between_bags() {
    let h = harness(ScriptedDice::new([]));
    traders(&h);

    let outcome = h.game.gift("qq:a", "qq:b", "Spirit Herb", 3).expect("gift");
    assert_eq!(outcome.kind, OutcomeKind::ItemGifted);
    assert_eq!(outcome.narrative, "You give spirit_herb x3 to Blaze.");
    assert_eq!((herbs(&h, "qq:a"), herbs(&h, "qq:b")), (2, 8));
}

#[test]
fn gifts_to_yourself_are_refused() {
    let h = harness(ScriptedDice::new([]));
    traders(&h);
    assert!(matches!(
        h.game.gift("qq:a", "QQ:A", "spirit_herb", 1),
        Err(GameError::Refused(Refusal::SelfGiftNotAllowed))
    ));
    assert!(matches!(
        h.game.gift("qq:a", "@azure", "spirit_herb", 1),
        Err(GameError::Refused(Refusal::SelfGiftNotAllowed))
    ));
    assert_eq!(herbs(&h, "qq:a"), 5);
}

#[test]
fn short_or_empty_gifts_change_nothing() {
    let h = harness(ScriptedDice::new([]));
    traders(&h);
    h.game.gift("qq:a", "Blaze", "spirit_herb", 3).expect("first gift");

    assert_eq!(
        h.game.gift("qq:a", "Blaze", "spirit herb", 10).unwrap_err().refusal(),
        Some(&Refusal::InsufficientIngredients {
            item: "spirit_herb".to_string(),
            required: 10,
            held: 2,
        })
    );
    assert!(matches!(
        h.game.gift("qq:a", "Blaze", "spirit_herb", 0),
        Err(GameError::Refused(Refusal::NothingToGive))
    ));
    assert!(matches!(
        h.game.gift("qq:a", "qq:ghost", "spirit_herb", 1),
        Err(GameError::Refused(Refusal::TargetNotFound { .. }))
    ));
    assert_eq!((herbs(&h, "qq:a"), herbs(&h, "qq:b")), (2, 8));
}

#[test]
fn gifting_through_chat() {
    let h = harness(ScriptedDice::new([]));
    traders(&h);

    let reply = handle_command(&h.game, "qq:a", "Azure", "gift spirit herb 2 @Blaze");
    assert_eq!(reply, "You give spirit_herb x2 to Blaze.");
    let reply = handle_command(&h.game, "qq:a", "Azure", "give spirit_water qq:b");
    assert_eq!(reply, "You give spirit_water x1 to Blaze.");

    let b = h.load("qq:b");
    assert_eq!(inventory::item_quantity(&b, "spirit_herb"), 7);
    assert_eq!(inventory::item_quantity(&b, "spirit_water"), 4);
    assert_eq!(
        handle_command(&h.game, "qq:a", "Azure", "gift spirit_herb Azure"),
        "You cannot give items to yourself."
    );
}
