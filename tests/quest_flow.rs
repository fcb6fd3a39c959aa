mod common;

use common::harness;
use xiuxian::game::inventory::{self, scroll_item_id};
use xiuxian::game::{Domain, GameError, OutcomeKind, Refusal, ScriptedDice};

/// Five hunts where only the azure iron drop lands.
fn five_hunts() -> ScriptedDice {
    ScriptedDice::new(std::iter::repeat([0.5, 0.99, 0.99]).take(5).flatten())
}

#[test]
fn starter_quest_runs_end_to_end() {
    let h = harness(five_hunts());
    h.game.enter("qq:q", "Questor").expect("enter");

    let early = h.game.complete_quest("qq:q", "main_1").unwrap_err();
    assert!(matches!(
        early,
        GameError::Refused(Refusal::QuestIncomplete { missing: 5, .. })
    ));

    for _ in 0..5 {
        let outcome = h.game.hunt("qq:q", "sea_turtle").expect("hunt");
        assert_eq!(outcome.kind, OutcomeKind::HuntWon);
    }
    let c = h.load("qq:q");
    assert_eq!(c.quests["main_1"].counter("kill_monster"), 5);
    assert_eq!(inventory::item_quantity(&c, "azure_iron"), 5);
    assert!(h.game.quest_log("qq:q").expect("log").contains("[x] Defeat five beasts 5/5"));

    let outcome = h
        .game
        .complete_quest("qq:q", "Into the Cultivation World")
        .expect("complete");
    assert_eq!(outcome.kind, OutcomeKind::QuestCompleted);
    let c = h.load("qq:q");
    assert_eq!(c.currency, 300);
    assert_eq!(inventory::item_quantity(&c, "azure_iron"), 2);
    assert_eq!(inventory::item_quantity(&c, "sea_turtle_core"), 2);
    assert!(c.quests["main_1"].completed);

    // the reward scroll unlocks the first breakthrough pill
    h.game.learn_recipe("qq:q", "foundation_pill").expect("learn");
    let c = h.load("qq:q");
    assert!(c.knows_recipe(Domain::Alchemy, "foundation_pill"));
    assert_eq!(inventory::item_quantity(&c, &scroll_item_id("foundation_pill")), 0);
    assert_eq!(inventory::item_quantity(&c, &scroll_item_id("fiend_gathering_pill")), 1);

    assert!(matches!(
        h.game.accept_quest("qq:q", "main_1"),
        Err(GameError::Refused(Refusal::QuestUnavailable { .. }))
    ));
}

#[test]
fn counters_start_at_acceptance() {
    let h = harness(five_hunts());
    h.game.enter("qq:r", "Latecomer").expect("enter");

    h.game.hunt("qq:r", "sea_turtle").expect("hunt before accepting");
    h.game.accept_quest("qq:r", "side_2").expect("accept");
    assert!(matches!(
        h.game.accept_quest("qq:r", "Culling the Lesser Beasts"),
        Err(GameError::Refused(Refusal::QuestAlreadyTaken { .. }))
    ));
    h.game.hunt("qq:r", "sea_turtle").expect("hunt after accepting");

    let c = h.load("qq:r");
    assert_eq!(c.quests["side_2"].counter("kill_monster"), 1);
    assert_eq!(c.quests["main_1"].counter("kill_monster"), 2);
}

#[test]
fn gated_quests_explain_themselves() {
    let h = harness(ScriptedDice::new([]));
    h.game.enter("qq:s", "Junior").expect("enter");
    let err = h.game.accept_quest("qq:s", "main_2").unwrap_err();
    assert!(err.player_message().contains("First Furnace"));
    assert!(matches!(
        h.game.accept_quest("qq:s", "no such quest"),
        Err(GameError::Refused(Refusal::QuestNotFound { .. }))
    ));
}
