mod common;

use chrono::Duration;
use common::{harness, harness_with_rules, Harness};
use xiuxian::config::RulesConfig;
use xiuxian::game::inventory;
use xiuxian::game::{BattleResult, GameError, OutcomeKind, Refusal, ScriptedDice};

/// Two Metal-root rookies (attack 10, defense 5, health 100) holding 100 and 30 stones.
fn duelists(h: &Harness) {
    h.game.enter("qq:a", "Azure").expect("enter attacker");
    h.game.enter("qq:b", "Blaze").expect("enter defender");
    h.edit("qq:a", |c| c.currency = 100);
    h.edit("qq:b", |c| c.currency = 30);
}

#[test]
fn attacker_victory_moves_capped_stake() {
    // starter picks for both, then strikes alternate 9 (attacker) and 6 (defender)
    let dice = ScriptedDice::new([]).with_picks([0, 60, 0, 60, 9, 6, 9, 6, 9, 6]);
    let h = harness(dice);
    duelists(&h);

    let outcome = h.game.challenge("qq:a", "qq:b").expect("duel");
    assert_eq!(outcome.kind, OutcomeKind::DuelWon);
    assert_eq!(outcome.delta.currency, 30);

    let a = h.load("qq:a");
    let b = h.load("qq:b");
    assert_eq!(a.currency, 130);
    assert_eq!(b.currency, 0);
    assert_eq!(a.health, 82);
    assert_eq!(b.health, 73);
    assert!(a.last_battle_at.is_some());

    let history = h.game.battle_history("qq:b", 10).expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].result, BattleResult::AttackerWon);
    assert_eq!(history[0].transfer, 30);
    assert_eq!(history[0].narrative.len(), 7);
}

#[test]
fn defender_victory_moves_nothing_by_default() {
    // every strike lands at the low end, so the duel ends level and the defender holds
    let h = harness(ScriptedDice::new([]));
    duelists(&h);

    let outcome = h.game.challenge("qq:a", "Blaze").expect("duel");
    assert_eq!(outcome.kind, OutcomeKind::DuelLost);
    let a = h.load("qq:a");
    let b = h.load("qq:b");
    assert_eq!((a.currency, b.currency), (100, 30));
    assert_eq!((a.health, b.health), (82, 82));
}

#[test]
fn defender_reward_switch_pays_the_defender() {
    let rules = RulesConfig {
        reward_defender_victory: true,
        ..RulesConfig::default()
    };
    let h = harness_with_rules(ScriptedDice::new([]), rules);
    duelists(&h);

    h.game.challenge("qq:a", "@Blaze").expect("duel");
    assert_eq!(h.load("qq:a").currency, 50);
    assert_eq!(h.load("qq:b").currency, 80);
}

#[test]
fn duel_cooldown_applies_to_the_attacker() {
    let h = harness(ScriptedDice::new([]));
    duelists(&h);
    h.game.challenge("qq:a", "qq:b").expect("first duel");

    h.clock.advance(Duration::minutes(10));
    let err = h.game.challenge("qq:a", "qq:b").unwrap_err();
    assert_eq!(
        err.refusal(),
        Some(&Refusal::CooldownActive {
            action: "duel".to_string(),
            remaining_secs: 1200,
        })
    );
    // the defender is free to strike back
    h.game.challenge("qq:b", "qq:a").expect("return duel");

    h.clock.advance(Duration::minutes(21));
    h.game.challenge("qq:a", "qq:b").expect("after cooldown");
    assert_eq!(h.game.battle_history("qq:a", 10).expect("history").len(), 3);
    assert_eq!(h.game.battle_history("qq:a", 2).expect("history").len(), 2);
}

#[test]
fn bad_targets_are_refused() {
    let h = harness(ScriptedDice::new([]));
    duelists(&h);
    assert!(matches!(
        h.game.challenge("qq:a", "QQ:A"),
        Err(GameError::Refused(Refusal::SelfTargetNotAllowed))
    ));
    assert!(matches!(
        h.game.challenge("qq:a", "azure"),
        Err(GameError::Refused(Refusal::SelfTargetNotAllowed))
    ));
    assert!(matches!(
        h.game.challenge("qq:a", "qq:ghost"),
        Err(GameError::Refused(Refusal::TargetNotFound { .. }))
    ));
    assert!(h.game.battle_history("qq:a", 10).expect("history").is_empty());
}

#[test]
fn hunting_rolls_each_drop_and_feeds_quests() {
    // drop rolls in table order: azure_iron, sea_turtle_core, turtle_membrane
    let h = harness(ScriptedDice::new([0.5, 0.5, 0.5]));
    h.game.enter("qq:h", "Hunter").expect("enter");

    let outcome = h.game.hunt("qq:h", "Sea-Splitting Turtle").expect("hunt");
    assert_eq!(outcome.kind, OutcomeKind::HuntWon);
    let c = h.load("qq:h");
    assert_eq!(inventory::item_quantity(&c, "azure_iron"), 1);
    assert_eq!(inventory::item_quantity(&c, "sea_turtle_core"), 0);
    assert_eq!(inventory::item_quantity(&c, "turtle_membrane"), 0);
    assert_eq!(c.health, 92);
    assert_eq!(c.quests["main_1"].counter("kill_monster"), 1);

    assert!(matches!(
        h.game.hunt("qq:h", "jade_ape"),
        Err(GameError::Refused(Refusal::MonsterNotFound { .. }))
    ));
}
