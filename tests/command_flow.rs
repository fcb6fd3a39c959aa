mod common;

use chrono::Duration;
use common::harness;
use tempfile::TempDir;
use xiuxian::config::RulesConfig;
use xiuxian::game::commands::handle_command;
use xiuxian::game::{Catalog, EntityStore, Game, ScriptedDice, XiuxianStoreBuilder};

#[test]
fn first_contact_creates_and_greets() {
    let h = harness(ScriptedDice::new([]));
    let reply = handle_command(&h.game, "qq:1", "Lin Feng", "status");
    assert!(reply.starts_with("Welcome to the cultivation world, Lin Feng!"));
    assert!(reply.contains("Metal 60"));

    let again = handle_command(&h.game, "qq:1", "Lin Feng", "STATUS");
    assert!(!again.contains("Welcome"));
    assert!(again.contains("=== Lin Feng ==="));
}

#[test]
fn meditation_through_chat() {
    let h = harness(ScriptedDice::new([]));
    handle_command(&h.game, "qq:1", "Lin Feng", "help");

    let reply = handle_command(&h.game, "qq:1", "Lin Feng", "cultivate");
    assert!(reply.contains("secluded cultivation"));
    assert_eq!(
        handle_command(&h.game, "qq:1", "Lin Feng", "meditate"),
        "You are already in secluded cultivation."
    );
    assert!(handle_command(&h.game, "qq:1", "Lin Feng", "status").contains("left."));

    h.clock.advance(Duration::minutes(10));
    let reply = handle_command(&h.game, "qq:1", "Lin Feng", "finish");
    assert!(reply.contains("Cultivation +9.2"));
}

#[test]
fn refusals_and_typos_get_player_text() {
    let h = harness(ScriptedDice::new([]));
    handle_command(&h.game, "qq:1", "Lin Feng", "status");

    assert_eq!(
        handle_command(&h.game, "qq:1", "Lin Feng", "hunt"),
        "Usage: HUNT <monster>"
    );
    assert_eq!(
        handle_command(&h.game, "qq:1", "Lin Feng", "fight qq:ghost"),
        "No cultivator named 'qq:ghost' exists."
    );
    assert!(handle_command(&h.game, "qq:1", "Lin Feng", "xyzzy")
        .starts_with("Unknown command 'xyzzy'"));
    assert_eq!(
        handle_command(&h.game, "qq:1", "Lin Feng", "alchemy foundation pill"),
        "You have not learned the recipe 'Foundation Pill'."
    );
}

#[test]
fn ranking_orders_by_power() {
    let h = harness(ScriptedDice::new([]));
    handle_command(&h.game, "qq:1", "Lin Feng", "status");
    handle_command(&h.game, "qq:2", "Han Li", "status");
    h.game
        .store()
        .put_character(&{
            let mut c = h.game.character("qq:2").expect("load");
            c.tier = 1;
            c
        })
        .expect("store");

    let board = handle_command(&h.game, "qq:1", "Lin Feng", "rank");
    assert!(board.starts_with("=== POWER RANKING ==="));
    let han = board.find("Han Li").expect("han listed");
    let lin = board.find("Lin Feng").expect("lin listed");
    assert!(han < lin);
}

#[test]
fn characters_survive_reopening_the_store() {
    let dir = TempDir::new().expect("tempdir");
    {
        let store = XiuxianStoreBuilder::new(dir.path()).open().expect("open");
        let game = Game::new(store, Catalog::builtin(), RulesConfig::default())
            .with_dice(ScriptedDice::new([]));
        handle_command(&game, "qq:9", "Persistent", "cultivate");
    }
    let store = XiuxianStoreBuilder::new(dir.path()).open().expect("reopen");
    let game = Game::new(store, Catalog::builtin(), RulesConfig::default());
    let c = game.character("qq:9").expect("load");
    assert_eq!(c.display_name, "Persistent");
    assert!(c.is_cultivating());
}
