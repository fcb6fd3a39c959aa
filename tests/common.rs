//! Test utilities & fixtures.
//! Every game gets its own temporary sled store, a manual clock and scripted dice.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use xiuxian::config::RulesConfig;
use xiuxian::game::{
    Catalog, Character, EntityStore, Game, ManualClock, ScriptedDice, XiuxianStoreBuilder,
};

/// 2024-03-01 08:00 UTC, well clear of a day boundary.
pub fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

pub struct Harness {
    pub game: Game,
    pub clock: Arc<ManualClock>,
    _dir: TempDir,
}

impl Harness {
    /// Load, edit and store a character outside the rules.
    pub fn edit(&self, identity: &str, change: impl FnOnce(&mut Character)) {
        let mut character = self.game.character(identity).expect("load character");
        change(&mut character);
        self.game.store().put_character(&character).expect("store character");
    }

    pub fn load(&self, identity: &str) -> Character {
        self.game.character(identity).expect("load character")
    }
}

pub fn harness(dice: ScriptedDice) -> Harness {
    harness_with_rules(dice, RulesConfig::default())
}

/// With no queued picks every new character gets a Metal root of purity 60.
pub fn harness_with_rules(dice: ScriptedDice, rules: RulesConfig) -> Harness {
    let dir = TempDir::new().expect("tempdir");
    let store = XiuxianStoreBuilder::new(dir.path()).open().expect("open store");
    let clock = Arc::new(ManualClock::new(morning()));
    let game = Game::new(store, Catalog::builtin(), rules)
        .with_clock(clock.clone())
        .with_dice(dice);
    Harness {
        game,
        clock,
        _dir: dir,
    }
}
