//! Game rules, content and persistence.
//!
//! Rule modules ([`advancement`], [`production`], [`combat`], [`quest`], [`farming`]) are pure
//! functions over a [`Character`] and a [`Turn`]. [`Game`] wraps them with
//! per-identity locking and a [`XiuxianStore`], and [`commands`] maps chat text
//! onto the engine.

pub mod advancement;
pub mod catalog;
pub mod clock;
pub mod combat;
pub mod commands;
pub mod dice;
pub mod engine;
pub mod errors;
pub mod farming;
pub mod inventory;
pub mod production;
pub mod quest;
pub mod seed;
pub mod storage;
pub mod types;

pub use catalog::Catalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use dice::{Dice, DiceBag, ScriptedDice};
pub use engine::{Game, IdentityLocks, Turn};
pub use errors::{GameError, Refusal};
pub use storage::{EntityStore, XiuxianStore, XiuxianStoreBuilder};
pub use types::{
    BattleLogEntry, BattleResult, Character, Delta, Domain, Element, Faction, Outcome,
    OutcomeKind, Plot, Quality, Stage,
};
