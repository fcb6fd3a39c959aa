//! # Xiuxian - Cultivation RPG Rule Engine
//!
//! Xiuxian is the rule engine behind a chat-driven "cultivation" role-playing game.
//! Players meditate to accrue cultivation, break through a ladder of tiers, refine
//! pills, forge equipment, draw talismans, duel each other and hunt monsters.
//!
//! ## Features
//!
//! - **Advancement**: Daily-capped meditation sessions, random meditation events and
//!   probabilistic breakthroughs with cooldowns.
//! - **Production**: One crafting algorithm parameterised per domain (alchemy,
//!   forging, talisman drawing).
//! - **Combat**: Three-round duels with elemental advantage, and monster hunts with
//!   independent drop rolls.
//! - **Quests**: Objective counters fed by combat and crafting, rewards that unlock
//!   new recipes.
//! - **Spirit field**: Plots that grow herbs from seeds on a timer, hastened by
//!   accelerant items.
//! - **Gifting**: Items move between players in a single store transaction.
//! - **Persistence**: Sled-backed character store with atomic duel and gift commits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xiuxian::config::Config;
//! use xiuxian::game::{Catalog, Game, XiuxianStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = XiuxianStore::open(config.storage.database_path())?;
//!     let game = Game::new(store, Catalog::builtin(), config.rules.clone());
//!
//!     let reply = xiuxian::game::commands::handle_command(&game, "qq:10001", "Lin Feng", "status");
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - Characters, rules, content catalog, storage and the command dispatcher
//! - [`config`] - Configuration management
//! - [`logutil`] - Log sanitising helpers for player-supplied text

pub mod config;
pub mod game;
pub mod logutil;
