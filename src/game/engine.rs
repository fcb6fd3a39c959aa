//! The game facade: loads a character, runs exactly one rule operation on an owned
//! copy and persists the result.
//!
//! Every mutating call takes the per-identity lock(s) first, so two commands for
//! the same character never interleave. Duels and gifts lock both participants in
//! sorted identity order and commit both records in one store transaction.
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use log::{debug, error, info};

use crate::config::RulesConfig;
use crate::game::advancement;
use crate::game::catalog::Catalog;
use crate::game::clock::{Clock, SystemClock};
use crate::game::combat;
use crate::game::dice::{Dice, DiceBag};
use crate::game::errors::{format_wait, GameError, Refusal};
use crate::game::farming;
use crate::game::inventory;
use crate::game::production;
use crate::game::quest;
use crate::game::storage::{EntityStore, XiuxianStore};
use crate::game::types::{
    BattleLogEntry, Character, Domain, Element, Faction, Outcome, OutcomeKind, SkillProgress,
};
use crate::logutil::log_safe;

/// Everything a rule operation may consult besides the character itself.
pub struct Turn<'a> {
    pub catalog: &'a Catalog,
    pub rules: &'a RulesConfig,
    pub now: DateTime<Utc>,
    pub dice: &'a mut dyn Dice,
}

/// Lazily created mutex per character identity.
#[derive(Default)]
pub struct IdentityLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdentityLocks {
    /// Lock handles for `identities`, deduplicated and in sorted order.
    pub fn handles(&self, identities: &[&str]) -> Vec<Arc<Mutex<()>>> {
        let mut keys: Vec<String> = identities.iter().map(|id| id.to_ascii_lowercase()).collect();
        keys.sort();
        keys.dedup();
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        keys.into_iter()
            .map(|key| slots.entry(key).or_default().clone())
            .collect()
    }
}

fn lock_all(handles: &[Arc<Mutex<()>>]) -> Vec<MutexGuard<'_, ()>> {
    handles
        .iter()
        .map(|handle| handle.lock().unwrap_or_else(PoisonError::into_inner))
        .collect()
}

fn report(identity: &str, operation: &str, err: &GameError) {
    if err.is_refusal() {
        debug!("{} {} refused: {}", identity, operation, err);
    } else {
        error!("{} {} failed: {}", identity, operation, err);
    }
}

pub struct Game<S: EntityStore = XiuxianStore> {
    store: S,
    catalog: Catalog,
    rules: RulesConfig,
    clock: Arc<dyn Clock>,
    dice: Mutex<Box<dyn Dice + Send>>,
    locks: IdentityLocks,
}

impl<S: EntityStore> Game<S> {
    pub fn new(store: S, catalog: Catalog, rules: RulesConfig) -> Self {
        Self {
            store,
            catalog,
            rules,
            clock: Arc::new(SystemClock),
            dice: Mutex::new(Box::new(DiceBag::from_entropy())),
            locks: IdentityLocks::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_dice(mut self, dice: impl Dice + Send + 'static) -> Self {
        self.dice = Mutex::new(Box::new(dice));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn run<T>(&self, now: DateTime<Utc>, op: impl FnOnce(&mut Turn<'_>) -> T) -> T {
        let mut dice = self.dice.lock().unwrap_or_else(PoisonError::into_inner);
        let mut turn = Turn {
            catalog: &self.catalog,
            rules: &self.rules,
            now,
            dice: &mut **dice,
        };
        op(&mut turn)
    }

    /// Load, mutate an owned copy, persist on success.
    fn mutate<F>(&self, identity: &str, operation: &str, op: F) -> Result<Outcome, GameError>
    where
        F: FnOnce(&mut Character, &mut Turn<'_>) -> Result<Outcome, GameError>,
    {
        let handles = self.locks.handles(&[identity]);
        let _guards = lock_all(&handles);
        let mut working = self.store.get_character(identity)?;
        let now = self.clock.now();
        let result = self.run(now, |turn| op(&mut working, turn));
        match result {
            Ok(outcome) => {
                working.updated_at = now;
                self.store.put_character(&working)?;
                info!("{} {} -> {:?}", identity, operation, outcome.kind);
                Ok(outcome)
            }
            Err(err) if err.commits_partial_state() => {
                working.updated_at = now;
                self.store.put_character(&working)?;
                report(identity, operation, &err);
                Err(err)
            }
            Err(err) => {
                report(identity, operation, &err);
                Err(err)
            }
        }
    }

    /// Load a character, creating it with the starter kit on first contact.
    ///
    /// Returns the character and whether it was just created.
    pub fn enter(&self, identity: &str, display_name: &str) -> Result<(Character, bool), GameError> {
        let handles = self.locks.handles(&[identity]);
        let _guards = lock_all(&handles);
        let display_name = display_name.trim();
        if let Some(mut existing) = self.store.find_character(identity)? {
            if !display_name.is_empty() && existing.display_name != display_name {
                existing.display_name = display_name.to_string();
                self.store.put_character(&existing)?;
            }
            return Ok((existing, false));
        }

        let now = self.clock.now();
        let name = if display_name.is_empty() { identity } else { display_name };
        let mut character = Character::new(identity, name, now);
        self.run(now, |turn| apply_starter_kit(&mut character, turn))?;
        self.store.put_character(&character)?;
        info!(
            "{} created character {} with {:?} root",
            identity,
            log_safe(name),
            character.dominant_affinity()
        );
        Ok((character, true))
    }

    pub fn character(&self, identity: &str) -> Result<Character, GameError> {
        self.store.get_character(identity)
    }

    pub fn start_cultivation(&self, identity: &str) -> Result<Outcome, GameError> {
        self.mutate(identity, "cultivate", |c, turn| {
            advancement::start_session(c, turn)
        })
    }

    pub fn finish_cultivation(&self, identity: &str) -> Result<Outcome, GameError> {
        self.mutate(identity, "finish", advancement::complete_session)
    }

    pub fn attempt_breakthrough(&self, identity: &str) -> Result<Outcome, GameError> {
        self.mutate(identity, "breakthrough", advancement::attempt_breakthrough)
    }

    pub fn craft(&self, identity: &str, domain: Domain, query: &str) -> Result<Outcome, GameError> {
        self.mutate(identity, domain.skill(), |c, turn| {
            production::craft(c, domain, query, turn)
        })
    }

    pub fn learn_recipe(&self, identity: &str, query: &str) -> Result<Outcome, GameError> {
        self.mutate(identity, "learn", |c, turn| {
            production::learn_recipe(c, query, turn.catalog)
        })
    }

    pub fn hunt(&self, identity: &str, monster: &str) -> Result<Outcome, GameError> {
        self.mutate(identity, "hunt", |c, turn| combat::resolve_pve(c, monster, turn))
    }

    pub fn accept_quest(&self, identity: &str, query: &str) -> Result<Outcome, GameError> {
        self.mutate(identity, "accept", |c, turn| {
            quest::accept_quest(c, turn.catalog, query)
        })
    }

    pub fn complete_quest(&self, identity: &str, query: &str) -> Result<Outcome, GameError> {
        self.mutate(identity, "complete", |c, turn| {
            quest::complete_quest(c, turn.catalog, query)
        })
    }

    /// Switch to another faction's ladder, keeping the tier ordinal.
    pub fn choose_faction(&self, identity: &str, faction: Faction) -> Result<Outcome, GameError> {
        self.mutate(identity, "faction", |c, turn| {
            if c.faction == faction {
                return Refusal::FactionUnchanged {
                    faction: faction.to_string(),
                }
                .fail();
            }
            let tier = turn.catalog.tier(faction, c.tier)?;
            c.faction = faction;
            let narrative = format!(
                "You pledge yourself to the {} path. Your realm is now known as {}.",
                faction, tier.name
            );
            Ok(Outcome::new(OutcomeKind::FactionChosen, narrative))
        })
    }

    pub fn plant(&self, identity: &str, plant: &str, plot: u32) -> Result<Outcome, GameError> {
        self.mutate(identity, "plant", |c, turn| farming::plant(c, plant, plot, turn))
    }

    pub fn harvest(&self, identity: &str, plot: u32) -> Result<Outcome, GameError> {
        self.mutate(identity, "harvest", |c, turn| farming::harvest(c, plot, turn))
    }

    pub fn accelerate(&self, identity: &str, plot: u32, item: &str) -> Result<Outcome, GameError> {
        self.mutate(identity, "accelerate", |c, turn| {
            farming::accelerate(c, plot, item, turn)
        })
    }

    /// Identity of another player, matching identity first and display name second.
    fn resolve_target(&self, target: &str) -> Result<Option<String>, GameError> {
        let target = target.trim().trim_start_matches('@');
        if let Some(found) = self.store.find_character(target)? {
            return Ok(Some(found.identity));
        }
        for id in self.store.list_character_ids()? {
            let candidate = self.store.get_character(&id)?;
            if candidate.display_name.eq_ignore_ascii_case(target) {
                return Ok(Some(candidate.identity));
            }
        }
        Ok(None)
    }

    /// Challenge another player to a duel.
    pub fn challenge(&self, identity: &str, target: &str) -> Result<Outcome, GameError> {
        let result = self.challenge_inner(identity, target);
        if let Err(err) = &result {
            report(identity, "duel", err);
        }
        result
    }

    /// Resolve `target` to a player other than `identity`, refusing with `on_self`.
    fn resolve_counterpart(
        &self,
        identity: &str,
        target: &str,
        on_self: Refusal,
    ) -> Result<String, GameError> {
        let target_label = target.trim();
        if identity.eq_ignore_ascii_case(target_label.trim_start_matches('@')) {
            return on_self.fail();
        }
        let Some(target_id) = self.resolve_target(target_label)? else {
            return Refusal::TargetNotFound {
                target: target_label.to_string(),
            }
            .fail();
        };
        if identity.eq_ignore_ascii_case(&target_id) {
            return on_self.fail();
        }
        Ok(target_id)
    }

    fn challenge_inner(&self, identity: &str, target: &str) -> Result<Outcome, GameError> {
        let target_label = target.trim().to_string();
        let target_id =
            self.resolve_counterpart(identity, &target_label, Refusal::SelfTargetNotAllowed)?;

        let handles = self.locks.handles(&[identity, &target_id]);
        let _guards = lock_all(&handles);
        let mut attacker = self.store.get_character(identity)?;
        let Some(mut defender) = self.store.find_character(&target_id)? else {
            return Refusal::TargetNotFound {
                target: target_label,
            }
            .fail();
        };
        let now = self.clock.now();
        let (outcome, entry) =
            self.run(now, |turn| combat::resolve_pvp(&mut attacker, &mut defender, turn))?;
        attacker.updated_at = now;
        defender.updated_at = now;
        self.store.put_battle(&attacker, &defender, &entry)?;
        info!(
            "{} duel vs {} -> {:?} (transfer {})",
            identity, defender.identity, entry.result, entry.transfer
        );
        Ok(outcome)
    }

    /// Give `count` of an item to another player; both bags are written together.
    pub fn gift(
        &self,
        identity: &str,
        target: &str,
        item: &str,
        count: u32,
    ) -> Result<Outcome, GameError> {
        let result = self.gift_inner(identity, target, item, count);
        if let Err(err) = &result {
            report(identity, "gift", err);
        }
        result
    }

    fn gift_inner(
        &self,
        identity: &str,
        target: &str,
        item: &str,
        count: u32,
    ) -> Result<Outcome, GameError> {
        if count == 0 {
            return Refusal::NothingToGive.fail();
        }
        let target_id = self.resolve_counterpart(identity, target, Refusal::SelfGiftNotAllowed)?;

        let handles = self.locks.handles(&[identity, &target_id]);
        let _guards = lock_all(&handles);
        let mut giver = self.store.get_character(identity)?;
        let Some(mut receiver) = self.store.find_character(&target_id)? else {
            return Refusal::TargetNotFound {
                target: target.trim().to_string(),
            }
            .fail();
        };
        let outcome = inventory::transfer_item(&mut giver, &mut receiver, item, count)?;
        let now = self.clock.now();
        giver.updated_at = now;
        receiver.updated_at = now;
        self.store.put_characters(&[&giver, &receiver])?;
        info!(
            "{} gift -> {} ({} x{})",
            identity,
            receiver.identity,
            log_safe(item),
            count
        );
        Ok(outcome)
    }

    pub fn battle_history(
        &self,
        identity: &str,
        limit: usize,
    ) -> Result<Vec<BattleLogEntry>, GameError> {
        self.store.battle_history(identity, limit)
    }

    /// Characters ordered by power, strongest first.
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<Character>, GameError> {
        let mut all = Vec::new();
        for id in self.store.list_character_ids()? {
            all.push(self.store.get_character(&id)?);
        }
        all.sort_by(|a, b| {
            b.power()
                .total_cmp(&a.power())
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
        all.truncate(limit);
        Ok(all)
    }

    pub fn status(&self, identity: &str) -> Result<String, GameError> {
        let character = self.store.get_character(identity)?;
        Ok(format_status(&character, &self.catalog, &self.rules, self.clock.now()))
    }

    pub fn inventory(&self, identity: &str) -> Result<String, GameError> {
        Ok(inventory::format_inventory(&self.store.get_character(identity)?))
    }

    pub fn recipe_list(&self, identity: &str, domain: Option<Domain>) -> Result<String, GameError> {
        let character = self.store.get_character(identity)?;
        let domains: Vec<Domain> = match domain {
            Some(domain) => vec![domain],
            None => Domain::ALL.to_vec(),
        };
        Ok(domains
            .into_iter()
            .map(|d| production::format_recipe_list(&character, &self.catalog, d))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    pub fn quest_log(&self, identity: &str) -> Result<String, GameError> {
        let character = self.store.get_character(identity)?;
        Ok(quest::format_quest_log(&character, &self.catalog))
    }

    pub fn monster_list(&self, identity: &str) -> Result<String, GameError> {
        let character = self.store.get_character(identity)?;
        Ok(combat::format_monster_list(&character, &self.catalog))
    }

    pub fn field(&self, identity: &str) -> Result<String, GameError> {
        let character = self.store.get_character(identity)?;
        Ok(farming::format_field(
            &character,
            &self.catalog,
            &self.rules,
            self.clock.now(),
        ))
    }

    pub fn plant_list(&self) -> String {
        farming::format_plant_list(&self.catalog)
    }
}

/// Seed a brand-new character from the catalog's starter kit.
fn apply_starter_kit(character: &mut Character, turn: &mut Turn<'_>) -> Result<(), GameError> {
    let catalog = turn.catalog;
    let starter = &catalog.starter;
    character.currency = starter.currency;
    for (item, count) in &starter.items {
        inventory::add_item(character, item, *count);
    }
    for skill in &starter.skills {
        character.skills.insert(skill.clone(), SkillProgress::starting());
    }
    let last = Element::FIVE.len() as i64 - 1;
    let index = turn.dice.between(0, last).clamp(0, last) as usize;
    let purity = turn
        .dice
        .between(starter.purity_min as i64, starter.purity_max as i64);
    character
        .affinities
        .insert(Element::FIVE[index], purity.clamp(1, 100) as u8);
    for quest_id in &starter.quests {
        let record = catalog.quest(quest_id).ok_or_else(|| {
            GameError::Catalog(format!("starter quest {} is not in the catalog", quest_id))
        })?;
        quest::start_quest(character, record);
    }
    Ok(())
}

/// Character sheet.
pub fn format_status(
    character: &Character,
    catalog: &Catalog,
    rules: &RulesConfig,
    now: DateTime<Utc>,
) -> String {
    let affinities = if character.affinities.is_empty() {
        "none".to_string()
    } else {
        character
            .affinities
            .iter()
            .map(|(element, purity)| format!("{} {}", element, purity))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut output = format!(
        "=== {} ===\nPath: {}\nRealm: {} ({})\nCultivation: {:.1}/{:.0} ({:.0}%)\nHealth: {}/{}  Mana: {}/{}\nAttack {}  Defense {}  Speed {}\nSpirit stones: {}\nRoots: {}",
        character.display_name,
        character.faction,
        catalog.tier_name(character.faction, character.tier),
        character.stage,
        character.cultivation,
        character.tier_threshold(),
        character.progress_percent(),
        character.health,
        character.max_health,
        character.mana,
        character.max_mana,
        character.attack,
        character.defense,
        character.speed,
        character.currency,
        affinities
    );
    if let Some(since) = character.cultivating_since {
        let ready_at = since + rules.session_duration();
        if now >= ready_at {
            output.push_str("\nYour meditation is complete. FINISH to collect it.");
        } else {
            output.push_str(&format!(
                "\nIn seclusion, {} left.",
                format_wait(advancement::remaining_secs(ready_at - now))
            ));
        }
    }
    output
}
