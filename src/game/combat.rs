//! Duels between players and hunts against catalog monsters.
//!
//! Duels run up to `pvp_rounds` exchanges on running health totals that are only
//! written back once the fight is over. Hunts are a single power comparison on the
//! character's own attack and defense; equipment only matters in duels.
use log::debug;

use crate::game::advancement::remaining_secs;
use crate::game::catalog::{Catalog, Monster, Recipe};
use crate::game::dice::Dice;
use crate::game::engine::Turn;
use crate::game::errors::{GameError, Refusal};
use crate::game::inventory;
use crate::game::production::scaled_attributes;
use crate::game::quest;
use crate::game::types::{
    Attribute, BattleLogEntry, BattleResult, Character, Delta, Element, Outcome, OutcomeKind,
};

/// Fighting strength of one side, equipment included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BattleStats {
    pub attack: i64,
    pub defense: i64,
    pub speed: i64,
    /// Running health pool at the start of the fight.
    pub health: i64,
    pub element: Option<Element>,
}

impl BattleStats {
    pub fn of(character: &Character, catalog: &Catalog) -> Self {
        let mut stats = BattleStats {
            attack: character.attack as i64,
            defense: character.defense as i64,
            speed: character.speed as i64,
            health: character.health as i64,
            element: character.dominant_affinity(),
        };
        for (recipe_id, quality) in inventory::equipment(character) {
            let Some(bundle) = catalog.recipe_by_id(recipe_id).and_then(Recipe::attributes) else {
                debug!("equipment {} has no catalog attributes", recipe_id);
                continue;
            };
            for (attribute, value) in scaled_attributes(bundle, quality) {
                match attribute {
                    Attribute::Attack => stats.attack += value,
                    Attribute::Defense => stats.defense += value,
                    Attribute::Speed => stats.speed += value,
                    Attribute::Vitality => stats.health += value,
                }
            }
        }
        stats
    }

    pub fn has_advantage_over(&self, other: &BattleStats) -> bool {
        match (self.element, other.element) {
            (Some(mine), Some(theirs)) => mine.has_advantage_over(theirs),
            _ => false,
        }
    }
}

/// Damage before the random spread: `max(1, atk - def/2)`, x1.5 on elemental advantage.
pub fn strike_base(attacker: &BattleStats, defender: &BattleStats) -> i64 {
    let base = (attacker.attack - defender.defense / 2).max(1);
    if attacker.has_advantage_over(defender) {
        (base as f64 * 1.5).floor() as i64
    } else {
        base
    }
}

/// One blow, spread uniformly within +/-20% of the base and never below 1.
pub fn strike(attacker: &BattleStats, defender: &BattleStats, dice: &mut dyn Dice) -> i64 {
    let base = strike_base(attacker, defender) as f64;
    let low = (base * 0.8).floor() as i64;
    let high = (base * 1.2).floor() as i64;
    dice.between(low, high).max(1)
}

/// Fight a duel. The caller has already resolved and locked both characters.
pub fn resolve_pvp(
    attacker: &mut Character,
    defender: &mut Character,
    turn: &mut Turn<'_>,
) -> Result<(Outcome, BattleLogEntry), GameError> {
    if attacker.identity.eq_ignore_ascii_case(&defender.identity) {
        return Refusal::SelfTargetNotAllowed.fail();
    }
    if let Some(last) = attacker.last_battle_at {
        let until = last + turn.rules.pvp_cooldown();
        if turn.now < until {
            return Refusal::CooldownActive {
                action: "duel".to_string(),
                remaining_secs: remaining_secs(until - turn.now),
            }
            .fail();
        }
    }

    let before = attacker.clone();
    let a_stats = BattleStats::of(attacker, turn.catalog);
    let d_stats = BattleStats::of(defender, turn.catalog);
    let mut a_hp = a_stats.health;
    let mut d_hp = d_stats.health;
    let mut log = Vec::new();

    for round in 1..=turn.rules.pvp_rounds {
        let damage = strike(&a_stats, &d_stats, &mut *turn.dice);
        d_hp -= damage;
        log.push(format!(
            "Round {}: {} strikes {} for {}{}.",
            round,
            attacker.display_name,
            defender.display_name,
            damage,
            if a_stats.has_advantage_over(&d_stats) { " (elemental advantage)" } else { "" }
        ));
        if d_hp <= 0 {
            break;
        }
        let damage = strike(&d_stats, &a_stats, &mut *turn.dice);
        a_hp -= damage;
        log.push(format!(
            "Round {}: {} strikes back for {}{}.",
            round,
            defender.display_name,
            damage,
            if d_stats.has_advantage_over(&a_stats) { " (elemental advantage)" } else { "" }
        ));
        if a_hp <= 0 {
            break;
        }
    }

    let attacker_won = a_hp > d_hp;
    attacker.settle_health(a_hp);
    defender.settle_health(d_hp);
    attacker.last_battle_at = Some(turn.now);

    let max_transfer = turn.rules.pvp_max_transfer;
    let transfer = if attacker_won {
        let stake = max_transfer.min(defender.currency);
        defender.currency -= stake;
        attacker.currency += stake;
        stake
    } else if turn.rules.reward_defender_victory {
        let stake = max_transfer.min(attacker.currency);
        attacker.currency -= stake;
        defender.currency += stake;
        stake
    } else {
        0
    };

    let (result, kind, winner) = if attacker_won {
        (BattleResult::AttackerWon, OutcomeKind::DuelWon, &attacker.display_name)
    } else {
        (BattleResult::DefenderWon, OutcomeKind::DuelLost, &defender.display_name)
    };
    let mut summary = format!("{} wins the duel!", winner);
    if transfer > 0 {
        summary.push_str(&format!(" {} spirit stones change hands.", transfer));
    }
    log.push(summary);

    let mut entry = BattleLogEntry::new(&attacker.identity, &defender.identity, result, turn.now);
    entry.transfer = transfer;
    entry.narrative = log.clone();

    let outcome =
        Outcome::new(kind, log.join("\n")).with_delta(Delta::between(&before, attacker));
    Ok((outcome, entry))
}

/// Hunt a monster. Never fatal: health stops at 1.
pub fn resolve_pve(
    character: &mut Character,
    query: &str,
    turn: &mut Turn<'_>,
) -> Result<Outcome, GameError> {
    let catalog = turn.catalog;
    let monster = catalog
        .monster(query)
        .filter(|m| m.min_tier <= character.tier)
        .ok_or_else(|| Refusal::MonsterNotFound {
            monster: query.trim().to_string(),
        })?;

    let power = (character.attack + character.defense) as f64;
    let threshold = 0.8 * monster.power() as f64;
    let won = power >= threshold;
    debug!(
        "{} hunts {}: power {} vs {:.1}",
        character.identity, monster.id, power, threshold
    );

    let before = character.clone();
    let mut lines = Vec::new();
    let kind = if won {
        lines.push(format!("You defeat the {}!", monster.name));
        let drops = roll_drops(monster, &mut *turn.dice);
        for item in &drops {
            inventory::add_item(character, item, 1);
        }
        if drops.is_empty() {
            lines.push("It leaves nothing of value behind.".to_string());
        } else {
            lines.push(format!("Spoils: {}", drops.join(", ")));
        }
        let damage = (monster.attack as i64 - character.defense as i64 / 2).max(1) as u32;
        character.lose_health(damage);
        lines.push(format!("You took {} damage.", damage));
        quest::increment_objective(character, "kill_monster", 1);
        quest::increment_objective(character, &format!("kill_monster:{}", monster.id), 1);
        OutcomeKind::HuntWon
    } else {
        character.lose_health(monster.attack);
        lines.push(format!(
            "The {} overwhelms you. You flee with {} damage.",
            monster.name, monster.attack
        ));
        OutcomeKind::HuntLost
    };
    lines.push(format!("Health {}/{}", character.health, character.max_health));

    Ok(Outcome::new(kind, lines.join("\n")).with_delta(Delta::between(&before, character)))
}

/// Independent drop rolls, one per table entry.
fn roll_drops(monster: &Monster, dice: &mut dyn Dice) -> Vec<String> {
    monster
        .drops
        .iter()
        .filter(|(_, probability)| dice.chance(**probability))
        .map(|(item, _)| item.clone())
        .collect()
}

/// Monsters within reach, easiest gate first.
pub fn format_monster_list(character: &Character, catalog: &Catalog) -> String {
    let monsters = catalog.monsters_within(character.tier);
    if monsters.is_empty() {
        return "No monsters roam within your reach.".to_string();
    }
    let mut output = String::from("=== MONSTERS ===\n");
    for monster in monsters {
        output.push_str(&format!(
            "{} [{}] HP {} ATK {} DEF {} (from {})\n",
            monster.name,
            monster.id,
            monster.health,
            monster.attack,
            monster.defense,
            catalog.tier_name(character.faction, monster.min_tier)
        ));
    }
    output.trim_end().to_string()
}

/// Duel log lines from `identity`'s point of view.
pub fn format_battle_history(identity: &str, entries: &[BattleLogEntry]) -> String {
    if entries.is_empty() {
        return "You have fought no duels.".to_string();
    }
    let mut output = String::from("=== DUELS ===\n");
    for entry in entries {
        let attacked = entry.attacker.eq_ignore_ascii_case(identity);
        let opponent = if attacked { &entry.defender } else { &entry.attacker };
        let won = entry.winner().eq_ignore_ascii_case(identity);
        let stakes = if entry.transfer == 0 {
            String::new()
        } else if won {
            format!(" +{}", entry.transfer)
        } else {
            format!(" -{}", entry.transfer)
        };
        output.push_str(&format!(
            "{} {} {} {}{}\n",
            entry.fought_at.format("%m-%d %H:%M"),
            if attacked { "vs" } else { "from" },
            opponent,
            if won { "WON" } else { "LOST" },
            stakes
        ));
    }
    output.trim_end().to_string()
}
