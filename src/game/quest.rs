//! Quest lifecycle: accepting quests, feeding objective counters, completing
//! quests and paying out rewards.
//!
//! Counter objectives are initialised at zero when a quest is accepted and only
//! those keys ever advance. `collect:<item>` objectives hold no counter; they
//! are checked against the bag when the quest is handed in.
use crate::game::catalog::{Catalog, QuestRecord};
use crate::game::errors::{GameError, Refusal};
use crate::game::inventory;
use crate::game::types::{Character, Delta, Outcome, OutcomeKind, QuestProgress};

/// Advance `key` by `amount` on every active quest that tracks it.
///
/// Returns how many quests moved.
pub fn increment_objective(character: &mut Character, key: &str, amount: u32) -> usize {
    let mut advanced = 0;
    for progress in character.quests.values_mut().filter(|p| p.is_active()) {
        if let Some(counter) = progress.counters.get_mut(key) {
            *counter = counter.saturating_add(amount);
            advanced += 1;
        }
    }
    advanced
}

/// Quests the character could accept right now.
pub fn available_quests<'a>(character: &Character, catalog: &'a Catalog) -> Vec<&'a QuestRecord> {
    catalog
        .quests
        .iter()
        .filter(|quest| unavailable_reason(character, catalog, quest).is_none())
        .collect()
}

fn unavailable_reason(character: &Character, catalog: &Catalog, quest: &QuestRecord) -> Option<String> {
    if let Some(progress) = character.quests.get(&quest.id) {
        if progress.is_active() {
            return Some("already in progress".to_string());
        }
        if !quest.repeatable {
            return Some("already completed".to_string());
        }
    }
    if character.tier < quest.min_tier {
        return Some(format!(
            "requires {}",
            catalog.tier_name(character.faction, quest.min_tier)
        ));
    }
    match quest.faction {
        Some(faction) if faction != character.faction => {
            Some(format!("reserved for the {} path", faction))
        }
        _ => None,
    }
}

/// Record `quest` as active with fresh counters, skipping every check.
pub(crate) fn start_quest(character: &mut Character, quest: &QuestRecord) {
    let times_completed = character
        .quests
        .get(&quest.id)
        .map(|p| p.times_completed)
        .unwrap_or(0);
    let counters = quest
        .objectives
        .iter()
        .filter(|objective| objective.collect_item().is_none())
        .map(|objective| (objective.key.clone(), 0))
        .collect();
    character.quests.insert(
        quest.id.clone(),
        QuestProgress {
            counters,
            completed: false,
            times_completed,
        },
    );
}

/// Accept a quest from the catalog.
pub fn accept_quest(
    character: &mut Character,
    catalog: &Catalog,
    query: &str,
) -> Result<Outcome, GameError> {
    let quest = catalog.quest(query).ok_or_else(|| Refusal::QuestNotFound {
        quest: query.trim().to_string(),
    })?;
    if character
        .quests
        .get(&quest.id)
        .map(QuestProgress::is_active)
        .unwrap_or(false)
    {
        return Refusal::QuestAlreadyTaken {
            quest: quest.name.clone(),
        }
        .fail();
    }
    if let Some(reason) = unavailable_reason(character, catalog, quest) {
        return Refusal::QuestUnavailable {
            quest: quest.name.clone(),
            reason,
        }
        .fail();
    }
    start_quest(character, quest);

    let mut narrative = format!("Quest accepted: {}", quest.name);
    for objective in &quest.objectives {
        narrative.push_str(&format!("\n- {} (0/{})", objective.description, objective.required));
    }
    Ok(Outcome::new(OutcomeKind::QuestAccepted, narrative))
}

/// Hand in a quest whose objectives are all met and collect its rewards.
pub fn complete_quest(
    character: &mut Character,
    catalog: &Catalog,
    query: &str,
) -> Result<Outcome, GameError> {
    let quest = catalog.quest(query).ok_or_else(|| Refusal::QuestNotFound {
        quest: query.trim().to_string(),
    })?;
    let Some(progress) = character.quests.get(&quest.id).filter(|p| p.is_active()) else {
        return Refusal::QuestUnavailable {
            quest: quest.name.clone(),
            reason: "you have not taken it up".to_string(),
        }
        .fail();
    };

    for objective in &quest.objectives {
        let held = match objective.collect_item() {
            Some(item) => inventory::item_quantity(character, item),
            None => progress.counter(&objective.key),
        };
        if held < objective.required {
            return Refusal::QuestIncomplete {
                quest: quest.name.clone(),
                objective: objective.description.clone(),
                missing: objective.required - held,
            }
            .fail();
        }
    }

    let before = character.clone();
    for objective in &quest.objectives {
        if let Some(item) = objective.collect_item() {
            inventory::remove_item(character, item, objective.required);
        }
    }
    character.currency = character.currency.saturating_add(quest.rewards.currency);
    for (item, count) in &quest.rewards.items {
        inventory::add_item(character, item, *count);
    }
    if let Some(progress) = character.quests.get_mut(&quest.id) {
        progress.completed = true;
        progress.times_completed += 1;
        progress.counters.clear();
    }

    let mut narrative = format!("Quest complete: {}!", quest.name);
    if quest.rewards.currency > 0 {
        narrative.push_str(&format!("\nSpirit stones +{}", quest.rewards.currency));
    }
    for (item, count) in &quest.rewards.items {
        narrative.push_str(&format!("\n{} x{}", item, count));
    }
    Ok(Outcome::new(OutcomeKind::QuestCompleted, narrative)
        .with_delta(Delta::between(&before, character)))
}

/// Active quests with their progress, followed by quests open for acceptance.
pub fn format_quest_log(character: &Character, catalog: &Catalog) -> String {
    let mut output = String::from("=== QUESTS ===\n");
    let mut any_active = false;
    for (id, progress) in character.quests.iter().filter(|(_, p)| p.is_active()) {
        any_active = true;
        let Some(quest) = catalog.quest(id) else {
            output.push_str(&format!("{} (no longer offered)\n", id));
            continue;
        };
        output.push_str(&format!("{} [{}]\n", quest.name, quest.id));
        for objective in &quest.objectives {
            let current = match objective.collect_item() {
                Some(item) => inventory::item_quantity(character, item),
                None => progress.counter(&objective.key),
            };
            let mark = if current >= objective.required { "x" } else { " " };
            output.push_str(&format!(
                "  [{}] {} {}/{}\n",
                mark,
                objective.description,
                current.min(objective.required),
                objective.required
            ));
        }
    }
    if !any_active {
        output.push_str("No active quests.\n");
    }

    let open = available_quests(character, catalog);
    if !open.is_empty() {
        output.push_str("Available:\n");
        for quest in open {
            output.push_str(&format!("  {} [{}]\n", quest.name, quest.id));
        }
    }
    output.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Faction;
    use chrono::Utc;

    fn newcomer() -> Character {
        Character::new("qq:7", "Newcomer", Utc::now())
    }

    #[test]
    fn counters_only_move_for_tracked_keys() {
        let catalog = Catalog::builtin();
        let mut c = newcomer();
        accept_quest(&mut c, &catalog, "side_2").unwrap();
        assert_eq!(increment_objective(&mut c, "kill_monster", 1), 1);
        assert_eq!(increment_objective(&mut c, "craft:alchemy", 1), 0);
        assert_eq!(c.quests["side_2"].counter("kill_monster"), 1);
        assert!(!c.quests["side_2"].counters.contains_key("craft:alchemy"));
    }

    #[test]
    fn accept_refusals() {
        let catalog = Catalog::builtin();
        let mut c = newcomer();
        assert!(matches!(
            accept_quest(&mut c, &catalog, "nope"),
            Err(GameError::Refused(Refusal::QuestNotFound { .. }))
        ));
        assert!(matches!(
            accept_quest(&mut c, &catalog, "main_2"),
            Err(GameError::Refused(Refusal::QuestUnavailable { .. }))
        ));
        accept_quest(&mut c, &catalog, "Herb Gathering").unwrap();
        assert!(matches!(
            accept_quest(&mut c, &catalog, "side_1"),
            Err(GameError::Refused(Refusal::QuestAlreadyTaken { .. }))
        ));
        c.tier = 2;
        assert!(matches!(
            accept_quest(&mut c, &catalog, "main_3"),
            Err(GameError::Refused(Refusal::QuestUnavailable { .. }))
        ));
        c.faction = Faction::Immortal;
        accept_quest(&mut c, &catalog, "main_3").unwrap();
    }

    #[test]
    fn completion_hands_in_items_and_pays_out() {
        let catalog = Catalog::builtin();
        let mut c = newcomer().with_item("spirit_herb", 12).with_currency(5);
        accept_quest(&mut c, &catalog, "side_1").unwrap();
        let outcome = complete_quest(&mut c, &catalog, "side_1").unwrap();
        assert_eq!(outcome.kind, OutcomeKind::QuestCompleted);
        assert_eq!(inventory::item_quantity(&c, "spirit_herb"), 2);
        assert_eq!(inventory::item_quantity(&c, "scroll:tide_talisman"), 1);
        assert_eq!(c.currency, 105);
        assert_eq!(outcome.delta.currency, 100);
        assert_eq!(c.quests["side_1"].times_completed, 1);

        // repeatable
        accept_quest(&mut c, &catalog, "side_1").unwrap();
        assert!(matches!(
            complete_quest(&mut c, &catalog, "side_1"),
            Err(GameError::Refused(Refusal::QuestIncomplete { missing: 8, .. }))
        ));
    }

    #[test]
    fn incomplete_quest_names_first_gap() {
        let catalog = Catalog::builtin();
        let mut c = newcomer();
        accept_quest(&mut c, &catalog, "main_1").unwrap();
        increment_objective(&mut c, "kill_monster", 5);
        let err = complete_quest(&mut c, &catalog, "main_1").unwrap_err();
        assert_eq!(
            err.refusal(),
            Some(&Refusal::QuestIncomplete {
                quest: "Into the Cultivation World".to_string(),
                objective: "Hand in three azure iron".to_string(),
                missing: 3,
            })
        );
        assert!(!c.quests["main_1"].completed);
    }

    #[test]
    fn non_repeatable_quests_close_after_completion() {
        let catalog = Catalog::builtin();
        let mut c = newcomer().with_item("azure_iron", 3);
        accept_quest(&mut c, &catalog, "main_1").unwrap();
        increment_objective(&mut c, "kill_monster", 5);
        complete_quest(&mut c, &catalog, "main_1").unwrap();
        assert!(!c.knows_recipe(crate::game::types::Domain::Alchemy, "foundation_pill"));
        assert_eq!(inventory::item_quantity(&c, "scroll:foundation_pill"), 1);
        assert!(matches!(
            accept_quest(&mut c, &catalog, "main_1"),
            Err(GameError::Refused(Refusal::QuestUnavailable { .. }))
        ));
        assert!(!available_quests(&c, &catalog).iter().any(|q| q.id == "main_1"));
        assert!(format_quest_log(&c, &catalog).contains("No active quests."));
    }
}
