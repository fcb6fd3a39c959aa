//! Inventory management for characters.
//!
//! Item ids are plain strings with a small grammar:
//! - `spirit_herb` - raw material
//! - `foundation_pill:superior` - graded consumable or charm
//! - `equip:azure_sword:common` - forged equipment
//! - `scroll:foundation_pill` - recipe scroll
//! - `seed:spirit_herb` - seed of a spirit plant
use std::collections::BTreeMap;

use super::errors::{GameError, Refusal};
use super::types::{Character, Delta, InventoryEntry, Outcome, OutcomeKind, Quality};

pub const EQUIPMENT_PREFIX: &str = "equip";
pub const SCROLL_PREFIX: &str = "scroll";
pub const SEED_PREFIX: &str = "seed";

/// Result of an inventory mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryResult {
    Added { quantity: u32, total: u32 },
    Removed { quantity: u32, remaining: u32 },
    Failed { reason: String },
}

// ============================================================================
// Item ids
// ============================================================================

pub fn graded_item_id(base: &str, quality: Quality) -> String {
    format!("{}:{}", base, quality.tag())
}

pub fn equipment_item_id(recipe_id: &str, quality: Quality) -> String {
    format!("{}:{}:{}", EQUIPMENT_PREFIX, recipe_id, quality.tag())
}

pub fn scroll_item_id(recipe_id: &str) -> String {
    format!("{}:{}", SCROLL_PREFIX, recipe_id)
}

pub fn seed_item_id(plant_id: &str) -> String {
    format!("{}:{}", SEED_PREFIX, plant_id)
}

/// Recipe id and quality of an equipment item, `None` for anything else.
pub fn parse_equipment(item_id: &str) -> Option<(&str, Quality)> {
    let mut parts = item_id.splitn(3, ':');
    if parts.next()? != EQUIPMENT_PREFIX {
        return None;
    }
    let recipe = parts.next()?;
    let quality = Quality::from_tag(parts.next()?)?;
    Some((recipe, quality))
}

/// Base id of a consumable, stripping any quality tag.
pub fn base_item_id(item_id: &str) -> &str {
    match item_id.split_once(':') {
        Some((base, tag)) if Quality::from_tag(tag).is_some() => base,
        _ => item_id,
    }
}

// ============================================================================
// Inventory Operations
// ============================================================================

/// Add stackable items. Zero quantities are ignored.
pub fn add_item(character: &mut Character, item_id: &str, quantity: u32) -> InventoryResult {
    if quantity == 0 {
        return InventoryResult::Failed {
            reason: "Cannot add zero items".to_string(),
        };
    }
    let entry = character
        .inventory
        .entry(item_id.to_string())
        .or_insert(InventoryEntry {
            count: 0,
            durability: None,
        });
    entry.count = entry.count.saturating_add(quantity);
    InventoryResult::Added {
        quantity,
        total: entry.count,
    }
}

/// Add one piece of equipment with the given durability.
pub fn add_equipment(character: &mut Character, item_id: &str, durability: u32) -> InventoryResult {
    let entry = character
        .inventory
        .entry(item_id.to_string())
        .or_insert(InventoryEntry {
            count: 0,
            durability: Some(durability),
        });
    entry.count = entry.count.saturating_add(1);
    entry.durability = Some(entry.durability.unwrap_or(0).max(durability));
    InventoryResult::Added {
        quantity: 1,
        total: entry.count,
    }
}

pub fn item_quantity(character: &Character, item_id: &str) -> u32 {
    character
        .inventory
        .get(item_id)
        .map(|entry| entry.count)
        .unwrap_or(0)
}

pub fn has_item(character: &Character, item_id: &str, quantity: u32) -> bool {
    item_quantity(character, item_id) >= quantity
}

/// Remove items; the entry disappears once its count reaches zero.
pub fn remove_item(character: &mut Character, item_id: &str, quantity: u32) -> InventoryResult {
    let held = item_quantity(character, item_id);
    if held < quantity {
        return InventoryResult::Failed {
            reason: format!("Only {} {} in inventory", held, item_id),
        };
    }
    let remaining = held - quantity;
    if remaining == 0 {
        character.inventory.remove(item_id);
    } else if let Some(entry) = character.inventory.get_mut(item_id) {
        entry.count = remaining;
    }
    InventoryResult::Removed {
        quantity,
        remaining,
    }
}

/// First ingredient the character is short of, as `(item, required, held)`.
pub fn find_shortfall(
    character: &Character,
    costs: &BTreeMap<String, u32>,
) -> Option<(String, u32, u32)> {
    costs.iter().find_map(|(item, &required)| {
        let held = item_quantity(character, item);
        (held < required).then(|| (item.clone(), required, held))
    })
}

/// Deduct every cost. Returns false without touching anything on a shortfall.
pub fn consume_all(character: &mut Character, costs: &BTreeMap<String, u32>) -> bool {
    if find_shortfall(character, costs).is_some() {
        return false;
    }
    for (item, &quantity) in costs {
        remove_item(character, item, quantity);
    }
    true
}

/// Count of every non-equipment item sharing `base`, whatever its quality.
pub fn quantity_of_base(character: &Character, base: &str) -> u32 {
    character
        .inventory
        .iter()
        .filter(|(id, _)| parse_equipment(id).is_none() && base_item_id(id) == base)
        .map(|(_, entry)| entry.count)
        .sum()
}

/// Remove one item of `base`, plain stock first, then the lowest quality held.
pub fn take_one_of_base(character: &mut Character, base: &str) -> Option<String> {
    let candidates = std::iter::once(base.to_string())
        .chain(Quality::ASCENDING.into_iter().map(|q| graded_item_id(base, q)));
    for id in candidates {
        if has_item(character, &id, 1) {
            remove_item(character, &id, 1);
            return Some(id);
        }
    }
    None
}

/// Equipment entries currently carried, with their quality.
pub fn equipment(character: &Character) -> Vec<(&str, Quality)> {
    character
        .inventory
        .keys()
        .filter_map(|id| parse_equipment(id))
        .collect()
}

/// Id of the held item a player typed, e.g. `Spirit Herb` for `spirit_herb`.
pub fn resolve_held_item(character: &Character, query: &str) -> Option<String> {
    let query = query.trim();
    if character.inventory.contains_key(query) {
        return Some(query.to_string());
    }
    let normalized = query.to_ascii_lowercase().replace(' ', "_");
    character
        .inventory
        .contains_key(&normalized)
        .then_some(normalized)
}

/// Move `quantity` of an item from one bag to another. Equipment keeps its durability.
pub fn transfer_item(
    giver: &mut Character,
    receiver: &mut Character,
    query: &str,
    quantity: u32,
) -> Result<Outcome, GameError> {
    if quantity == 0 {
        return Refusal::NothingToGive.fail();
    }
    let item_id = resolve_held_item(giver, query).unwrap_or_else(|| query.trim().to_string());
    let held = item_quantity(giver, &item_id);
    if held < quantity {
        return Refusal::InsufficientIngredients {
            item: item_id,
            required: quantity,
            held,
        }
        .fail();
    }

    let before = giver.clone();
    let durability = giver.inventory.get(&item_id).and_then(|entry| entry.durability);
    remove_item(giver, &item_id, quantity);
    match durability {
        Some(durability) => {
            for _ in 0..quantity {
                add_equipment(receiver, &item_id, durability);
            }
        }
        None => {
            add_item(receiver, &item_id, quantity);
        }
    }

    let narrative = format!(
        "You give {} x{} to {}.",
        item_id, quantity, receiver.display_name
    );
    Ok(Outcome::new(OutcomeKind::ItemGifted, narrative).with_delta(Delta::between(&before, giver)))
}

/// Format inventory for display
pub fn format_inventory(character: &Character) -> String {
    if character.inventory.is_empty() {
        return "Your bag is empty.".to_string();
    }
    let mut output = String::from("=== BAG ===\n");
    for (id, entry) in &character.inventory {
        match entry.durability {
            Some(durability) => {
                output.push_str(&format!("{} x{} (durability {})\n", id, entry.count, durability))
            }
            None => output.push_str(&format!("{} x{}\n", id, entry.count)),
        }
    }
    output.push_str(&format!("Spirit stones: {}", character.currency));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_test_character() -> Character {
        Character::new("qq:7", "Tester", Utc::now())
    }

    #[test]
    fn test_add_and_remove_items() {
        let mut c = create_test_character();
        assert_eq!(
            add_item(&mut c, "spirit_herb", 3),
            InventoryResult::Added {
                quantity: 3,
                total: 3
            }
        );
        assert_eq!(
            remove_item(&mut c, "spirit_herb", 2),
            InventoryResult::Removed {
                quantity: 2,
                remaining: 1
            }
        );
        assert!(matches!(
            remove_item(&mut c, "spirit_herb", 2),
            InventoryResult::Failed { .. }
        ));
        assert_eq!(item_quantity(&c, "spirit_herb"), 1);
    }

    #[test]
    fn test_zero_count_entries_are_dropped() {
        let mut c = create_test_character();
        add_item(&mut c, "cinnabar", 1);
        remove_item(&mut c, "cinnabar", 1);
        assert!(!c.inventory.contains_key("cinnabar"));
    }

    #[test]
    fn test_consume_all_is_all_or_nothing() {
        let mut c = create_test_character().with_item("a", 1).with_item("b", 5);
        let mut costs = BTreeMap::new();
        costs.insert("a".to_string(), 2);
        costs.insert("b".to_string(), 1);
        assert_eq!(find_shortfall(&c, &costs), Some(("a".to_string(), 2, 1)));
        assert!(!consume_all(&mut c, &costs));
        assert_eq!(item_quantity(&c, "a"), 1);
        assert_eq!(item_quantity(&c, "b"), 5);
    }

    #[test]
    fn test_item_id_grammar() {
        let pill = graded_item_id("foundation_pill", Quality::Superior);
        assert_eq!(pill, "foundation_pill:superior");
        assert_eq!(base_item_id(&pill), "foundation_pill");
        assert_eq!(base_item_id("spirit_herb"), "spirit_herb");

        let sword = equipment_item_id("azure_sword", Quality::Supreme);
        assert_eq!(parse_equipment(&sword), Some(("azure_sword", Quality::Supreme)));
        assert_eq!(parse_equipment(&pill), None);
        assert_eq!(scroll_item_id("azure_sword"), "scroll:azure_sword");
        assert_eq!(seed_item_id("spirit_herb"), "seed:spirit_herb");
        assert_eq!(base_item_id("seed:spirit_herb"), "seed:spirit_herb");
        assert_eq!(base_item_id("scroll:azure_sword"), "scroll:azure_sword");
    }

    #[test]
    fn test_take_one_prefers_lowest_quality() {
        let mut c = create_test_character()
            .with_item("foundation_pill:supreme", 1)
            .with_item("foundation_pill:inferior", 1);
        assert_eq!(quantity_of_base(&c, "foundation_pill"), 2);
        assert_eq!(
            take_one_of_base(&mut c, "foundation_pill").as_deref(),
            Some("foundation_pill:inferior")
        );
        assert_eq!(quantity_of_base(&c, "foundation_pill"), 1);
        assert_eq!(take_one_of_base(&mut c, "qi_condensing_pill"), None);
    }

    #[test]
    fn test_held_items_resolve_from_display_text() {
        let c = create_test_character().with_item("spirit_herb", 1);
        assert_eq!(resolve_held_item(&c, "Spirit Herb").as_deref(), Some("spirit_herb"));
        assert_eq!(resolve_held_item(&c, "spirit_herb").as_deref(), Some("spirit_herb"));
        assert_eq!(resolve_held_item(&c, "demon grass"), None);
    }

    #[test]
    fn test_transfer_moves_stock_and_durability() {
        let mut giver = create_test_character().with_item("spirit_herb", 5);
        let sword = equipment_item_id("azure_sea_sword", Quality::Common);
        add_equipment(&mut giver, &sword, 80);
        let mut receiver = Character::new("qq:8", "Friend", Utc::now());

        let outcome = transfer_item(&mut giver, &mut receiver, "spirit herb", 3).unwrap();
        assert_eq!(outcome.kind, OutcomeKind::ItemGifted);
        assert_eq!(outcome.delta.items.get("spirit_herb"), Some(&-3));
        assert_eq!(item_quantity(&giver, "spirit_herb"), 2);
        assert_eq!(item_quantity(&receiver, "spirit_herb"), 3);

        transfer_item(&mut giver, &mut receiver, &sword, 1).unwrap();
        assert!(!giver.inventory.contains_key(&sword));
        assert_eq!(receiver.inventory[&sword].durability, Some(80));
    }

    #[test]
    fn test_transfer_refuses_without_touching_bags() {
        let mut giver = create_test_character().with_item("spirit_herb", 2);
        let mut receiver = Character::new("qq:8", "Friend", Utc::now());
        let err = transfer_item(&mut giver, &mut receiver, "spirit_herb", 3).unwrap_err();
        assert_eq!(
            err.refusal(),
            Some(&Refusal::InsufficientIngredients {
                item: "spirit_herb".to_string(),
                required: 3,
                held: 2,
            })
        );
        assert!(matches!(
            transfer_item(&mut giver, &mut receiver, "spirit_herb", 0),
            Err(GameError::Refused(Refusal::NothingToGive))
        ));
        assert_eq!(item_quantity(&giver, "spirit_herb"), 2);
        assert!(receiver.inventory.is_empty());
    }
}
