//! Spirit fields: sow a seed in a numbered plot, wait out the growth timer and
//! harvest the yield. Accelerant items pull the ripening time forward.
//!
//! Roll order: planting rolls the variant chance; a harvest rolls the seed return,
//! then (wood roots only) the bonus chance and the bonus pick; accelerating rolls
//! the wood bonus only for wood roots.
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};

use crate::config::RulesConfig;
use crate::game::advancement::remaining_secs;
use crate::game::catalog::Catalog;
use crate::game::engine::Turn;
use crate::game::errors::{format_wait, GameError, Refusal};
use crate::game::inventory::{self, seed_item_id};
use crate::game::quest;
use crate::game::types::{Character, Delta, Element, Outcome, OutcomeKind, Plot};

/// Chance a harvest hands back a seed of the same plant.
pub const SEED_RETURN_CHANCE: f64 = 0.7;
/// Chance a wood root gathers one extra unit at harvest.
pub const WOOD_HARVEST_BONUS_CHANCE: f64 = 0.3;
/// Chance a wood root skips one more hour when accelerating.
pub const WOOD_GROWTH_BONUS_CHANCE: f64 = 0.2;
pub const FARMING_SKILL: &str = "farming";
pub const HARVEST_SKILL_EXP: u32 = 6;

fn check_plot(plot: u32, rules: &RulesConfig) -> Result<(), GameError> {
    if plot == 0 || plot > rules.farm_plots {
        return Refusal::PlotOutOfRange {
            plot,
            max: rules.farm_plots,
        }
        .fail();
    }
    Ok(())
}

fn has_wood_root(character: &Character) -> bool {
    character.affinity(Element::Wood).is_some()
}

/// Sow one seed of `query` in `plot`.
pub fn plant(
    character: &mut Character,
    query: &str,
    plot: u32,
    turn: &mut Turn<'_>,
) -> Result<Outcome, GameError> {
    check_plot(plot, turn.rules)?;
    let catalog = turn.catalog;
    let spec = catalog
        .plant(query)
        .ok_or_else(|| Refusal::PlantNotFound {
            plant: query.trim().to_string(),
        })?;
    if character.plots.contains_key(&plot) {
        return Refusal::PlotOccupied { plot }.fail();
    }
    let seed = seed_item_id(&spec.id);
    let held = inventory::item_quantity(character, &seed);
    if held == 0 {
        return Refusal::InsufficientIngredients {
            item: seed,
            required: 1,
            held,
        }
        .fail();
    }

    let before = character.clone();
    inventory::remove_item(character, &seed, 1);
    let variant = turn.dice.chance(spec.variant_chance);
    let growth = Duration::hours(i64::from(spec.growth_hours));
    character.plots.insert(
        plot,
        Plot {
            plant_id: spec.id.clone(),
            planted_at: turn.now,
            ripe_at: turn.now + growth,
            variant,
        },
    );
    debug!(
        "{} planted {} in plot {} (variant {})",
        character.identity, spec.id, plot, variant
    );

    let narrative = format!(
        "You sow {} in plot {}. It ripens in {}.",
        spec.name,
        plot,
        format_wait(growth.num_seconds())
    );
    Ok(Outcome::new(OutcomeKind::Planted, narrative).with_delta(Delta::between(&before, character)))
}

/// Gather a ripe plot, clearing it.
pub fn harvest(
    character: &mut Character,
    plot: u32,
    turn: &mut Turn<'_>,
) -> Result<Outcome, GameError> {
    check_plot(plot, turn.rules)?;
    let Some(planted) = character.plots.get(&plot).cloned() else {
        return Refusal::PlotEmpty { plot }.fail();
    };
    let catalog = turn.catalog;
    let Some(spec) = catalog.plant_by_id(&planted.plant_id) else {
        warn!(
            "{} plot {} holds unknown plant {}; clearing it",
            character.identity, plot, planted.plant_id
        );
        character.plots.remove(&plot);
        return Ok(Outcome::new(
            OutcomeKind::Harvested,
            format!("The plant in plot {} has withered away. The plot is cleared.", plot),
        ));
    };
    if !planted.is_ripe(turn.now) {
        return Refusal::NotRipe {
            plot,
            remaining_secs: remaining_secs(planted.ripe_at - turn.now),
        }
        .fail();
    }

    let before = character.clone();
    character.plots.remove(&plot);
    let multiplier = if planted.variant { 2 } else { 1 };
    let mut lines = vec![format!("You harvest {} from plot {}.", spec.name, plot)];
    if planted.variant {
        lines.push("A variant plant! The yield is doubled.".to_string());
    }
    let mut gathered = Vec::new();
    for (item, count) in &spec.yields {
        let amount = count.saturating_mul(multiplier);
        inventory::add_item(character, item, amount);
        gathered.push(format!("{} x{}", item, amount));
    }
    lines.push(format!("Gathered: {}", gathered.join(", ")));

    if turn.dice.chance(SEED_RETURN_CHANCE) {
        let seed = seed_item_id(&spec.id);
        inventory::add_item(character, &seed, 1);
        lines.push(format!("You keep a {} for the next sowing.", seed));
    }
    if has_wood_root(character) && turn.dice.chance(WOOD_HARVEST_BONUS_CHANCE) {
        let items: Vec<&String> = spec.yields.keys().collect();
        let last = items.len() as i64 - 1;
        let pick = turn.dice.between(0, last).clamp(0, last.max(0)) as usize;
        if let Some(item) = items.get(pick) {
            inventory::add_item(character, item, 1);
            lines.push(format!("Your wood root stirs the soil: one extra {}.", item));
        }
    }

    if character.grant_skill_exp(FARMING_SKILL, HARVEST_SKILL_EXP) {
        lines.push(format!(
            "Farming skill rises to level {}!",
            character.skill_level(FARMING_SKILL)
        ));
    } else {
        lines.push(format!("Farming skill +{} exp.", HARVEST_SKILL_EXP));
    }
    quest::increment_objective(character, "harvest", 1);
    quest::increment_objective(character, &format!("harvest:{}", spec.id), 1);

    Ok(Outcome::new(OutcomeKind::Harvested, lines.join("\n"))
        .with_delta(Delta::between(&before, character)))
}

/// Spend one accelerant on a growing plot.
pub fn accelerate(
    character: &mut Character,
    plot: u32,
    query: &str,
    turn: &mut Turn<'_>,
) -> Result<Outcome, GameError> {
    check_plot(plot, turn.rules)?;
    let Some(planted) = character.plots.get(&plot) else {
        return Refusal::PlotEmpty { plot }.fail();
    };
    if planted.is_ripe(turn.now) {
        return Refusal::AlreadyRipe { plot }.fail();
    }
    let catalog = turn.catalog;
    let (item, hours) = catalog
        .accelerant(query)
        .ok_or_else(|| Refusal::UnknownAccelerant {
            item: query.trim().to_string(),
        })?;
    let held = inventory::item_quantity(character, item);
    if held == 0 {
        return Refusal::InsufficientIngredients {
            item: item.to_string(),
            required: 1,
            held,
        }
        .fail();
    }

    let before = character.clone();
    inventory::remove_item(character, item, 1);
    let mut skipped = i64::from(hours);
    let mut lines = vec![format!(
        "You tend plot {} with {}. Growth hastens by {}h.",
        plot, item, hours
    )];
    if has_wood_root(character) && turn.dice.chance(WOOD_GROWTH_BONUS_CHANCE) {
        skipped += 1;
        lines.push("Your wood root quickens the plant by another hour.".to_string());
    }
    let now = turn.now;
    let ripe_at = match character.plots.get_mut(&plot) {
        Some(planted) => {
            planted.ripe_at -= Duration::hours(skipped);
            planted.ripe_at
        }
        None => return Refusal::PlotEmpty { plot }.fail(),
    };
    lines.push(ripening_text(ripe_at, now));

    Ok(Outcome::new(OutcomeKind::GrowthAccelerated, lines.join("\n"))
        .with_delta(Delta::between(&before, character)))
}

fn ripening_text(ripe_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if now >= ripe_at {
        "It is ripe now.".to_string()
    } else {
        format!("Ripe in {}.", format_wait(remaining_secs(ripe_at - now)))
    }
}

/// Every plot the character owns, empty ones included.
pub fn format_field(
    character: &Character,
    catalog: &Catalog,
    rules: &RulesConfig,
    now: DateTime<Utc>,
) -> String {
    let mut output = String::from("=== SPIRIT FIELD ===\n");
    for number in 1..=rules.farm_plots {
        let line = match character.plots.get(&number) {
            None => "empty".to_string(),
            Some(planted) => {
                let name = catalog
                    .plant_by_id(&planted.plant_id)
                    .map(|spec| spec.name.as_str())
                    .unwrap_or("Withered plant");
                if planted.is_ripe(now) {
                    let variant = if planted.variant { " (variant)" } else { "" };
                    format!("{} - ripe{}! HARVEST {}", name, variant, number)
                } else {
                    format!(
                        "{} - {} left",
                        name,
                        format_wait(remaining_secs(planted.ripe_at - now))
                    )
                }
            }
        };
        output.push_str(&format!("Plot {}: {}\n", number, line));
    }
    output.trim_end().to_string()
}

/// Plants in the catalog with growth time and yield.
pub fn format_plant_list(catalog: &Catalog) -> String {
    if catalog.plants.is_empty() {
        return "No spirit plants are known.".to_string();
    }
    let mut output = String::from("=== SPIRIT PLANTS ===\n");
    for spec in &catalog.plants {
        let yields = spec
            .yields
            .iter()
            .map(|(item, count)| format!("{} x{}", item, count))
            .collect::<Vec<_>>()
            .join(", ");
        output.push_str(&format!(
            "{} [{}] - {}h, yields {} (sow {})\n",
            spec.name,
            spec.id,
            spec.growth_hours,
            yields,
            seed_item_id(&spec.id)
        ));
    }
    output.trim_end().to_string()
}
