//! Crafting for the three production domains.
//!
//! Alchemy, forging and talisman drawing share one algorithm; everything that
//! differs between them lives in a [`DomainProfile`]:
//!
//! 1. the recipe must be learned and every ingredient held;
//! 2. a quality roll and a success roll are drawn;
//! 3. ingredients are consumed whatever the outcome;
//! 4. success grants the output, skill experience and possibly a windfall;
//! 5. failure may cause a mishap that hurts the crafter.
use log::debug;

use crate::game::catalog::{Catalog, Recipe, RecipeOutput, TalismanCategory};
use crate::game::engine::Turn;
use crate::game::errors::{GameError, Refusal};
use crate::game::inventory::{self, equipment_item_id, graded_item_id, scroll_item_id};
use crate::game::quest;
use crate::game::types::{
    AttributeBundle, Character, Delta, Domain, Element, Outcome, OutcomeKind, Quality,
};

/// Durability of freshly forged equipment.
pub const BASE_DURABILITY: u32 = 100;

/// Success-rate bonus from an elemental root.
#[derive(Debug, Clone, Copy)]
pub struct AffinityBonus {
    pub element: Element,
    /// Bonus is `purity / divisor`.
    pub divisor: f64,
    /// Talisman categories the bonus applies to; empty means every recipe.
    pub categories: &'static [TalismanCategory],
}

/// Extra reward rolled after a successful craft.
#[derive(Debug, Clone, Copy)]
pub enum Windfall {
    /// A second copy of the output.
    Duplicate {
        element: Element,
        chance: f64,
        categories: &'static [TalismanCategory],
    },
    /// Equipment comes out with more durability.
    Reinforced {
        element: Element,
        chance: f64,
        durability: u32,
    },
}

/// Harm dealt by a failed craft.
#[derive(Debug, Clone, Copy)]
pub enum Mishap {
    /// Health loss, never below 1.
    Burn { min: u32, max: u32 },
    /// Mana loss, never below 0.
    Backlash { min: u32, max: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct DomainProfile {
    pub domain: Domain,
    /// Grade name and base success rate, indexed by recipe grade.
    pub grades: &'static [(&'static str, f64)],
    pub skill_bonus: f64,
    pub rate_floor: f64,
    pub rate_ceiling: f64,
    pub affinity_bonuses: &'static [AffinityBonus],
    pub windfall: Windfall,
    pub mishap_chance: f64,
    pub mishap: Mishap,
    pub base_exp: u32,
    /// Extra experience of `purity / divisor` for the given root.
    pub exp_bonus: Option<(Element, u32)>,
}

const ANY_CATEGORY: &[TalismanCategory] = &[];
const NURTURING: &[TalismanCategory] = &[TalismanCategory::Supportive, TalismanCategory::Special];
const OFFENSIVE: &[TalismanCategory] = &[TalismanCategory::Offensive];

const ALCHEMY: DomainProfile = DomainProfile {
    domain: Domain::Alchemy,
    grades: &[("Common", 0.8), ("Refined", 0.6), ("Celestial", 0.4), ("Divine", 0.2)],
    skill_bonus: 0.05,
    rate_floor: 0.05,
    rate_ceiling: 0.95,
    affinity_bonuses: &[
        AffinityBonus {
            element: Element::Fire,
            divisor: 500.0,
            categories: ANY_CATEGORY,
        },
        AffinityBonus {
            element: Element::Wood,
            divisor: 1000.0,
            categories: ANY_CATEGORY,
        },
    ],
    windfall: Windfall::Duplicate {
        element: Element::Wood,
        chance: 0.10,
        categories: ANY_CATEGORY,
    },
    mishap_chance: 0.30,
    mishap: Mishap::Burn { min: 5, max: 15 },
    base_exp: 10,
    exp_bonus: Some((Element::Fire, 10)),
};

const FORGING: DomainProfile = DomainProfile {
    domain: Domain::Forging,
    grades: &[
        ("Artifact", 0.7),
        ("Spirit Artifact", 0.5),
        ("Treasure", 0.4),
        ("Spirit Treasure", 0.3),
        ("Immortal Artifact", 0.2),
        ("Divine Artifact", 0.1),
    ],
    skill_bonus: 0.03,
    rate_floor: 0.10,
    rate_ceiling: 0.90,
    affinity_bonuses: &[AffinityBonus {
        element: Element::Metal,
        divisor: 400.0,
        categories: ANY_CATEGORY,
    }],
    windfall: Windfall::Reinforced {
        element: Element::Metal,
        chance: 0.15,
        durability: 200,
    },
    mishap_chance: 0.20,
    mishap: Mishap::Burn { min: 10, max: 20 },
    base_exp: 15,
    exp_bonus: None,
};

const TALISMAN: DomainProfile = DomainProfile {
    domain: Domain::Talisman,
    grades: &[("Yellow", 0.8), ("Cinnabar", 0.6), ("Jade", 0.4), ("Blood Bone", 0.3)],
    skill_bonus: 0.04,
    rate_floor: 0.05,
    rate_ceiling: 0.95,
    affinity_bonuses: &[
        AffinityBonus {
            element: Element::Water,
            divisor: 400.0,
            categories: NURTURING,
        },
        AffinityBonus {
            element: Element::Fire,
            divisor: 500.0,
            categories: OFFENSIVE,
        },
    ],
    windfall: Windfall::Duplicate {
        element: Element::Water,
        chance: 1.0,
        categories: NURTURING,
    },
    mishap_chance: 0.10,
    mishap: Mishap::Backlash { min: 10, max: 30 },
    base_exp: 8,
    exp_bonus: None,
};

impl DomainProfile {
    pub fn for_domain(domain: Domain) -> &'static DomainProfile {
        match domain {
            Domain::Alchemy => &ALCHEMY,
            Domain::Forging => &FORGING,
            Domain::Talisman => &TALISMAN,
        }
    }

    pub fn grade_name(&self, grade: u8) -> &'static str {
        self.grades
            .get(grade as usize)
            .map(|(name, _)| *name)
            .unwrap_or("Unknown")
    }

    fn verb(&self) -> &'static str {
        match self.domain {
            Domain::Alchemy => "refine",
            Domain::Forging => "forge",
            Domain::Talisman => "draw",
        }
    }
}

fn category_matches(categories: &[TalismanCategory], recipe: &Recipe) -> bool {
    categories.is_empty()
        || recipe
            .category()
            .map(|c| categories.contains(&c))
            .unwrap_or(false)
}

/// Chance that `character` succeeds at `recipe`, clamped into the domain's bounds.
pub fn success_rate(
    character: &Character,
    recipe: &Recipe,
    profile: &DomainProfile,
) -> Result<f64, GameError> {
    let base = profile
        .grades
        .get(recipe.grade as usize)
        .map(|(_, rate)| *rate)
        .ok_or_else(|| {
            GameError::Catalog(format!(
                "recipe {} has grade {} outside the {} table",
                recipe.id, recipe.grade, profile.domain
            ))
        })?;
    let skill = character.skill_level(profile.domain.skill()) as f64 * profile.skill_bonus;
    let affinity: f64 = profile
        .affinity_bonuses
        .iter()
        .filter(|bonus| category_matches(bonus.categories, recipe))
        .filter_map(|bonus| {
            character
                .affinity(bonus.element)
                .map(|purity| purity as f64 / bonus.divisor)
        })
        .sum();
    Ok((base + skill + affinity).clamp(profile.rate_floor, profile.rate_ceiling))
}

/// Equipment attributes after the quality multiplier, truncated toward zero.
pub fn scaled_attributes(base: &AttributeBundle, quality: Quality) -> AttributeBundle {
    let factor = quality.equipment_multiplier();
    base.iter()
        .map(|(attr, value)| (*attr, (*value as f64 * factor) as i64))
        .collect()
}

/// Attempt to craft `query` in `domain`.
pub fn craft(
    character: &mut Character,
    domain: Domain,
    query: &str,
    turn: &mut Turn<'_>,
) -> Result<Outcome, GameError> {
    let profile = DomainProfile::for_domain(domain);
    let catalog = turn.catalog;
    let recipe = match catalog.recipe(domain, query) {
        Some(recipe) if character.knows_recipe(domain, &recipe.id) => recipe,
        Some(recipe) => {
            return Refusal::RecipeNotLearned {
                recipe: recipe.name.clone(),
            }
            .fail()
        }
        None => {
            return Refusal::RecipeNotLearned {
                recipe: query.trim().to_string(),
            }
            .fail()
        }
    };
    if let Some((item, required, held)) = inventory::find_shortfall(character, &recipe.ingredients)
    {
        return Refusal::InsufficientIngredients {
            item,
            required,
            held,
        }
        .fail();
    }
    let rate = success_rate(character, recipe, profile)?;

    let quality = Quality::from_roll(turn.dice.roll());
    let succeeded = turn.dice.roll() < rate;
    debug!(
        "{} {} {}: rate {:.3}, quality {}, success {}",
        character.identity,
        profile.verb(),
        recipe.id,
        rate,
        quality,
        succeeded
    );

    let before = character.clone();
    inventory::consume_all(character, &recipe.ingredients);

    let mut lines = Vec::new();
    let kind = if succeeded {
        grant_output(character, recipe, profile, quality, turn, &mut lines);
        let exp = profile.base_exp
            + profile
                .exp_bonus
                .and_then(|(element, divisor)| {
                    character.affinity(element).map(|p| p as u32 / divisor.max(1))
                })
                .unwrap_or(0);
        let skill = domain.skill();
        if character.grant_skill_exp(skill, exp) {
            lines.push(format!(
                "Your {} skill rises to level {}!",
                skill,
                character.skill_level(skill)
            ));
        } else {
            lines.push(format!("{} skill +{} exp.", capitalize(skill), exp));
        }
        quest::increment_objective(character, &format!("craft:{}", skill), 1);
        OutcomeKind::CraftSucceeded
    } else {
        lines.push(format!(
            "You failed to {} {}. The materials are lost.",
            profile.verb(),
            recipe.name
        ));
        if turn.dice.chance(profile.mishap_chance) {
            match profile.mishap {
                Mishap::Burn { min, max } => {
                    let harm = turn.dice.between(min as i64, max as i64).max(0) as u32;
                    character.lose_health(harm);
                    lines.push(format!("The furnace backfires and burns you for {} health!", harm));
                }
                Mishap::Backlash { min, max } => {
                    let harm = turn.dice.between(min as i64, max as i64).max(0) as u32;
                    character.lose_mana(harm);
                    lines.push(format!("Spiritual backlash drains {} mana!", harm));
                }
            }
        }
        OutcomeKind::CraftFailed
    };

    Ok(Outcome::new(kind, lines.join("\n")).with_delta(Delta::between(&before, character)))
}

fn grant_output(
    character: &mut Character,
    recipe: &Recipe,
    profile: &DomainProfile,
    quality: Quality,
    turn: &mut Turn<'_>,
    lines: &mut Vec<String>,
) {
    let grade = profile.grade_name(recipe.grade);
    match &recipe.output {
        RecipeOutput::Equipment { attributes, .. } => {
            let mut durability = BASE_DURABILITY;
            if let Windfall::Reinforced {
                element,
                chance,
                durability: reinforced,
            } = profile.windfall
            {
                if character.affinity(element).is_some() && turn.dice.chance(chance) {
                    durability = reinforced;
                    lines.push(format!(
                        "Your {} root tempers the metal: durability {}!",
                        element, durability
                    ));
                }
            }
            let stats = scaled_attributes(attributes, quality);
            let item_id = equipment_item_id(&recipe.id, quality);
            inventory::add_equipment(character, &item_id, durability);
            let stats_text: Vec<String> = stats
                .iter()
                .map(|(attr, value)| format!("{} +{}", attr, value))
                .collect();
            lines.insert(
                0,
                format!(
                    "You forged {} ({} {}): {}.",
                    recipe.name,
                    quality,
                    grade,
                    stats_text.join(", ")
                ),
            );
        }
        RecipeOutput::Elixir { .. } | RecipeOutput::Charm { .. } => {
            let mut copies = 1;
            if let Windfall::Duplicate {
                element,
                chance,
                categories,
            } = profile.windfall
            {
                if category_matches(categories, recipe)
                    && character.affinity(element).is_some()
                    && turn.dice.chance(chance)
                {
                    copies = 2;
                    lines.push(format!("Your {} root yields a second {}!", element, recipe.name));
                }
            }
            let item_id = graded_item_id(&recipe.id, quality);
            inventory::add_item(character, &item_id, copies);
            let potency = match recipe.output {
                RecipeOutput::Charm { .. } => {
                    format!(" Potency x{:.2}.", quality.charm_multiplier())
                }
                _ => String::new(),
            };
            lines.insert(
                0,
                format!(
                    "You {} {} ({} {}).{}",
                    past_tense(profile.verb()),
                    recipe.name,
                    quality,
                    grade,
                    potency
                ),
            );
        }
    }
}

fn past_tense(verb: &str) -> &'static str {
    match verb {
        "refine" => "refined",
        "forge" => "forged",
        _ => "drew",
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Learn a recipe by reading its scroll.
pub fn learn_recipe(
    character: &mut Character,
    query: &str,
    catalog: &Catalog,
) -> Result<Outcome, GameError> {
    let recipe = catalog
        .find_recipe(query)
        .ok_or_else(|| Refusal::RecipeNotFound {
            recipe: query.trim().to_string(),
        })?;
    if character.knows_recipe(recipe.domain, &recipe.id) {
        return Refusal::RecipeAlreadyLearned {
            recipe: recipe.name.clone(),
        }
        .fail();
    }
    let scroll = scroll_item_id(&recipe.id);
    if !inventory::has_item(character, &scroll, 1) {
        return Refusal::MissingRecipeScroll {
            recipe: recipe.name.clone(),
        }
        .fail();
    }
    let before = character.clone();
    inventory::remove_item(character, &scroll, 1);
    character
        .learned_recipes
        .entry(recipe.domain)
        .or_default()
        .insert(recipe.id.clone());
    let narrative = format!(
        "You study the scroll and learn {} ({}). Needs: {}.",
        recipe.name,
        recipe.domain,
        recipe.describe_ingredients()
    );
    Ok(Outcome::new(OutcomeKind::RecipeLearned, narrative)
        .with_delta(Delta::between(&before, character)))
}

/// Learned recipes of one domain, one per line.
pub fn format_recipe_list(character: &Character, catalog: &Catalog, domain: Domain) -> String {
    let profile = DomainProfile::for_domain(domain);
    let learned = match character.learned_recipes.get(&domain) {
        Some(set) if !set.is_empty() => set,
        _ => {
            return format!(
                "You know no {} recipes yet. Complete quests to earn recipe scrolls.",
                domain
            )
        }
    };
    let mut output = format!("=== {} RECIPES ===\n", domain.skill().to_uppercase());
    for id in learned {
        match catalog.recipe_by_id(id) {
            Some(recipe) => output.push_str(&format!(
                "{} [{}, {} lv {}] - {} | {}\n",
                recipe.name,
                profile.grade_name(recipe.grade),
                domain,
                recipe.required_level,
                recipe.describe_ingredients(),
                recipe.describe_output()
            )),
            None => output.push_str(&format!("{} (lost to time)\n", id)),
        }
    }
    output.trim_end().to_string()
}
