//! Read-only content catalog: tier ladders, recipes, monsters, quests, spirit plants
//! and the starter kit.
//!
//! The catalog is global and never mutated by gameplay. Lookups return `None` for
//! "no such entry"; integrity problems surface as [`GameError::Catalog`].
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::game::errors::GameError;
use crate::game::inventory::seed_item_id;
use crate::game::production::DomainProfile;
use crate::game::seed;
use crate::game::types::{AttributeBundle, Domain, Faction};

/// One rung of a faction's advancement ladder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierSpec {
    pub name: String,
    /// Item consumed to break through out of this tier.
    #[serde(default)]
    pub breakthrough_item: Option<String>,
    /// Faction that gets the breakthrough bonus while on this tier.
    #[serde(default)]
    pub favored_faction: Option<Faction>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TalismanCategory {
    Offensive,
    Defensive,
    Supportive,
    Special,
}

impl fmt::Display for TalismanCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TalismanCategory::Offensive => "offensive",
            TalismanCategory::Defensive => "defensive",
            TalismanCategory::Supportive => "supportive",
            TalismanCategory::Special => "special",
        };
        f.write_str(label)
    }
}

/// What a recipe produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecipeOutput {
    Elixir {
        effect: String,
    },
    Equipment {
        slot: String,
        attributes: AttributeBundle,
    },
    Charm {
        category: TalismanCategory,
        effect: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub domain: Domain,
    /// Ordinal into the domain's grade table.
    pub grade: u8,
    pub required_level: u32,
    pub ingredients: BTreeMap<String, u32>,
    pub output: RecipeOutput,
}

impl Recipe {
    pub fn category(&self) -> Option<TalismanCategory> {
        match &self.output {
            RecipeOutput::Charm { category, .. } => Some(*category),
            _ => None,
        }
    }

    pub fn attributes(&self) -> Option<&AttributeBundle> {
        match &self.output {
            RecipeOutput::Equipment { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn describe_output(&self) -> String {
        match &self.output {
            RecipeOutput::Elixir { effect } => effect.clone(),
            RecipeOutput::Charm { category, effect } => format!("[{}] {}", category, effect),
            RecipeOutput::Equipment { slot, attributes } => {
                let stats: Vec<String> = attributes
                    .iter()
                    .map(|(attr, value)| format!("{} +{}", attr, value))
                    .collect();
                format!("{}: {}", slot, stats.join(", "))
            }
        }
    }

    pub fn describe_ingredients(&self) -> String {
        self.ingredients
            .iter()
            .map(|(item, qty)| format!("{} x{}", item, qty))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Monster {
    pub id: String,
    pub name: String,
    pub difficulty: Difficulty,
    pub health: u32,
    pub attack: u32,
    pub defense: u32,
    /// Minimum tier ordinal required to challenge it.
    pub min_tier: usize,
    /// Item id to independent drop probability.
    pub drops: BTreeMap<String, f64>,
}

impl Monster {
    pub fn power(&self) -> u32 {
        self.attack + self.defense
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    Main,
    Side,
    Daily,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Objective {
    /// Counter key (`kill_monster`, `kill_monster:<id>`, `craft:<domain>`, `harvest`,
    /// `harvest:<plant>`) or
    /// `collect:<item>` for hand-ins checked against the inventory.
    pub key: String,
    pub required: u32,
    pub description: String,
}

impl Objective {
    pub fn collect_item(&self) -> Option<&str> {
        self.key.strip_prefix("collect:")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuestRewards {
    #[serde(default)]
    pub currency: u64,
    #[serde(default)]
    pub items: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestRecord {
    pub id: String,
    pub name: String,
    pub kind: QuestKind,
    #[serde(default)]
    pub min_tier: usize,
    #[serde(default)]
    pub faction: Option<Faction>,
    #[serde(default)]
    pub repeatable: bool,
    pub objectives: Vec<Objective>,
    pub rewards: QuestRewards,
}

/// A spirit plant grown from `seed:<id>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantSpec {
    pub id: String,
    pub name: String,
    pub growth_hours: u32,
    pub yields: BTreeMap<String, u32>,
    /// Chance a planting turns out a variant with doubled yield.
    #[serde(default)]
    pub variant_chance: f64,
}

/// Values every new character starts with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StarterKit {
    pub currency: u64,
    pub items: BTreeMap<String, u32>,
    pub skills: Vec<String>,
    pub quests: Vec<String>,
    pub purity_min: u8,
    pub purity_max: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub ladders: BTreeMap<Faction, Vec<TierSpec>>,
    pub recipes: Vec<Recipe>,
    pub monsters: Vec<Monster>,
    pub quests: Vec<QuestRecord>,
    #[serde(default)]
    pub plants: Vec<PlantSpec>,
    /// Item id to the hours of growth it skips.
    #[serde(default)]
    pub accelerants: BTreeMap<String, u32>,
    pub starter: StarterKit,
}

fn matches_query(id: &str, name: &str, query: &str) -> bool {
    let query = query.trim();
    id.eq_ignore_ascii_case(query)
        || name.eq_ignore_ascii_case(query)
        || id.eq_ignore_ascii_case(&query.replace(' ', "_"))
}

impl Catalog {
    /// Content shipped with the game.
    pub fn builtin() -> Self {
        seed::builtin_catalog()
    }

    pub fn from_json_str(text: &str) -> Result<Self, GameError> {
        let catalog: Catalog = serde_json::from_str(text)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load and validate a JSON catalog file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, GameError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check cross references a malformed catalog could break.
    pub fn validate(&self) -> Result<(), GameError> {
        for faction in Faction::ALL {
            if self.ladder(faction)?.is_empty() {
                return Err(GameError::Catalog(format!("ladder for {} is empty", faction)));
            }
        }
        for recipe in &self.recipes {
            let grades = DomainProfile::for_domain(recipe.domain).grades.len();
            if recipe.grade as usize >= grades {
                return Err(GameError::Catalog(format!(
                    "recipe {} has grade {} but {} has {} grades",
                    recipe.id, recipe.grade, recipe.domain, grades
                )));
            }
            if recipe.ingredients.is_empty() {
                return Err(GameError::Catalog(format!("recipe {} has no ingredients", recipe.id)));
            }
            let shape_ok = matches!(
                (recipe.domain, &recipe.output),
                (Domain::Alchemy, RecipeOutput::Elixir { .. })
                    | (Domain::Forging, RecipeOutput::Equipment { .. })
                    | (Domain::Talisman, RecipeOutput::Charm { .. })
            );
            if !shape_ok {
                return Err(GameError::Catalog(format!(
                    "recipe {} output does not fit domain {}",
                    recipe.id, recipe.domain
                )));
            }
        }
        let longest = self.ladders.values().map(Vec::len).max().unwrap_or(0);
        for monster in &self.monsters {
            if monster.min_tier >= longest {
                return Err(GameError::Catalog(format!(
                    "monster {} gated behind missing tier {}",
                    monster.id, monster.min_tier
                )));
            }
            if let Some((item, p)) = monster.drops.iter().find(|(_, p)| !(0.0..=1.0).contains(*p)) {
                return Err(GameError::Catalog(format!(
                    "monster {} drops {} with probability {}",
                    monster.id, item, p
                )));
            }
        }
        for plant in &self.plants {
            if plant.growth_hours == 0 || plant.yields.is_empty() {
                return Err(GameError::Catalog(format!(
                    "plant {} needs a growth time and a yield",
                    plant.id
                )));
            }
            if !(0.0..=1.0).contains(&plant.variant_chance) {
                return Err(GameError::Catalog(format!(
                    "plant {} has variant chance {}",
                    plant.id, plant.variant_chance
                )));
            }
        }
        if let Some((item, _)) = self.accelerants.iter().find(|(_, hours)| **hours == 0) {
            return Err(GameError::Catalog(format!("accelerant {} skips no time", item)));
        }
        let obtainable = self.obtainable_items();
        for recipe in &self.recipes {
            if let Some(item) = recipe.ingredients.keys().find(|item| !obtainable.contains(*item)) {
                return Err(GameError::Catalog(format!(
                    "recipe {} needs {}, which nothing yields",
                    recipe.id, item
                )));
            }
        }
        for (faction, ladder) in &self.ladders {
            for tier in ladder {
                let Some(item) = &tier.breakthrough_item else {
                    continue;
                };
                if self.recipe_by_id(item).is_none() && !obtainable.contains(item) {
                    return Err(GameError::Catalog(format!(
                        "{} tier {} needs {}, which cannot be obtained",
                        faction, tier.name, item
                    )));
                }
            }
        }
        for quest_id in &self.starter.quests {
            if self.quest(quest_id).is_none() {
                return Err(GameError::Catalog(format!("starter quest {} missing", quest_id)));
            }
        }
        if self.starter.purity_min == 0 || self.starter.purity_min > self.starter.purity_max {
            return Err(GameError::Catalog("starter purity range is invalid".into()));
        }
        Ok(())
    }

    /// Items a player can come by without crafting: the starter kit, monster drops,
    /// quest rewards and the harvest of every plant whose seed is among those.
    pub fn obtainable_items(&self) -> BTreeSet<String> {
        let mut items: BTreeSet<String> = self.starter.items.keys().cloned().collect();
        for monster in &self.monsters {
            items.extend(
                monster
                    .drops
                    .iter()
                    .filter(|(_, probability)| **probability > 0.0)
                    .map(|(item, _)| item.clone()),
            );
        }
        for quest in &self.quests {
            items.extend(quest.rewards.items.keys().cloned());
        }
        let harvested: Vec<String> = self
            .plants
            .iter()
            .filter(|plant| items.contains(&seed_item_id(&plant.id)))
            .flat_map(|plant| plant.yields.keys().cloned())
            .collect();
        items.extend(harvested);
        items
    }

    pub fn ladder(&self, faction: Faction) -> Result<&[TierSpec], GameError> {
        self.ladders
            .get(&faction)
            .map(Vec::as_slice)
            .ok_or_else(|| GameError::Catalog(format!("no tier ladder for {}", faction)))
    }

    pub fn tier(&self, faction: Faction, index: usize) -> Result<&TierSpec, GameError> {
        self.ladder(faction)?.get(index).ok_or_else(|| {
            GameError::Catalog(format!("{} ladder has no tier {}", faction, index))
        })
    }

    /// Display name for a tier, tolerant of bad indices.
    pub fn tier_name(&self, faction: Faction, index: usize) -> String {
        self.tier(faction, index)
            .map(|tier| tier.name.clone())
            .unwrap_or_else(|_| format!("Tier {}", index + 1))
    }

    pub fn recipe(&self, domain: Domain, query: &str) -> Option<&Recipe> {
        self.recipes
            .iter()
            .find(|r| r.domain == domain && matches_query(&r.id, &r.name, query))
    }

    /// Recipe lookup across every domain.
    pub fn find_recipe(&self, query: &str) -> Option<&Recipe> {
        self.recipes
            .iter()
            .find(|r| matches_query(&r.id, &r.name, query))
    }

    pub fn recipe_by_id(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    pub fn monster(&self, query: &str) -> Option<&Monster> {
        self.monsters
            .iter()
            .find(|m| matches_query(&m.id, &m.name, query))
    }

    /// Monsters a character of `tier` may challenge, easiest gate first.
    pub fn monsters_within(&self, tier: usize) -> Vec<&Monster> {
        let mut list: Vec<&Monster> = self.monsters.iter().filter(|m| m.min_tier <= tier).collect();
        list.sort_by(|a, b| a.min_tier.cmp(&b.min_tier).then_with(|| a.name.cmp(&b.name)));
        list
    }

    pub fn quest(&self, query: &str) -> Option<&QuestRecord> {
        self.quests
            .iter()
            .find(|q| matches_query(&q.id, &q.name, query))
    }

    pub fn plant(&self, query: &str) -> Option<&PlantSpec> {
        self.plants
            .iter()
            .find(|p| matches_query(&p.id, &p.name, query))
    }

    pub fn plant_by_id(&self, id: &str) -> Option<&PlantSpec> {
        self.plants.iter().find(|p| p.id == id)
    }

    /// Accelerant id and the hours it skips.
    pub fn accelerant(&self, query: &str) -> Option<(&str, u32)> {
        self.accelerants
            .iter()
            .find(|(id, _)| matches_query(id, &id.replace('_', " "), query))
            .map(|(id, hours)| (id.as_str(), *hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_consistent() {
        let catalog = Catalog::builtin();
        catalog.validate().expect("builtin catalog valid");
        for faction in Faction::ALL {
            assert_eq!(catalog.ladder(faction).unwrap().len(), 8);
        }
        assert_eq!(catalog.monsters.len(), 16);
    }

    #[test]
    fn lookups_accept_ids_and_names() {
        let catalog = Catalog::builtin();
        let by_id = catalog.recipe(Domain::Alchemy, "foundation_pill").unwrap();
        let by_name = catalog.recipe(Domain::Alchemy, "foundation pill").unwrap();
        assert_eq!(by_id.id, by_name.id);
        assert!(catalog.recipe(Domain::Forging, "foundation_pill").is_none());
        assert!(catalog.monster("Sea-Splitting Turtle").is_some());
        assert!(catalog.monster("no such beast").is_none());
    }

    #[test]
    fn monster_gate_filters_by_tier() {
        let catalog = Catalog::builtin();
        let starters = catalog.monsters_within(0);
        assert!(!starters.is_empty());
        assert!(starters.iter().all(|m| m.min_tier == 0));
        assert_eq!(catalog.monsters_within(7).len(), 16);
    }

    #[test]
    fn json_catalog_round_trips_and_validates() {
        let catalog = Catalog::builtin();
        let text = catalog.to_json_pretty().unwrap();
        let reloaded = Catalog::from_json_str(&text).unwrap();
        assert_eq!(reloaded, catalog);

        let mut broken = catalog.clone();
        broken.recipes[0].grade = 42;
        let text = broken.to_json_pretty().unwrap();
        assert!(matches!(
            Catalog::from_json_str(&text),
            Err(GameError::Catalog(_))
        ));
    }

    #[test]
    fn every_recipe_ingredient_has_a_source() {
        let catalog = Catalog::builtin();
        let obtainable = catalog.obtainable_items();
        for recipe in &catalog.recipes {
            for item in recipe.ingredients.keys() {
                assert!(obtainable.contains(item), "{} needs {}", recipe.id, item);
            }
        }
        assert!(obtainable.contains("demon_grass"));
        assert!(obtainable.contains("bone_lotus"));
    }

    #[test]
    fn unobtainable_ingredients_are_rejected() {
        let mut no_fields = Catalog::builtin();
        no_fields.plants.clear();
        let err = no_fields.validate().unwrap_err();
        assert!(matches!(err, GameError::Catalog(ref text) if text.contains("which nothing yields")));

        let mut exotic = Catalog::builtin();
        exotic.recipes[0]
            .ingredients
            .insert("moon_dew".to_string(), 1);
        let err = exotic.validate().unwrap_err();
        assert!(matches!(err, GameError::Catalog(ref text) if text.contains("moon_dew")));

        let mut orphan_seed = Catalog::builtin();
        orphan_seed.starter.items.remove("seed:demon_grass");
        orphan_seed.quests.retain(|q| !q.rewards.items.contains_key("seed:demon_grass"));
        let err = orphan_seed.validate().unwrap_err();
        assert!(matches!(err, GameError::Catalog(ref text) if text.contains("demon_grass")));
    }

    #[test]
    fn plants_and_accelerants_resolve_by_name() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.plant("Spirit Herb").map(|p| p.id.as_str()), Some("spirit_herb"));
        assert_eq!(catalog.accelerant("spirit water"), Some(("spirit_water", 2)));
        assert_eq!(catalog.accelerant("Growth_Talisman"), Some(("growth_talisman", 8)));
        assert_eq!(catalog.accelerant("cinnabar"), None);
    }
}
