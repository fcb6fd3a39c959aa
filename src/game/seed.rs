//! Built-in content tables.
use std::collections::BTreeMap;

use crate::game::catalog::{
    Catalog, Difficulty, Monster, Objective, PlantSpec, QuestKind, QuestRecord, QuestRewards,
    Recipe, RecipeOutput, StarterKit, TalismanCategory, TierSpec,
};
use crate::game::inventory::{scroll_item_id, seed_item_id};
use crate::game::types::{Attribute, Domain, Faction};

pub fn builtin_catalog() -> Catalog {
    let mut recipes = alchemy_recipes();
    recipes.extend(forging_recipes());
    recipes.extend(talisman_recipes());
    Catalog {
        ladders: ladders(),
        recipes,
        monsters: monsters(),
        quests: quests(),
        plants: plants(),
        accelerants: counts(&[("spirit_water", 2), ("growth_talisman", 8)]),
        starter: starter_kit(),
    }
}

fn counts(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

const IMMORTAL_TIERS: [(&str, Option<&str>); 8] = [
    ("Body Tempering", Some("foundation_pill")),
    ("Qi Refining", Some("qi_condensing_pill")),
    ("Foundation Establishment", Some("golden_core_pill")),
    ("Golden Core", Some("nascent_soul_pill")),
    ("Nascent Soul", Some("deity_pill")),
    ("Deity Transformation", Some("tribulation_pill")),
    ("Tribulation Crossing", Some("mahayana_pill")),
    ("Mahayana", None),
];

const DEMONIC_TIERS: [(&str, Option<&str>); 8] = [
    ("Bone Corrosion", Some("fiend_gathering_pill")),
    ("Fiend Gathering", Some("demon_fiend_pill")),
    ("Demon Altar", Some("demon_heart_pill")),
    ("Demon Core", Some("demon_embryo_pill")),
    ("Demon Embryo", Some("purgatory_pill")),
    ("Purgatory", Some("heaven_defiance_pill")),
    ("Heaven Defiance", Some("world_extinction_pill")),
    ("World Extinction", None),
];

fn ladder(table: &[(&str, Option<&str>)], favored: Option<Faction>) -> Vec<TierSpec> {
    table
        .iter()
        .map(|(name, item)| TierSpec {
            name: name.to_string(),
            breakthrough_item: item.map(str::to_string),
            favored_faction: favored,
        })
        .collect()
}

fn ladders() -> BTreeMap<Faction, Vec<TierSpec>> {
    let mut map = BTreeMap::new();
    map.insert(Faction::Immortal, ladder(&IMMORTAL_TIERS, Some(Faction::Immortal)));
    map.insert(Faction::Demonic, ladder(&DEMONIC_TIERS, Some(Faction::Demonic)));
    // Neutral cultivators walk the immortal ladder without its blessing.
    map.insert(Faction::Neutral, ladder(&IMMORTAL_TIERS, None));
    map
}

fn elixir(id: &str, name: &str, grade: u8, level: u32, ingredients: &[(&str, u32)], effect: &str) -> Recipe {
    Recipe {
        id: id.to_string(),
        name: name.to_string(),
        domain: Domain::Alchemy,
        grade,
        required_level: level,
        ingredients: counts(ingredients),
        output: RecipeOutput::Elixir {
            effect: effect.to_string(),
        },
    }
}

fn alchemy_recipes() -> Vec<Recipe> {
    vec![
        elixir("foundation_pill", "Foundation Pill", 0, 1, &[("spirit_herb", 2), ("sea_turtle_core", 1)], "Required to break out of Body Tempering"),
        elixir("fiend_gathering_pill", "Fiend Gathering Pill", 0, 2, &[("demon_grass", 2), ("rotbone_core", 1)], "Required to break out of Bone Corrosion"),
        elixir("qi_condensing_pill", "Qi Condensing Pill", 1, 1, &[("spirit_herb", 5), ("sea_turtle_core", 2), ("jade_ape_core", 1)], "Required to break out of Qi Refining"),
        elixir("demon_fiend_pill", "Demon Fiend Pill", 1, 2, &[("demon_grass", 5), ("rotbone_core", 2), ("soul_eater_core", 1)], "Required to break out of Fiend Gathering"),
        elixir("golden_core_pill", "Golden Core Pill", 1, 2, &[("spirit_herb", 10), ("jade_ape_core", 5), ("vine_spirit_core", 3)], "Required to break out of Foundation Establishment"),
        elixir("demon_heart_pill", "Demon Heart Pill", 1, 2, &[("demon_grass", 10), ("soul_eater_core", 5), ("magma_core", 3)], "Required to break out of Demon Altar"),
        elixir("nascent_soul_pill", "Nascent Soul Pill", 2, 3, &[("spirit_herb", 50), ("vine_spirit_core", 5), ("ironwing_core", 4)], "Required to break out of Golden Core"),
        elixir("demon_embryo_pill", "Demon Embryo Pill", 2, 3, &[("demon_grass", 50), ("magma_core", 5), ("bone_dragon_core", 4)], "Required to break out of Demon Core"),
        elixir("deity_pill", "Deity Transformation Pill", 2, 4, &[("spirit_herb", 100), ("ironwing_core", 8), ("thunder_qilin_core", 4)], "Required to break out of Nascent Soul"),
        elixir("purgatory_pill", "Purgatory Pill", 2, 4, &[("demon_grass", 100), ("bone_dragon_core", 8), ("gu_mother_core", 4)], "Required to break out of Demon Embryo"),
        elixir("tribulation_pill", "Tribulation Pill", 2, 5, &[("spirit_herb", 200), ("thunder_qilin_core", 2), ("fire_bird_core", 2)], "Required to break out of Deity Transformation"),
        elixir("heaven_defiance_pill", "Heaven Defiance Pill", 2, 5, &[("demon_grass", 200), ("gu_mother_core", 2), ("flame_fiend_core", 2)], "Required to break out of Purgatory"),
        elixir("mahayana_pill", "Mahayana Pill", 3, 6, &[("spirit_herb", 400), ("thunder_qilin_core", 4), ("fire_bird_core", 5)], "Required to break out of Tribulation Crossing"),
        elixir("world_extinction_pill", "World Extinction Pill", 3, 6, &[("demon_grass", 400), ("gu_mother_core", 4), ("flame_fiend_core", 5)], "Required to break out of Heaven Defiance"),
        elixir("blood_qi_pill", "Blood Qi Pill", 0, 1, &[("spirit_herb", 2), ("blood_qi_grass", 2)], "Restores 10 health"),
        elixir("ninefold_life_pill", "Ninefold Life Pill", 1, 1, &[("jade_ape_core", 1), ("blood_qi_grass", 3)], "Raises maximum health by 10"),
        elixir("blood_demon_pill", "Blood Demon Pill", 0, 1, &[("demon_grass", 2), ("bloodthirst_grass", 2)], "Restores 10 health"),
        elixir("bone_rebirth_pill", "Bone Rebirth Pill", 1, 1, &[("bone_lotus", 1), ("bloodthirst_grass", 3)], "Raises maximum health by 10"),
    ]
}

fn equipment(id: &str, name: &str, grade: u8, level: u32, slot: &str, ingredients: &[(&str, u32)], stats: &[(Attribute, i64)]) -> Recipe {
    Recipe {
        id: id.to_string(),
        name: name.to_string(),
        domain: Domain::Forging,
        grade,
        required_level: level,
        ingredients: counts(ingredients),
        output: RecipeOutput::Equipment {
            slot: slot.to_string(),
            attributes: stats.iter().copied().collect(),
        },
    }
}

fn forging_recipes() -> Vec<Recipe> {
    use Attribute::{Attack, Defense, Vitality};
    vec![
        equipment("azure_sea_sword", "Azure Sea Sword", 0, 1, "weapon", &[("sea_turtle_core", 2), ("azure_iron", 3)], &[(Attack, 15)]),
        equipment("red_essence_mail", "Red Essence Mail", 0, 1, "armor", &[("jade_ape_core", 2), ("red_essence_iron", 3)], &[(Defense, 12)]),
        equipment("turtle_ring", "Turtle Shell Ring", 0, 1, "ring", &[("sea_turtle_core", 1), ("azure_iron", 2)], &[(Attack, 5), (Defense, 3)]),
        equipment("frost_vine_blade", "Frost Vine Blade", 1, 3, "weapon", &[("vine_spirit_core", 2), ("frost_iron", 3)], &[(Attack, 28)]),
        equipment("ink_iron_armor", "Ink Iron Armor", 1, 3, "armor", &[("ironwing_core", 2), ("ink_iron", 3)], &[(Defense, 22)]),
        equipment("starfall_spear", "Starfall Spear", 3, 5, "weapon", &[("thunder_qilin_core", 2), ("star_iron", 3)], &[(Attack, 45)]),
        equipment("primordial_robe", "Primordial Robe", 3, 5, "armor", &[("ice_kun_core", 2), ("primordial_iron", 3)], &[(Defense, 35)]),
        equipment("yinyang_blade", "Yin-Yang Blade", 5, 7, "weapon", &[("fire_bird_core", 2), ("yinyang_iron", 3)], &[(Attack, 65)]),
        equipment("dragon_ancestor_plate", "Dragon Ancestor Plate", 5, 7, "armor", &[("dragon_core", 2), ("doom_meteorite", 3)], &[(Defense, 50)]),
        equipment("rotbone_ring", "Rotbone Ring", 0, 1, "ring", &[("rotbone_core", 1), ("bone_iron_shards", 2)], &[(Attack, 6), (Defense, 4)]),
        equipment("soul_crystal_band", "Soul Crystal Band", 1, 3, "ring", &[("soul_eater_core", 1), ("fiend_crystal", 2)], &[(Attack, 9), (Defense, 6), (Vitality, 40)]),
        equipment("rotbone_shield", "Rotbone Shield", 0, 1, "treasure", &[("rotbone_core", 3), ("bone_iron_shards", 5)], &[(Defense, 10), (Vitality, 100)]),
        equipment("magma_cauldron", "Magma Forging Cauldron", 1, 3, "treasure", &[("magma_core", 3), ("black_demon_iron", 5)], &[(Attack, 18), (Defense, 12)]),
        equipment("gu_banner", "Myriad Gu Banner", 3, 5, "treasure", &[("gu_mother_core", 3), ("embryo_sand", 5)], &[(Attack, 25), (Defense, 18), (Vitality, 180)]),
        equipment("heart_demon_bell", "Heart Demon Bell", 5, 7, "treasure", &[("heart_demon_core", 3), ("defiance_crystal", 5)], &[(Attack, 35), (Defense, 25), (Vitality, 250)]),
    ]
}

fn charm(id: &str, name: &str, grade: u8, level: u32, category: TalismanCategory, ingredients: &[(&str, u32)], effect: &str) -> Recipe {
    Recipe {
        id: id.to_string(),
        name: name.to_string(),
        domain: Domain::Talisman,
        grade,
        required_level: level,
        ingredients: counts(ingredients),
        output: RecipeOutput::Charm {
            category,
            effect: effect.to_string(),
        },
    }
}

fn talisman_recipes() -> Vec<Recipe> {
    use TalismanCategory::{Defensive, Offensive, Special, Supportive};
    vec![
        charm("tide_talisman", "Tide Talisman", 0, 1, Offensive, &[("sea_turtle_core", 1), ("azure_iron", 1)], "Deals attack x0.8 water damage"),
        charm("ape_ward", "Spirit Ape Ward", 0, 1, Defensive, &[("jade_ape_core", 1), ("red_essence_iron", 1)], "Shield absorbing defense x2 damage for one round"),
        charm("vine_lightning", "Vine Lightning Talisman", 1, 3, Offensive, &[("vine_spirit_core", 1), ("frost_iron", 1)], "Deals attack x1.2 wood damage"),
        charm("ironwing_mending", "Ironwing Mending Talisman", 1, 3, Supportive, &[("ironwing_core", 1), ("ink_iron", 1)], "Restores 15% of maximum health"),
        charm("qilin_storm", "Qilin Storm Talisman", 2, 5, Offensive, &[("thunder_qilin_core", 1), ("star_iron", 1)], "Thunder strikes every foe for attack x0.9"),
        charm("kun_barrier", "Kun-Peng Barrier", 2, 5, Defensive, &[("ice_kun_core", 1), ("primordial_iron", 1)], "Party shield absorbing defense x3 damage"),
        charm("phoenix_piercer", "Vermilion Piercer", 3, 7, Special, &[("fire_bird_core", 1), ("yinyang_iron", 1)], "Ignores 30% defense, deals attack x1.5 fire damage"),
        charm("dragon_escape", "Dragon Ancestor Escape", 3, 7, Special, &[("dragon_core", 1), ("doom_meteorite", 1)], "Ends the battle and returns you to safety"),
        charm("leech_talisman", "Blood Leech Talisman", 0, 1, Offensive, &[("rotbone_core", 1), ("bone_iron_shards", 1)], "Deals attack x0.7 poison damage"),
        charm("owl_hex", "Soul Owl Hex", 0, 1, Supportive, &[("soul_eater_core", 1), ("fiend_crystal", 1)], "Lowers target defense by 15% for three rounds"),
        charm("magma_brand", "Magma Brand", 1, 3, Offensive, &[("magma_core", 1), ("black_demon_iron", 1)], "Deals attack x1.1 fire damage and may ignite"),
        charm("bone_dragon_drain", "Bone Dragon Drain", 1, 3, Supportive, &[("bone_dragon_core", 1), ("demon_core_shard", 1)], "Drains attack x0.8 health from the target"),
    ]
}

fn monster(id: &str, name: &str, difficulty: Difficulty, stats: (u32, u32, u32), min_tier: usize, drops: &[(&str, f64)]) -> Monster {
    let (health, attack, defense) = stats;
    Monster {
        id: id.to_string(),
        name: name.to_string(),
        difficulty,
        health,
        attack,
        defense,
        min_tier,
        drops: drops.iter().map(|(k, p)| (k.to_string(), *p)).collect(),
    }
}

fn monsters() -> Vec<Monster> {
    use Difficulty::{High, Low, Medium};
    vec![
        monster("sea_turtle", "Sea-Splitting Turtle", Low, (50, 10, 5), 0, &[("sea_turtle_core", 0.3), ("azure_iron", 0.8), ("turtle_membrane", 0.2)]),
        monster("jade_ape", "Jade-Eyed Ape", Medium, (100, 20, 10), 1, &[("jade_ape_core", 0.6), ("red_essence_iron", 0.5), ("ape_brow_hair", 0.2), ("seed:blood_qi_grass", 0.2)]),
        monster("vine_spirit", "Verdant Vine Spirit", High, (200, 40, 20), 2, &[("vine_spirit_core", 0.8), ("frost_iron", 0.3), ("vine_marrow", 0.2)]),
        monster("ironwing", "Ironwing Roc", High, (300, 80, 30), 3, &[("ironwing_core", 0.8), ("ink_iron", 0.3), ("ironwing_plume", 0.2)]),
        monster("thunder_qilin", "Thunder Prison Qilin", Low, (400, 100, 40), 4, &[("thunder_qilin_core", 0.3), ("star_iron", 0.8), ("qilin_mane", 0.2)]),
        monster("ice_kun", "Frost Kun-Peng", Medium, (500, 120, 50), 5, &[("ice_kun_core", 0.6), ("primordial_iron", 0.5), ("kun_throat_bone", 0.2)]),
        monster("fire_bird", "Vermilion Fire Bird", High, (600, 140, 60), 6, &[("fire_bird_core", 0.8), ("yinyang_iron", 0.3), ("fire_bird_plume", 0.2)]),
        monster("dragon_ancestor", "Dragon Ancestor Ao Xuan", High, (700, 40, 70), 7, &[("dragon_core", 0.8), ("doom_meteorite", 0.3), ("dragon_scale_dust", 0.2)]),
        monster("blood_leech", "Rotbone Blood Leech", Low, (50, 10, 5), 0, &[("rotbone_core", 0.3), ("bone_iron_shards", 0.8), ("leech_saliva", 0.2)]),
        monster("soul_owl", "Soul-Eating Owl", Medium, (100, 20, 10), 1, &[("soul_eater_core", 0.6), ("fiend_crystal", 0.5), ("owl_soul_feather", 0.2), ("seed:bloodthirst_grass", 0.2)]),
        monster("magma_spider", "Magma Spider", High, (200, 40, 20), 2, &[("magma_core", 0.8), ("black_demon_iron", 0.3), ("spider_fire_silk", 0.2), ("seed:bone_lotus", 0.1)]),
        monster("bone_dragon", "Styx Bone Dragon", High, (300, 40, 20), 3, &[("bone_dragon_core", 0.8), ("demon_core_shard", 0.3), ("dragon_spine", 0.2)]),
        monster("gu_mother", "Myriad Gu Mother", Low, (400, 10, 5), 4, &[("gu_mother_core", 0.3), ("embryo_sand", 0.8), ("gu_gland", 0.2)]),
        monster("flame_fiend", "World-Burning Flame Fiend", Medium, (500, 20, 10), 5, &[("flame_fiend_core", 0.6), ("purgatory_iron", 0.5), ("fiend_heart_blood", 0.2)]),
        monster("heart_demon", "Chaos Heart Demon", High, (600, 40, 20), 6, &[("heart_demon_core", 0.8), ("defiance_crystal", 0.3), ("heart_demon_saliva", 0.2)]),
        monster("doom_dragon", "Primordial Doom Dragon", High, (700, 40, 20), 7, &[("doom_dragon_core", 0.8), ("doom_meteorite", 0.3), ("doom_dragon_scale", 0.2)]),
    ]
}

fn objective(key: &str, required: u32, description: &str) -> Objective {
    Objective {
        key: key.to_string(),
        required,
        description: description.to_string(),
    }
}

/// Currency, items, and one scroll per listed recipe.
fn rewards(currency: u64, items: &[(&str, u32)], scrolls: &[&str]) -> QuestRewards {
    let mut items = counts(items);
    for recipe in scrolls {
        items.insert(scroll_item_id(recipe), 1);
    }
    QuestRewards { currency, items }
}

fn quests() -> Vec<QuestRecord> {
    vec![
        QuestRecord {
            id: "main_1".to_string(),
            name: "Into the Cultivation World".to_string(),
            kind: QuestKind::Main,
            min_tier: 0,
            faction: None,
            repeatable: false,
            objectives: vec![
                objective("kill_monster", 5, "Defeat five beasts"),
                objective("collect:azure_iron", 3, "Hand in three azure iron"),
            ],
            rewards: rewards(
                200,
                &[("sea_turtle_core", 2), ("rotbone_core", 2)],
                &["foundation_pill", "fiend_gathering_pill"],
            ),
        },
        QuestRecord {
            id: "main_2".to_string(),
            name: "First Furnace".to_string(),
            kind: QuestKind::Main,
            min_tier: 1,
            faction: None,
            repeatable: false,
            objectives: vec![
                objective("craft:alchemy", 1, "Refine any pill"),
                objective("kill_monster:jade_ape", 3, "Defeat three Jade-Eyed Apes"),
            ],
            rewards: rewards(300, &[], &["qi_condensing_pill", "blood_qi_pill"]),
        },
        QuestRecord {
            id: "main_3".to_string(),
            name: "Sect Trial".to_string(),
            kind: QuestKind::Main,
            min_tier: 2,
            faction: Some(Faction::Immortal),
            repeatable: false,
            objectives: vec![
                objective("kill_monster:vine_spirit", 5, "Defeat five Verdant Vine Spirits"),
                objective("craft:forging", 1, "Forge any equipment"),
            ],
            rewards: rewards(500, &[("vine_spirit_core", 3)], &["frost_vine_blade"]),
        },
        QuestRecord {
            id: "side_1".to_string(),
            name: "Herb Gathering".to_string(),
            kind: QuestKind::Side,
            min_tier: 0,
            faction: None,
            repeatable: true,
            objectives: vec![objective("collect:spirit_herb", 10, "Hand in ten spirit herbs")],
            rewards: rewards(100, &[], &["tide_talisman"]),
        },
        QuestRecord {
            id: "side_2".to_string(),
            name: "Culling the Lesser Beasts".to_string(),
            kind: QuestKind::Side,
            min_tier: 0,
            faction: None,
            repeatable: true,
            objectives: vec![objective("kill_monster", 3, "Defeat three beasts")],
            rewards: rewards(
                150,
                &[("azure_iron", 5), ("seed:spirit_herb", 2), ("seed:demon_grass", 2)],
                &["azure_sea_sword"],
            ),
        },
        QuestRecord {
            id: "side_3".to_string(),
            name: "Tending the Spirit Field".to_string(),
            kind: QuestKind::Side,
            min_tier: 0,
            faction: None,
            repeatable: true,
            objectives: vec![objective("harvest", 3, "Harvest three spirit plants")],
            rewards: rewards(
                120,
                &[("spirit_water", 3), ("growth_talisman", 1), ("seed:blood_qi_grass", 1)],
                &[],
            ),
        },
    ]
}

fn plant(id: &str, name: &str, growth_hours: u32, harvest: u32, variant_chance: f64) -> PlantSpec {
    PlantSpec {
        id: id.to_string(),
        name: name.to_string(),
        growth_hours,
        yields: counts(&[(id, harvest)]),
        variant_chance,
    }
}

fn plants() -> Vec<PlantSpec> {
    vec![
        plant("spirit_herb", "Spirit Herb", 4, 3, 0.1),
        plant("demon_grass", "Demon Grass", 4, 3, 0.1),
        plant("blood_qi_grass", "Blood Qi Grass", 6, 2, 0.05),
        plant("bloodthirst_grass", "Bloodthirst Grass", 6, 2, 0.05),
        plant("bone_lotus", "Bone Lotus", 12, 1, 0.05),
    ]
}

fn starter_kit() -> StarterKit {
    StarterKit {
        currency: 100,
        items: {
            let mut items = counts(&[
                ("spirit_herb", 5),
                ("talisman_paper", 10),
                ("cinnabar", 5),
                ("spirit_water", 3),
            ]);
            items.insert(seed_item_id("spirit_herb"), 2);
            items.insert(seed_item_id("demon_grass"), 2);
            items
        },
        skills: vec!["breathing".to_string(), "swordplay".to_string()],
        quests: vec!["main_1".to_string()],
        purity_min: 60,
        purity_max: 90,
    }
}
