use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CHARACTER_SCHEMA_VERSION: u8 = 2;
pub const BATTLE_LOG_SCHEMA_VERSION: u8 = 1;

/// Health never drops below this while a character lives.
pub const HEALTH_FLOOR: u32 = 1;

/// Experience needed per skill level.
pub const EXP_PER_SKILL_LEVEL: u32 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Immortal,
    Demonic,
    Neutral,
}

impl Faction {
    pub const ALL: [Faction; 3] = [Faction::Immortal, Faction::Demonic, Faction::Neutral];

    pub fn label(self) -> &'static str {
        match self {
            Faction::Immortal => "Immortal",
            Faction::Demonic => "Demonic",
            Faction::Neutral => "Neutral",
        }
    }

    pub fn parse(text: &str) -> Option<Faction> {
        match text.trim().to_ascii_lowercase().as_str() {
            "immortal" | "righteous" | "xian" => Some(Faction::Immortal),
            "demonic" | "demon" | "mo" => Some(Faction::Demonic),
            "neutral" | "none" => Some(Faction::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sub-rank inside a tier. `Perfected` is the breakthrough-ready stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Early,
    Middle,
    Late,
    Perfected,
}

impl Stage {
    pub fn index(self) -> u32 {
        match self {
            Stage::Early => 0,
            Stage::Middle => 1,
            Stage::Late => 2,
            Stage::Perfected => 3,
        }
    }

    /// Stage reached at the given percentage of the tier's cultivation threshold.
    pub fn for_progress(percent: f64) -> Stage {
        if percent >= 100.0 {
            Stage::Perfected
        } else if percent >= 60.0 {
            Stage::Late
        } else if percent >= 30.0 {
            Stage::Middle
        } else {
            Stage::Early
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Early => "Early",
            Stage::Middle => "Middle",
            Stage::Late => "Late",
            Stage::Perfected => "Perfected",
        };
        f.write_str(label)
    }
}

/// Spiritual root element. `Chaos` stands in for every other element.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Metal,
    Wood,
    Water,
    Fire,
    Earth,
    Chaos,
}

impl Element {
    /// The five ordinary elements, in the order starter roots are drawn from.
    pub const FIVE: [Element; 5] = [
        Element::Metal,
        Element::Wood,
        Element::Water,
        Element::Fire,
        Element::Earth,
    ];

    /// The element this one overcomes: metal > wood > earth > water > fire > metal.
    pub fn overcomes(self) -> Option<Element> {
        match self {
            Element::Metal => Some(Element::Wood),
            Element::Wood => Some(Element::Earth),
            Element::Earth => Some(Element::Water),
            Element::Water => Some(Element::Fire),
            Element::Fire => Some(Element::Metal),
            Element::Chaos => None,
        }
    }

    pub fn has_advantage_over(self, other: Element) -> bool {
        self.overcomes() == Some(other)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Element::Metal => "Metal",
            Element::Wood => "Wood",
            Element::Water => "Water",
            Element::Fire => "Fire",
            Element::Earth => "Earth",
            Element::Chaos => "Chaos",
        };
        f.write_str(label)
    }
}

/// Production domain a recipe belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Alchemy,
    Forging,
    Talisman,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Alchemy, Domain::Forging, Domain::Talisman];

    /// Skill trained by crafting in this domain.
    pub fn skill(self) -> &'static str {
        match self {
            Domain::Alchemy => "alchemy",
            Domain::Forging => "forging",
            Domain::Talisman => "talisman",
        }
    }

    pub fn parse(text: &str) -> Option<Domain> {
        match text.trim().to_ascii_lowercase().as_str() {
            "alchemy" | "pill" | "pills" => Some(Domain::Alchemy),
            "forging" | "forge" | "equipment" => Some(Domain::Forging),
            "talisman" | "talismans" | "charm" => Some(Domain::Talisman),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.skill())
    }
}

/// Quality tier drawn for every crafted item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Inferior,
    Common,
    Superior,
    Supreme,
}

impl Quality {
    /// Lowest first, so cheaper stock is spent before better stock.
    pub const ASCENDING: [Quality; 4] = [
        Quality::Inferior,
        Quality::Common,
        Quality::Superior,
        Quality::Supreme,
    ];

    pub fn from_roll(roll: f64) -> Quality {
        if roll < 0.10 {
            Quality::Supreme
        } else if roll < 0.30 {
            Quality::Superior
        } else if roll < 0.60 {
            Quality::Common
        } else {
            Quality::Inferior
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Quality::Inferior => "inferior",
            Quality::Common => "common",
            Quality::Superior => "superior",
            Quality::Supreme => "supreme",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Quality> {
        Quality::ASCENDING.into_iter().find(|q| q.tag() == tag)
    }

    /// Attribute multiplier applied to forged equipment.
    pub fn equipment_multiplier(self) -> f64 {
        match self {
            Quality::Supreme => 1.2,
            Quality::Superior => 1.1,
            Quality::Common => 1.0,
            Quality::Inferior => 0.9,
        }
    }

    /// Effect multiplier reported for talismans.
    pub fn charm_multiplier(self) -> f64 {
        match self {
            Quality::Supreme => 1.3,
            Quality::Superior => 1.15,
            Quality::Common => 1.0,
            Quality::Inferior => 0.85,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Attack,
    Defense,
    Speed,
    Vitality,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Attribute::Attack => "attack",
            Attribute::Defense => "defense",
            Attribute::Speed => "speed",
            Attribute::Vitality => "vitality",
        };
        f.write_str(label)
    }
}

pub type AttributeBundle = BTreeMap<Attribute, i64>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SkillProgress {
    pub level: u32,
    pub exp: u32,
}

impl SkillProgress {
    pub fn starting() -> Self {
        Self { level: 1, exp: 0 }
    }

    /// Add experience and return true when the level went up.
    pub fn gain(&mut self, exp: u32) -> bool {
        let before = self.level;
        self.exp = self.exp.saturating_add(exp);
        self.level = self.exp / EXP_PER_SKILL_LEVEL + 1;
        self.level > before
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryEntry {
    pub count: u32,
    pub durability: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct QuestProgress {
    pub counters: BTreeMap<String, u32>,
    pub completed: bool,
    pub times_completed: u32,
}

impl QuestProgress {
    pub fn is_active(&self) -> bool {
        !self.completed
    }

    pub fn counter(&self, key: &str) -> u32 {
        self.counters.get(key).copied().unwrap_or(0)
    }
}

/// Something growing in one of a character's spirit-field plots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Plot {
    pub plant_id: String,
    pub planted_at: DateTime<Utc>,
    pub ripe_at: DateTime<Utc>,
    /// Variant plants double their yield.
    pub variant: bool,
}

impl Plot {
    pub fn is_ripe(&self, now: DateTime<Utc>) -> bool {
        now >= self.ripe_at
    }
}

/// A player's complete mutable game state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Character {
    pub identity: String,
    pub display_name: String,
    pub faction: Faction,
    /// Zero-based position in the faction's tier ladder.
    pub tier: usize,
    pub stage: Stage,
    pub cultivation: f64,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
    pub currency: u64,
    pub affinities: BTreeMap<Element, u8>,
    pub skills: BTreeMap<String, SkillProgress>,
    pub inventory: BTreeMap<String, InventoryEntry>,
    pub learned_recipes: BTreeMap<Domain, BTreeSet<String>>,
    pub quests: BTreeMap<String, QuestProgress>,
    /// Spirit-field plots by number, starting at 1.
    pub plots: BTreeMap<u32, Plot>,
    /// Set while a meditation session is running.
    pub cultivating_since: Option<DateTime<Utc>>,
    pub last_session_at: Option<DateTime<Utc>>,
    pub sessions_today: u32,
    pub last_battle_at: Option<DateTime<Utc>>,
    pub last_breakthrough_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl Character {
    /// Bare character with the given pools; starter kit is applied by the engine.
    pub fn new(identity: &str, display_name: &str, now: DateTime<Utc>) -> Self {
        Self {
            identity: identity.to_string(),
            display_name: display_name.to_string(),
            faction: Faction::Neutral,
            tier: 0,
            stage: Stage::Early,
            cultivation: 0.0,
            health: 100,
            max_health: 100,
            mana: 100,
            max_mana: 100,
            attack: 10,
            defense: 5,
            speed: 5,
            currency: 0,
            affinities: BTreeMap::new(),
            skills: BTreeMap::new(),
            inventory: BTreeMap::new(),
            learned_recipes: BTreeMap::new(),
            quests: BTreeMap::new(),
            plots: BTreeMap::new(),
            cultivating_since: None,
            last_session_at: None,
            sessions_today: 0,
            last_battle_at: None,
            last_breakthrough_at: None,
            created_at: now,
            updated_at: now,
            schema_version: CHARACTER_SCHEMA_VERSION,
        }
    }

    pub fn with_faction(mut self, faction: Faction) -> Self {
        self.faction = faction;
        self
    }

    pub fn with_affinity(mut self, element: Element, purity: u8) -> Self {
        self.affinities.insert(element, purity.clamp(1, 100));
        self
    }

    pub fn with_currency(mut self, currency: u64) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_item(mut self, item_id: &str, count: u32) -> Self {
        crate::game::inventory::add_item(&mut self, item_id, count);
        self
    }

    pub fn with_recipe(mut self, domain: Domain, recipe_id: &str) -> Self {
        self.learned_recipes
            .entry(domain)
            .or_default()
            .insert(recipe_id.to_string());
        self
    }

    pub fn is_cultivating(&self) -> bool {
        self.cultivating_since.is_some()
    }

    pub fn ready_for_breakthrough(&self) -> bool {
        self.stage == Stage::Perfected
    }

    /// Cultivation needed to perfect the current tier: `100 x 2^tier`.
    pub fn tier_threshold(&self) -> f64 {
        100.0 * 2f64.powi(self.tier as i32)
    }

    pub fn progress_percent(&self) -> f64 {
        (self.cultivation / self.tier_threshold() * 100.0).min(100.0)
    }

    /// Re-derive the stage from cultivation.
    pub fn refresh_stage(&mut self) {
        self.stage = Stage::for_progress(self.progress_percent());
    }

    /// Ranking score: tier first, then stage, then progress inside the tier.
    pub fn power(&self) -> f64 {
        self.tier as f64 * 1000.0 + self.stage.index() as f64 * 100.0 + self.progress_percent()
    }

    pub fn lose_health(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount).max(HEALTH_FLOOR);
    }

    pub fn lose_mana(&mut self, amount: u32) {
        self.mana = self.mana.saturating_sub(amount);
    }

    pub fn lose_cultivation(&mut self, amount: f64) {
        self.cultivation = (self.cultivation - amount).max(0.0);
    }

    /// Persist a running battle total, keeping health inside `[1, max_health]`.
    pub fn settle_health(&mut self, running: i64) {
        self.health = running.clamp(HEALTH_FLOOR as i64, self.max_health as i64) as u32;
    }

    pub fn restore_pools(&mut self) {
        self.health = self.max_health;
        self.mana = self.max_mana;
    }

    pub fn has_chaos_root(&self) -> bool {
        self.affinities.contains_key(&Element::Chaos)
    }

    /// Purity counted for `element`; a chaos root answers for every element.
    pub fn affinity(&self, element: Element) -> Option<u8> {
        self.affinities
            .get(&element)
            .or_else(|| self.affinities.get(&Element::Chaos))
            .copied()
    }

    pub fn max_purity(&self) -> u8 {
        self.affinities.values().copied().max().unwrap_or(0)
    }

    /// Highest-purity element, earliest element winning ties.
    pub fn dominant_affinity(&self) -> Option<Element> {
        let mut best: Option<(Element, u8)> = None;
        for (&element, &purity) in &self.affinities {
            match best {
                Some((_, top)) if purity <= top => {}
                _ => best = Some((element, purity)),
            }
        }
        best.map(|(element, _)| element)
    }

    /// Level of `skill`, 0 when never trained.
    pub fn skill_level(&self, skill: &str) -> u32 {
        self.skills.get(skill).map(|s| s.level).unwrap_or(0)
    }

    pub fn grant_skill_exp(&mut self, skill: &str, exp: u32) -> bool {
        self.skills
            .entry(skill.to_string())
            .or_insert_with(|| SkillProgress { level: 1, exp: 0 })
            .gain(exp)
    }

    pub fn knows_recipe(&self, domain: Domain, recipe_id: &str) -> bool {
        self.learned_recipes
            .get(&domain)
            .map(|set| set.contains(recipe_id))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BattleResult {
    AttackerWon,
    DefenderWon,
}

/// Append-only duel record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BattleLogEntry {
    pub id: Uuid,
    pub attacker: String,
    pub defender: String,
    pub result: BattleResult,
    pub transfer: u64,
    pub narrative: Vec<String>,
    pub fought_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl BattleLogEntry {
    pub fn new(attacker: &str, defender: &str, result: BattleResult, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            attacker: attacker.to_string(),
            defender: defender.to_string(),
            result,
            transfer: 0,
            narrative: Vec::new(),
            fought_at: at,
            schema_version: BATTLE_LOG_SCHEMA_VERSION,
        }
    }

    pub fn involves(&self, identity: &str) -> bool {
        self.attacker.eq_ignore_ascii_case(identity) || self.defender.eq_ignore_ascii_case(identity)
    }

    pub fn winner(&self) -> &str {
        match self.result {
            BattleResult::AttackerWon => &self.attacker,
            BattleResult::DefenderWon => &self.defender,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    SessionStarted,
    SessionCompleted,
    BreakthroughSucceeded,
    BreakthroughFailed,
    CraftSucceeded,
    CraftFailed,
    DuelWon,
    DuelLost,
    HuntWon,
    HuntLost,
    RecipeLearned,
    QuestAccepted,
    QuestCompleted,
    FactionChosen,
    Planted,
    Harvested,
    GrowthAccelerated,
    ItemGifted,
}

/// Numeric summary of what an operation changed on the acting character.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Delta {
    pub tier: i64,
    pub cultivation: f64,
    pub health: i64,
    pub max_health: i64,
    pub mana: i64,
    pub max_mana: i64,
    pub attack: i64,
    pub defense: i64,
    pub currency: i64,
    pub items: BTreeMap<String, i64>,
}

impl Delta {
    pub fn between(before: &Character, after: &Character) -> Self {
        let mut items = BTreeMap::new();
        let ids: BTreeSet<&String> = before.inventory.keys().chain(after.inventory.keys()).collect();
        for id in ids {
            let was = before.inventory.get(id).map(|e| e.count as i64).unwrap_or(0);
            let now = after.inventory.get(id).map(|e| e.count as i64).unwrap_or(0);
            if was != now {
                items.insert(id.clone(), now - was);
            }
        }
        Self {
            tier: after.tier as i64 - before.tier as i64,
            cultivation: after.cultivation - before.cultivation,
            health: after.health as i64 - before.health as i64,
            max_health: after.max_health as i64 - before.max_health as i64,
            mana: after.mana as i64 - before.mana as i64,
            max_mana: after.max_mana as i64 - before.max_mana as i64,
            attack: after.attack as i64 - before.attack as i64,
            defense: after.defense as i64 - before.defense as i64,
            currency: after.currency as i64 - before.currency as i64,
            items,
        }
    }
}

/// Result of a committed operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub narrative: String,
    pub delta: Delta,
}

impl Outcome {
    pub fn new(kind: OutcomeKind, narrative: impl Into<String>) -> Self {
        Self {
            kind,
            narrative: narrative.into(),
            delta: Delta::default(),
        }
    }

    pub fn with_delta(mut self, delta: Delta) -> Self {
        self.delta = delta;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Character {
        Character::new("qq:1", "Lin", Utc::now())
    }

    #[test]
    fn skill_level_follows_experience() {
        let mut skill = SkillProgress::starting();
        assert!(!skill.gain(99));
        assert_eq!(skill.level, 1);
        assert!(skill.gain(1));
        assert_eq!(skill.level, 2);
        skill.gain(250);
        assert_eq!(skill.level, 4);
    }

    #[test]
    fn chaos_root_answers_for_every_element() {
        let c = fresh().with_affinity(Element::Chaos, 70);
        assert_eq!(c.affinity(Element::Fire), Some(70));
        assert_eq!(c.affinity(Element::Metal), Some(70));
        let plain = fresh().with_affinity(Element::Wood, 40);
        assert_eq!(plain.affinity(Element::Fire), None);
    }

    #[test]
    fn dominant_affinity_breaks_ties_by_element_order() {
        let c = fresh()
            .with_affinity(Element::Fire, 80)
            .with_affinity(Element::Wood, 80)
            .with_affinity(Element::Earth, 50);
        assert_eq!(c.dominant_affinity(), Some(Element::Wood));
        assert_eq!(fresh().dominant_affinity(), None);
    }

    #[test]
    fn advantage_cycle_is_closed() {
        assert!(Element::Metal.has_advantage_over(Element::Wood));
        assert!(Element::Wood.has_advantage_over(Element::Earth));
        assert!(Element::Earth.has_advantage_over(Element::Water));
        assert!(Element::Water.has_advantage_over(Element::Fire));
        assert!(Element::Fire.has_advantage_over(Element::Metal));
        assert!(!Element::Wood.has_advantage_over(Element::Metal));
        assert!(!Element::Chaos.has_advantage_over(Element::Fire));
        assert!(!Element::Fire.has_advantage_over(Element::Chaos));
    }

    #[test]
    fn stage_tracks_progress() {
        let mut c = fresh();
        c.cultivation = 29.0;
        c.refresh_stage();
        assert_eq!(c.stage, Stage::Early);
        c.cultivation = 45.0;
        c.refresh_stage();
        assert_eq!(c.stage, Stage::Middle);
        c.cultivation = 99.9;
        c.refresh_stage();
        assert_eq!(c.stage, Stage::Late);
        c.cultivation = 100.0;
        c.refresh_stage();
        assert!(c.ready_for_breakthrough());

        c.tier = 2;
        c.refresh_stage();
        assert_eq!(c.stage, Stage::Early);
    }

    #[test]
    fn health_stays_in_bounds() {
        let mut c = fresh();
        c.lose_health(500);
        assert_eq!(c.health, 1);
        c.settle_health(-40);
        assert_eq!(c.health, 1);
        c.settle_health(10_000);
        assert_eq!(c.health, c.max_health);
        c.lose_mana(500);
        assert_eq!(c.mana, 0);
    }

    #[test]
    fn delta_reports_inventory_changes() {
        let before = fresh().with_item("spirit_herb", 3).with_currency(100);
        let mut after = before.clone();
        after.inventory.remove("spirit_herb");
        after.currency = 130;
        let delta = Delta::between(&before, &after);
        assert_eq!(delta.currency, 30);
        assert_eq!(delta.items.get("spirit_herb"), Some(&-3));
    }
}
