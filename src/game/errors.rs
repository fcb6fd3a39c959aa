use thiserror::Error;

use crate::game::types::Stage;

/// Errors that can arise while running a game operation.
#[derive(Debug, Error)]
pub enum GameError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, catalog files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON content catalog.
    #[error("catalog parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Content catalog entry missing or inconsistent.
    #[error("catalog integrity: {0}")]
    Catalog(String),

    /// The player asked for something the rules do not allow right now.
    #[error("{0}")]
    Refused(#[from] Refusal),

    /// Internal error (poisoned locks, aborted transactions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    pub fn is_refusal(&self) -> bool {
        matches!(self, GameError::Refused(_))
    }

    pub fn refusal(&self) -> Option<&Refusal> {
        match self {
            GameError::Refused(refusal) => Some(refusal),
            _ => None,
        }
    }

    /// Refusals that still carry a state change the caller must persist.
    pub fn commits_partial_state(&self) -> bool {
        matches!(self, GameError::Refused(Refusal::MaxTierReached { .. }))
    }

    /// Text safe to show a player. Integrity failures are not described.
    pub fn player_message(&self) -> String {
        match self {
            GameError::Refused(refusal) => refusal.to_string(),
            _ => "The heavens are in turmoil. Please try again later.".to_string(),
        }
    }
}

/// A user-correctable reason an operation was turned down.
///
/// The display text is relayed to the player verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("You are already in secluded cultivation.")]
    AlreadyInProgress,

    #[error("You are not cultivating right now.")]
    NotCultivating,

    #[error("Your meditation is not finished yet. {} remaining.", wait_text(.remaining_secs))]
    SessionNotElapsed { remaining_secs: i64 },

    #[error("You have already cultivated {cap} times today. Rest until tomorrow.")]
    DailyLimitReached { cap: u32 },

    #[error("You cannot {action} again yet. {} remaining.", wait_text(.remaining_secs))]
    CooldownActive { action: String, remaining_secs: i64 },

    #[error("You have not learned the recipe '{recipe}'.")]
    RecipeNotLearned { recipe: String },

    #[error("Not enough {item}: need {required}, you hold {held}.")]
    InsufficientIngredients {
        item: String,
        required: u32,
        held: u32,
    },

    #[error("No cultivator named '{target}' exists.")]
    TargetNotFound { target: String },

    #[error("You cannot challenge yourself.")]
    SelfTargetNotAllowed,

    #[error("No monster called '{monster}' roams within your reach.")]
    MonsterNotFound { monster: String },

    #[error("A breakthrough requires {item}, which you do not have.")]
    MissingBreakthroughItem { item: String },

    #[error("Your foundation is not ready. Reach Perfected stage first (currently {stage}).")]
    TierRequirementUnmet { stage: Stage },

    #[error("You stand at the peak of {tier}. There is no higher realm to reach.")]
    MaxTierReached { tier: String },

    #[error("No recipe called '{recipe}' exists.")]
    RecipeNotFound { recipe: String },

    #[error("You already know the recipe '{recipe}'.")]
    RecipeAlreadyLearned { recipe: String },

    #[error("You need a scroll of '{recipe}' to learn it.")]
    MissingRecipeScroll { recipe: String },

    #[error("No quest called '{quest}' exists.")]
    QuestNotFound { quest: String },

    #[error("You have already taken up '{quest}'.")]
    QuestAlreadyTaken { quest: String },

    #[error("'{quest}' is not open to you: {reason}.")]
    QuestUnavailable { quest: String, reason: String },

    #[error("'{quest}' is not finished: {objective} still needs {missing}.")]
    QuestIncomplete {
        quest: String,
        objective: String,
        missing: u32,
    },

    #[error("You already follow the {faction} path.")]
    FactionUnchanged { faction: String },

    #[error("Plot numbers run from 1 to {max}.")]
    PlotOutOfRange { plot: u32, max: u32 },

    #[error("No spirit plant called '{plant}' is known.")]
    PlantNotFound { plant: String },

    #[error("Plot {plot} is already planted.")]
    PlotOccupied { plot: u32 },

    #[error("Nothing grows in plot {plot}.")]
    PlotEmpty { plot: u32 },

    #[error("The plant in plot {plot} is not ripe yet. {} remaining.", wait_text(.remaining_secs))]
    NotRipe { plot: u32, remaining_secs: i64 },

    #[error("The plant in plot {plot} is already ripe. HARVEST {plot} to gather it.")]
    AlreadyRipe { plot: u32 },

    #[error("{item} does not hasten growth.")]
    UnknownAccelerant { item: String },

    #[error("You cannot give items to yourself.")]
    SelfGiftNotAllowed,

    #[error("You must give at least one item.")]
    NothingToGive,
}

impl Refusal {
    /// Convenience for `Err(refusal.into())` at call sites returning `GameError`.
    pub fn fail<T>(self) -> Result<T, GameError> {
        Err(GameError::Refused(self))
    }
}

fn wait_text(seconds: &i64) -> String {
    format_wait(*seconds)
}

/// Human wait time, e.g. `1h 05m`, `7m 30s`, `42s`.
pub fn format_wait(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (hours, minutes, secs) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
