use std::path::{Path, PathBuf};

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{IVec, Transactional};

use crate::game::errors::GameError;
use crate::game::types::{
    BattleLogEntry, Character, BATTLE_LOG_SCHEMA_VERSION, CHARACTER_SCHEMA_VERSION,
};

const TREE_CHARACTERS: &str = "xiuxian_characters";
const TREE_BATTLES: &str = "xiuxian_battles";

const CHARACTER_PREFIX: &str = "characters:";
const BATTLE_PREFIX: &str = "battles:";

/// Persistence boundary used by the engine.
///
/// Implementations must make `put_battle` and `put_characters` atomic: every
/// record lands together or not at all.
pub trait EntityStore: Send + Sync {
    /// Fetch a character, `GameError::NotFound` when absent.
    fn get_character(&self, identity: &str) -> Result<Character, GameError>;

    fn put_character(&self, character: &Character) -> Result<(), GameError>;

    /// Commit a duel: both participants plus the log entry.
    fn put_battle(
        &self,
        attacker: &Character,
        defender: &Character,
        entry: &BattleLogEntry,
    ) -> Result<(), GameError>;

    /// Write several characters in one atomic step.
    fn put_characters(&self, characters: &[&Character]) -> Result<(), GameError>;

    fn list_character_ids(&self) -> Result<Vec<String>, GameError>;

    /// Most recent duels involving `identity`, newest first.
    fn battle_history(&self, identity: &str, limit: usize)
        -> Result<Vec<BattleLogEntry>, GameError>;

    fn find_character(&self, identity: &str) -> Result<Option<Character>, GameError> {
        match self.get_character(identity) {
            Ok(character) => Ok(Some(character)),
            Err(GameError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct XiuxianStoreBuilder {
    path: PathBuf,
}

impl XiuxianStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(self) -> Result<XiuxianStore, GameError> {
        XiuxianStore::open(self.path)
    }
}

/// Sled-backed persistence for characters and duel logs.
pub struct XiuxianStore {
    _db: sled::Db,
    characters: sled::Tree,
    battles: sled::Tree,
}

impl XiuxianStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let characters = db.open_tree(TREE_CHARACTERS)?;
        let battles = db.open_tree(TREE_BATTLES)?;
        Ok(Self {
            _db: db,
            characters,
            battles,
        })
    }

    fn character_key(identity: &str) -> Vec<u8> {
        format!("{}{}", CHARACTER_PREFIX, identity.to_ascii_lowercase()).into_bytes()
    }

    fn battle_key(entry: &BattleLogEntry) -> Vec<u8> {
        let nanos = entry
            .fought_at
            .timestamp_nanos_opt()
            .unwrap_or_else(|| entry.fought_at.timestamp_micros() * 1000);
        format!("{}{:020}:{}", BATTLE_PREFIX, nanos, entry.id).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, GameError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, GameError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    fn check_character(record: Character) -> Result<Character, GameError> {
        if record.schema_version != CHARACTER_SCHEMA_VERSION {
            return Err(GameError::SchemaMismatch {
                entity: "character",
                expected: CHARACTER_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    fn check_battle(record: BattleLogEntry) -> Result<BattleLogEntry, GameError> {
        if record.schema_version != BATTLE_LOG_SCHEMA_VERSION {
            return Err(GameError::SchemaMismatch {
                entity: "battle log",
                expected: BATTLE_LOG_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }
}

impl EntityStore for XiuxianStore {
    fn get_character(&self, identity: &str) -> Result<Character, GameError> {
        let key = Self::character_key(identity);
        let Some(bytes) = self.characters.get(&key)? else {
            return Err(GameError::NotFound(format!("character: {}", identity)));
        };
        Self::check_character(Self::deserialize(bytes)?)
    }

    fn put_character(&self, character: &Character) -> Result<(), GameError> {
        let key = Self::character_key(&character.identity);
        let bytes = Self::serialize(character)?;
        self.characters.insert(key, bytes)?;
        self.characters.flush()?;
        Ok(())
    }

    fn put_battle(
        &self,
        attacker: &Character,
        defender: &Character,
        entry: &BattleLogEntry,
    ) -> Result<(), GameError> {
        let attacker_key = Self::character_key(&attacker.identity);
        let attacker_bytes = Self::serialize(attacker)?;
        let defender_key = Self::character_key(&defender.identity);
        let defender_bytes = Self::serialize(defender)?;
        let battle_key = Self::battle_key(entry);
        let battle_bytes = Self::serialize(entry)?;

        let committed = (&self.characters, &self.battles).transaction(|(characters, battles)| {
            characters.insert(attacker_key.as_slice(), attacker_bytes.as_slice())?;
            characters.insert(defender_key.as_slice(), defender_bytes.as_slice())?;
            battles.insert(battle_key.as_slice(), battle_bytes.as_slice())?;
            Ok::<(), ConflictableTransactionError<()>>(())
        });
        match committed {
            Ok(()) => {}
            Err(TransactionError::Storage(e)) => return Err(GameError::Sled(e)),
            Err(TransactionError::Abort(())) => {
                return Err(GameError::Internal("duel commit aborted".to_string()))
            }
        }
        self.characters.flush()?;
        self.battles.flush()?;
        Ok(())
    }

    fn put_characters(&self, characters: &[&Character]) -> Result<(), GameError> {
        let mut records = Vec::with_capacity(characters.len());
        for character in characters {
            records.push((
                Self::character_key(&character.identity),
                Self::serialize(*character)?,
            ));
        }
        let committed = self.characters.transaction(|tree| {
            for (key, bytes) in &records {
                tree.insert(key.as_slice(), bytes.as_slice())?;
            }
            Ok::<(), ConflictableTransactionError<()>>(())
        });
        match committed {
            Ok(()) => {}
            Err(TransactionError::Storage(e)) => return Err(GameError::Sled(e)),
            Err(TransactionError::Abort(())) => {
                return Err(GameError::Internal("character commit aborted".to_string()))
            }
        }
        self.characters.flush()?;
        Ok(())
    }

    fn list_character_ids(&self) -> Result<Vec<String>, GameError> {
        let mut ids = Vec::new();
        for entry in self.characters.scan_prefix(CHARACTER_PREFIX.as_bytes()) {
            let (key, _) = entry?;
            let text = String::from_utf8_lossy(&key);
            if let Some(identity) = text.strip_prefix(CHARACTER_PREFIX) {
                ids.push(identity.to_string());
            }
        }
        Ok(ids)
    }

    fn battle_history(
        &self,
        identity: &str,
        limit: usize,
    ) -> Result<Vec<BattleLogEntry>, GameError> {
        let mut entries = Vec::new();
        if limit == 0 {
            return Ok(entries);
        }
        for item in self.battles.scan_prefix(BATTLE_PREFIX.as_bytes()).rev() {
            let (_, bytes) = item?;
            let entry = Self::check_battle(Self::deserialize(bytes)?)?;
            if entry.involves(identity) {
                entries.push(entry);
                if entries.len() == limit {
                    break;
                }
            }
        }
        Ok(entries)
    }
}
