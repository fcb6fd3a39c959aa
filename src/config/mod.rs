//! # Configuration Management Module
//!
//! Handles loading and writing the TOML configuration for the Xiuxian game server.
//!
//! ## Configuration Structure
//!
//! - [`StorageConfig`] - Where the sled database lives
//! - [`LoggingConfig`] - Log level and optional log file
//! - [`RulesConfig`] - Tunable game constants (session length, cooldowns, duel rules)
//! - [`ContentConfig`] - Optional JSON content catalog replacing the built-in one
//!
//! ## Usage
//!
//! ```rust,no_run
//! use xiuxian::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Daily sessions: {}", config.rules.daily_session_cap);
//!
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "xiuxian.log"
//!
//! [rules]
//! daily_session_cap = 3
//! session_minutes = 10
//! pvp_max_transfer = 50
//! farm_plots = 5
//! ```
//!
//! Every `[rules]` key is optional and falls back to its default. Values are
//! range-checked by [`RulesConfig::validate`] when the file is loaded.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub content: ContentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl StorageConfig {
    /// Directory holding the sled database.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("xiuxian")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Game balance constants. Defaults reproduce the classic rule set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RulesConfig {
    /// Meditation sessions a character may start per calendar day
    #[serde(default = "default_daily_session_cap")]
    pub daily_session_cap: u32,
    #[serde(default = "default_session_minutes")]
    pub session_minutes: i64,
    /// Wait after a breakthrough attempt before the next one
    #[serde(default = "default_breakthrough_cooldown_minutes")]
    pub breakthrough_cooldown_minutes: i64,
    #[serde(default = "default_pvp_cooldown_minutes")]
    pub pvp_cooldown_minutes: i64,
    #[serde(default = "default_pvp_rounds")]
    pub pvp_rounds: u32,
    /// Upper bound on currency moved by a single duel
    #[serde(default = "default_pvp_max_transfer")]
    pub pvp_max_transfer: u64,
    /// When true a defender who wins a duel also takes the stake from the attacker
    #[serde(default)]
    pub reward_defender_victory: bool,
    /// Calendar days roll over at local midnight for this UTC offset
    #[serde(default)]
    pub day_offset_hours: i32,
    #[serde(default = "default_breakthrough_pool_gain")]
    pub breakthrough_health_gain: u32,
    #[serde(default = "default_breakthrough_pool_gain")]
    pub breakthrough_mana_gain: u32,
    #[serde(default = "default_breakthrough_attack_gain")]
    pub breakthrough_attack_gain: u32,
    #[serde(default = "default_breakthrough_defense_gain")]
    pub breakthrough_defense_gain: u32,
    /// Spirit-field plots every character owns
    #[serde(default = "default_farm_plots")]
    pub farm_plots: u32,
}

/// Longest wait a rule may configure: one year.
pub const MAX_RULE_MINUTES: i64 = 525_600;
/// Upper bound on spirit-field plots.
pub const MAX_FARM_PLOTS: u32 = 20;

fn default_daily_session_cap() -> u32 {
    3
}
fn default_session_minutes() -> i64 {
    10
}
fn default_breakthrough_cooldown_minutes() -> i64 {
    60
}
fn default_pvp_cooldown_minutes() -> i64 {
    30
}
fn default_pvp_rounds() -> u32 {
    3
}
fn default_pvp_max_transfer() -> u64 {
    50
}
fn default_breakthrough_pool_gain() -> u32 {
    20
}
fn default_breakthrough_attack_gain() -> u32 {
    5
}
fn default_breakthrough_defense_gain() -> u32 {
    3
}
fn default_farm_plots() -> u32 {
    5
}

fn rule_minutes(minutes: i64) -> Duration {
    Duration::minutes(minutes.clamp(0, MAX_RULE_MINUTES))
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            daily_session_cap: default_daily_session_cap(),
            session_minutes: default_session_minutes(),
            breakthrough_cooldown_minutes: default_breakthrough_cooldown_minutes(),
            pvp_cooldown_minutes: default_pvp_cooldown_minutes(),
            pvp_rounds: default_pvp_rounds(),
            pvp_max_transfer: default_pvp_max_transfer(),
            reward_defender_victory: false,
            day_offset_hours: 0,
            breakthrough_health_gain: default_breakthrough_pool_gain(),
            breakthrough_mana_gain: default_breakthrough_pool_gain(),
            breakthrough_attack_gain: default_breakthrough_attack_gain(),
            breakthrough_defense_gain: default_breakthrough_defense_gain(),
            farm_plots: default_farm_plots(),
        }
    }
}

impl RulesConfig {
    /// Reject values the rules cannot run with.
    pub fn validate(&self) -> Result<()> {
        let waits = [
            ("session_minutes", self.session_minutes),
            ("breakthrough_cooldown_minutes", self.breakthrough_cooldown_minutes),
            ("pvp_cooldown_minutes", self.pvp_cooldown_minutes),
        ];
        for (key, minutes) in waits {
            if !(0..=MAX_RULE_MINUTES).contains(&minutes) {
                return Err(anyhow!(
                    "rules.{} must be between 0 and {}, got {}",
                    key,
                    MAX_RULE_MINUTES,
                    minutes
                ));
            }
        }
        if self.pvp_rounds == 0 {
            return Err(anyhow!("rules.pvp_rounds must be at least 1"));
        }
        if !(1..=MAX_FARM_PLOTS).contains(&self.farm_plots) {
            return Err(anyhow!(
                "rules.farm_plots must be between 1 and {}, got {}",
                MAX_FARM_PLOTS,
                self.farm_plots
            ));
        }
        if !(-23..=23).contains(&self.day_offset_hours) {
            return Err(anyhow!(
                "rules.day_offset_hours must be between -23 and 23, got {}",
                self.day_offset_hours
            ));
        }
        Ok(())
    }

    /// Session length, clamped into `0..=MAX_RULE_MINUTES`.
    pub fn session_duration(&self) -> Duration {
        rule_minutes(self.session_minutes)
    }

    pub fn breakthrough_cooldown(&self) -> Duration {
        rule_minutes(self.breakthrough_cooldown_minutes)
    }

    pub fn pvp_cooldown(&self) -> Duration {
        rule_minutes(self.pvp_cooldown_minutes)
    }

    /// Calendar date of `at` in the configured day offset.
    ///
    /// Offsets outside +/-23h fall back to UTC.
    pub fn calendar_day(&self, at: DateTime<Utc>) -> NaiveDate {
        match FixedOffset::east_opt(self.day_offset_hours * 3600) {
            Some(offset) => at.with_timezone(&offset).date_naive(),
            None => at.date_naive(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentConfig {
    /// JSON catalog replacing the built-in content tables
    #[serde(default)]
    pub catalog_path: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;
        config
            .rules
            .validate()
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("xiuxian.log".to_string()),
            },
            rules: RulesConfig::default(),
            content: ContentConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn partial_rules_fall_back_to_defaults() {
        let text = r#"
            [storage]
            data_dir = "/tmp/xx"

            [logging]
            level = "debug"

            [rules]
            daily_session_cap = 5
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.rules.daily_session_cap, 5);
        assert_eq!(config.rules.session_minutes, 10);
        assert_eq!(config.rules.pvp_max_transfer, 50);
        assert!(!config.rules.reward_defender_victory);
        assert!(config.content.catalog_path.is_none());
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn calendar_day_honours_offset() {
        let rules = RulesConfig {
            day_offset_hours: 8,
            ..RulesConfig::default()
        };
        let late_utc = Utc.with_ymd_and_hms(2024, 3, 1, 17, 30, 0).unwrap();
        assert_eq!(
            rules.calendar_day(late_utc),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
        assert_eq!(
            RulesConfig::default().calendar_day(late_utc),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn default_config_round_trips_through_disk() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        let path = path.to_str().expect("utf8 path").to_string();

        tokio_test::block_on(Config::create_default(&path)).expect("write default");
        let loaded = tokio_test::block_on(Config::load(&path)).expect("load");
        assert_eq!(loaded.rules, RulesConfig::default());
        assert_eq!(loaded.storage.database_path(), PathBuf::from("./data").join("xiuxian"));
    }

    #[test]
    fn out_of_range_rules_are_rejected_on_load() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[storage]\ndata_dir = \"./data\"\n\n[logging]\nlevel = \"info\"\n\n[rules]\nsession_minutes = 9223372036854775807\n",
        )
        .expect("write config");
        let path = path.to_str().expect("utf8 path").to_string();
        let err = tokio_test::block_on(Config::load(&path)).unwrap_err();
        assert!(err.to_string().contains("rules.session_minutes"));

        let negative = RulesConfig {
            pvp_cooldown_minutes: -5,
            ..RulesConfig::default()
        };
        assert!(negative.validate().is_err());
        let no_fields = RulesConfig {
            farm_plots: 0,
            ..RulesConfig::default()
        };
        assert!(no_fields.validate().is_err());
        assert!(RulesConfig::default().validate().is_ok());
    }

    #[test]
    fn duration_helpers_never_overflow() {
        let extreme = RulesConfig {
            session_minutes: i64::MAX,
            breakthrough_cooldown_minutes: i64::MIN,
            ..RulesConfig::default()
        };
        assert_eq!(extreme.session_duration(), Duration::minutes(MAX_RULE_MINUTES));
        assert_eq!(extreme.breakthrough_cooldown(), Duration::zero());
        assert_eq!(RulesConfig::default().pvp_cooldown(), Duration::minutes(30));
    }
}
