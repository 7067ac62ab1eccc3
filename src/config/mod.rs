pub mod models;

use std::fs;
use std::ops::Index;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter as EnumIterDerive, EnumString};

use crate::allocator::AllocationPolicy;
use crate::config::models::{
    AutoPromotionConfigItem, ConfigItem, FileLoggingConfigItem, HistoryLookbackConfigItem,
    LogLevelConfigItem, RetryLimitConfigItem, SlugListConfigItem,
};
use crate::core::types::HistoryLookback;
use crate::errors::{Error, Result};
use crate::extensions::enums::valid_csv;
use crate::logging::LogSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIterDerive, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ConfigKey {
    MalePriorityOrder,
    FemalePriorityOrder,
    HistoryLookback,
    WaitlistAutoPromotion,
    PlacementRetryLimit,
    FileLoggingEnabled,
    LogLevel,
}

impl ConfigKey {
    pub fn try_from(s: &str) -> Result<Self> {
        Self::from_str(s.trim()).map_err(|_| {
            Error::Parse(format!(
                "Unknown configuration key '{}'. Valid keys: {}",
                s.trim(),
                valid_csv::<ConfigKey>()
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub male_priority_order: SlugListConfigItem,
    pub female_priority_order: SlugListConfigItem,
    #[serde(default)]
    pub history_lookback: HistoryLookbackConfigItem,
    #[serde(default)]
    pub waitlist_auto_promotion: AutoPromotionConfigItem,
    #[serde(default)]
    pub placement_retry_limit: RetryLimitConfigItem,
    #[serde(default)]
    pub file_logging_enabled: FileLoggingConfigItem,
    #[serde(default)]
    pub log_level: LogLevelConfigItem,
}

macro_rules! row {
    ($item:expr) => {
        ($item.description().to_string(), $item.display_value())
    };
}

impl ConfigFile {
    /// Description and displayed value of one key.
    fn describe(&self, key: ConfigKey) -> (String, String) {
        match key {
            ConfigKey::MalePriorityOrder => row!(self.male_priority_order),
            ConfigKey::FemalePriorityOrder => row!(self.female_priority_order),
            ConfigKey::HistoryLookback => row!(self.history_lookback),
            ConfigKey::WaitlistAutoPromotion => row!(self.waitlist_auto_promotion),
            ConfigKey::PlacementRetryLimit => row!(self.placement_retry_limit),
            ConfigKey::FileLoggingEnabled => row!(self.file_logging_enabled),
            ConfigKey::LogLevel => row!(self.log_level),
        }
    }

    fn apply(&mut self, key: ConfigKey, new_value: &str) -> Result<()> {
        match key {
            ConfigKey::MalePriorityOrder => self.male_priority_order.set_value(new_value),
            ConfigKey::FemalePriorityOrder => self.female_priority_order.set_value(new_value),
            ConfigKey::HistoryLookback => self.history_lookback.set_value(new_value),
            ConfigKey::WaitlistAutoPromotion => self.waitlist_auto_promotion.set_value(new_value),
            ConfigKey::PlacementRetryLimit => self.placement_retry_limit.set_value(new_value),
            ConfigKey::FileLoggingEnabled => self.file_logging_enabled.set_value(new_value),
            ConfigKey::LogLevel => self.log_level.set_value(new_value),
        }
    }
}

/// One applied edit, as displayed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigChange {
    pub key: String,
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    data: ConfigFile,
}

#[derive(Debug, Clone)]
pub struct ConfigRows(Vec<(String, String, String)>);

impl ConfigRows {
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &(String, String, String)> {
        self.0.iter()
    }
}
impl Index<usize> for ConfigRows {
    type Output = (String, String, String);
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl Config {
    pub fn load_default() -> Result<Self> {
        Self::load_from("config.json")
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(Error::config(format!(
                "Configuration file '{}' not found.",
                path.display()
            )));
        }
        let text = fs::read_to_string(&path)
            .map_err(|e| Error::config(format!("Failed to read {}: {}", path.display(), e)))?;
        let data: ConfigFile = serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("Invalid JSON in '{}': {}", path.display(), e)))?;
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn view(&self) -> &ConfigFile {
        &self.data
    }

    pub fn male_priority_order(&self) -> &[String] {
        self.data.male_priority_order.get_value()
    }
    pub fn female_priority_order(&self) -> &[String] {
        self.data.female_priority_order.get_value()
    }
    pub fn history_lookback(&self) -> HistoryLookback {
        *self.data.history_lookback.get_value()
    }
    pub fn waitlist_auto_promotion(&self) -> bool {
        self.data.waitlist_auto_promotion.get_value().0
    }
    pub fn placement_retry_limit(&self) -> u32 {
        *self.data.placement_retry_limit.get_value()
    }
    pub fn file_logging_enabled(&self) -> bool {
        self.data.file_logging_enabled.get_value().0
    }
    pub fn log_level(&self) -> &str {
        self.data.log_level.get_value()
    }

    /// Snapshot of the allocation settings; later edits do not reach an
    /// allocator built from an earlier snapshot.
    pub fn allocation_policy(&self) -> AllocationPolicy {
        AllocationPolicy {
            male_priority_order: self.male_priority_order().to_vec(),
            female_priority_order: self.female_priority_order().to_vec(),
            history_lookback: self.history_lookback(),
            waitlist_auto_promotion: self.waitlist_auto_promotion(),
            placement_retry_limit: self.placement_retry_limit(),
        }
    }

    pub fn log_settings(&self, log_dir: impl Into<PathBuf>) -> LogSettings {
        LogSettings {
            level: self.log_level().to_string(),
            file_logging_enabled: self.file_logging_enabled(),
            log_dir: log_dir.into(),
        }
    }

    pub fn rows(&self) -> ConfigRows {
        ConfigRows(
            ConfigKey::iter()
                .map(|key| {
                    let (description, value) = self.data.describe(key);
                    (key.to_string(), description, value)
                })
                .collect(),
        )
    }

    pub fn set_key(&mut self, key: ConfigKey, new_value: &str) -> Result<ConfigChange> {
        let mut changes = self.set_many([(key.to_string(), new_value)])?;
        changes
            .pop()
            .ok_or_else(|| Error::config(format!("No change recorded for {key}")))
    }

    pub fn set(&mut self, key_str: &str, new_value: &str) -> Result<ConfigChange> {
        self.set_key(ConfigKey::try_from(key_str)?, new_value)
    }

    /// Applies every pair or none of them; the file is written once.
    /// Returns the changes in the order given.
    pub fn set_many<I, K, V>(&mut self, pairs: I) -> Result<Vec<ConfigChange>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut staged = self.data.clone();
        let mut changes = Vec::new();
        for (k, v) in pairs {
            let key = ConfigKey::try_from(k.as_ref())?;
            let (_, old) = staged.describe(key);
            staged.apply(key, v.as_ref())?;
            let (_, new) = staged.describe(key);
            changes.push(ConfigChange {
                key: key.to_string(),
                old,
                new,
            });
        }
        self.edit(|cfg| {
            *cfg = staged;
            Ok(())
        })?;
        Ok(changes)
    }

    fn edit<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut ConfigFile) -> Result<()>,
    {
        let mut staged = self.data.clone();
        f(&mut staged)?;
        self.data = staged;
        self.save()
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, json)
            .map_err(|e| Error::config(format!("Failed to write {}: {}", self.path.display(), e)))
    }
}
