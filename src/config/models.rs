use crate::core::aliases::SlugList;
use crate::core::types::{Bool, HistoryLookback};
use crate::errors::Error;
use crate::extensions::string::SplitSlugs;
use crate::logging::{DEFAULT_LOG_LEVEL, build_filter};
use serde::{Deserialize, Serialize};

pub trait ConfigItem<T> {
    fn get_value(&self) -> &T;
    fn set_value(&mut self, new_value: &str) -> Result<(), Error>;
    fn description(&self) -> &str;
    /// Value as shown in config listings and change logs.
    fn display_value(&self) -> String;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlugListConfigItem {
    pub value: SlugList,
    pub description: String,
}
impl ConfigItem<SlugList> for SlugListConfigItem {
    fn get_value(&self) -> &SlugList {
        &self.value
    }
    fn set_value(&mut self, new_value: &str) -> Result<(), Error> {
        let slugs = new_value.split_slugs();
        if slugs.is_empty() {
            return Err(Error::Parse(
                "Duty order needs at least one duty slug, e.g. 'traffic, food'".into(),
            ));
        }
        self.value = slugs;
        Ok(())
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn display_value(&self) -> String {
        self.value.join(", ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryLookbackConfigItem {
    pub value: HistoryLookback,
    pub description: String,
}

impl Default for HistoryLookbackConfigItem {
    fn default() -> Self {
        Self {
            value: HistoryLookback::AllTime,
            description: "Which past assignments count toward duty history.".into(),
        }
    }
}

impl ConfigItem<HistoryLookback> for HistoryLookbackConfigItem {
    fn get_value(&self) -> &HistoryLookback {
        &self.value
    }
    fn set_value(&mut self, new_value: &str) -> Result<(), Error> {
        Ok(self.value = HistoryLookback::try_from_str(new_value)?)
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn display_value(&self) -> String {
        self.value.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoPromotionConfigItem {
    pub value: Bool,
    pub description: String,
}

impl Default for AutoPromotionConfigItem {
    fn default() -> Self {
        Self {
            value: Bool(true),
            description: "Promote waitlisted volunteers when seats free up.".into(),
        }
    }
}

impl ConfigItem<Bool> for AutoPromotionConfigItem {
    fn get_value(&self) -> &Bool {
        &self.value
    }
    fn set_value(&mut self, new_value: &str) -> Result<(), Error> {
        Ok(self.value = Bool::try_from_str(new_value)?)
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn display_value(&self) -> String {
        self.value.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryLimitConfigItem {
    pub value: u32,
    pub description: String,
}

impl Default for RetryLimitConfigItem {
    fn default() -> Self {
        Self {
            value: 3,
            description: "Extra placement attempts after losing a seat to a concurrent placement."
                .into(),
        }
    }
}

impl ConfigItem<u32> for RetryLimitConfigItem {
    fn get_value(&self) -> &u32 {
        &self.value
    }
    fn set_value(&mut self, new_value: &str) -> Result<(), Error> {
        let parsed = new_value.trim().parse::<u32>().map_err(|_| {
            Error::Parse(format!(
                "Invalid retry limit: '{}'. Expected a whole number of 0 or more",
                new_value.trim()
            ))
        })?;
        self.value = parsed;
        Ok(())
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn display_value(&self) -> String {
        self.value.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLoggingConfigItem {
    pub value: Bool,
    pub description: String,
}

impl Default for FileLoggingConfigItem {
    fn default() -> Self {
        Self {
            value: Bool(true),
            description: "Enable writing log messages to file.".into(),
        }
    }
}

impl ConfigItem<Bool> for FileLoggingConfigItem {
    fn get_value(&self) -> &Bool {
        &self.value
    }
    fn set_value(&mut self, new_value: &str) -> Result<(), Error> {
        Ok(self.value = Bool::try_from_str(new_value)?)
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn display_value(&self) -> String {
        self.value.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLevelConfigItem {
    pub value: String,
    pub description: String,
}

impl Default for LogLevelConfigItem {
    fn default() -> Self {
        Self {
            value: DEFAULT_LOG_LEVEL.into(),
            description: "Log filter used when RUST_LOG is not set.".into(),
        }
    }
}

impl ConfigItem<String> for LogLevelConfigItem {
    fn get_value(&self) -> &String {
        &self.value
    }
    fn set_value(&mut self, new_value: &str) -> Result<(), Error> {
        let level = new_value.trim();
        build_filter(level)?;
        self.value = level.to_string();
        Ok(())
    }
    fn description(&self) -> &str {
        &self.description
    }
    fn display_value(&self) -> String {
        self.value.clone()
    }
}
