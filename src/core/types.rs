use crate::errors::{Error, Result};
use crate::extensions::enums::valid_csv;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumIter as EnumIterDerive, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    AsRefStr,
    EnumIterDerive,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn try_from(s: &str) -> Result<Self> {
        Self::from_str(s.trim()).map_err(|_| {
            Error::Parse(format!(
                "Invalid gender: '{}'. Valid values: {}",
                s.trim(),
                valid_csv::<Gender>()
            ))
        })
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumString,
    Display,
    AsRefStr,
    EnumIterDerive,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GenderRestriction {
    #[default]
    None,
    Male,
    Female,
}

impl GenderRestriction {
    pub fn admits(self, gender: Gender) -> bool {
        match self {
            GenderRestriction::None => true,
            GenderRestriction::Male => gender == Gender::Male,
            GenderRestriction::Female => gender == Gender::Female,
        }
    }

    pub fn try_from(s: &str) -> Result<Self> {
        Self::from_str(s.trim()).map_err(|_| {
            Error::Parse(format!(
                "Invalid gender restriction: '{}'. Valid values: {}",
                s.trim(),
                valid_csv::<GenderRestriction>()
            ))
        })
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    EnumString,
    Display,
    AsRefStr,
    EnumIterDerive,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DriveStatus {
    #[default]
    Draft,
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl DriveStatus {
    /// Drives that are finished or called off take no new placements.
    pub fn accepts_placements(self) -> bool {
        !matches!(self, DriveStatus::Completed | DriveStatus::Cancelled)
    }

    pub fn try_from(s: &str) -> Result<Self> {
        Self::from_str(s.trim()).map_err(|_| {
            Error::Parse(format!(
                "Invalid drive status: '{}'. Valid statuses: {}",
                s.trim(),
                valid_csv::<DriveStatus>()
            ))
        })
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    AsRefStr,
    EnumIterDerive,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Placed,
    Waitlisted,
    Confirmed,
    Arrived,
    Completed,
    Cancelled,
    NoShow,
}

impl AssignmentStatus {
    /// Whether an assignment in this status is counted in its slot's `placed_count`.
    pub fn occupies_seat(self) -> bool {
        matches!(
            self,
            AssignmentStatus::Placed
                | AssignmentStatus::Confirmed
                | AssignmentStatus::Arrived
                | AssignmentStatus::Completed
        )
    }

    /// Whether a past assignment in this status informs duty preference.
    pub fn counts_as_history(self) -> bool {
        !matches!(
            self,
            AssignmentStatus::Cancelled | AssignmentStatus::NoShow | AssignmentStatus::Waitlisted
        )
    }

    pub fn can_transition_to(self, next: AssignmentStatus) -> bool {
        use AssignmentStatus::*;
        matches!(
            (self, next),
            (Placed, Confirmed)
                | (Placed, Arrived)
                | (Confirmed, Arrived)
                | (Arrived, Completed)
                | (Placed, Cancelled)
                | (Confirmed, Cancelled)
                | (Waitlisted, Cancelled)
                | (Placed, NoShow)
                | (Confirmed, NoShow)
        )
    }

    pub fn try_from(s: &str) -> Result<Self> {
        Self::from_str(s.trim()).map_err(|_| {
            Error::Parse(format!(
                "Invalid assignment status: '{}'. Valid statuses: {}",
                s.trim(),
                valid_csv::<AssignmentStatus>()
            ))
        })
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumString,
    Display,
    AsRefStr,
    EnumIterDerive,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OverflowBehavior {
    AllowOverflow,
    UnassignOne,
    ReassignToDuty,
}

impl OverflowBehavior {
    pub fn help(&self) -> &'static str {
        match self {
            OverflowBehavior::AllowOverflow => {
                "Compete through the normal placement rules when the forced duty is full."
            }
            OverflowBehavior::UnassignOne => {
                "Displace the latest default placement and re-place that volunteer normally."
            }
            OverflowBehavior::ReassignToDuty => {
                "Displace the latest default placement into the configured reassignment duty."
            }
        }
    }

    pub fn try_from(s: &str) -> Result<Self> {
        Self::from_str(s.trim()).map_err(|_| {
            Error::Parse(format!(
                "Invalid overflow behavior: '{}'. Allowed behaviors: {}",
                s.trim(),
                valid_csv::<OverflowBehavior>()
            ))
        })
    }
}

/// Which past assignments count as a volunteer's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryLookback {
    #[default]
    AllTime,
    CurrentSeason,
    /// Only the volunteer's N most recent drives.
    LastDrives(u32),
}

impl HistoryLookback {
    const LAST_DRIVES_PREFIX: &'static str = "last-drives:";

    pub fn usage() -> String {
        format!(
            "Valid lookbacks: all-time, current-season, {}<N>",
            Self::LAST_DRIVES_PREFIX
        )
    }

    pub fn try_from_str(s: &str) -> Result<Self> {
        let raw = s.trim().to_ascii_lowercase();
        match raw.as_str() {
            "all-time" => return Ok(HistoryLookback::AllTime),
            "current-season" => return Ok(HistoryLookback::CurrentSeason),
            _ => {}
        }
        let n = raw
            .strip_prefix(Self::LAST_DRIVES_PREFIX)
            .and_then(|n| n.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                Error::Parse(format!(
                    "Invalid history lookback: '{}'. {}",
                    s.trim(),
                    Self::usage()
                ))
            })?;
        Ok(HistoryLookback::LastDrives(n))
    }
}

impl fmt::Display for HistoryLookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryLookback::AllTime => write!(f, "all-time"),
            HistoryLookback::CurrentSeason => write!(f, "current-season"),
            HistoryLookback::LastDrives(n) => write!(f, "{}{}", Self::LAST_DRIVES_PREFIX, n),
        }
    }
}

impl Serialize for HistoryLookback {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<<S as Serializer>::Ok, <S as Serializer>::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HistoryLookback {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<HistoryLookback, <D as Deserializer<'de>>::Error> {
        let s = String::deserialize(deserializer)?;
        HistoryLookback::try_from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr, EnumIterDerive)]
#[strum(ascii_case_insensitive)]
pub enum BoolFormat {
    #[strum(serialize = "true", serialize = "True", to_string = "True")]
    TextTrue,

    #[strum(serialize = "false", serialize = "False", to_string = "False")]
    TextFalse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bool(pub bool);

impl Bool {
    pub fn try_from_str(s: &str) -> Result<Self> {
        match BoolFormat::from_str(s.trim()) {
            Ok(fmt) => Ok(Bool(matches!(fmt, BoolFormat::TextTrue))),
            Err(_) => Err(Error::Parse(format!(
                "Invalid string value for boolean: '{}'. Valid values: {}",
                s,
                valid_csv::<BoolFormat>()
            ))),
        }
    }
}

impl fmt::Display for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.0 { "True" } else { "False" })
    }
}

impl Serialize for Bool {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<<S as Serializer>::Ok, <S as Serializer>::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Bool {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Bool, <D as Deserializer<'de>>::Error> {
        let b = String::deserialize(deserializer)?;
        Bool::try_from_str(&b).map_err(serde::de::Error::custom)
    }
}
