use thiserror::Error;

// Re-export a simple Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

use crate::core::aliases::{DriveId, SlotId, VolunteerId};
use crate::core::types::{AssignmentStatus, DriveStatus};

/// Errors surfaced by the allocation engine and its plumbing.
#[derive(Error, Debug)]
pub enum Error {
    // ---- Parsing ------------------------------------------------------------
    /// Malformed textual input (enum names, lookback specs, CLI values).
    #[error("Parse error: {0}")]
    Parse(String),

    // ---- Invalid input ------------------------------------------------------
    #[error("Unknown volunteer: {0}")]
    UnknownVolunteer(VolunteerId),

    #[error("Unknown drive: {0}")]
    UnknownDrive(DriveId),

    #[error("Unknown duty '{0}'")]
    UnknownDuty(String),

    #[error("{entity} with id {id} not found.")]
    NotFound { entity: &'static str, id: i32 },

    #[error("Volunteer {volunteer_id} holds no assignment for drive {drive_id}")]
    NoAssignment {
        volunteer_id: VolunteerId,
        drive_id: DriveId,
    },

    #[error("{0} already exists.")]
    Duplicate(String),

    // ---- Allocation rules ---------------------------------------------------
    /// Placement attempted against a drive that no longer takes volunteers.
    #[error("Drive {drive_id} is {status} and accepts no placements")]
    DriveClosed {
        drive_id: DriveId,
        status: DriveStatus,
    },

    /// A capacity change would leave more volunteers placed than seats.
    #[error("Slot {slot_id} cannot shrink to {capacity}: {placed} volunteer(s) already placed")]
    CapacityBelowPlaced {
        slot_id: SlotId,
        capacity: u32,
        placed: u32,
    },

    #[error("Assignment cannot move from {from} to {to}")]
    InvalidTransition {
        from: AssignmentStatus,
        to: AssignmentStatus,
    },

    // ---- Config -------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing configuration item: {item}")]
    ConfigItemMissing { item: &'static str },

    // ---- Plumbing / Wrappers ------------------------------------------------
    /// Store lock poisoned or otherwise unusable.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ----------------------- Convenience constructors ----------------------------

impl Error {
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Error::Parse(msg.into())
    }
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Error::Storage(msg.into())
    }
}

// ----------------------- Small result helpers --------------------------------

/// Map an `Option<T>` into `Result<T, Error::ConfigItemMissing>` with a static key.
pub fn require_config_item<T>(opt: Option<T>, item: &'static str) -> Result<T> {
    opt.ok_or_else(|| Error::ConfigItemMissing { item })
}
