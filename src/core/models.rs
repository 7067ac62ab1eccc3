use crate::core::aliases::{AssignmentId, DriveId, DutyId, SeasonId, SlotId, VolunteerId};
use crate::core::types::{AssignmentStatus, DriveStatus, Gender, GenderRestriction, OverflowBehavior};
use crate::extensions::string::ToPhoneDigits;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub trait BaseEntity {
    /// Entity name used in not-found errors.
    const KIND: &'static str;
    fn id(&self) -> i32;
    fn set_id(&mut self, id: i32);
}

macro_rules! base_entity {
    ($ty:ty, $kind:literal) => {
        impl BaseEntity for $ty {
            const KIND: &'static str = $kind;
            fn id(&self) -> i32 {
                self.id
            }
            fn set_id(&mut self, id: i32) {
                self.id = id;
            }
        }
    };
}

// ==========
// Volunteer
// ==========

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volunteer {
    pub id: VolunteerId,
    /// Digits only; the stable identity key.
    pub phone: String,
    pub name: String,
    pub gender: Gender,
    #[serde(default)]
    pub completed_drives: u32,
}

impl Volunteer {
    pub fn new(phone: &str, name: impl Into<String>, gender: Gender) -> Self {
        Self {
            id: 1,
            phone: phone.to_phone_digits(),
            name: name.into(),
            gender,
            completed_drives: 0,
        }
    }
}
base_entity!(Volunteer, "Volunteer");

impl fmt::Display for Volunteer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Volunteer(id={}, name='{}', gender={}, completed={})",
            self.id, self.name, self.gender, self.completed_drives
        )
    }
}

// ======
// Drive
// ======

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drive {
    pub id: DriveId,
    pub name: String,
    #[serde(default)]
    pub season_id: Option<SeasonId>,
    pub date: NaiveDate,
    /// Size input that scales duty capacity, e.g. the meal-unit count.
    pub size: u32,
    #[serde(default)]
    pub status: DriveStatus,
}

impl Drive {
    pub fn new(name: impl Into<String>, date: NaiveDate, size: u32) -> Self {
        Self {
            id: 1,
            name: name.into(),
            season_id: None,
            date,
            size,
            status: DriveStatus::Open,
        }
    }

    pub fn with_season(mut self, season_id: SeasonId) -> Self {
        self.season_id = Some(season_id);
        self
    }
}
base_entity!(Drive, "Drive");

// =====
// Duty
// =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duty {
    pub id: DutyId,
    pub name: String,
    /// Lowercase key referenced by priority orders and priority entries.
    pub slug: String,
    #[serde(default)]
    pub gender_restriction: GenderRestriction,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Duty {
    pub fn new(name: impl Into<String>, slug: &str, gender_restriction: GenderRestriction) -> Self {
        Self {
            id: 1,
            name: name.into(),
            slug: slug.trim().to_ascii_lowercase(),
            gender_restriction,
            active: true,
        }
    }
}
base_entity!(Duty, "Duty");

// ==============
// Capacity rule
// ==============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CapacityMode {
    /// `base + ceil(per_unit * size)`; missing values count as zero.
    Linear {
        #[serde(default)]
        base: Option<i32>,
        #[serde(default)]
        per_unit: Option<f64>,
    },
    /// Fixed capacity for sizes within `[min_size, max_size]`; `None` is unbounded.
    Tiered {
        min_size: u32,
        #[serde(default)]
        max_size: Option<u32>,
        capacity: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRule {
    pub id: i32,
    pub duty_id: DutyId,
    #[serde(flatten)]
    pub mode: CapacityMode,
}

impl CapacityRule {
    pub fn linear(duty_id: DutyId, base: i32, per_unit: f64) -> Self {
        Self {
            id: 1,
            duty_id,
            mode: CapacityMode::Linear {
                base: Some(base),
                per_unit: Some(per_unit),
            },
        }
    }

    pub fn tier(duty_id: DutyId, min_size: u32, max_size: Option<u32>, capacity: u32) -> Self {
        Self {
            id: 1,
            duty_id,
            mode: CapacityMode::Tiered {
                min_size,
                max_size,
                capacity,
            },
        }
    }
}
base_entity!(CapacityRule, "CapacityRule");

// ================
// Drive duty slot
// ================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveDutySlot {
    pub id: SlotId,
    pub drive_id: DriveId,
    pub duty_id: DutyId,
    pub computed_capacity: u32,
    #[serde(default)]
    pub manual_override: Option<u32>,
    #[serde(default)]
    pub placed_count: u32,
    /// Bumped on every count or capacity change; seat claims compare against it.
    #[serde(default)]
    pub version: u64,
}

impl DriveDutySlot {
    pub fn new(drive_id: DriveId, duty_id: DutyId, computed_capacity: u32) -> Self {
        Self {
            id: 1,
            drive_id,
            duty_id,
            computed_capacity,
            manual_override: None,
            placed_count: 0,
            version: 0,
        }
    }

    pub fn effective_capacity(&self) -> u32 {
        self.manual_override.unwrap_or(self.computed_capacity)
    }

    pub fn has_room(&self) -> bool {
        self.effective_capacity() > self.placed_count
    }

    pub fn spare(&self) -> u32 {
        self.effective_capacity().saturating_sub(self.placed_count)
    }
}
base_entity!(DriveDutySlot, "DriveDutySlot");

// ===========
// Assignment
// ===========

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub volunteer_id: VolunteerId,
    pub drive_id: DriveId,
    pub slot_id: SlotId,
    pub duty_id: DutyId,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub queue_position: Option<u32>,
    /// Placed through a priority entry; never displaced by another one.
    #[serde(default)]
    pub is_priority: bool,
    pub actor: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
}
base_entity!(Assignment, "Assignment");

impl Assignment {
    pub fn from_new(new: NewAssignment, status: AssignmentStatus) -> Self {
        Self {
            id: 1,
            volunteer_id: new.volunteer_id,
            drive_id: new.drive_id,
            slot_id: new.slot_id,
            duty_id: new.duty_id,
            status,
            queue_position: None,
            is_priority: new.is_priority,
            actor: new.actor,
            created_at: Utc::now(),
            cancel_reason: None,
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Assignment(id={}, volunteer={}, drive={}, slot={}, status={}",
            self.id, self.volunteer_id, self.drive_id, self.slot_id, self.status
        )?;
        if let Some(pos) = self.queue_position {
            write!(f, ", queue={pos}")?;
        }
        write!(f, ")")
    }
}

/// Assignment fields chosen by the engine; the store fills in id, status and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    pub volunteer_id: VolunteerId,
    pub drive_id: DriveId,
    pub slot_id: SlotId,
    pub duty_id: DutyId,
    pub is_priority: bool,
    pub actor: String,
}

// =============
// Availability
// =============

/// A volunteer's declared availability for one drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub id: i32,
    pub volunteer_id: VolunteerId,
    pub drive_id: DriveId,
    pub registered_at: DateTime<Utc>,
}
base_entity!(Availability, "Availability");

// ===============
// Priority entry
// ===============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub id: i32,
    pub phone: String,
    pub duty_slug: String,
    pub overflow_behavior: OverflowBehavior,
    /// Only read for `reassign_to_duty`.
    #[serde(default)]
    pub reassign_target: Option<String>,
}

impl PriorityEntry {
    pub fn new(phone: &str, duty_slug: &str, overflow_behavior: OverflowBehavior) -> Self {
        Self {
            id: 1,
            phone: phone.to_phone_digits(),
            duty_slug: duty_slug.trim().to_ascii_lowercase(),
            overflow_behavior,
            reassign_target: None,
        }
    }

    pub fn reassigning_to(mut self, slug: &str) -> Self {
        self.reassign_target = Some(slug.trim().to_ascii_lowercase());
        self
    }
}
base_entity!(PriorityEntry, "PriorityEntry");

/// A slot joined with its duty metadata, the unit the allocator decides over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView {
    pub slot: DriveDutySlot,
    pub duty: Duty,
}
