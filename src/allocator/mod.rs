//! Duty allocation engine.
//!
//! [`DutyAllocator`] decides, for one volunteer and one drive, which duty slot
//! (if any) the volunteer receives. The pure pieces live in their own modules
//! (`capacity`, `eligibility`, `ranking`, `priority`); the operations that read
//! and write through a [`RosterStore`] are `impl` blocks spread over
//! `placement`, `batch`, `waitlist`, `slots`, `lifecycle` and `registration`.
//!
//! Every write goes through one atomic store call guarded by the slot's
//! version, so a slot never holds more seat-occupying assignments than its
//! effective capacity, whatever the interleaving of callers.

use std::sync::Arc;

use tracing::debug;

use crate::core::aliases::{DriveId, SlugList, VolunteerId};
use crate::core::models::{Assignment, Drive, Volunteer};
use crate::core::store::RosterStore;
use crate::core::types::{Gender, HistoryLookback};
use crate::errors::{Error, Result};

mod batch;
mod capacity;
mod eligibility;
mod lifecycle;
mod observer;
mod placement;
mod priority;
mod ranking;
mod registration;
mod slots;
mod waitlist;
#[cfg(test)]
mod tests;

pub use batch::{BatchEntry, BatchResult};
pub use capacity::resolve_capacity;
pub use eligibility::{has_spare_capacity, is_eligible, is_gender_eligible};
pub use observer::{PlacementEvent, PlacementObserver, TracingObserver};
pub use placement::PlacementOutcome;
pub use priority::{PriorityDecision, PriorityTable, VictimPlan, resolve_priority};
pub use ranking::{history_window, rank_by_frequency};
pub use registration::RegistrationEntry;
pub use waitlist::SweepReport;

/// Reason recorded on an assignment cancelled to make room for a priority entry.
pub const DISPLACEMENT_REASON: &str = "displaced by priority entry";
/// Actor recorded on placements made by the waitlist sweeper.
pub const SWEEPER_ACTOR: &str = "waitlist-sweeper";

/// Read-only allocation settings, taken once when the allocator is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPolicy {
    pub male_priority_order: SlugList,
    pub female_priority_order: SlugList,
    pub history_lookback: HistoryLookback,
    pub waitlist_auto_promotion: bool,
    /// Extra attempts after losing a seat to a concurrent placement.
    pub placement_retry_limit: u32,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            male_priority_order: Vec::new(),
            female_priority_order: Vec::new(),
            history_lookback: HistoryLookback::AllTime,
            waitlist_auto_promotion: true,
            placement_retry_limit: 3,
        }
    }
}

impl AllocationPolicy {
    pub fn fallback_order(&self, gender: Gender) -> &[String] {
        match gender {
            Gender::Male => &self.male_priority_order,
            Gender::Female => &self.female_priority_order,
        }
    }
}

pub struct DutyAllocator<S: RosterStore> {
    store: Arc<S>,
    policy: AllocationPolicy,
    observer: Arc<dyn PlacementObserver>,
}

impl<S: RosterStore> DutyAllocator<S> {
    pub fn new(store: Arc<S>, policy: AllocationPolicy) -> Self {
        Self {
            store,
            policy,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PlacementObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> &AllocationPolicy {
        &self.policy
    }

    fn load_volunteer(&self, id: VolunteerId) -> Result<Volunteer> {
        self.store.volunteer(id)?.ok_or(Error::UnknownVolunteer(id))
    }

    fn load_drive(&self, id: DriveId) -> Result<Drive> {
        self.store.drive(id)?.ok_or(Error::UnknownDrive(id))
    }

    /// Like `load_drive`, but refuses drives that take no more placements.
    fn load_open_drive(&self, id: DriveId) -> Result<Drive> {
        let drive = self.load_drive(id)?;
        if !drive.status.accepts_placements() {
            return Err(Error::DriveClosed {
                drive_id: drive.id,
                status: drive.status,
            });
        }
        Ok(drive)
    }

    /// Outcome view of an assignment that already exists.
    fn describe(&self, assignment: &Assignment) -> Result<PlacementOutcome> {
        let duty_name = self
            .store
            .slot_views(assignment.drive_id)?
            .into_iter()
            .find(|v| v.slot.id == assignment.slot_id)
            .map(|v| v.duty.name)
            .unwrap_or_else(|| format!("duty #{}", assignment.duty_id));
        debug!(
            assignment_id = assignment.id,
            status = %assignment.status,
            "returning existing assignment"
        );
        Ok(PlacementOutcome::from_assignment(assignment, duty_name))
    }
}
