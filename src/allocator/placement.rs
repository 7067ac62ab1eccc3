use serde::Serialize;
use tracing::{debug, warn};

use crate::allocator::eligibility::{is_eligible, is_gender_eligible};
use crate::allocator::priority::PriorityTable;
use crate::allocator::ranking::{history_window, rank_by_frequency};
use crate::allocator::{DutyAllocator, PlacementEvent};
use crate::core::aliases::{AssignmentId, DriveId, DutyId, VolunteerId};
use crate::core::models::{Assignment, Drive, NewAssignment, SlotView, Volunteer};
use crate::core::store::{ClaimResult, RosterStore, SeatClaim};
use crate::core::types::AssignmentStatus;
use crate::errors::{Error, Result};

/// What a placement call produced for one volunteer on one drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementOutcome {
    pub assignment_id: AssignmentId,
    pub volunteer_id: VolunteerId,
    pub drive_id: DriveId,
    pub duty_id: DutyId,
    pub duty_name: String,
    pub status: AssignmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
}

impl PlacementOutcome {
    pub(crate) fn from_assignment(assignment: &Assignment, duty_name: impl Into<String>) -> Self {
        Self {
            assignment_id: assignment.id,
            volunteer_id: assignment.volunteer_id,
            drive_id: assignment.drive_id,
            duty_id: assignment.duty_id,
            duty_name: duty_name.into(),
            status: assignment.status,
            queue_position: assignment.queue_position,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.status.occupies_seat()
    }

    pub fn is_waitlisted(&self) -> bool {
        self.status == AssignmentStatus::Waitlisted
    }
}

impl<S: RosterStore> DutyAllocator<S> {
    /// Places one volunteer on one drive.
    ///
    /// Returns the existing assignment unchanged when the volunteer already
    /// holds one for the drive. `Ok(None)` means no duty on the drive admits
    /// the volunteer's gender, so not even a waitlist entry was created.
    pub fn place_volunteer(
        &self,
        volunteer_id: VolunteerId,
        drive_id: DriveId,
        actor: &str,
    ) -> Result<Option<PlacementOutcome>> {
        let volunteer = self.load_volunteer(volunteer_id)?;
        let drive = self.load_open_drive(drive_id)?;

        if let Some(existing) = self.store.assignment_for(volunteer.id, drive.id)? {
            return self.describe(&existing).map(Some);
        }

        let table = PriorityTable::load(self.store.as_ref())?;
        if let Some(outcome) = self.apply_priority(&table, &volunteer, &drive, actor)? {
            return Ok(Some(outcome));
        }
        self.place_general(&volunteer, &drive, actor)
    }

    /// History-first, then the gender's fallback order, then the waitlist.
    pub(crate) fn place_general(
        &self,
        volunteer: &Volunteer,
        drive: &Drive,
        actor: &str,
    ) -> Result<Option<PlacementOutcome>> {
        let history = self.store.volunteer_history(volunteer.id)?;
        let ranked = rank_by_frequency(&history_window(
            &history,
            drive,
            self.policy.history_lookback,
        ));

        for attempt in 0..=self.policy.placement_retry_limit {
            let views = self.store.slot_views(drive.id)?;
            let Some(view) = self.choose_slot(volunteer, &views, &ranked) else {
                return self.waitlist_volunteer(volunteer, drive, &views, actor);
            };
            match self.claim_seat(volunteer, view, false, actor)? {
                Some(outcome) => return Ok(Some(outcome)),
                None => debug!(
                    volunteer_id = volunteer.id,
                    slot_id = view.slot.id,
                    attempt,
                    "lost seat to a concurrent placement, retrying"
                ),
            }
        }

        warn!(
            volunteer_id = volunteer.id,
            drive_id = drive.id,
            retries = self.policy.placement_retry_limit,
            "placement retries exhausted, waitlisting"
        );
        let views = self.store.slot_views(drive.id)?;
        self.waitlist_volunteer(volunteer, drive, &views, actor)
    }

    fn choose_slot<'v>(
        &self,
        volunteer: &Volunteer,
        views: &'v [SlotView],
        ranked: &[DutyId],
    ) -> Option<&'v SlotView> {
        let returning = ranked.iter().find_map(|duty_id| {
            views
                .iter()
                .find(|v| v.duty.id == *duty_id && is_eligible(volunteer, v))
        });
        if returning.is_some() {
            return returning;
        }
        self.policy
            .fallback_order(volunteer.gender)
            .iter()
            .find_map(|slug| {
                views
                    .iter()
                    .find(|v| v.duty.slug == *slug && is_eligible(volunteer, v))
            })
    }

    /// Tries to take one seat in `view` as read. `Ok(None)` means the slot
    /// moved underneath us and the caller should decide again.
    pub(crate) fn claim_seat(
        &self,
        volunteer: &Volunteer,
        view: &SlotView,
        is_priority: bool,
        actor: &str,
    ) -> Result<Option<PlacementOutcome>> {
        let claim = SeatClaim {
            observed_version: view.slot.version,
            assignment: NewAssignment {
                volunteer_id: volunteer.id,
                drive_id: view.slot.drive_id,
                slot_id: view.slot.id,
                duty_id: view.duty.id,
                is_priority,
                actor: actor.to_string(),
            },
        };
        match self.store.commit_placement(claim)? {
            ClaimResult::Committed(assignment) => {
                let outcome = PlacementOutcome::from_assignment(&assignment, &view.duty.name);
                self.observer.notify(&PlacementEvent::Placed(outcome.clone()));
                Ok(Some(outcome))
            }
            ClaimResult::Duplicate(existing) => self.describe(&existing).map(Some),
            ClaimResult::Conflict => Ok(None),
        }
    }

    fn waitlist_volunteer(
        &self,
        volunteer: &Volunteer,
        drive: &Drive,
        views: &[SlotView],
        actor: &str,
    ) -> Result<Option<PlacementOutcome>> {
        // The first duty that admits the volunteer stands in as the nominal slot.
        let Some(nominal) = views.iter().find(|v| is_gender_eligible(volunteer, v)) else {
            self.observer.notify(&PlacementEvent::NoEligibleSlot {
                volunteer_id: volunteer.id,
                drive_id: drive.id,
            });
            return Ok(None);
        };
        self.enqueue(volunteer, nominal, actor)
    }

    pub(crate) fn enqueue(
        &self,
        volunteer: &Volunteer,
        view: &SlotView,
        actor: &str,
    ) -> Result<Option<PlacementOutcome>> {
        let new = NewAssignment {
            volunteer_id: volunteer.id,
            drive_id: view.slot.drive_id,
            slot_id: view.slot.id,
            duty_id: view.duty.id,
            is_priority: false,
            actor: actor.to_string(),
        };
        match self.store.enqueue_waitlisted(new)? {
            ClaimResult::Committed(assignment) => {
                let outcome = PlacementOutcome::from_assignment(&assignment, &view.duty.name);
                self.observer
                    .notify(&PlacementEvent::Waitlisted(outcome.clone()));
                Ok(Some(outcome))
            }
            ClaimResult::Duplicate(existing) => self.describe(&existing).map(Some),
            ClaimResult::Conflict => Err(Error::storage(format!(
                "waitlist insert for volunteer {} reported a seat conflict",
                volunteer.id
            ))),
        }
    }
}
