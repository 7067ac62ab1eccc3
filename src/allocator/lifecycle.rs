use tracing::info;

use crate::allocator::DutyAllocator;
use crate::core::aliases::{DriveId, VolunteerId};
use crate::core::models::Assignment;
use crate::core::store::RosterStore;
use crate::core::types::AssignmentStatus;
use crate::errors::{Error, Result};

impl<S: RosterStore> DutyAllocator<S> {
    /// Moves a volunteer's assignment on a drive to `status`. Leaving a
    /// seat-occupying status frees the seat for the waitlist.
    pub fn update_status(
        &self,
        volunteer_id: VolunteerId,
        drive_id: DriveId,
        status: AssignmentStatus,
        reason: Option<&str>,
    ) -> Result<Assignment> {
        self.load_volunteer(volunteer_id)?;
        self.load_drive(drive_id)?;
        let assignment = self
            .store
            .assignment_for(volunteer_id, drive_id)?
            .ok_or(Error::NoAssignment {
                volunteer_id,
                drive_id,
            })?;

        let updated = self
            .store
            .update_status(assignment.id, status, reason.map(str::to_string))?;
        info!(
            volunteer_id,
            drive_id,
            from = %assignment.status,
            to = %updated.status,
            "assignment status changed"
        );
        Ok(updated)
    }

    pub fn cancel_assignment(
        &self,
        volunteer_id: VolunteerId,
        drive_id: DriveId,
        reason: &str,
    ) -> Result<Assignment> {
        self.update_status(
            volunteer_id,
            drive_id,
            AssignmentStatus::Cancelled,
            Some(reason),
        )
    }
}
