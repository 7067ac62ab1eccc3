use tracing::info;

use crate::allocator::PlacementOutcome;
use crate::core::aliases::{DriveId, VolunteerId};
use crate::core::models::Assignment;

/// Something the allocator decided, reported after the store accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementEvent {
    Placed(PlacementOutcome),
    Waitlisted(PlacementOutcome),
    /// A waitlisted volunteer received a seat during promotion.
    Promoted(PlacementOutcome),
    /// A default placement was cancelled to seat a priority volunteer.
    Displaced {
        displaced: Assignment,
        by: VolunteerId,
    },
    /// No duty on the drive admits the volunteer at all.
    NoEligibleSlot {
        volunteer_id: VolunteerId,
        drive_id: DriveId,
    },
}

pub trait PlacementObserver: Send + Sync {
    fn notify(&self, event: &PlacementEvent);
}

/// Default observer: one structured log line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PlacementObserver for TracingObserver {
    fn notify(&self, event: &PlacementEvent) {
        match event {
            PlacementEvent::Placed(o) => info!(
                volunteer_id = o.volunteer_id,
                drive_id = o.drive_id,
                duty = %o.duty_name,
                "volunteer placed"
            ),
            PlacementEvent::Waitlisted(o) => info!(
                volunteer_id = o.volunteer_id,
                drive_id = o.drive_id,
                duty = %o.duty_name,
                position = o.queue_position,
                "volunteer waitlisted"
            ),
            PlacementEvent::Promoted(o) => info!(
                volunteer_id = o.volunteer_id,
                drive_id = o.drive_id,
                duty = %o.duty_name,
                "volunteer promoted from waitlist"
            ),
            PlacementEvent::Displaced { displaced, by } => info!(
                volunteer_id = displaced.volunteer_id,
                drive_id = displaced.drive_id,
                slot_id = displaced.slot_id,
                priority_volunteer = by,
                "default placement displaced"
            ),
            PlacementEvent::NoEligibleSlot {
                volunteer_id,
                drive_id,
            } => info!(volunteer_id, drive_id, "no duty admits volunteer"),
        }
    }
}
