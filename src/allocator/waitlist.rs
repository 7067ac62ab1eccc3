use std::thread;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::allocator::eligibility::has_spare_capacity;
use crate::allocator::{DutyAllocator, PlacementEvent, PlacementOutcome, SWEEPER_ACTOR};
use crate::core::aliases::DriveId;
use crate::core::models::{Assignment, Drive};
use crate::core::store::RosterStore;
use crate::errors::Result;

/// Result of promoting one drive's waitlist during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub drive_id: DriveId,
    pub promoted: Vec<PlacementOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<S: RosterStore> DutyAllocator<S> {
    /// Re-runs placement for a drive's waitlist in queue order while any slot
    /// has a free seat, then renumbers whoever is still waiting.
    pub fn promote_waitlist(&self, drive_id: DriveId) -> Result<Vec<PlacementOutcome>> {
        let drive = self.load_drive(drive_id)?;
        if !drive.status.accepts_placements() {
            debug!(drive_id, status = %drive.status, "skipping waitlist of closed drive");
            return Ok(Vec::new());
        }

        let mut promoted = Vec::new();
        for entry in self.store.waitlist(drive.id)? {
            if !has_spare_capacity(&self.store.slot_views(drive.id)?) {
                debug!(drive_id, "no spare seats left, stopping promotion");
                break;
            }
            match self.requeue(&entry, &drive) {
                Ok(Some(outcome)) if outcome.is_placed() => {
                    self.observer
                        .notify(&PlacementEvent::Promoted(outcome.clone()));
                    promoted.push(outcome);
                }
                Ok(_) => {}
                Err(err) => warn!(
                    volunteer_id = entry.volunteer_id,
                    drive_id,
                    error = %err,
                    "waitlist promotion failed, entry kept"
                ),
            }
        }

        self.store.compact_waitlist(drive.id)?;
        if !promoted.is_empty() {
            info!(drive_id, promoted = promoted.len(), "waitlist promoted");
        }
        Ok(promoted)
    }

    /// Takes the entry off the waitlist and places it again. The row is put
    /// back untouched if placement errors out.
    fn requeue(&self, entry: &Assignment, drive: &Drive) -> Result<Option<PlacementOutcome>> {
        let volunteer = self.load_volunteer(entry.volunteer_id)?;
        let removed = self.store.delete_waitlisted(entry.id)?;
        match self.place_general(&volunteer, drive, SWEEPER_ACTOR) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if let Err(restore_err) = self.store.restore_assignment(removed) {
                    warn!(
                        assignment_id = entry.id,
                        error = %restore_err,
                        "could not restore waitlist entry"
                    );
                }
                Err(err)
            }
        }
    }

    /// Promotes every drive that has a waitlist, one worker per drive.
    pub fn sweep(&self) -> Result<Vec<SweepReport>> {
        if !self.policy.waitlist_auto_promotion {
            info!("waitlist auto-promotion disabled, sweep skipped");
            return Ok(Vec::new());
        }

        let drive_ids = self.store.drives_with_waitlist()?;
        let reports: Vec<SweepReport> = thread::scope(|scope| {
            let handles: Vec<_> = drive_ids
                .iter()
                .map(|&drive_id| (drive_id, scope.spawn(move || self.promote_waitlist(drive_id))))
                .collect();

            handles
                .into_iter()
                .map(|(drive_id, handle)| {
                    let (promoted, error) = match handle.join() {
                        Ok(Ok(promoted)) => (promoted, None),
                        Ok(Err(err)) => (Vec::new(), Some(err.to_string())),
                        Err(_) => (Vec::new(), Some("promotion worker panicked".to_string())),
                    };
                    if let Some(error) = &error {
                        warn!(drive_id, %error, "sweep failed for drive");
                    }
                    SweepReport {
                        drive_id,
                        promoted,
                        error,
                    }
                })
                .collect()
        });
        Ok(reports)
    }
}
