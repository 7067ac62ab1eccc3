use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::allocator::{DutyAllocator, PlacementOutcome};
use crate::core::aliases::{DriveId, VolunteerId};
use crate::core::store::RosterStore;
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BatchResult {
    /// Placed or waitlisted.
    Assigned(PlacementOutcome),
    /// No duty on the drive admits the volunteer.
    NoPlacement,
    /// This volunteer failed; the rest of the batch carried on.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchEntry {
    pub volunteer_id: VolunteerId,
    pub result: BatchResult,
}

impl BatchResult {
    pub(crate) fn from_attempt(attempt: Result<Option<PlacementOutcome>>) -> Self {
        match attempt {
            Ok(Some(outcome)) => BatchResult::Assigned(outcome),
            Ok(None) => BatchResult::NoPlacement,
            Err(err) => BatchResult::Failed {
                reason: err.to_string(),
            },
        }
    }
}

impl<S: RosterStore> DutyAllocator<S> {
    /// Places every volunteer who declared availability for the drive and
    /// holds no assignment yet, earliest registration first.
    pub fn place_all_available(&self, drive_id: DriveId, actor: &str) -> Result<Vec<BatchEntry>> {
        let drive = self.load_open_drive(drive_id)?;
        let rows = self.store.availability(drive.id)?;

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for row in rows {
            if !seen.insert(row.volunteer_id) {
                continue;
            }
            match self.store.assignment_for(row.volunteer_id, drive.id) {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(err) => {
                    entries.push(BatchEntry {
                        volunteer_id: row.volunteer_id,
                        result: BatchResult::Failed {
                            reason: err.to_string(),
                        },
                    });
                    continue;
                }
            }

            let result =
                BatchResult::from_attempt(self.place_volunteer(row.volunteer_id, drive.id, actor));
            if let BatchResult::Failed { reason } = &result {
                warn!(volunteer_id = row.volunteer_id, drive_id, %reason, "batch placement failed");
            }
            entries.push(BatchEntry {
                volunteer_id: row.volunteer_id,
                result,
            });
        }

        info!(drive_id, processed = entries.len(), "batch placement finished");
        Ok(entries)
    }
}
