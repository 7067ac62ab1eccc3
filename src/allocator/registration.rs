use serde::Serialize;
use tracing::{info, warn};

use crate::allocator::{BatchResult, DutyAllocator};
use crate::core::aliases::{DriveId, VolunteerId};
use crate::core::models::Volunteer;
use crate::core::store::RosterStore;
use crate::core::types::Gender;
use crate::errors::{Error, Result};
use crate::extensions::string::ToPhoneDigits;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationEntry {
    pub drive_id: DriveId,
    pub result: BatchResult,
}

impl<S: RosterStore> DutyAllocator<S> {
    /// Finds a volunteer by phone or creates one. Gender is fixed at creation.
    pub fn ensure_volunteer(&self, phone: &str, name: &str, gender: Gender) -> Result<Volunteer> {
        let digits = phone.to_phone_digits();
        if digits.is_empty() {
            return Err(Error::parse(format!("Phone number '{phone}' has no digits")));
        }

        if let Some(existing) = self.store.volunteer_by_phone(&digits)? {
            if existing.gender != gender {
                warn!(
                    volunteer_id = existing.id,
                    stored = %existing.gender,
                    requested = %gender,
                    "gender cannot change after registration, keeping stored value"
                );
            }
            return Ok(existing);
        }

        match self.store.insert_volunteer(Volunteer::new(&digits, name, gender)) {
            Ok(created) => {
                info!(volunteer_id = created.id, "volunteer registered");
                Ok(created)
            }
            // Lost a race with another registration for the same phone.
            Err(Error::Duplicate(_)) => self
                .store
                .volunteer_by_phone(&digits)?
                .ok_or_else(|| Error::storage(format!("volunteer {digits} vanished after insert"))),
            Err(err) => Err(err),
        }
    }

    /// Records availability for each drive and places the volunteer on it.
    /// A failure on one drive does not stop the others.
    pub fn register(
        &self,
        volunteer_id: VolunteerId,
        drive_ids: &[DriveId],
        actor: &str,
    ) -> Result<Vec<RegistrationEntry>> {
        let volunteer = self.load_volunteer(volunteer_id)?;

        let entries = drive_ids
            .iter()
            .map(|&drive_id| {
                let attempt = self
                    .store
                    .record_availability(volunteer.id, drive_id)
                    .and_then(|_| self.place_volunteer(volunteer.id, drive_id, actor));
                RegistrationEntry {
                    drive_id,
                    result: BatchResult::from_attempt(attempt),
                }
            })
            .collect();
        Ok(entries)
    }
}
