use std::collections::HashSet;

use tracing::info;

use crate::allocator::DutyAllocator;
use crate::allocator::capacity::resolve_capacity;
use crate::core::aliases::{DriveId, DutyId};
use crate::core::models::{DriveDutySlot, SlotView};
use crate::core::store::RosterStore;
use crate::errors::{Error, Result};

impl<S: RosterStore> DutyAllocator<S> {
    /// Creates a slot for every active duty the drive does not staff yet,
    /// sized from the duty's capacity rules. Returns the new slots.
    pub fn materialize_slots(&self, drive_id: DriveId) -> Result<Vec<DriveDutySlot>> {
        let drive = self.load_drive(drive_id)?;
        let staffed: HashSet<DutyId> = self
            .store
            .slot_views(drive.id)?
            .into_iter()
            .map(|v| v.duty.id)
            .collect();

        let mut created = Vec::new();
        for duty in self.store.duties()? {
            if !duty.active || staffed.contains(&duty.id) {
                continue;
            }
            let capacity = resolve_capacity(&self.store.capacity_rules(duty.id)?, drive.size);
            let slot = self
                .store
                .insert_slot(DriveDutySlot::new(drive.id, duty.id, capacity))?;
            info!(drive_id, duty = %duty.slug, capacity, "slot created");
            created.push(slot);
        }
        Ok(created)
    }

    /// Changes the drive size and recomputes every slot's capacity. Nothing
    /// changes if any slot without an override would drop below its placed count.
    pub fn resize_drive(&self, drive_id: DriveId, size: u32) -> Result<Vec<SlotView>> {
        let drive = self.load_drive(drive_id)?;
        let views = self.store.slot_views(drive.id)?;
        let capacities = views
            .iter()
            .map(|v| {
                let rules = self.store.capacity_rules(v.duty.id)?;
                Ok((v.slot.id, resolve_capacity(&rules, size)))
            })
            .collect::<Result<Vec<_>>>()?;

        self.store.resize_drive(drive.id, size, &capacities)?;
        info!(drive_id, from = drive.size, to = size, "drive resized");
        self.store.slot_views(drive.id)
    }

    /// Pins (or with `None`, releases) a slot's capacity by duty slug.
    pub fn set_manual_override(
        &self,
        drive_id: DriveId,
        duty_slug: &str,
        value: Option<u32>,
    ) -> Result<DriveDutySlot> {
        let drive = self.load_drive(drive_id)?;
        let slug = duty_slug.trim().to_ascii_lowercase();
        let view = self
            .store
            .slot_views(drive.id)?
            .into_iter()
            .find(|v| v.duty.slug == slug)
            .ok_or_else(|| Error::UnknownDuty(slug.clone()))?;

        let slot = self.store.set_manual_override(view.slot.id, value)?;
        info!(drive_id, duty = %slug, ?value, "manual override set");
        Ok(slot)
    }
}
