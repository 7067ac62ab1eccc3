use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::core::aliases::{AssignmentId, DriveId, DutyId, SlotId, VolunteerId};
use crate::core::models::{
    Assignment, Availability, CapacityRule, Drive, DriveDutySlot, Duty, NewAssignment,
    PriorityEntry, SlotView, Volunteer,
};
use crate::core::repository::{Repository, Sort};
use crate::core::types::{AssignmentStatus, DriveStatus};
use crate::errors::{Error, Result};
use crate::extensions::string::ToPhoneDigits;

/// Request to take one seat in a slot, valid only while the slot still has
/// the version the caller decided against.
#[derive(Debug, Clone)]
pub struct SeatClaim {
    pub observed_version: u64,
    pub assignment: NewAssignment,
}

/// Request to hand an occupied seat from `victim_id` to a priority volunteer.
#[derive(Debug, Clone)]
pub struct SeatSwap {
    pub victim_id: AssignmentId,
    pub observed_version: u64,
    pub reason: String,
    pub assignment: NewAssignment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimResult {
    Committed(Assignment),
    /// The slot changed (or filled) since it was read; decide again.
    Conflict,
    /// The volunteer already holds an assignment for this drive.
    Duplicate(Assignment),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapResult {
    Swapped {
        placed: Assignment,
        displaced: Assignment,
    },
    Conflict,
    Duplicate(Assignment),
}

/// Storage seam for the allocator. Every write is one atomic unit.
pub trait RosterStore: Send + Sync {
    fn volunteer(&self, id: VolunteerId) -> Result<Option<Volunteer>>;
    fn volunteer_by_phone(&self, phone: &str) -> Result<Option<Volunteer>>;
    fn insert_volunteer(&self, volunteer: Volunteer) -> Result<Volunteer>;
    fn drive(&self, id: DriveId) -> Result<Option<Drive>>;
    fn duties(&self) -> Result<Vec<Duty>>;
    fn capacity_rules(&self, duty_id: DutyId) -> Result<Vec<CapacityRule>>;
    fn priority_entries(&self) -> Result<Vec<PriorityEntry>>;

    /// Slots of a drive joined with their duties, in slot id order.
    fn slot_views(&self, drive_id: DriveId) -> Result<Vec<SlotView>>;
    fn insert_slot(&self, slot: DriveDutySlot) -> Result<DriveDutySlot>;
    /// Sets the drive size and the recomputed capacities together, or nothing.
    fn resize_drive(
        &self,
        drive_id: DriveId,
        size: u32,
        capacities: &[(SlotId, u32)],
    ) -> Result<()>;
    fn set_manual_override(&self, slot_id: SlotId, value: Option<u32>) -> Result<DriveDutySlot>;

    fn assignment(&self, id: AssignmentId) -> Result<Option<Assignment>>;
    fn assignment_for(
        &self,
        volunteer_id: VolunteerId,
        drive_id: DriveId,
    ) -> Result<Option<Assignment>>;
    /// Every assignment of a volunteer with its drive, oldest first.
    fn volunteer_history(&self, volunteer_id: VolunteerId) -> Result<Vec<(Assignment, Drive)>>;
    fn assignments_for_drive(&self, drive_id: DriveId) -> Result<Vec<Assignment>>;
    /// Waitlisted assignments of a drive by ascending queue position.
    fn waitlist(&self, drive_id: DriveId) -> Result<Vec<Assignment>>;
    fn drives_with_waitlist(&self) -> Result<Vec<DriveId>>;

    /// Availability rows of a drive, earliest registration first.
    fn availability(&self, drive_id: DriveId) -> Result<Vec<Availability>>;
    fn record_availability(
        &self,
        volunteer_id: VolunteerId,
        drive_id: DriveId,
    ) -> Result<Availability>;

    fn commit_placement(&self, claim: SeatClaim) -> Result<ClaimResult>;
    fn enqueue_waitlisted(&self, assignment: NewAssignment) -> Result<ClaimResult>;
    fn swap_seat(&self, swap: SeatSwap) -> Result<SwapResult>;
    fn update_status(
        &self,
        assignment_id: AssignmentId,
        status: AssignmentStatus,
        reason: Option<String>,
    ) -> Result<Assignment>;
    fn delete_waitlisted(&self, assignment_id: AssignmentId) -> Result<Assignment>;
    fn restore_assignment(&self, assignment: Assignment) -> Result<()>;
    /// Renumbers a drive's waitlist to 1..=n keeping its order.
    fn compact_waitlist(&self, drive_id: DriveId) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub volunteers: Repository<Volunteer>,
    pub drives: Repository<Drive>,
    pub duties: Repository<Duty>,
    pub capacity_rules: Repository<CapacityRule>,
    pub slots: Repository<DriveDutySlot>,
    pub assignments: Repository<Assignment>,
    pub availability: Repository<Availability>,
    pub priority_entries: Repository<PriorityEntry>,
    /// Rows removed by priority displacement, kept for audit.
    pub archived: Vec<Assignment>,
}

impl Tables {
    fn assignment_for(&self, volunteer_id: VolunteerId, drive_id: DriveId) -> Option<&Assignment> {
        self.assignments
            .query()
            .r#where(move |a| a.volunteer_id == volunteer_id && a.drive_id == drive_id)
            .first()
    }

    fn next_queue_position(&self, drive_id: DriveId) -> u32 {
        self.assignments
            .query()
            .r#where(move |a| a.drive_id == drive_id && a.status == AssignmentStatus::Waitlisted)
            .collect()
            .iter()
            .filter_map(|a| a.queue_position)
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Tables) -> Self {
        Self {
            tables: RwLock::new(tables),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| Error::storage("roster tables lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| Error::storage("roster tables lock poisoned"))
    }

    /// Runs `f` against a consistent view of every table.
    pub fn with_tables<R>(&self, f: impl FnOnce(&Tables) -> R) -> Result<R> {
        let tables = self.read()?;
        Ok(f(&tables))
    }

    pub fn add_drive(&self, drive: Drive) -> Result<Drive> {
        Ok(self.write()?.drives.insert(drive).clone())
    }

    pub fn add_duty(&self, duty: Duty) -> Result<Duty> {
        let mut tables = self.write()?;
        let slug = duty.slug.clone();
        if tables.duties.query().r#where(move |d| d.slug == slug).exists() {
            return Err(Error::Duplicate(format!("Duty '{}'", duty.slug)));
        }
        Ok(tables.duties.insert(duty).clone())
    }

    pub fn add_capacity_rule(&self, rule: CapacityRule) -> Result<CapacityRule> {
        let mut tables = self.write()?;
        tables.duties.get(rule.duty_id)?;
        Ok(tables.capacity_rules.insert(rule).clone())
    }

    pub fn add_priority_entry(&self, entry: PriorityEntry) -> Result<PriorityEntry> {
        Ok(self.write()?.priority_entries.insert(entry).clone())
    }

    pub fn set_drive_status(&self, drive_id: DriveId, status: DriveStatus) -> Result<()> {
        self.write()?.drives.get_mut(drive_id)?.status = status;
        Ok(())
    }

    pub fn archived(&self) -> Result<Vec<Assignment>> {
        Ok(self.read()?.archived.clone())
    }
}

impl RosterStore for MemoryStore {
    fn volunteer(&self, id: VolunteerId) -> Result<Option<Volunteer>> {
        Ok(self.read()?.volunteers.find(id).cloned())
    }

    fn volunteer_by_phone(&self, phone: &str) -> Result<Option<Volunteer>> {
        let digits = phone.to_phone_digits();
        let tables = self.read()?;
        Ok(tables
            .volunteers
            .query()
            .r#where(move |v| v.phone == digits)
            .first()
            .cloned())
    }

    fn insert_volunteer(&self, volunteer: Volunteer) -> Result<Volunteer> {
        let mut tables = self.write()?;
        let phone = volunteer.phone.clone();
        if tables.volunteers.query().r#where(move |v| v.phone == phone).exists() {
            return Err(Error::Duplicate(format!(
                "Volunteer with phone {}",
                volunteer.phone
            )));
        }
        Ok(tables.volunteers.insert(volunteer).clone())
    }

    fn drive(&self, id: DriveId) -> Result<Option<Drive>> {
        Ok(self.read()?.drives.find(id).cloned())
    }

    fn duties(&self) -> Result<Vec<Duty>> {
        Ok(self
            .read()?
            .duties
            .values(Sort::IdAsc)
            .into_iter()
            .cloned()
            .collect())
    }

    fn capacity_rules(&self, duty_id: DutyId) -> Result<Vec<CapacityRule>> {
        let tables = self.read()?;
        Ok(tables
            .capacity_rules
            .query()
            .r#where(move |r| r.duty_id == duty_id)
            .collect()
            .into_iter()
            .cloned()
            .collect())
    }

    fn priority_entries(&self) -> Result<Vec<PriorityEntry>> {
        Ok(self
            .read()?
            .priority_entries
            .values(Sort::IdAsc)
            .into_iter()
            .cloned()
            .collect())
    }

    fn slot_views(&self, drive_id: DriveId) -> Result<Vec<SlotView>> {
        let tables = self.read()?;
        tables
            .slots
            .query()
            .r#where(move |s| s.drive_id == drive_id)
            .collect()
            .into_iter()
            .map(|slot| {
                let duty = tables.duties.get(slot.duty_id)?;
                Ok(SlotView {
                    slot: slot.clone(),
                    duty: duty.clone(),
                })
            })
            .collect()
    }

    fn insert_slot(&self, slot: DriveDutySlot) -> Result<DriveDutySlot> {
        let mut tables = self.write()?;
        tables.drives.get(slot.drive_id)?;
        tables.duties.get(slot.duty_id)?;
        let (drive_id, duty_id) = (slot.drive_id, slot.duty_id);
        if tables
            .slots
            .query()
            .r#where(move |s| s.drive_id == drive_id && s.duty_id == duty_id)
            .exists()
        {
            return Err(Error::Duplicate(format!(
                "Slot for duty {duty_id} on drive {drive_id}"
            )));
        }
        Ok(tables.slots.insert(slot).clone())
    }

    fn resize_drive(
        &self,
        drive_id: DriveId,
        size: u32,
        capacities: &[(SlotId, u32)],
    ) -> Result<()> {
        let mut tables = self.write()?;
        tables.drives.get(drive_id)?;

        for &(slot_id, capacity) in capacities {
            let slot = tables.slots.get(slot_id)?;
            if slot.manual_override.is_none() && capacity < slot.placed_count {
                return Err(Error::CapacityBelowPlaced {
                    slot_id,
                    capacity,
                    placed: slot.placed_count,
                });
            }
        }

        tables.drives.get_mut(drive_id)?.size = size;
        for &(slot_id, capacity) in capacities {
            let slot = tables.slots.get_mut(slot_id)?;
            if slot.computed_capacity != capacity {
                slot.computed_capacity = capacity;
                slot.version += 1;
            }
        }
        Ok(())
    }

    fn set_manual_override(&self, slot_id: SlotId, value: Option<u32>) -> Result<DriveDutySlot> {
        let mut tables = self.write()?;
        let slot = tables.slots.get_mut(slot_id)?;
        let capacity = value.unwrap_or(slot.computed_capacity);
        if capacity < slot.placed_count {
            return Err(Error::CapacityBelowPlaced {
                slot_id,
                capacity,
                placed: slot.placed_count,
            });
        }
        slot.manual_override = value;
        slot.version += 1;
        Ok(slot.clone())
    }

    fn assignment(&self, id: AssignmentId) -> Result<Option<Assignment>> {
        Ok(self.read()?.assignments.find(id).cloned())
    }

    fn assignment_for(
        &self,
        volunteer_id: VolunteerId,
        drive_id: DriveId,
    ) -> Result<Option<Assignment>> {
        Ok(self.read()?.assignment_for(volunteer_id, drive_id).cloned())
    }

    fn volunteer_history(&self, volunteer_id: VolunteerId) -> Result<Vec<(Assignment, Drive)>> {
        let tables = self.read()?;
        Ok(tables
            .assignments
            .query()
            .r#where(move |a| a.volunteer_id == volunteer_id)
            .order_with(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .collect()
            .into_iter()
            .filter_map(|a| {
                tables
                    .drives
                    .find(a.drive_id)
                    .map(|d| (a.clone(), d.clone()))
            })
            .collect())
    }

    fn assignments_for_drive(&self, drive_id: DriveId) -> Result<Vec<Assignment>> {
        let tables = self.read()?;
        Ok(tables
            .assignments
            .query()
            .r#where(move |a| a.drive_id == drive_id)
            .collect()
            .into_iter()
            .cloned()
            .collect())
    }

    fn waitlist(&self, drive_id: DriveId) -> Result<Vec<Assignment>> {
        let tables = self.read()?;
        Ok(tables
            .assignments
            .query()
            .r#where(move |a| a.drive_id == drive_id && a.status == AssignmentStatus::Waitlisted)
            .order_with(|a, b| a.queue_position.cmp(&b.queue_position))
            .collect()
            .into_iter()
            .cloned()
            .collect())
    }

    fn drives_with_waitlist(&self) -> Result<Vec<DriveId>> {
        let tables = self.read()?;
        let ids: BTreeSet<DriveId> = tables
            .assignments
            .query()
            .r#where(|a| a.status == AssignmentStatus::Waitlisted)
            .collect()
            .into_iter()
            .map(|a| a.drive_id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    fn availability(&self, drive_id: DriveId) -> Result<Vec<Availability>> {
        let tables = self.read()?;
        Ok(tables
            .availability
            .query()
            .r#where(move |a| a.drive_id == drive_id)
            .order_with(|a, b| {
                a.registered_at
                    .cmp(&b.registered_at)
                    .then(a.id.cmp(&b.id))
            })
            .collect()
            .into_iter()
            .cloned()
            .collect())
    }

    fn record_availability(
        &self,
        volunteer_id: VolunteerId,
        drive_id: DriveId,
    ) -> Result<Availability> {
        let mut tables = self.write()?;
        tables.volunteers.get(volunteer_id)?;
        tables.drives.get(drive_id)?;
        if let Some(existing) = tables
            .availability
            .query()
            .r#where(move |a| a.volunteer_id == volunteer_id && a.drive_id == drive_id)
            .first()
        {
            return Ok(existing.clone());
        }
        Ok(tables
            .availability
            .insert(Availability {
                id: 0,
                volunteer_id,
                drive_id,
                registered_at: Utc::now(),
            })
            .clone())
    }

    fn commit_placement(&self, claim: SeatClaim) -> Result<ClaimResult> {
        let mut guard = self.write()?;
        let tables = &mut *guard;
        let new = claim.assignment;

        if let Some(existing) = tables.assignment_for(new.volunteer_id, new.drive_id) {
            return Ok(ClaimResult::Duplicate(existing.clone()));
        }

        let slot = tables.slots.get_mut(new.slot_id)?;
        if slot.version != claim.observed_version || !slot.has_room() {
            return Ok(ClaimResult::Conflict);
        }
        slot.placed_count += 1;
        slot.version += 1;

        let stored = tables
            .assignments
            .insert(Assignment::from_new(new, AssignmentStatus::Placed))
            .clone();
        Ok(ClaimResult::Committed(stored))
    }

    fn enqueue_waitlisted(&self, new: NewAssignment) -> Result<ClaimResult> {
        let mut guard = self.write()?;
        let tables = &mut *guard;

        if let Some(existing) = tables.assignment_for(new.volunteer_id, new.drive_id) {
            return Ok(ClaimResult::Duplicate(existing.clone()));
        }
        tables.slots.get(new.slot_id)?;

        let position = tables.next_queue_position(new.drive_id);
        let mut assignment = Assignment::from_new(new, AssignmentStatus::Waitlisted);
        assignment.queue_position = Some(position);
        Ok(ClaimResult::Committed(
            tables.assignments.insert(assignment).clone(),
        ))
    }

    fn swap_seat(&self, swap: SeatSwap) -> Result<SwapResult> {
        let mut guard = self.write()?;
        let tables = &mut *guard;
        let new = swap.assignment;

        if let Some(existing) = tables.assignment_for(new.volunteer_id, new.drive_id) {
            return Ok(SwapResult::Duplicate(existing.clone()));
        }

        let victim = tables.assignments.get(swap.victim_id)?;
        if victim.slot_id != new.slot_id || !victim.status.occupies_seat() || victim.is_priority {
            return Ok(SwapResult::Conflict);
        }

        let slot = tables.slots.get_mut(new.slot_id)?;
        if slot.version != swap.observed_version {
            return Ok(SwapResult::Conflict);
        }
        // One seat changes hands; the count stays put.
        slot.version += 1;

        let mut displaced = tables.assignments.delete(swap.victim_id)?;
        displaced.status = AssignmentStatus::Cancelled;
        displaced.cancel_reason = Some(swap.reason);
        tables.archived.push(displaced.clone());

        let mut placed = Assignment::from_new(new, AssignmentStatus::Placed);
        placed.is_priority = true;
        let placed = tables.assignments.insert(placed).clone();
        Ok(SwapResult::Swapped { placed, displaced })
    }

    fn update_status(
        &self,
        assignment_id: AssignmentId,
        status: AssignmentStatus,
        reason: Option<String>,
    ) -> Result<Assignment> {
        let mut guard = self.write()?;
        let tables = &mut *guard;

        let assignment = tables.assignments.get_mut(assignment_id)?;
        let from = assignment.status;
        if !from.can_transition_to(status) {
            return Err(Error::InvalidTransition { from, to: status });
        }

        assignment.status = status;
        if status != AssignmentStatus::Waitlisted {
            assignment.queue_position = None;
        }
        if matches!(status, AssignmentStatus::Cancelled | AssignmentStatus::NoShow) {
            assignment.cancel_reason = reason;
        }
        let updated = assignment.clone();

        if from.occupies_seat() && !status.occupies_seat() {
            let slot = tables.slots.get_mut(updated.slot_id)?;
            slot.placed_count = slot.placed_count.saturating_sub(1);
            slot.version += 1;
        }
        if status == AssignmentStatus::Completed {
            tables.volunteers.get_mut(updated.volunteer_id)?.completed_drives += 1;
        }
        Ok(updated)
    }

    fn delete_waitlisted(&self, assignment_id: AssignmentId) -> Result<Assignment> {
        let mut tables = self.write()?;
        let assignment = tables.assignments.get(assignment_id)?;
        if assignment.status != AssignmentStatus::Waitlisted {
            return Err(Error::NotFound {
                entity: "Waitlisted assignment",
                id: assignment_id,
            });
        }
        tables.assignments.delete(assignment_id)
    }

    fn restore_assignment(&self, assignment: Assignment) -> Result<()> {
        let mut tables = self.write()?;
        if tables
            .assignment_for(assignment.volunteer_id, assignment.drive_id)
            .is_some()
        {
            return Err(Error::Duplicate(format!(
                "Assignment for volunteer {} on drive {}",
                assignment.volunteer_id, assignment.drive_id
            )));
        }
        if assignment.status.occupies_seat() {
            let slot = tables.slots.get_mut(assignment.slot_id)?;
            if !slot.has_room() {
                return Err(Error::CapacityBelowPlaced {
                    slot_id: slot.id,
                    capacity: slot.effective_capacity(),
                    placed: slot.placed_count + 1,
                });
            }
            slot.placed_count += 1;
            slot.version += 1;
        }
        tables.assignments.insert_with_id(assignment)
    }

    fn compact_waitlist(&self, drive_id: DriveId) -> Result<()> {
        let mut tables = self.write()?;
        let mut next = 1u32;
        tables
            .assignments
            .query_mut()
            .r#where(move |a| a.drive_id == drive_id && a.status == AssignmentStatus::Waitlisted)
            .order_with(|a, b| a.queue_position.cmp(&b.queue_position))
            .for_each_mut(|a| {
                a.queue_position = Some(next);
                next += 1;
            });
        Ok(())
    }
}
