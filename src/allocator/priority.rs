use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::allocator::eligibility::{is_eligible, is_gender_eligible};
use crate::allocator::{DISPLACEMENT_REASON, DutyAllocator, PlacementEvent, PlacementOutcome};
use crate::core::aliases::{AssignmentId, SlotId, VolunteerId};
use crate::core::models::{Assignment, Drive, NewAssignment, PriorityEntry, SlotView, Volunteer};
use crate::core::store::{RosterStore, SeatSwap, SwapResult};
use crate::core::types::{AssignmentStatus, OverflowBehavior};
use crate::errors::Result;

/// Priority entries keyed by phone digits, loaded once per decision.
#[derive(Debug, Clone, Default)]
pub struct PriorityTable {
    entries: HashMap<String, PriorityEntry>,
}

impl PriorityTable {
    /// The first entry seen for a phone wins.
    pub fn new(entries: impl IntoIterator<Item = PriorityEntry>) -> Self {
        let mut map = HashMap::new();
        for entry in entries {
            map.entry(entry.phone.clone()).or_insert(entry);
        }
        Self { entries: map }
    }

    pub fn load(store: &impl RosterStore) -> Result<Self> {
        Ok(Self::new(store.priority_entries()?))
    }

    pub fn lookup(&self, phone: &str) -> Option<&PriorityEntry> {
        self.entries.get(phone)
    }

    /// Seat holders among `occupants` who have an entry themselves.
    /// Displacement never picks them, however they got their seat.
    pub fn entry_holders(
        &self,
        store: &impl RosterStore,
        occupants: &[Assignment],
    ) -> Result<HashSet<VolunteerId>> {
        let mut holders = HashSet::new();
        for a in occupants.iter().filter(|a| a.status.occupies_seat()) {
            if holders.contains(&a.volunteer_id) {
                continue;
            }
            if let Some(v) = store.volunteer(a.volunteer_id)? {
                if self.lookup(&v.phone).is_some() {
                    holders.insert(v.id);
                }
            }
        }
        Ok(holders)
    }
}

/// What happens to the volunteer whose seat is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VictimPlan {
    /// Run general placement again.
    Replace,
    /// Move into this slot, or its waitlist when it is full.
    ReassignTo { slot_id: SlotId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorityDecision {
    /// No entry, or the entry cannot apply to this drive.
    NotApplicable,
    PlaceDirect {
        slot_id: SlotId,
    },
    /// The forced duty is full and nobody can be displaced; compete normally.
    FallThrough,
    Displace {
        slot_id: SlotId,
        victim_id: AssignmentId,
        then: VictimPlan,
    },
}

pub struct OverflowContext<'a> {
    pub volunteer: &'a Volunteer,
    pub target: &'a SlotView,
    pub views: &'a [SlotView],
    /// Every assignment currently on the drive.
    pub occupants: &'a [Assignment],
    /// Volunteers who hold a priority entry and so cannot be displaced.
    pub protected: &'a HashSet<VolunteerId>,
}

pub trait OverflowHandler {
    fn on_full(&self, ctx: &OverflowContext<'_>) -> PriorityDecision;
}

pub struct AllowOverflow;
pub struct UnassignOne;
pub struct ReassignToDuty {
    target: Option<String>,
}

impl OverflowHandler for AllowOverflow {
    fn on_full(&self, _ctx: &OverflowContext<'_>) -> PriorityDecision {
        PriorityDecision::FallThrough
    }
}

impl OverflowHandler for UnassignOne {
    fn on_full(&self, ctx: &OverflowContext<'_>) -> PriorityDecision {
        match latest_default_placement(ctx) {
            Some(victim) => PriorityDecision::Displace {
                slot_id: ctx.target.slot.id,
                victim_id: victim.id,
                then: VictimPlan::Replace,
            },
            None => PriorityDecision::FallThrough,
        }
    }
}

impl OverflowHandler for ReassignToDuty {
    fn on_full(&self, ctx: &OverflowContext<'_>) -> PriorityDecision {
        let Some(slug) = self.target.as_deref() else {
            warn!(
                phone = %ctx.volunteer.phone,
                "reassign_to_duty entry has no reassignment target"
            );
            return PriorityDecision::NotApplicable;
        };
        let Some(reassign) = ctx.views.iter().find(|v| v.duty.slug == slug) else {
            warn!(
                duty = slug,
                drive_id = ctx.target.slot.drive_id,
                "reassignment duty is not staffed on this drive"
            );
            return PriorityDecision::NotApplicable;
        };
        match latest_default_placement(ctx) {
            Some(victim) => PriorityDecision::Displace {
                slot_id: ctx.target.slot.id,
                victim_id: victim.id,
                then: VictimPlan::ReassignTo {
                    slot_id: reassign.slot.id,
                },
            },
            None => PriorityDecision::FallThrough,
        }
    }
}

pub fn make_overflow_handler(entry: &PriorityEntry) -> Box<dyn OverflowHandler> {
    match entry.overflow_behavior {
        OverflowBehavior::AllowOverflow => Box::new(AllowOverflow),
        OverflowBehavior::UnassignOne => Box::new(UnassignOne),
        OverflowBehavior::ReassignToDuty => Box::new(ReassignToDuty {
            target: entry.reassign_target.clone(),
        }),
    }
}

/// The most recent seat holder in the target slot that has not yet arrived
/// and holds no priority entry.
fn latest_default_placement<'a>(ctx: &OverflowContext<'a>) -> Option<&'a Assignment> {
    let slot_id = ctx.target.slot.id;
    ctx.occupants
        .iter()
        .filter(|a| {
            a.slot_id == slot_id
                && !a.is_priority
                && !ctx.protected.contains(&a.volunteer_id)
                && matches!(a.status, AssignmentStatus::Placed | AssignmentStatus::Confirmed)
        })
        .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
}

/// Decides how a priority entry applies to a volunteer on one drive.
pub fn resolve_priority(
    table: &PriorityTable,
    volunteer: &Volunteer,
    views: &[SlotView],
    occupants: &[Assignment],
    protected: &HashSet<VolunteerId>,
) -> PriorityDecision {
    let Some(entry) = table.lookup(&volunteer.phone) else {
        return PriorityDecision::NotApplicable;
    };
    let Some(target) = views.iter().find(|v| v.duty.slug == entry.duty_slug) else {
        debug!(duty = %entry.duty_slug, "priority duty not staffed on this drive");
        return PriorityDecision::NotApplicable;
    };
    if !is_gender_eligible(volunteer, target) {
        warn!(
            volunteer_id = volunteer.id,
            duty = %entry.duty_slug,
            "priority duty does not admit the volunteer's gender, ignoring entry"
        );
        return PriorityDecision::NotApplicable;
    }
    if is_eligible(volunteer, target) {
        return PriorityDecision::PlaceDirect {
            slot_id: target.slot.id,
        };
    }
    let ctx = OverflowContext {
        volunteer,
        target,
        views,
        occupants,
        protected,
    };
    make_overflow_handler(entry).on_full(&ctx)
}

impl<S: RosterStore> DutyAllocator<S> {
    /// Applies the volunteer's priority entry, if any. `Ok(None)` hands the
    /// volunteer on to general placement.
    pub(crate) fn apply_priority(
        &self,
        table: &PriorityTable,
        volunteer: &Volunteer,
        drive: &Drive,
        actor: &str,
    ) -> Result<Option<PlacementOutcome>> {
        if table.lookup(&volunteer.phone).is_none() {
            return Ok(None);
        }

        for attempt in 0..=self.policy.placement_retry_limit {
            let views = self.store.slot_views(drive.id)?;
            let occupants = self.store.assignments_for_drive(drive.id)?;
            let protected = table.entry_holders(self.store.as_ref(), &occupants)?;
            let decision = resolve_priority(table, volunteer, &views, &occupants, &protected);
            debug!(volunteer_id = volunteer.id, ?decision, attempt, "priority decision");

            match decision {
                PriorityDecision::NotApplicable | PriorityDecision::FallThrough => {
                    return Ok(None);
                }
                PriorityDecision::PlaceDirect { slot_id } => {
                    let Some(view) = views.iter().find(|v| v.slot.id == slot_id) else {
                        continue;
                    };
                    if let Some(outcome) = self.claim_seat(volunteer, view, true, actor)? {
                        return Ok(Some(outcome));
                    }
                }
                PriorityDecision::Displace {
                    slot_id,
                    victim_id,
                    then,
                } => {
                    let Some(view) = views.iter().find(|v| v.slot.id == slot_id) else {
                        continue;
                    };
                    if let Some(outcome) =
                        self.displace(volunteer, view, victim_id, then, drive, actor)?
                    {
                        return Ok(Some(outcome));
                    }
                }
            }
        }

        warn!(
            volunteer_id = volunteer.id,
            "priority placement kept losing to concurrent writes, competing normally"
        );
        Ok(None)
    }

    fn displace(
        &self,
        volunteer: &Volunteer,
        view: &SlotView,
        victim_id: AssignmentId,
        then: VictimPlan,
        drive: &Drive,
        actor: &str,
    ) -> Result<Option<PlacementOutcome>> {
        let swap = SeatSwap {
            victim_id,
            observed_version: view.slot.version,
            reason: DISPLACEMENT_REASON.to_string(),
            assignment: NewAssignment {
                volunteer_id: volunteer.id,
                drive_id: drive.id,
                slot_id: view.slot.id,
                duty_id: view.duty.id,
                is_priority: true,
                actor: actor.to_string(),
            },
        };
        match self.store.swap_seat(swap)? {
            SwapResult::Swapped { placed, displaced } => {
                let outcome = PlacementOutcome::from_assignment(&placed, &view.duty.name);
                self.observer.notify(&PlacementEvent::Displaced {
                    displaced: displaced.clone(),
                    by: volunteer.id,
                });
                self.observer.notify(&PlacementEvent::Placed(outcome.clone()));

                if let Err(err) = self.reseat(&displaced, then, drive, actor) {
                    warn!(
                        volunteer_id = displaced.volunteer_id,
                        drive_id = drive.id,
                        error = %err,
                        "could not re-place displaced volunteer"
                    );
                }
                Ok(Some(outcome))
            }
            SwapResult::Duplicate(existing) => self.describe(&existing).map(Some),
            SwapResult::Conflict => Ok(None),
        }
    }

    fn reseat(
        &self,
        displaced: &Assignment,
        plan: VictimPlan,
        drive: &Drive,
        actor: &str,
    ) -> Result<Option<PlacementOutcome>> {
        let volunteer = self.load_volunteer(displaced.volunteer_id)?;
        match plan {
            VictimPlan::Replace => self.place_general(&volunteer, drive, actor),
            VictimPlan::ReassignTo { slot_id } => {
                self.place_into(&volunteer, drive, slot_id, actor)
            }
        }
    }

    /// Seats the volunteer in `slot_id`, waitlisting against it when full.
    /// Falls back to general placement if the slot does not admit them.
    fn place_into(
        &self,
        volunteer: &Volunteer,
        drive: &Drive,
        slot_id: SlotId,
        actor: &str,
    ) -> Result<Option<PlacementOutcome>> {
        for _ in 0..=self.policy.placement_retry_limit {
            let views = self.store.slot_views(drive.id)?;
            let Some(view) = views
                .iter()
                .find(|v| v.slot.id == slot_id && is_gender_eligible(volunteer, v))
            else {
                return self.place_general(volunteer, drive, actor);
            };
            if !view.slot.has_room() {
                return self.enqueue(volunteer, view, actor);
            }
            if let Some(outcome) = self.claim_seat(volunteer, view, false, actor)? {
                return Ok(Some(outcome));
            }
        }

        let views = self.store.slot_views(drive.id)?;
        match views.iter().find(|v| v.slot.id == slot_id) {
            Some(view) => self.enqueue(volunteer, view, actor),
            None => self.place_general(volunteer, drive, actor),
        }
    }
}
