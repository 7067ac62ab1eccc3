mod slots_tests;

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::allocator::{AllocationPolicy, DutyAllocator, PlacementEvent, PlacementObserver};
use crate::core::models::{
    Assignment, Drive, DriveDutySlot, Duty, NewAssignment, SlotView, Volunteer,
};
use crate::core::store::{ClaimResult, MemoryStore, RosterStore, SeatClaim};
use crate::core::types::{Gender, GenderRestriction};

pub(super) const ACTOR: &str = "test";

#[derive(Default)]
pub(super) struct RecordingObserver {
    events: Mutex<Vec<PlacementEvent>>,
}

impl RecordingObserver {
    pub(super) fn events(&self) -> Vec<PlacementEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl PlacementObserver for RecordingObserver {
    fn notify(&self, event: &PlacementEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub(super) fn sample_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2099, 1, 1).unwrap()
}

/// Traffic is male-only, kitchen female-only, food open to everyone.
pub(super) fn policy() -> AllocationPolicy {
    AllocationPolicy {
        male_priority_order: vec!["traffic".into(), "food".into(), "kitchen".into()],
        female_priority_order: vec!["food".into(), "kitchen".into()],
        ..AllocationPolicy::default()
    }
}

pub(super) struct Harness {
    pub store: Arc<MemoryStore>,
    pub observer: Arc<RecordingObserver>,
    pub allocator: DutyAllocator<MemoryStore>,
}

pub(super) fn harness_with(policy: AllocationPolicy) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let observer = Arc::new(RecordingObserver::default());
    let allocator = DutyAllocator::new(Arc::clone(&store), policy).with_observer(observer.clone());
    Harness {
        store,
        observer,
        allocator,
    }
}

pub(super) fn harness() -> Harness {
    harness_with(policy())
}

/// The three standard duties: traffic, food, kitchen.
pub(super) fn standard_duties(store: &MemoryStore) -> (Duty, Duty, Duty) {
    (
        add_duty(store, "Traffic", "traffic", GenderRestriction::Male),
        add_duty(store, "Food", "food", GenderRestriction::None),
        add_duty(store, "Kitchen", "kitchen", GenderRestriction::Female),
    )
}

pub(super) fn add_duty(
    store: &MemoryStore,
    name: &str,
    slug: &str,
    restriction: GenderRestriction,
) -> Duty {
    store.add_duty(Duty::new(name, slug, restriction)).unwrap()
}

/// A drive `days` days after the sample date.
pub(super) fn add_drive(store: &MemoryStore, name: &str, days: u64, size: u32) -> Drive {
    let date = sample_date()
        .checked_add_days(chrono::Days::new(days))
        .unwrap();
    store.add_drive(Drive::new(name, date, size)).unwrap()
}

pub(super) fn add_slot(
    store: &MemoryStore,
    drive: &Drive,
    duty: &Duty,
    capacity: u32,
) -> DriveDutySlot {
    store
        .insert_slot(DriveDutySlot::new(drive.id, duty.id, capacity))
        .unwrap()
}

pub(super) fn add_volunteer(store: &MemoryStore, phone: &str, gender: Gender) -> Volunteer {
    store
        .insert_volunteer(Volunteer::new(phone, format!("vol-{phone}"), gender))
        .unwrap()
}

pub(super) fn view_for(store: &MemoryStore, drive: &Drive, duty: &Duty) -> SlotView {
    store
        .slot_views(drive.id)
        .unwrap()
        .into_iter()
        .find(|v| v.duty.id == duty.id)
        .unwrap()
}

/// Seats a volunteer directly, bypassing the allocator.
pub(super) fn seat(
    store: &MemoryStore,
    volunteer: &Volunteer,
    drive: &Drive,
    duty: &Duty,
) -> Assignment {
    let view = view_for(store, drive, duty);
    let claim = SeatClaim {
        observed_version: view.slot.version,
        assignment: NewAssignment {
            volunteer_id: volunteer.id,
            drive_id: drive.id,
            slot_id: view.slot.id,
            duty_id: duty.id,
            is_priority: false,
            actor: ACTOR.into(),
        },
    };
    match store.commit_placement(claim).unwrap() {
        ClaimResult::Committed(a) => a,
        other => panic!("expected a committed seat, got {other:?}"),
    }
}

pub(super) fn views(store: &MemoryStore, drive: &Drive) -> Vec<SlotView> {
    store.slot_views(drive.id).unwrap()
}

pub(super) fn placed_count(store: &MemoryStore, drive: &Drive, duty: &Duty) -> u32 {
    view_for(store, drive, duty).slot.placed_count
}
