use dutyroster::allocator::BatchResult;
use dutyroster::core::models::PriorityEntry;
use dutyroster::core::store::RosterStore;
use dutyroster::core::types::{AssignmentStatus, Gender, OverflowBehavior};

use crate::common::{ACTOR, allocator, seed_roster};

fn duty_of(result: &BatchResult) -> (&str, AssignmentStatus) {
    match result {
        BatchResult::Assigned(outcome) => (outcome.duty_name.as_str(), outcome.status),
        other => panic!("expected an assignment, got {other:?}"),
    }
}

#[test]
fn materialized_slots_follow_capacity_rules() {
    let store = seed_roster(1);
    let caps: Vec<_> = store
        .slot_views(1)
        .unwrap()
        .into_iter()
        .map(|v| (v.duty.slug, v.slot.computed_capacity))
        .collect();
    assert_eq!(
        caps,
        vec![
            ("traffic".to_string(), 2),
            ("food".to_string(), 2),
            ("kitchen".to_string(), 1)
        ]
    );

    let engine = allocator(&store);
    assert!(engine.materialize_slots(1).unwrap().is_empty());
    let resized = engine.resize_drive(1, 60).unwrap();
    let food = resized.iter().find(|v| v.duty.slug == "food").unwrap();
    assert_eq!(food.slot.computed_capacity, 4);
}

#[test]
fn registration_day_fills_duties_then_waitlist() {
    let store = seed_roster(1);
    let engine = allocator(&store);

    let mut results = Vec::new();
    for (phone, gender) in [
        ("555-0001", Gender::Male),
        ("555-0002", Gender::Female),
        ("555-0003", Gender::Female),
        ("555-0004", Gender::Female),
        ("555-0005", Gender::Female),
    ] {
        let volunteer = engine
            .ensure_volunteer(phone, &format!("vol {phone}"), gender)
            .unwrap();
        let entries = engine.register(volunteer.id, &[1], ACTOR).unwrap();
        results.push(entries[0].result.clone());
    }

    let duties: Vec<_> = results.iter().map(duty_of).collect();
    assert_eq!(
        duties,
        vec![
            ("Traffic", AssignmentStatus::Placed),
            ("Food", AssignmentStatus::Placed),
            ("Food", AssignmentStatus::Placed),
            ("Kitchen", AssignmentStatus::Placed),
            ("Food", AssignmentStatus::Waitlisted),
        ]
    );

    // Registering twice changes nothing.
    let again = engine
        .ensure_volunteer("5550001", "someone else", Gender::Male)
        .unwrap();
    assert_eq!(again.id, 1);
    let entries = engine.register(again.id, &[1], ACTOR).unwrap();
    assert_eq!(duty_of(&entries[0].result), ("Traffic", AssignmentStatus::Placed));
    assert_eq!(store.availability(1).unwrap().len(), 5);
}

#[test]
fn cancellation_frees_a_seat_for_the_waitlist() {
    let store = seed_roster(1);
    let engine = allocator(&store);
    let ids: Vec<_> = ["1", "2", "3"]
        .iter()
        .map(|p| {
            let v = engine.ensure_volunteer(p, p, Gender::Female).unwrap();
            engine.register(v.id, &[1], ACTOR).unwrap();
            v.id
        })
        .collect();
    let late = engine.ensure_volunteer("4", "4", Gender::Female).unwrap();
    engine.register(late.id, &[1], ACTOR).unwrap();
    assert_eq!(store.waitlist(1).unwrap().len(), 1);

    engine.cancel_assignment(ids[0], 1, "cannot make it").unwrap();
    let reports = engine.sweep().unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].promoted.len(), 1);
    assert_eq!(reports[0].promoted[0].volunteer_id, late.id);
    assert_eq!(reports[0].promoted[0].duty_name, "Food");
    assert!(store.waitlist(1).unwrap().is_empty());
}

#[test]
fn returning_volunteer_keeps_their_usual_duty() {
    let store = seed_roster(2);
    let engine = allocator(&store);
    engine.set_manual_override(1, "traffic", Some(1)).unwrap();
    let first = engine.ensure_volunteer("900", "first", Gender::Male).unwrap();
    engine.place_volunteer(first.id, 1, ACTOR).unwrap();

    // Traffic is full on the first drive, so the regular starts on food.
    let regular = engine.ensure_volunteer("901", "regular", Gender::Male).unwrap();
    let food = engine.place_volunteer(regular.id, 1, ACTOR).unwrap().unwrap();
    assert_eq!(food.duty_name, "Food");

    let next = engine.place_volunteer(regular.id, 2, ACTOR).unwrap().unwrap();
    assert_eq!(next.duty_name, "Food");
    let newcomer = engine.ensure_volunteer("902", "newcomer", Gender::Male).unwrap();
    let fresh = engine.place_volunteer(newcomer.id, 2, ACTOR).unwrap().unwrap();
    assert_eq!(fresh.duty_name, "Traffic");
}

#[test]
fn priority_volunteer_displaces_latest_default_placement() {
    let store = seed_roster(1);
    let engine = allocator(&store);
    let a = engine.ensure_volunteer("1", "a", Gender::Female).unwrap();
    let b = engine.ensure_volunteer("2", "b", Gender::Female).unwrap();
    engine.place_volunteer(a.id, 1, ACTOR).unwrap();
    engine.place_volunteer(b.id, 1, ACTOR).unwrap();

    store
        .add_priority_entry(PriorityEntry::new(
            "3",
            "food",
            OverflowBehavior::UnassignOne,
        ))
        .unwrap();
    let vip = engine.ensure_volunteer("3", "vip", Gender::Male).unwrap();
    let placed = engine.place_volunteer(vip.id, 1, ACTOR).unwrap().unwrap();

    assert_eq!(placed.duty_name, "Food");
    assert!(store.assignment(placed.assignment_id).unwrap().unwrap().is_priority);
    let moved = store.assignment_for(b.id, 1).unwrap().unwrap();
    assert_eq!(moved.status, AssignmentStatus::Placed);
    let kitchen = store
        .slot_views(1)
        .unwrap()
        .into_iter()
        .find(|v| v.duty.slug == "kitchen")
        .unwrap();
    assert_eq!(moved.slot_id, kitchen.slot.id);
    assert_eq!(store.archived().unwrap().len(), 1);
}
