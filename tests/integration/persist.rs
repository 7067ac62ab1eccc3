use std::fs;
use std::sync::Arc;

use dutyroster::core::models::PriorityEntry;
use dutyroster::core::persist::{RosterSnapshot, load_state};
use dutyroster::core::store::RosterStore;
use dutyroster::core::types::{AssignmentStatus, Gender, OverflowBehavior};
use dutyroster::errors::Error;

use crate::common::{ACTOR, allocator, make_temp_dir, seed_roster, write_state};

#[test]
fn saved_roster_resumes_where_it_stopped() {
    let dir = make_temp_dir("persist");
    let store = seed_roster(1);
    let engine = allocator(&store);
    for phone in ["1", "2", "3", "4"] {
        let v = engine.ensure_volunteer(phone, phone, Gender::Female).unwrap();
        engine.register(v.id, &[1], ACTOR).unwrap();
    }
    let path = write_state(&dir, &store);

    let loaded = Arc::new(load_state(&path).unwrap());
    let before = store.with_tables(RosterSnapshot::from_tables).unwrap();
    let after = loaded.with_tables(RosterSnapshot::from_tables).unwrap();
    assert_eq!(before, after);

    // The waitlist carries over and promotion still works on the loaded copy.
    let resumed = allocator(&loaded);
    resumed.cancel_assignment(1, 1, "moved away").unwrap();
    let promoted = resumed.promote_waitlist(1).unwrap();
    assert_eq!(promoted.len(), 1);
    assert_eq!(promoted[0].volunteer_id, 4);

    let late = resumed.ensure_volunteer("5", "5", Gender::Male).unwrap();
    assert_eq!(late.id, 5);
    let outcome = resumed.place_volunteer(late.id, 1, ACTOR).unwrap().unwrap();
    assert_eq!(outcome.status, AssignmentStatus::Placed);
    assert_eq!(outcome.duty_name, "Traffic");
}

#[test]
fn tampered_snapshot_is_rejected() {
    let dir = make_temp_dir("persist");
    let store = seed_roster(1);
    let engine = allocator(&store);
    let v = engine.ensure_volunteer("1", "a", Gender::Male).unwrap();
    engine.place_volunteer(v.id, 1, ACTOR).unwrap();
    let path = write_state(&dir, &store);

    let mut snapshot: RosterSnapshot =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    for slot in &mut snapshot.slots {
        slot.placed_count = 5;
    }
    fs::write(&path, serde_json::to_string_pretty(&snapshot).unwrap()).unwrap();

    match load_state(&path) {
        Err(Error::Storage(msg)) => assert!(msg.contains("holds")),
        Err(other) => panic!("expected a storage error, got {other:?}"),
        Ok(_) => panic!("inconsistent snapshot loaded"),
    }
}

#[test]
fn archived_displacements_survive_a_round_trip() {
    let dir = make_temp_dir("persist");
    let store = seed_roster(1);
    store
        .add_priority_entry(PriorityEntry::new(
            "9",
            "kitchen",
            OverflowBehavior::UnassignOne,
        ))
        .unwrap();
    let engine = allocator(&store);
    let regular = engine.ensure_volunteer("1", "a", Gender::Female).unwrap();
    engine.place_volunteer(regular.id, 1, ACTOR).unwrap();
    let filler = engine.ensure_volunteer("2", "b", Gender::Female).unwrap();
    engine.place_volunteer(filler.id, 1, ACTOR).unwrap();
    let third = engine.ensure_volunteer("3", "c", Gender::Female).unwrap();
    engine.place_volunteer(third.id, 1, ACTOR).unwrap();
    let vip = engine.ensure_volunteer("9", "vip", Gender::Female).unwrap();
    engine.place_volunteer(vip.id, 1, ACTOR).unwrap();
    assert_eq!(store.archived().unwrap().len(), 1);

    let loaded = load_state(&write_state(&dir, &store)).unwrap();
    let archived = loaded.archived().unwrap();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].status, AssignmentStatus::Cancelled);
    assert_eq!(archived[0].volunteer_id, third.id);
}
