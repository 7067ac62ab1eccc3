use crate::core::models::{CapacityRule, Duty};
use crate::core::store::RosterStore;
use crate::core::types::{Gender, GenderRestriction};
use crate::errors::Error;

use super::{ACTOR, add_drive, add_duty, add_volunteer, harness, view_for, views};

#[test]
fn materialize_sizes_slots_from_rules_once() {
    let h = harness();
    let food = add_duty(&h.store, "Food", "food", GenderRestriction::None);
    let traffic = add_duty(&h.store, "Traffic", "traffic", GenderRestriction::Male);
    let mut retired = Duty::new("Retired", "retired", GenderRestriction::None);
    retired.active = false;
    h.store.add_duty(retired).unwrap();
    h.store
        .add_capacity_rule(CapacityRule::linear(food.id, 1, 0.1))
        .unwrap();
    h.store
        .add_capacity_rule(CapacityRule::tier(traffic.id, 0, Some(99), 2))
        .unwrap();
    let drive = add_drive(&h.store, "d", 10, 40);

    let created = h.allocator.materialize_slots(drive.id).unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(view_for(&h.store, &drive, &food).slot.computed_capacity, 5);
    assert_eq!(view_for(&h.store, &drive, &traffic).slot.computed_capacity, 2);

    assert!(h.allocator.materialize_slots(drive.id).unwrap().is_empty());
    assert_eq!(views(&h.store, &drive).len(), 2);
}

#[test]
fn resize_recomputes_every_slot() {
    let h = harness();
    let food = add_duty(&h.store, "Food", "food", GenderRestriction::None);
    h.store
        .add_capacity_rule(CapacityRule::linear(food.id, 0, 0.5))
        .unwrap();
    let drive = add_drive(&h.store, "d", 10, 4);
    h.allocator.materialize_slots(drive.id).unwrap();
    assert_eq!(view_for(&h.store, &drive, &food).slot.effective_capacity(), 2);

    let resized = h.allocator.resize_drive(drive.id, 10).unwrap();
    assert_eq!(resized[0].slot.computed_capacity, 5);
    assert_eq!(h.store.drive(drive.id).unwrap().unwrap().size, 10);
}

#[test]
fn resize_below_placed_count_changes_nothing() {
    let h = harness();
    let food = add_duty(&h.store, "Food", "food", GenderRestriction::None);
    let kitchen = add_duty(&h.store, "Kitchen", "kitchen", GenderRestriction::Female);
    h.store
        .add_capacity_rule(CapacityRule::linear(kitchen.id, 0, 0.5))
        .unwrap();
    h.store
        .add_capacity_rule(CapacityRule::linear(food.id, 0, 0.5))
        .unwrap();
    let drive = add_drive(&h.store, "d", 10, 4);
    h.allocator.materialize_slots(drive.id).unwrap();
    for phone in ["1", "2"] {
        let v = add_volunteer(&h.store, phone, Gender::Female);
        h.allocator.place_volunteer(v.id, drive.id, ACTOR).unwrap();
    }
    let food_before = view_for(&h.store, &drive, &food).slot;
    assert_eq!(food_before.placed_count, 2);

    let err = h.allocator.resize_drive(drive.id, 2).unwrap_err();
    assert!(matches!(
        err,
        Error::CapacityBelowPlaced {
            capacity: 1,
            placed: 2,
            ..
        }
    ));
    assert_eq!(h.store.drive(drive.id).unwrap().unwrap().size, 4);
    assert_eq!(view_for(&h.store, &drive, &food).slot, food_before);
    assert_eq!(view_for(&h.store, &drive, &kitchen).slot.computed_capacity, 2);
}

#[test]
fn overridden_slot_is_exempt_from_resize_check() {
    let h = harness();
    let food = add_duty(&h.store, "Food", "food", GenderRestriction::None);
    h.store
        .add_capacity_rule(CapacityRule::linear(food.id, 0, 1.0))
        .unwrap();
    let drive = add_drive(&h.store, "d", 10, 2);
    h.allocator.materialize_slots(drive.id).unwrap();
    for phone in ["1", "2"] {
        let v = add_volunteer(&h.store, phone, Gender::Female);
        h.allocator.place_volunteer(v.id, drive.id, ACTOR).unwrap();
    }
    h.allocator.set_manual_override(drive.id, "food", Some(3)).unwrap();

    let resized = h.allocator.resize_drive(drive.id, 0).unwrap();
    assert_eq!(resized[0].slot.computed_capacity, 0);
    assert_eq!(resized[0].slot.effective_capacity(), 3);
}

#[test]
fn manual_override_validates_slug_and_placed_count() {
    let h = harness();
    let food = add_duty(&h.store, "Food", "food", GenderRestriction::None);
    h.store
        .add_capacity_rule(CapacityRule::tier(food.id, 0, None, 2))
        .unwrap();
    let drive = add_drive(&h.store, "d", 10, 2);
    h.allocator.materialize_slots(drive.id).unwrap();
    let v = add_volunteer(&h.store, "1", Gender::Male);
    h.allocator.place_volunteer(v.id, drive.id, ACTOR).unwrap();

    assert!(matches!(
        h.allocator.set_manual_override(drive.id, "Parking", Some(1)).unwrap_err(),
        Error::UnknownDuty(slug) if slug == "parking"
    ));
    assert!(matches!(
        h.allocator.set_manual_override(drive.id, "food", Some(0)).unwrap_err(),
        Error::CapacityBelowPlaced { .. }
    ));

    let pinned = h.allocator.set_manual_override(drive.id, " FOOD ", Some(7)).unwrap();
    assert_eq!(pinned.effective_capacity(), 7);
    let cleared = h.allocator.set_manual_override(drive.id, "food", None).unwrap();
    assert_eq!(cleared.effective_capacity(), 2);
}
