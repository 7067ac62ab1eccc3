use crate::core::models::{SlotView, Volunteer};

pub fn is_gender_eligible(volunteer: &Volunteer, view: &SlotView) -> bool {
    view.duty.gender_restriction.admits(volunteer.gender)
}

/// A seat is free and the duty admits the volunteer's gender.
pub fn is_eligible(volunteer: &Volunteer, view: &SlotView) -> bool {
    view.slot.has_room() && is_gender_eligible(volunteer, view)
}

pub fn has_spare_capacity(views: &[SlotView]) -> bool {
    views.iter().any(|v| v.slot.has_room())
}
