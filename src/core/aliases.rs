pub type VolunteerId = i32;
pub type DriveId = i32;
pub type DutyId = i32;
pub type SlotId = i32;
pub type AssignmentId = i32;
pub type SeasonId = i32;
/// Duty slugs in fallback priority order.
pub type SlugList = Vec<String>;
