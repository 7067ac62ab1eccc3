use crate::core::models::{CapacityMode, CapacityRule};

/// Absorbs float noise such as `0.1 * 30 = 3.0000000000000004` before rounding up.
const CEIL_TOLERANCE: f64 = 1e-9;

/// Capacity of a duty at the given drive size.
///
/// A linear rule wins whenever one exists (the lowest id if several were
/// configured). Otherwise tiered bands are scanned by ascending `min_size` and
/// the first band containing `size` applies; no band means no seats.
pub fn resolve_capacity(rules: &[CapacityRule], size: u32) -> u32 {
    let linear = rules
        .iter()
        .filter_map(|r| match r.mode {
            CapacityMode::Linear { base, per_unit } => Some((r.id, base, per_unit)),
            CapacityMode::Tiered { .. } => None,
        })
        .min_by_key(|(id, _, _)| *id);
    if let Some((_, base, per_unit)) = linear {
        return linear_capacity(base, per_unit, size);
    }

    let mut tiers: Vec<(u32, Option<u32>, u32, i32)> = rules
        .iter()
        .filter_map(|r| match r.mode {
            CapacityMode::Tiered {
                min_size,
                max_size,
                capacity,
            } => Some((min_size, max_size, capacity, r.id)),
            CapacityMode::Linear { .. } => None,
        })
        .collect();
    tiers.sort_by_key(|(min, _, _, id)| (*min, *id));

    tiers
        .into_iter()
        .find(|(min, max, _, _)| *min <= size && max.is_none_or(|max| size <= max))
        .map(|(_, _, capacity, _)| capacity)
        .unwrap_or(0)
}

fn linear_capacity(base: Option<i32>, per_unit: Option<f64>, size: u32) -> u32 {
    let base = u64::from(base.unwrap_or(0).max(0).unsigned_abs());
    let per_unit = per_unit
        .filter(|p| p.is_finite() && *p > 0.0)
        .unwrap_or(0.0);
    let scaled = (per_unit * f64::from(size) - CEIL_TOLERANCE).ceil().max(0.0);
    let scaled = if scaled >= f64::from(u32::MAX) {
        u64::from(u32::MAX)
    } else {
        scaled as u64
    };
    u32::try_from(base + scaled).unwrap_or(u32::MAX)
}
