use std::collections::{HashMap, HashSet};

use crate::core::aliases::{DriveId, DutyId};
use crate::core::models::{Assignment, Drive};
use crate::core::types::HistoryLookback;

/// Duties from a volunteer's history (oldest first) that count toward
/// preference for `target` under the given lookback.
pub fn history_window(
    records: &[(Assignment, Drive)],
    target: &Drive,
    lookback: HistoryLookback,
) -> Vec<DutyId> {
    let counted: Vec<&(Assignment, Drive)> = records
        .iter()
        .filter(|(a, d)| a.status.counts_as_history() && d.id != target.id)
        .collect();

    let keep: Option<HashSet<DriveId>> = match lookback {
        HistoryLookback::AllTime => None,
        HistoryLookback::CurrentSeason => Some(
            counted
                .iter()
                .filter(|(_, d)| d.season_id.is_some() && d.season_id == target.season_id)
                .map(|(_, d)| d.id)
                .collect(),
        ),
        HistoryLookback::LastDrives(n) => {
            let mut drives: Vec<&Drive> = counted.iter().map(|(_, d)| d).collect();
            // Most recent first; equal dates fall back to id.
            drives.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
            drives.dedup_by_key(|d| d.id);
            Some(drives.into_iter().take(n as usize).map(|d| d.id).collect())
        }
    };

    counted
        .into_iter()
        .filter(|(_, d)| keep.as_ref().is_none_or(|ids| ids.contains(&d.id)))
        .map(|(a, _)| a.duty_id)
        .collect()
}

/// Distinct duties ordered by how often they occur; ties keep first-seen order.
pub fn rank_by_frequency(duties: &[DutyId]) -> Vec<DutyId> {
    let mut counts: HashMap<DutyId, usize> = HashMap::new();
    let mut first_seen: Vec<DutyId> = Vec::new();
    for duty in duties {
        let count = counts.entry(*duty).or_insert(0);
        if *count == 0 {
            first_seen.push(*duty);
        }
        *count += 1;
    }
    // sort_by is stable, which keeps the first-seen tie order.
    first_seen.sort_by(|a, b| counts[b].cmp(&counts[a]));
    first_seen
}
