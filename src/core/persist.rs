use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::aliases::SlotId;
use crate::core::models::{
    Assignment, Availability, BaseEntity, CapacityRule, Drive, DriveDutySlot, Duty,
    PriorityEntry, Volunteer,
};
use crate::core::repository::{Repository, Sort};
use crate::core::store::{MemoryStore, Tables};
use crate::errors::{Error, Result};

/// Every table of a roster, in id order, as written to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    #[serde(default)]
    pub volunteers: Vec<Volunteer>,
    #[serde(default)]
    pub drives: Vec<Drive>,
    #[serde(default)]
    pub duties: Vec<Duty>,
    #[serde(default)]
    pub capacity_rules: Vec<CapacityRule>,
    #[serde(default)]
    pub slots: Vec<DriveDutySlot>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub availability: Vec<Availability>,
    #[serde(default)]
    pub priority_entries: Vec<PriorityEntry>,
    #[serde(default)]
    pub archived: Vec<Assignment>,
}

fn rows<T: BaseEntity + Clone>(repo: &Repository<T>) -> Vec<T> {
    repo.values(Sort::IdAsc).into_iter().cloned().collect()
}

fn repository<T: BaseEntity>(rows: Vec<T>) -> Result<Repository<T>> {
    let mut repo = Repository::new();
    for row in rows {
        repo.insert_with_id(row)?;
    }
    Ok(repo)
}

impl RosterSnapshot {
    pub fn from_tables(tables: &Tables) -> Self {
        Self {
            volunteers: rows(&tables.volunteers),
            drives: rows(&tables.drives),
            duties: rows(&tables.duties),
            capacity_rules: rows(&tables.capacity_rules),
            slots: rows(&tables.slots),
            assignments: rows(&tables.assignments),
            availability: rows(&tables.availability),
            priority_entries: rows(&tables.priority_entries),
            archived: tables.archived.clone(),
        }
    }

    /// Rebuilds the tables, refusing snapshots whose seat counts disagree
    /// with their assignments.
    pub fn into_tables(self) -> Result<Tables> {
        let mut seats: HashMap<SlotId, u32> = HashMap::new();
        for a in self.assignments.iter().filter(|a| a.status.occupies_seat()) {
            *seats.entry(a.slot_id).or_insert(0) += 1;
        }
        for slot in &self.slots {
            let held = seats.get(&slot.id).copied().unwrap_or(0);
            if held != slot.placed_count || slot.placed_count > slot.effective_capacity() {
                return Err(Error::storage(format!(
                    "slot {} records {} placed of {} seats but holds {} assignment(s)",
                    slot.id,
                    slot.placed_count,
                    slot.effective_capacity(),
                    held
                )));
            }
        }

        Ok(Tables {
            volunteers: repository(self.volunteers)?,
            drives: repository(self.drives)?,
            duties: repository(self.duties)?,
            capacity_rules: repository(self.capacity_rules)?,
            slots: repository(self.slots)?,
            assignments: repository(self.assignments)?,
            availability: repository(self.availability)?,
            priority_entries: repository(self.priority_entries)?,
            archived: self.archived,
        })
    }
}

pub fn save_state(store: &MemoryStore, path: &Path) -> Result<PathBuf> {
    let snapshot = store.with_tables(RosterSnapshot::from_tables)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let contents = serde_json::to_string_pretty(&snapshot)?;
    fs::write(path, contents)?;
    Ok(path.to_path_buf())
}

pub fn load_state(path: &Path) -> Result<MemoryStore> {
    let text = fs::read_to_string(path)?;
    let snapshot: RosterSnapshot = serde_json::from_str(&text)?;
    Ok(MemoryStore::from_tables(snapshot.into_tables()?))
}

/// Like `load_state`, but a missing file is an empty roster.
pub fn load_state_or_default(path: &Path) -> Result<MemoryStore> {
    if path.exists() {
        load_state(path)
    } else {
        Ok(MemoryStore::new())
    }
}
