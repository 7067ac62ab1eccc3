use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;

use dutyroster::allocator::{AllocationPolicy, DutyAllocator};
use dutyroster::core::models::{CapacityRule, Drive, Duty};
use dutyroster::core::persist::save_state;
use dutyroster::core::store::MemoryStore;
use dutyroster::core::types::GenderRestriction;

pub const ACTOR: &str = "integration";

pub fn binary_path() -> String {
    let raw = PathBuf::from(env!("CARGO_BIN_EXE_dutyroster"));
    if raw.is_absolute() {
        return raw.to_string_lossy().to_string();
    }
    let from_manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(&raw);
    if from_manifest.exists() {
        return from_manifest.to_string_lossy().to_string();
    }
    raw.to_string_lossy().to_string()
}

static COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn make_temp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "dutyroster-{prefix}-{}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let _ = fs::create_dir_all(&dir);
    dir
}

pub fn write_config(dir: &Path, file_logging: bool) {
    let logging = if file_logging { "True" } else { "False" };
    let cfg = format!(
        r#"{{
      "male_priority_order": {{ "value": ["traffic", "food", "kitchen"], "description": "male order" }},
      "female_priority_order": {{ "value": ["food", "kitchen"], "description": "female order" }},
      "history_lookback": {{ "value": "all-time", "description": "lookback" }},
      "waitlist_auto_promotion": {{ "value": "True", "description": "auto promotion" }},
      "placement_retry_limit": {{ "value": 3, "description": "retries" }},
      "file_logging_enabled": {{ "value": "{logging}", "description": "file logging" }},
      "log_level": {{ "value": "info", "description": "level" }}
    }}"#
    );
    fs::write(dir.join("config.json"), cfg).unwrap();
}

pub fn policy() -> AllocationPolicy {
    AllocationPolicy {
        male_priority_order: vec!["traffic".into(), "food".into(), "kitchen".into()],
        female_priority_order: vec!["food".into(), "kitchen".into()],
        ..AllocationPolicy::default()
    }
}

pub fn allocator(store: &Arc<MemoryStore>) -> DutyAllocator<MemoryStore> {
    DutyAllocator::new(Arc::clone(store), policy())
}

/// Three duties with rules that give a size-20 drive two traffic seats,
/// two food seats and one kitchen seat.
pub fn seed_roster(drive_count: u32) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let traffic = store
        .add_duty(Duty::new("Traffic", "traffic", GenderRestriction::Male))
        .unwrap();
    let food = store
        .add_duty(Duty::new("Food", "food", GenderRestriction::None))
        .unwrap();
    let kitchen = store
        .add_duty(Duty::new("Kitchen", "kitchen", GenderRestriction::Female))
        .unwrap();
    store
        .add_capacity_rule(CapacityRule::linear(traffic.id, 1, 0.05))
        .unwrap();
    store
        .add_capacity_rule(CapacityRule::tier(food.id, 0, Some(49), 2))
        .unwrap();
    store
        .add_capacity_rule(CapacityRule::tier(food.id, 50, None, 4))
        .unwrap();
    store
        .add_capacity_rule(CapacityRule::linear(kitchen.id, 1, 0.0))
        .unwrap();

    let engine = allocator(&store);
    for n in 0..drive_count {
        let date = NaiveDate::from_ymd_opt(2099, 1, 1 + n).unwrap();
        let drive = store
            .add_drive(Drive::new(format!("drive-{n}"), date, 20))
            .unwrap();
        engine.materialize_slots(drive.id).unwrap();
    }
    store
}

pub fn write_state(dir: &Path, store: &MemoryStore) -> PathBuf {
    save_state(store, &dir.join("roster.json")).unwrap()
}

pub fn run_cli(dir: &Path, args: &[&str]) -> Output {
    Command::new(binary_path())
        .current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run binary")
}

pub fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

pub fn read_log_contents(dir: &Path) -> Option<String> {
    let logs_dir = dir.join("logs");
    let mut entries = fs::read_dir(&logs_dir).ok()?;
    let entry = entries.find_map(|e| e.ok())?;
    fs::read_to_string(entry.path()).ok()
}
