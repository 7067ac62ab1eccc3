use std::fs;

use dutyroster::config::Config;
use dutyroster::core::persist::load_state;
use dutyroster::core::store::RosterStore;

use crate::common::{
    make_temp_dir, read_log_contents, run_cli, seed_roster, stdout_json, write_config,
    write_state,
};

#[test]
fn register_places_and_saves_state() {
    let dir = make_temp_dir("cli");
    write_config(&dir, false);
    write_state(&dir, &seed_roster(1));

    let output = run_cli(
        &dir,
        &[
            "register", "--phone", "555-0100", "--name", "Ana", "--gender", "female", "--drives",
            "1",
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json = stdout_json(&output);
    let entry = &json[0];
    assert_eq!(entry["drive_id"], 1);
    assert_eq!(entry["result"]["result"], "assigned");
    assert_eq!(entry["result"]["duty_name"], "Food");
    assert_eq!(entry["result"]["status"], "placed");

    let store = load_state(&dir.join("roster.json")).unwrap();
    let volunteer = store.volunteer_by_phone("5550100").unwrap().unwrap();
    assert_eq!(volunteer.name, "Ana");
    assert!(store.assignment_for(volunteer.id, 1).unwrap().is_some());
}

#[test]
fn place_all_then_cancel_and_promote() {
    let dir = make_temp_dir("cli");
    write_config(&dir, false);
    write_state(&dir, &seed_roster(1));
    for phone in ["1", "2", "3", "4"] {
        let output = run_cli(
            &dir,
            &[
                "register", "--phone", phone, "--name", phone, "--gender", "female", "--drives",
                "1",
            ],
        );
        assert!(output.status.success());
    }

    let output = run_cli(&dir, &["place-all", "--drive", "1"]);
    assert!(output.status.success());
    let entries = stdout_json(&output);
    assert_eq!(entries.as_array().unwrap().len(), 0);

    let output = run_cli(&dir, &["cancel", "--volunteer", "1", "--drive", "1"]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["status"], "cancelled");

    let output = run_cli(&dir, &["promote", "--drive", "1"]);
    assert!(output.status.success());
    let promoted = stdout_json(&output);
    assert_eq!(promoted[0]["volunteer_id"], 4);
    assert_eq!(promoted[0]["duty_name"], "Food");

    let store = load_state(&dir.join("roster.json")).unwrap();
    assert!(store.waitlist(1).unwrap().is_empty());
}

#[test]
fn unknown_volunteer_fails_without_touching_state() {
    let dir = make_temp_dir("cli");
    write_config(&dir, false);
    let state = write_state(&dir, &seed_roster(1));
    let before = fs::read_to_string(&state).unwrap();

    let output = run_cli(&dir, &["place", "--volunteer", "99", "--drive", "1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown volunteer: 99"), "stderr: {stderr}");
    assert_eq!(fs::read_to_string(&state).unwrap(), before);
}

#[test]
fn override_below_placed_is_reported() {
    let dir = make_temp_dir("cli");
    write_config(&dir, false);
    write_state(&dir, &seed_roster(1));
    run_cli(
        &dir,
        &[
            "register", "--phone", "1", "--name", "a", "--gender", "male", "--drives", "1",
        ],
    );

    let output = run_cli(
        &dir,
        &["override", "--drive", "1", "--duty", "traffic", "--capacity", "0"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot shrink to 0"));

    let output = run_cli(
        &dir,
        &["override", "--drive", "1", "--duty", "Traffic", "--capacity", "5"],
    );
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["manual_override"], 5);

    let output = run_cli(&dir, &["override", "--drive", "1", "--duty", "traffic", "--clear"]);
    assert!(output.status.success());
    assert!(stdout_json(&output)["manual_override"].is_null());
}

#[test]
fn config_set_updates_file_atomically() {
    let dir = make_temp_dir("cli");
    write_config(&dir, false);

    let output = run_cli(
        &dir,
        &[
            "config",
            "--set",
            "PLACEMENT_RETRY_LIMIT=7",
            "--set",
            "history_lookback=last-drives:3",
        ],
    );
    assert!(output.status.success());
    let changes = stdout_json(&output);
    assert_eq!(
        changes,
        serde_json::json!([
            { "key": "PLACEMENT_RETRY_LIMIT", "old": "3", "new": "7" },
            { "key": "HISTORY_LOOKBACK", "old": "all-time", "new": "last-drives:3" }
        ])
    );

    let output = run_cli(&dir, &["config"]);
    assert!(output.status.success());
    let rows = stdout_json(&output);
    let retry = rows
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["key"] == "PLACEMENT_RETRY_LIMIT")
        .unwrap();
    assert_eq!(retry["value"], "7");

    let output = run_cli(
        &dir,
        &[
            "config",
            "--set",
            "PLACEMENT_RETRY_LIMIT=9",
            "--set",
            "HISTORY_LOOKBACK=sometimes",
        ],
    );
    assert!(!output.status.success());

    let cfg = Config::load_from(dir.join("config.json")).unwrap();
    assert_eq!(cfg.placement_retry_limit(), 7);
    assert_eq!(cfg.history_lookback().to_string(), "last-drives:3");
}

#[test]
fn file_logging_writes_a_session_log() {
    let dir = make_temp_dir("cli");
    write_config(&dir, true);
    write_state(&dir, &seed_roster(1));

    let output = run_cli(&dir, &["sweep"]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), serde_json::json!([]));

    let log = read_log_contents(&dir).expect("session log should exist");
    assert!(log.contains("roster state saved"), "log: {log}");
}
