mod common;

use common::{event_types, events, fixture_path, run_cli};

// ============================================================================
// validate
// ============================================================================

#[test]
fn validate_valid_config() {
    let config = fixture_path("valid.yaml");
    let output = run_cli(&["validate", config.to_str().unwrap()], "");
    assert!(
        output.status.success(),
        "validate should succeed for valid config: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("valid.yaml: ok"));
}

#[test]
fn validate_rejects_duplicate_names() {
    let config = fixture_path("duplicate_names.yaml");
    let output = run_cli(&["--quiet", "validate", config.to_str().unwrap()], "");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("duplicate"), "stderr: {stderr}");
}

#[test]
fn validate_rejects_unknown_field() {
    let config = fixture_path("unknown_field.yaml");
    let output = run_cli(&["--quiet", "validate", config.to_str().unwrap()], "");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn validate_rejects_zero_spots() {
    let config = fixture_path("zero_spots.yaml");
    let output = run_cli(&["--quiet", "validate", config.to_str().unwrap()], "");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("urgency.spots_seed"));
}

#[test]
fn validate_rejects_unbounded_period() {
    let config = fixture_path("huge_period.yaml");
    let output = run_cli(&["--quiet", "validate", config.to_str().unwrap()], "");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("urgency.viewer_period"), "stderr: {stderr}");
}

#[test]
fn validate_reports_warnings_but_passes() {
    let config = fixture_path("overlapping_window.yaml");
    let output = run_cli(&["--quiet", "validate", config.to_str().unwrap()], "");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("warning"), "stderr: {stderr}");
    assert!(stderr.contains("social_proof.visible_for"), "stderr: {stderr}");
}

#[test]
fn validate_missing_file() {
    let output = run_cli(
        &["--quiet", "validate", "/tmp/nonexistent_revealgate_test_file.yaml"],
        "",
    );
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("file not found"));
}

// ============================================================================
// status
// ============================================================================

#[test]
fn status_without_store_is_not_seen() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("state.json");
    let output = run_cli(&["status", "--store", store.to_str().unwrap()], "");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("not seen"));
}

#[test]
fn status_json_reports_seen_flag() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("state.json");
    std::fs::write(&store, r#"{"hasSeenDelay":"true"}"#).unwrap();

    let output = run_cli(
        &["status", "--store", store.to_str().unwrap(), "--format", "json"],
        "",
    );
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("status JSON should be valid");
    assert_eq!(parsed["seen"], true);
}

#[test]
fn status_ignores_other_flag_values() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("state.json");
    std::fs::write(&store, r#"{"hasSeenDelay":"yes"}"#).unwrap();

    let output = run_cli(
        &["status", "--store", store.to_str().unwrap(), "--format", "json"],
        "",
    );
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["seen"], false);
}

// ============================================================================
// run
// ============================================================================

#[test]
fn run_reveals_and_persists_flag() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("nested/state.json");
    let output = run_cli(
        &[
            "--quiet",
            "run",
            "--offline",
            "--seed",
            "3",
            "--reveal-delay",
            "0s",
            "--duration",
            "1s",
            "--store",
            store.to_str().unwrap(),
        ],
        "play\n",
    );
    assert!(
        output.status.success(),
        "run should exit 0: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let events = events(&output);
    let types = event_types(&events);
    assert_eq!(types.first().map(String::as_str), Some("SessionStarted"));
    assert_eq!(types.last().map(String::as_str), Some("SessionEnded"));
    assert_eq!(events.last().unwrap()["reason"], "elapsed");
    assert!(
        events
            .iter()
            .any(|e| e["type"] == "RevealStateChanged" && e["to"] == "revealed"),
        "events: {types:?}"
    );

    // Sequence numbers are contiguous and every event carries the same session.
    let session = events[0]["session"].clone();
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event["sequence"], i);
        assert_eq!(event["session"], session);
    }

    let stored = std::fs::read_to_string(&store).unwrap();
    assert!(stored.contains("hasSeenDelay"), "store: {stored}");
}

#[test]
fn run_with_seen_store_starts_revealed() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("state.json");
    std::fs::write(&store, r#"{"hasSeenDelay":"true"}"#).unwrap();

    let output = run_cli(
        &["--quiet", "run", "--offline", "--store", store.to_str().unwrap()],
        "leave -1\ncontact\nquit\n",
    );
    assert!(output.status.success());

    let events = events(&output);
    assert_eq!(events[0]["type"], "SessionStarted");
    assert_eq!(events[0]["reveal_state"], "revealed");
    assert!(event_types(&events).contains(&"ContactOpened".to_string()));
    assert_eq!(events.last().unwrap()["reason"], "quit");
}

#[test]
fn run_back_before_reveal_leaves_page() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("state.json");
    let output = run_cli(
        &["--quiet", "run", "--offline", "--store", store.to_str().unwrap()],
        "back\n",
    );
    assert!(output.status.success());

    let events = events(&output);
    assert_eq!(events.last().unwrap()["reason"], "navigated_away");
    assert!(!store.exists(), "nothing is written before a reveal");
}

#[test]
fn run_writes_events_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("state.json");
    let events_file = dir.path().join("events.jsonl");
    let output = run_cli(
        &[
            "--quiet",
            "run",
            "--offline",
            "--store",
            store.to_str().unwrap(),
            "--events-file",
            events_file.to_str().unwrap(),
        ],
        "quit\n",
    );
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let written = std::fs::read_to_string(&events_file).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert!(lines.len() >= 2);
    assert!(lines[0].contains("SessionStarted"));
}

#[test]
fn run_rejects_unbounded_duration() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("state.json");
    let output = run_cli(
        &[
            "--quiet",
            "run",
            "--offline",
            "--store",
            store.to_str().unwrap(),
            "--duration",
            "500000000000years",
        ],
        "quit\n",
    );
    assert_eq!(output.status.code(), Some(2), "must be a usage error, not a panic");
    assert!(String::from_utf8_lossy(&output.stderr).contains("--duration"));
}

#[test]
fn run_rejects_unbounded_period_in_config() {
    let config = fixture_path("huge_period.yaml");
    let output = run_cli(
        &["--quiet", "run", "--offline", "--config", config.to_str().unwrap()],
        "quit\n",
    );
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn run_streams_flickering_modal() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("state.json");
    std::fs::write(&store, r#"{"hasSeenDelay":"true"}"#).unwrap();

    let output = run_cli(
        &["--quiet", "run", "--offline", "--store", store.to_str().unwrap()],
        "leave 0\ndismiss\nleave 0\ndismiss\nquit\n",
    );
    assert!(output.status.success());

    let types = event_types(&events(&output));
    let modal: Vec<&str> = types
        .iter()
        .map(String::as_str)
        .filter(|t| t.starts_with("ExitModal"))
        .collect();
    assert_eq!(
        modal,
        [
            "ExitModalShown",
            "ExitModalDismissed",
            "ExitModalShown",
            "ExitModalDismissed"
        ]
    );
}

#[test]
fn run_rejects_invalid_config() {
    let config = fixture_path("duplicate_names.yaml");
    let output = run_cli(
        &["--quiet", "run", "--offline", "--config", config.to_str().unwrap()],
        "quit\n",
    );
    assert_eq!(output.status.code(), Some(2));
}
