//! Shared integration-test harness for running the `revealgate` binary and
//! for building sessions on virtual time.

#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use revealgate::config::FunnelConfig;

/// Runs the binary with `args`, feeding `input` on stdin and closing it.
#[allow(clippy::missing_panics_doc)]
pub fn run_cli(args: &[&str], input: &str) -> Output {
    let bin = env!("CARGO_BIN_EXE_revealgate");
    let mut child = Command::new(bin)
        .args(args)
        .env_remove("REVEALGATE_LOG_LEVEL")
        .env_remove("REVEALGATE_CONFIG")
        .env_remove("REVEALGATE_STORE")
        .env_remove("REVEALGATE_METRICS_PORT")
        .env_remove("REVEALGATE_REVEAL_DELAY")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn revealgate");

    {
        let mut stdin = child.stdin.take().expect("stdin not captured");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write stdin");
    }

    child.wait_with_output().expect("failed to wait for revealgate")
}

/// Parses every stdout line as a JSON event.
#[allow(clippy::missing_panics_doc)]
pub fn events(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            serde_json::from_str(l).unwrap_or_else(|e| panic!("invalid event JSON: {e}\nline: {l}"))
        })
        .collect()
}

/// Event `type` tags in order.
pub fn event_types(events: &[serde_json::Value]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| e["type"].as_str().map(str::to_owned))
        .collect()
}

/// Path to a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Default configuration with a fixed seed and a 10 second reveal delay.
pub fn fast_config() -> FunnelConfig {
    let mut config = FunnelConfig {
        seed: Some(17),
        ..FunnelConfig::default()
    };
    config.reveal.delay = Duration::from_secs(10);
    config
}

/// Lets spawned tasks run without crossing any timer deadline that matters.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
