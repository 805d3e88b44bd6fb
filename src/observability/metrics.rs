//! Metrics collection
//!
//! Prometheus-compatible counters and gauges for funnel activity. The record
//! functions are no-ops until a recorder is installed with [`init_metrics`].

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::RevealGateError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `RevealGateError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), RevealGateError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| RevealGateError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

fn describe_metrics() {
    describe_counter!(
        "revealgate_reveals_total",
        "Call-to-action reveals by source (delay or persisted)"
    );
    describe_counter!(
        "revealgate_notifications_shown_total",
        "Social proof notifications shown"
    );
    describe_counter!(
        "revealgate_exit_intents_total",
        "Exit intents intercepted by signal kind"
    );
    describe_counter!(
        "revealgate_storage_write_failures_total",
        "Seen-flag writes that failed"
    );
    describe_counter!(
        "revealgate_geolocation_fallbacks_total",
        "City lookups that fell back to the placeholder"
    );
    describe_counter!(
        "revealgate_changes_lagged_total",
        "Surface changes dropped by a slow event consumer"
    );
    describe_gauge!("revealgate_viewer_count", "Simulated viewer count");
    describe_gauge!("revealgate_remaining_spots", "Simulated remaining spots");
}

/// Records a reveal.
pub fn record_reveal(source: &'static str) {
    counter!("revealgate_reveals_total", "source" => source).increment(1);
}

/// Records a social proof notification.
pub fn record_notification_shown() {
    counter!("revealgate_notifications_shown_total").increment(1);
}

/// Records an intercepted exit intent.
pub fn record_exit_intent(signal: &'static str) {
    counter!("revealgate_exit_intents_total", "signal" => signal).increment(1);
}

/// Records a failed seen-flag write.
pub fn record_storage_write_failure() {
    counter!("revealgate_storage_write_failures_total").increment(1);
}

/// Records a geolocation fallback.
pub fn record_geolocation_fallback() {
    counter!("revealgate_geolocation_fallbacks_total").increment(1);
}

/// Records changes an event consumer skipped.
pub fn record_changes_lagged(skipped: u64) {
    counter!("revealgate_changes_lagged_total").increment(skipped);
}

/// Sets the viewer count gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_viewer_count(count: i64) {
    gauge!("revealgate_viewer_count").set(count as f64);
}

/// Sets the remaining spots gauge.
pub fn set_remaining_spots(spots: u32) {
    gauge!("revealgate_remaining_spots").set(f64::from(spots));
}
