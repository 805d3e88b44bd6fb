//! Observability
//!
//! Diagnostic logging on stderr, Prometheus metrics, and the JSONL event
//! stream that renders a session's surface for whoever is watching.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{EndReason, Event, EventEmitter};
pub use logging::{LogFormat, LogSettings, init_logging};
pub use metrics::init_metrics;
