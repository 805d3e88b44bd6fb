//! Structured event stream
//!
//! Discrete, typed events describing what the visitor would see. Events are
//! serialized as newline-delimited JSON (JSONL) carrying the session id and a
//! monotonically increasing sequence number.
//!
//! Surface events are converted one-to-one from the session's [`Change`]
//! stream, so a transition that is undone before the emitter runs still
//! appears. Session start/end and contact are emitted directly.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::funnel::{Change, RevealState};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// `quit` command or end of input
    Quit,
    /// `--duration` elapsed
    Elapsed,
    /// Ctrl+C or SIGTERM
    Interrupted,
    /// Back gesture with no synthetic entry left to absorb it
    NavigatedAway,
}

/// A discrete event emitted during a session.
///
/// Tagged with `"type"` when serialized so consumers can dispatch on it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The session is up and the initial surface is in place.
    SessionStarted {
        /// When the session started.
        timestamp: DateTime<Utc>,
        /// Initial reveal state (`revealed` when the seen flag was set).
        reveal_state: RevealState,
        /// Initial viewer count.
        viewer_count: i64,
        /// Initial remaining spots.
        remaining_spots: u32,
        /// Closing time shown for the whole session.
        closing_time: String,
    },

    /// The funnel moved forward.
    RevealStateChanged {
        /// When the transition was observed.
        timestamp: DateTime<Utc>,
        /// Previous state.
        from: RevealState,
        /// New state.
        to: RevealState,
        /// Whether the play affordance is still shown.
        play_affordance_visible: bool,
    },

    /// The viewer walk ticked.
    ViewerCountChanged {
        /// When the tick was observed.
        timestamp: DateTime<Utc>,
        /// New count.
        viewer_count: i64,
        /// Signed change from the previous count.
        delta: i64,
    },

    /// The scarcity countdown ticked.
    RemainingSpotsChanged {
        /// When the tick was observed.
        timestamp: DateTime<Utc>,
        /// New remaining spots.
        remaining_spots: u32,
    },

    /// The city lookup finished (resolved or fallback).
    CityResolved {
        /// When the city arrived.
        timestamp: DateTime<Utc>,
        /// City shown to the visitor.
        city: String,
    },

    /// A social proof notification became visible.
    NotificationShown {
        /// When it was shown.
        timestamp: DateTime<Utc>,
        /// Displayed name.
        name: String,
        /// Per-session notification number.
        notification: u64,
    },

    /// The visible notification was hidden.
    NotificationHidden {
        /// When it was hidden.
        timestamp: DateTime<Utc>,
        /// Per-session notification number.
        notification: u64,
    },

    /// The exit modal was raised.
    ExitModalShown {
        /// When it was raised.
        timestamp: DateTime<Utc>,
    },

    /// The exit modal was closed.
    ExitModalDismissed {
        /// When it was closed.
        timestamp: DateTime<Utc>,
    },

    /// The contact destination was opened.
    ContactOpened {
        /// When it was opened.
        timestamp: DateTime<Utc>,
        /// Destination handed to the launcher.
        destination: String,
    },

    /// The session was torn down.
    SessionEnded {
        /// When teardown finished.
        timestamp: DateTime<Utc>,
        /// Why the session ended.
        reason: EndReason,
    },
}

impl From<Change> for Event {
    fn from(change: Change) -> Self {
        let timestamp = Utc::now();
        match change {
            Change::RevealState {
                from,
                to,
                play_affordance_visible,
            } => Self::RevealStateChanged {
                timestamp,
                from,
                to,
                play_affordance_visible,
            },
            Change::ViewerCount {
                viewer_count,
                delta,
            } => Self::ViewerCountChanged {
                timestamp,
                viewer_count,
                delta,
            },
            Change::RemainingSpots { remaining_spots } => Self::RemainingSpotsChanged {
                timestamp,
                remaining_spots,
            },
            Change::City { city } => Self::CityResolved { timestamp, city },
            Change::NotificationShown { name, sequence } => Self::NotificationShown {
                timestamp,
                name,
                notification: sequence,
            },
            Change::NotificationHidden { sequence } => Self::NotificationHidden {
                timestamp,
                notification: sequence,
            },
            Change::ExitModalShown => Self::ExitModalShown { timestamp },
            Change::ExitModalDismissed => Self::ExitModalDismissed { timestamp },
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number and session id via serde flatten)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// Session the event belongs to.
    session: Uuid,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) increments the sequence counter,
/// serializes the event as one JSON line, and flushes. Serialization or I/O
/// failures are dropped; a broken event sink never ends a session.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
    session: Uuid,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("session", &self.session)
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter for `session` writing to `writer`.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>, session: Uuid) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
            session,
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout(session: Uuid) -> Self {
        Self::new(Box::new(std::io::stdout()), session)
    }

    /// Creates an emitter that discards everything.
    #[must_use]
    pub fn noop(session: Uuid) -> Self {
        Self::new(Box::new(std::io::sink()), session)
    }

    /// Creates an emitter that writes to a file at `path`, truncating it.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path, session: Uuid) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file), session))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence,
            session: self.session,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Emits every event in order.
    pub fn emit_all(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}
