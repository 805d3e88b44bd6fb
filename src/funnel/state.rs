//! Reveal state and the user-facing surface
//!
//! [`RevealCell`] holds the funnel stage as an atomic so each edge of the
//! state machine is won by exactly one caller. [`Surface`] is the snapshot
//! the presentation layer renders.

use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Funnel stage. Only ever moves forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RevealState {
    /// Waiting for the visitor to press play.
    #[default]
    Idle = 0,
    /// Simulated video running; the reveal delay is counting down.
    Playing = 1,
    /// Call-to-action disclosed. Terminal for the session.
    Revealed = 2,
}

impl RevealState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Playing,
            _ => Self::Revealed,
        }
    }

    /// Returns `true` for [`RevealState::Revealed`].
    #[must_use]
    pub const fn is_revealed(self) -> bool {
        matches!(self, Self::Revealed)
    }
}

impl std::fmt::Display for RevealState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Revealed => "revealed",
        };
        f.write_str(name)
    }
}

/// Atomic holder for [`RevealState`].
#[derive(Debug)]
pub struct RevealCell {
    state: AtomicU8,
}

impl RevealCell {
    /// Creates a cell in `initial`.
    #[must_use]
    pub const fn new(initial: RevealState) -> Self {
        Self {
            state: AtomicU8::new(initial as u8),
        }
    }

    /// Current state.
    #[must_use]
    pub fn current(&self) -> RevealState {
        RevealState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Moves from `from` to `to` if the cell is still in `from`.
    ///
    /// Backward and self transitions are refused outright. Returns `true` if
    /// this call performed the transition.
    pub fn try_advance(&self, from: RevealState, to: RevealState) -> bool {
        if to <= from {
            return false;
        }
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl Default for RevealCell {
    fn default() -> Self {
        Self::new(RevealState::Idle)
    }
}

/// A social proof notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Display name
    pub name: String,
    /// Per-session counter, starting at 1
    pub sequence: u64,
}

/// Everything the presentation layer shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    /// Funnel stage
    pub reveal_state: RevealState,
    /// Session has reached the reveal (this visit or a previous one)
    pub seen: bool,
    /// Play button shown
    pub play_affordance_visible: bool,
    /// Simulated concurrent viewers; may drift negative
    pub viewer_count: i64,
    /// Simulated remaining spots; never below 1
    pub remaining_spots: u32,
    /// Closing time banner, `HH:MM`
    pub closing_time: String,
    /// Most recent social proof notification
    pub notification: Option<Notification>,
    /// Whether `notification` is on screen
    pub notification_visible: bool,
    /// Exit prompt on screen
    pub exit_modal_visible: bool,
    /// Visitor city; `None` until the lookup settles
    pub city: Option<String>,
}

impl Surface {
    /// Surface at session start, before any timer fires.
    #[must_use]
    pub fn initial(viewer_count: i64, remaining_spots: u32, closing_time: String) -> Self {
        Self {
            reveal_state: RevealState::Idle,
            seen: false,
            play_affordance_visible: true,
            viewer_count,
            remaining_spots,
            closing_time,
            notification: None,
            notification_visible: false,
            exit_modal_visible: false,
            city: None,
        }
    }

    /// Name currently on screen, if any.
    #[must_use]
    pub fn visible_notification(&self) -> Option<&str> {
        self.notification
            .as_ref()
            .filter(|_| self.notification_visible)
            .map(|n| n.name.as_str())
    }
}

/// Formats a timestamp as a 24-hour `HH:MM` closing time.
#[must_use]
pub fn format_closing_time<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%H:%M").to_string()
}
