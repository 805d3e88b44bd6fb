//! Surface change log
//!
//! Every write to the [`Surface`](super::Surface) that a visitor could notice
//! also publishes one [`Change`] on the session's change bus. Changes are
//! sent while the surface lock is held, so their order matches the order of
//! the writes and no transition is folded into a later snapshot.

use serde::Serialize;

use super::state::RevealState;

/// Capacity of the change bus. A subscriber that falls further behind than
/// this loses the oldest changes and is told how many.
pub const CHANGE_BUS_CAPACITY: usize = 1024;

/// One visible change to the surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    /// The funnel moved forward.
    RevealState {
        /// Previous state
        from: RevealState,
        /// New state
        to: RevealState,
        /// Whether the play affordance is still shown
        play_affordance_visible: bool,
    },
    /// The viewer walk ticked.
    ViewerCount {
        /// New count
        viewer_count: i64,
        /// Signed change from the previous count
        delta: i64,
    },
    /// The scarcity countdown ticked.
    RemainingSpots {
        /// New remaining spots
        remaining_spots: u32,
    },
    /// The city lookup finished.
    City {
        /// City shown to the visitor
        city: String,
    },
    /// A social proof notification became visible.
    NotificationShown {
        /// Displayed name
        name: String,
        /// Per-session notification number
        sequence: u64,
    },
    /// A notification's window closed.
    NotificationHidden {
        /// Per-session notification number
        sequence: u64,
    },
    /// The exit modal was raised.
    ExitModalShown,
    /// The exit modal was closed.
    ExitModalDismissed,
}

impl Change {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RevealState { .. } => "reveal_state",
            Self::ViewerCount { .. } => "viewer_count",
            Self::RemainingSpots { .. } => "remaining_spots",
            Self::City { .. } => "city",
            Self::NotificationShown { .. } => "notification_shown",
            Self::NotificationHidden { .. } => "notification_hidden",
            Self::ExitModalShown => "exit_modal_shown",
            Self::ExitModalDismissed => "exit_modal_dismissed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_json_is_tagged() {
        let json = serde_json::to_value(Change::NotificationShown {
            name: "Rosa".to_owned(),
            sequence: 3,
        })
        .unwrap();
        assert_eq!(json["change"], "notification_shown");
        assert_eq!(json["sequence"], 3);

        let json = serde_json::to_value(Change::ExitModalShown).unwrap();
        assert_eq!(json["change"], "exit_modal_shown");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(Change::ExitModalDismissed.kind(), "exit_modal_dismissed");
        assert_eq!(
            Change::RemainingSpots { remaining_spots: 4 }.kind(),
            "remaining_spots"
        );
    }
}
