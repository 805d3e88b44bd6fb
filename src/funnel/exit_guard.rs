//! Exit-intent guard
//!
//! Reacts to two abandonment signals once the funnel is revealed: the pointer
//! leaving through the top of the viewport, and a back-navigation attempt.
//! Either one raises the exit modal. Back-navigation is additionally trapped
//! by re-pushing a synthetic history entry after every attempt.
//!
//! Signals are handled synchronously by [`Session::signal`](super::Session::signal).
//! The synthetic entry is restored before the call returns, so consecutive
//! back attempts can never outrun the trap.

use serde::{Deserialize, Serialize};

use super::change::Change;
use super::session::SessionShared;
use crate::observability::metrics;

/// Signals raised by the page collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageSignal {
    /// Pointer left the viewport; `y` is its last vertical position.
    PointerLeave {
        /// Vertical position in viewport pixels; `<= 0` means the top edge
        y: f64,
    },
    /// The visitor tried to navigate back.
    BackNavigation,
}

impl PageSignal {
    /// Whether this signal reads as exit intent.
    #[must_use]
    pub fn is_exit_intent(self) -> bool {
        match self {
            Self::PointerLeave { y } => y <= 0.0,
            Self::BackNavigation => true,
        }
    }

    /// Snake-case signal name, matching the serialized `kind`.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::PointerLeave { .. } => "pointer_leave",
            Self::BackNavigation => "back_navigation",
        }
    }
}

/// Installs the history trap. Called once, on reveal.
pub(crate) fn arm(shared: &SessionShared) {
    shared.navigation().push_synthetic_entry();
    tracing::debug!("exit guard armed");
}

/// Reacts to one signal on the caller's thread.
pub(crate) fn handle(shared: &SessionShared, signal: PageSignal) {
    if !signal.is_exit_intent() {
        tracing::trace!(?signal, "pointer left below the top edge");
        return;
    }

    if signal == PageSignal::BackNavigation {
        shared.navigation().push_synthetic_entry();
    }

    let shown = shared.publish(|s| {
        if s.exit_modal_visible {
            return None;
        }
        s.exit_modal_visible = true;
        Some(Change::ExitModalShown)
    });
    metrics::record_exit_intent(signal.kind());
    tracing::debug!(?signal, shown, "exit intent");
}
