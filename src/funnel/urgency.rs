//! Urgency timers
//!
//! Two counters that tick from session start to teardown regardless of the
//! reveal state: a viewer count doing a lopsided random walk, and a scarcity
//! countdown that stalls at one remaining spot.

use std::sync::Arc;

use rand::Rng;

use super::change::Change;
use super::session::SessionShared;
use crate::observability::metrics;

/// Largest single viewer change.
pub const VIEWER_STEP_MAX: i64 = 5;

/// Chance that a viewer step is a decrease.
pub const DECREASE_PROBABILITY: f64 = 0.3;

/// Largest single viewer decrease.
pub const DECREASE_CAP: i64 = 3;

/// Remaining spots never drop below this.
pub const SPOTS_FLOOR: u32 = 1;

/// Draws one viewer-walk step.
///
/// The magnitude is uniform in `1..=5`; with probability 0.3 the step is a
/// decrease capped at 3. The expected drift is upward, but nothing stops a
/// long run of decreases from taking the count below zero.
pub fn viewer_step<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    let change = rng.random_range(1..=VIEWER_STEP_MAX);
    if rng.random_bool(DECREASE_PROBABILITY) {
        -change.min(DECREASE_CAP)
    } else {
        change
    }
}

/// One scarcity tick: decrement, holding at [`SPOTS_FLOOR`].
#[must_use]
pub const fn countdown(spots: u32) -> u32 {
    if spots <= SPOTS_FLOOR {
        SPOTS_FLOOR
    } else {
        spots - 1
    }
}

/// Starts both urgency timers on the session's root token.
pub(crate) fn start(shared: &Arc<SessionShared>) {
    let cancel = shared.cancel.child_token();

    let walker = Arc::clone(shared);
    shared.spawn_periodic(
        "viewer_walk",
        shared.config.urgency.viewer_period,
        cancel.clone(),
        move || {
            let step = viewer_step(&mut *walker.rng());
            walker.publish(|s| {
                let before = s.viewer_count;
                s.viewer_count = before.saturating_add(step);
                metrics::set_viewer_count(s.viewer_count);
                Some(Change::ViewerCount {
                    viewer_count: s.viewer_count,
                    delta: s.viewer_count.saturating_sub(before),
                })
            });
            tracing::trace!(step, "viewer walk tick");
        },
    );

    let counter = Arc::clone(shared);
    shared.spawn_periodic(
        "scarcity_countdown",
        shared.config.urgency.spots_period,
        cancel,
        move || {
            counter.publish(|s| {
                let next = countdown(s.remaining_spots);
                if next == s.remaining_spots {
                    return None;
                }
                s.remaining_spots = next;
                metrics::set_remaining_spots(next);
                Some(Change::RemainingSpots {
                    remaining_spots: next,
                })
            });
        },
    );
}
