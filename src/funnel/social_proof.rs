//! Social proof notifier
//!
//! Once armed, every cadence tick picks a display name that has not been shown
//! yet this cycle, publishes it, and starts an independent timer that hides it
//! again after the visibility window.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::change::Change;
use super::session::{SessionShared, deadline_after};
use super::state::Notification;
use crate::observability::metrics;

/// Name pool with a no-repeat-until-exhausted policy.
///
/// `used` is always a subset of `pool`. When every name has been shown the
/// used set is cleared and the pick comes from the whole pool, so a name may
/// repeat across the reset boundary but never within a cycle.
#[derive(Debug, Clone)]
pub struct NameRotation {
    pool: Vec<String>,
    used: HashSet<String>,
}

impl NameRotation {
    /// Creates a rotation over `pool`, with nothing used yet.
    #[must_use]
    pub fn new(pool: Vec<String>) -> Self {
        Self {
            pool,
            used: HashSet::new(),
        }
    }

    /// The full pool, in configured order.
    #[must_use]
    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    /// Names shown in the current cycle.
    #[must_use]
    pub const fn used(&self) -> &HashSet<String> {
        &self.used
    }

    /// Whether every pool name has been shown this cycle.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        !self.pool.is_empty() && self.pool.iter().all(|name| self.used.contains(name))
    }

    /// Marks `name` as shown. Names outside the pool are ignored.
    pub fn mark_used(&mut self, name: &str) {
        if self.pool.iter().any(|n| n == name) {
            self.used.insert(name.to_string());
        }
    }

    /// Picks the next name. Returns `None` only for an empty pool.
    pub fn pick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if self.pool.is_empty() {
            return None;
        }

        let available = self
            .pool
            .iter()
            .filter(|name| !self.used.contains(*name))
            .count();

        let pick = if available == 0 {
            self.used.clear();
            self.pool[rng.random_range(0..self.pool.len())].clone()
        } else {
            let nth = rng.random_range(0..available);
            self.pool
                .iter()
                .filter(|name| !self.used.contains(*name))
                .nth(nth)?
                .clone()
        };

        self.used.insert(pick.clone());
        Some(pick)
    }
}

/// Starts the notifier cadence under `cancel`.
pub(crate) fn start(shared: &Arc<SessionShared>, cancel: CancellationToken) {
    let notifier = Arc::clone(shared);
    let window_cancel = cancel.clone();
    shared.spawn_periodic(
        "social_proof",
        shared.config.social_proof.period,
        cancel,
        move || notify(&notifier, &window_cancel),
    );
}

fn notify(shared: &Arc<SessionShared>, cancel: &CancellationToken) {
    let picked = {
        let mut rng = shared.rng();
        shared.rotation().pick(&mut *rng)
    };
    let Some(name) = picked else {
        tracing::warn!("social proof pool is empty; skipping notification");
        return;
    };

    let sequence = shared.notification_seq.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::debug!(%name, sequence, "social proof notification");
    shared.publish(|s| {
        s.notification = Some(Notification {
            name: name.clone(),
            sequence,
        });
        s.notification_visible = true;
        Some(Change::NotificationShown { name, sequence })
    });
    metrics::record_notification_shown();

    // Each notification owns its hide timer; it only clears its own entry.
    let hider = Arc::clone(shared);
    let cancel = cancel.clone();
    let visible_for = shared.config.social_proof.visible_for;
    shared.tracker.spawn(async move {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {}
            () = tokio::time::sleep_until(deadline_after(visible_for)) => {
                hider.publish(|s| {
                    let current = s.notification.as_ref().map(|n| n.sequence);
                    if !s.notification_visible || current != Some(sequence) {
                        return None;
                    }
                    s.notification_visible = false;
                    Some(Change::NotificationHidden { sequence })
                });
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::DEFAULT_NAMES;

    fn default_rotation() -> NameRotation {
        NameRotation::new(DEFAULT_NAMES.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn test_full_cycle_has_no_repeats() {
        let mut rotation = default_rotation();
        let mut rng = StdRng::seed_from_u64(1);
        let picks: HashSet<String> = (0..20)
            .map(|_| rotation.pick(&mut rng).unwrap())
            .collect();
        assert_eq!(picks.len(), 20);
        assert!(rotation.is_exhausted());
    }

    #[test]
    fn test_exhausted_pool_resets_to_one() {
        let mut rotation = default_rotation();
        for name in DEFAULT_NAMES {
            rotation.mark_used(name);
        }
        assert_eq!(rotation.used().len(), 20);

        let mut rng = StdRng::seed_from_u64(3);
        let pick = rotation.pick(&mut rng).unwrap();
        assert!(DEFAULT_NAMES.contains(&pick.as_str()));
        assert_eq!(rotation.used().len(), 1);
        assert!(rotation.used().contains(&pick));
    }

    #[test]
    fn test_last_candidate_is_forced() {
        let mut rotation = default_rotation();
        for name in &DEFAULT_NAMES[..19] {
            rotation.mark_used(name);
        }
        let mut rng = StdRng::seed_from_u64(99);
        assert_eq!(rotation.pick(&mut rng).as_deref(), Some("Laura"));
        assert!(rotation.is_exhausted());
    }

    #[test]
    fn test_empty_pool_yields_none() {
        let mut rotation = NameRotation::new(Vec::new());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(rotation.pick(&mut rng).is_none());
        assert!(!rotation.is_exhausted());
    }

    #[test]
    fn test_mark_used_ignores_foreign_names() {
        let mut rotation = default_rotation();
        rotation.mark_used("Zelda");
        assert!(rotation.used().is_empty());
    }

    #[test]
    fn test_seeded_sequences_match() {
        let mut a = default_rotation();
        let mut b = default_rotation();
        let mut rng_a = StdRng::seed_from_u64(2024);
        let mut rng_b = StdRng::seed_from_u64(2024);
        for _ in 0..45 {
            assert_eq!(a.pick(&mut rng_a), b.pick(&mut rng_b));
        }
    }

    proptest! {
        #[test]
        fn prop_used_stays_within_pool(seed in any::<u64>(), pool_size in 1usize..30, draws in 0usize..200) {
            let pool: Vec<String> = (0..pool_size).map(|i| format!("name-{i}")).collect();
            let mut rotation = NameRotation::new(pool.clone());
            let mut rng = StdRng::seed_from_u64(seed);
            let mut cycle = HashSet::new();
            for _ in 0..draws {
                let was_exhausted = rotation.is_exhausted();
                let pick = rotation.pick(&mut rng).unwrap();
                if was_exhausted {
                    cycle.clear();
                }
                // No repeats inside a cycle.
                prop_assert!(cycle.insert(pick.clone()));
                prop_assert!(pool.contains(&pick));
                prop_assert!(rotation.used().len() <= pool_size);
                prop_assert!(rotation.used().iter().all(|n| pool.contains(n)));
            }
        }
    }
}
