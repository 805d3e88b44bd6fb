//! Navigation and contact collaborators
//!
//! The exit guard intercepts back-navigation by keeping a synthetic history
//! entry on top of the stack; [`NavigationGuard`] is the only thing it touches.
//! Swap in [`DisabledNavigation`] wherever there is no history to trap.

use std::sync::atomic::{AtomicUsize, Ordering};

/// History manipulation used by the exit guard.
pub trait NavigationGuard: Send + Sync {
    /// Pushes a synthetic entry so the next back gesture lands on the page.
    fn push_synthetic_entry(&self);
}

/// No-op guard for environments without browser history.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNavigation;

impl NavigationGuard for DisabledNavigation {
    fn push_synthetic_entry(&self) {}
}

/// In-process history stack.
///
/// Tracks how many synthetic entries sit above the real page. A back gesture
/// pops one entry; the guard is expected to push it straight back.
#[derive(Debug, Default)]
pub struct SimulatedHistory {
    depth: AtomicUsize,
    pushes: AtomicUsize,
}

impl SimulatedHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pops one entry. Returns `false` when only the real page is left, i.e.
    /// the back gesture would leave the page.
    pub fn back(&self) -> bool {
        self.depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| d.checked_sub(1))
            .is_ok()
    }

    /// Synthetic entries currently on the stack.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Total pushes since creation.
    #[must_use]
    pub fn pushes(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }
}

impl NavigationGuard for SimulatedHistory {
    fn push_synthetic_entry(&self) {
        self.depth.fetch_add(1, Ordering::SeqCst);
        self.pushes.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Contact
// ============================================================================

/// Opens the outbound contact destination. Fire-and-forget.
pub trait ContactLauncher: Send + Sync {
    /// Opens `destination`.
    fn open(&self, destination: &str);
}

/// Logs the destination instead of opening anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogContact;

impl ContactLauncher for LogContact {
    fn open(&self, destination: &str) {
        tracing::info!(destination, "opening contact destination");
    }
}
