//! Funnel session orchestration
//!
//! A [`Session`] owns the reveal state machine and every timer hanging off
//! it. All tasks are spawned into one [`TaskTracker`] and watch a child of one
//! [`CancellationToken`], so [`Session::shutdown`] (or dropping the session)
//! is the single teardown path. Page signals are handled on the caller's
//! thread, so the exit guard's reaction is complete when
//! [`Session::signal`] returns.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::FunnelConfig;
use crate::geo::{FixedGeolocator, Geolocator, resolve_city};
use crate::navigation::{ContactLauncher, DisabledNavigation, LogContact, NavigationGuard};
use crate::observability::metrics;
use crate::storage::{FlagStore, MemoryFlagStore, read_seen_flag, write_seen_flag};

use super::change::{CHANGE_BUS_CAPACITY, Change};
use super::exit_guard::{self, PageSignal};
use super::social_proof::{self, NameRotation};
use super::state::{RevealCell, RevealState, Surface, format_closing_time};
use super::urgency;

// ============================================================================
// Collaborators
// ============================================================================

/// External collaborators a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Durable seen-flag storage
    pub store: Arc<dyn FlagStore>,
    /// City lookup
    pub geolocator: Arc<dyn Geolocator>,
    /// History trap used by the exit guard
    pub navigation: Arc<dyn NavigationGuard>,
    /// Outbound contact
    pub contact: Arc<dyn ContactLauncher>,
}

impl Collaborators {
    /// In-memory store, failing geolocation, disabled navigation, logged
    /// contact. Nothing leaves the process.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            store: Arc::new(MemoryFlagStore::new()),
            geolocator: Arc::new(FixedGeolocator::failing()),
            navigation: Arc::new(DisabledNavigation),
            contact: Arc::new(LogContact),
        }
    }

    /// Replaces the flag store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn FlagStore>) -> Self {
        self.store = store;
        self
    }

    /// Replaces the geolocator.
    #[must_use]
    pub fn with_geolocator(mut self, geolocator: Arc<dyn Geolocator>) -> Self {
        self.geolocator = geolocator;
        self
    }

    /// Replaces the navigation guard.
    #[must_use]
    pub fn with_navigation(mut self, navigation: Arc<dyn NavigationGuard>) -> Self {
        self.navigation = navigation;
        self
    }

    /// Replaces the contact launcher.
    #[must_use]
    pub fn with_contact(mut self, contact: Arc<dyn ContactLauncher>) -> Self {
        self.contact = contact;
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Why the session reached [`RevealState::Revealed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealSource {
    /// The reveal delay elapsed after "play"
    Delay,
    /// The seen flag was already set at startup
    Persisted,
}

impl RevealSource {
    /// Lowercase label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delay => "delay",
            Self::Persisted => "persisted",
        }
    }
}

impl std::fmt::Display for RevealSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stand-in horizon for a deadline that does not fit in an [`Instant`].
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + delay`, clamped to a far-future instant instead of overflowing.
pub(crate) fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay).unwrap_or_else(|| now + FAR_FUTURE)
}

// ============================================================================
// Shared state
// ============================================================================

/// State shared between the session handle and its tasks.
pub(crate) struct SessionShared {
    pub(crate) id: Uuid,
    pub(crate) config: FunnelConfig,
    state: RevealCell,
    surface: watch::Sender<Surface>,
    changes: broadcast::Sender<Change>,
    rng: Mutex<StdRng>,
    rotation: Mutex<NameRotation>,
    pub(crate) notification_seq: AtomicU64,
    notifier_armed: AtomicBool,
    guard_armed: AtomicBool,
    pub(crate) cancel: CancellationToken,
    pub(crate) tracker: TaskTracker,
    store: Arc<dyn FlagStore>,
    navigation: Arc<dyn NavigationGuard>,
    contact: Arc<dyn ContactLauncher>,
}

impl SessionShared {
    pub(crate) fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn rotation(&self) -> MutexGuard<'_, NameRotation> {
        self.rotation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn navigation(&self) -> &dyn NavigationGuard {
        self.navigation.as_ref()
    }

    /// Applies `update` to the surface. When it reports a [`Change`], the
    /// change is published and watchers are woken; otherwise nobody is.
    ///
    /// The change is sent under the surface lock, so the change bus sees
    /// writes in the same order the surface does.
    pub(crate) fn publish<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut Surface) -> Option<Change>,
    {
        self.surface.send_if_modified(|surface| match update(surface) {
            Some(change) => {
                tracing::trace!(change = change.kind(), "surface changed");
                // No subscribers is fine.
                let _ = self.changes.send(change);
                true
            }
            None => false,
        })
    }

    /// Spawns a periodic timer whose first tick lands one full `period` after
    /// start. The task exits when `cancel` fires.
    pub(crate) fn spawn_periodic<F>(
        &self,
        name: &'static str,
        period: Duration,
        cancel: CancellationToken,
        mut tick: F,
    ) where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            warn!(timer = name, "zero period; timer not started");
            return;
        }
        self.tracker.spawn(async move {
            let mut interval = tokio::time::interval_at(deadline_after(period), period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        debug!(timer = name, "timer cancelled");
                        break;
                    }
                    _ = interval.tick() => tick(),
                }
            }
        });
    }

    /// Performs the transition into [`RevealState::Revealed`] and its side
    /// effects. Returns `false` if another caller already revealed.
    fn reveal(self: &Arc<Self>, source: RevealSource) -> bool {
        let from = match source {
            RevealSource::Delay => RevealState::Playing,
            RevealSource::Persisted => RevealState::Idle,
        };
        if !self.state.try_advance(from, RevealState::Revealed) {
            debug!(%source, state = %self.state.current(), "reveal skipped");
            return false;
        }

        if source == RevealSource::Delay {
            if let Err(e) = write_seen_flag(self.store.as_ref()) {
                metrics::record_storage_write_failure();
                warn!(error = %e, "could not persist seen flag; the delay will replay next visit");
            }
        }

        self.publish(|s| {
            let from = s.reveal_state;
            s.reveal_state = RevealState::Revealed;
            s.seen = true;
            s.play_affordance_visible = false;
            Some(Change::RevealState {
                from,
                to: RevealState::Revealed,
                play_affordance_visible: false,
            })
        });
        metrics::record_reveal(source.as_str());
        info!(session = %self.id, %source, "call-to-action revealed");

        self.arm_social_proof();
        self.arm_exit_guard();
        true
    }

    fn arm_social_proof(self: &Arc<Self>) {
        if self
            .notifier_armed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("social proof already armed");
            return;
        }
        social_proof::start(self, self.cancel.child_token());
    }

    fn arm_exit_guard(self: &Arc<Self>) {
        if self
            .guard_armed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("exit guard already armed");
            return;
        }
        exit_guard::arm(self);
    }
}

// ============================================================================
// Session handle
// ============================================================================

/// One visitor session.
///
/// Must be started inside a Tokio runtime. Dropping the handle cancels every
/// task; call [`Session::shutdown`] to also wait for them to finish.
pub struct Session {
    shared: Arc<SessionShared>,
}

impl Session {
    /// Starts a session: reads the seen flag, starts the urgency timers and the
    /// city lookup, and reveals immediately if the flag was set.
    #[must_use]
    pub fn start(config: FunnelConfig, collaborators: Collaborators) -> Self {
        let seen = match read_seen_flag(collaborators.store.as_ref()) {
            Ok(seen) => seen,
            Err(e) => {
                warn!(error = %e, "seen flag unreadable; treating as not seen");
                false
            }
        };

        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let closing_time = format_closing_time(&chrono::Local::now());
        let (surface, _) = watch::channel(Surface::initial(
            config.urgency.viewer_seed,
            config.urgency.spots_seed,
            closing_time,
        ));
        let (changes, _) = broadcast::channel(CHANGE_BUS_CAPACITY);

        let shared = Arc::new(SessionShared {
            id: Uuid::new_v4(),
            rotation: Mutex::new(NameRotation::new(config.social_proof.names.clone())),
            config,
            state: RevealCell::new(RevealState::Idle),
            surface,
            changes,
            rng: Mutex::new(rng),
            notification_seq: AtomicU64::new(0),
            notifier_armed: AtomicBool::new(false),
            guard_armed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            store: collaborators.store,
            navigation: collaborators.navigation,
            contact: collaborators.contact,
        });

        info!(session = %shared.id, seen, "session started");

        urgency::start(&shared);
        Self::spawn_city_lookup(&shared, collaborators.geolocator);

        if seen {
            shared.reveal(RevealSource::Persisted);
        }

        Self { shared }
    }

    fn spawn_city_lookup(shared: &Arc<SessionShared>, geolocator: Arc<dyn Geolocator>) {
        let lookup = Arc::clone(shared);
        let cancel = shared.cancel.child_token();
        shared.tracker.spawn(async move {
            let geo = &lookup.config.geolocation;
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                city = resolve_city(geolocator.as_ref(), geo.timeout, &geo.fallback_city) => {
                    lookup.publish(|s| {
                        s.city = Some(city.clone());
                        Some(Change::City { city })
                    });
                }
            }
        });
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Configuration the session runs with.
    #[must_use]
    pub fn config(&self) -> &FunnelConfig {
        &self.shared.config
    }

    /// Current surface snapshot.
    #[must_use]
    pub fn surface(&self) -> Surface {
        self.shared.surface.borrow().clone()
    }

    /// Receiver notified on every surface change. Watch receivers only see
    /// the latest snapshot; use [`Session::watch_changes`] to observe every
    /// transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Surface> {
        self.shared.surface.subscribe()
    }

    /// Current surface together with a receiver for every [`Change`] after
    /// it. Both are taken under the surface lock, so replaying the changes
    /// onto the snapshot reproduces the live surface.
    #[must_use]
    pub fn watch_changes(&self) -> (Surface, broadcast::Receiver<Change>) {
        let shared = &self.shared;
        let mut taken = None;
        shared.surface.send_if_modified(|s| {
            taken = Some((s.clone(), shared.changes.subscribe()));
            false
        });
        taken.unwrap_or_else(|| (self.surface(), shared.changes.subscribe()))
    }

    /// Current reveal state.
    #[must_use]
    pub fn reveal_state(&self) -> RevealState {
        self.shared.state.current()
    }

    /// Handles the video widget's "play" signal.
    ///
    /// Only the first call from [`RevealState::Idle`] has any effect: it hides
    /// the play affordance and schedules the reveal. Returns whether it did.
    pub fn play(&self) -> bool {
        let shared = &self.shared;
        if !shared
            .state
            .try_advance(RevealState::Idle, RevealState::Playing)
        {
            debug!(state = %shared.state.current(), "play ignored");
            return false;
        }

        shared.publish(|s| {
            let from = s.reveal_state;
            s.reveal_state = RevealState::Playing;
            s.play_affordance_visible = false;
            Some(Change::RevealState {
                from,
                to: RevealState::Playing,
                play_affordance_visible: false,
            })
        });
        info!(session = %shared.id, delay = ?shared.config.reveal.delay, "playback started");

        let revealer = Arc::clone(shared);
        let cancel = shared.cancel.child_token();
        let delay = shared.config.reveal.delay;
        shared.tracker.spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => debug!("reveal delay cancelled"),
                () = tokio::time::sleep_until(deadline_after(delay)) => {
                    revealer.reveal(RevealSource::Delay);
                }
            }
        });
        true
    }

    /// Delivers a page signal to the exit guard.
    ///
    /// Returns `false` when the guard is not armed (before the reveal or after
    /// shutdown) and the signal was ignored. Otherwise the guard has already
    /// reacted when this returns: a back attempt has its synthetic history
    /// entry restored and the modal is up.
    pub fn signal(&self, signal: PageSignal) -> bool {
        if !self.is_exit_guard_armed() {
            debug!(?signal, "page signal ignored; exit guard not armed");
            return false;
        }
        exit_guard::handle(&self.shared, signal);
        true
    }

    /// Closes the exit modal. The guard stays armed. Returns whether the modal
    /// was open.
    pub fn dismiss_exit_modal(&self) -> bool {
        self.shared.publish(|s| {
            if !s.exit_modal_visible {
                return None;
            }
            s.exit_modal_visible = false;
            Some(Change::ExitModalDismissed)
        })
    }

    /// Opens the contact destination from the CTA or the exit modal. Ignored
    /// until revealed, since neither is on screen before that.
    pub fn contact(&self) -> bool {
        if !self.reveal_state().is_revealed() {
            debug!("contact ignored before reveal");
            return false;
        }
        self.shared
            .contact
            .open(&self.shared.config.contact.destination);
        true
    }

    /// Whether the social proof notifier has been armed.
    #[must_use]
    pub fn is_social_proof_armed(&self) -> bool {
        self.shared.notifier_armed.load(Ordering::SeqCst)
    }

    /// Whether the exit guard is armed and still listening. Shutdown
    /// releases it.
    #[must_use]
    pub fn is_exit_guard_armed(&self) -> bool {
        self.shared.guard_armed.load(Ordering::SeqCst) && !self.shared.cancel.is_cancelled()
    }

    /// Names shown in the current rotation cycle.
    #[must_use]
    pub fn used_name_count(&self) -> usize {
        self.shared.rotation().used().len()
    }

    /// Number of live session tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.shared.tracker.len()
    }

    /// Cancels every timer, releases the exit guard, and waits for the tasks
    /// to finish.
    pub async fn shutdown(&self) {
        self.shared.cancel.cancel();
        self.shared.tracker.close();
        self.shared.tracker.wait().await;
        info!(session = %self.shared.id, "session ended");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.shared.id)
            .field("reveal_state", &self.shared.state.current())
            .field("tasks", &self.shared.tracker.len())
            .finish_non_exhaustive()
    }
}
