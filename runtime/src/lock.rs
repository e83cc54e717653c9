//! The locked state cell shared by every request handle.
//!
//! [`LifecycleLock`] owns a handle's lifecycle state and the thing the handle
//! delegates to (a transport, or the current step of a sequence). Both sit
//! behind one [`parking_lot::ReentrantMutex`], and every state read, state write
//! and delegated side effect happens while it is held.
//!
//! # Transition protocol
//!
//! [`LifecycleLock::apply_transition`] runs entirely under the lock:
//!
//! 1. Read the current state
//! 2. Decide the edge with [`TransitionOutcome::decide`]
//! 3. If legal, run the side effect, **then** commit the new state
//! 4. Otherwise do nothing
//!
//! The lock serializes callers, so a side effect fires exactly once per legal
//! transition even when many threads race on the same handle.
//!
//! # Re-entrancy
//!
//! The mutex is re-entrant because a side effect may call back into the same
//! handle on the same thread (a transport whose `cancel` synchronously reports
//! completion, for example). Such a request is not applied in the middle of the
//! running transition. It is parked and applied right after the running
//! transition commits. A parked cancellation is never overwritten.
//!
//! A delegate installed from inside a side effect is handed the state being
//! entered, not the one being left.

use crate::config::HandleConfig;
use crate::metrics::LifecycleMetrics;
use parking_lot::ReentrantMutex;
use request_lifecycle_core::{HandleKind, LifecycleState, TransitionOutcome};
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Data guarded by the handle lock.
struct Slot<T: ?Sized> {
    state: Cell<LifecycleState>,
    /// State being entered while a side effect runs
    applying: Cell<Option<LifecycleState>>,
    pending: Cell<Option<LifecycleState>>,
    target: RefCell<Option<Arc<T>>>,
}

/// Clears the `applying` marker even if the side effect unwinds.
///
/// On unwind the transition is not committed, so requests parked during it
/// are dropped as well.
struct ApplyingGuard<'a> {
    marker: &'a Cell<Option<LifecycleState>>,
    pending: &'a Cell<Option<LifecycleState>>,
}

impl<'a> ApplyingGuard<'a> {
    fn enter<T: ?Sized>(slot: &'a Slot<T>, to: LifecycleState) -> Self {
        slot.applying.set(Some(to));
        Self {
            marker: &slot.applying,
            pending: &slot.pending,
        }
    }
}

impl Drop for ApplyingGuard<'_> {
    fn drop(&mut self) {
        self.marker.set(None);
        if std::thread::panicking() {
            self.pending.set(None);
        }
    }
}

/// Lifecycle state plus delegate, guarded by one re-entrant lock.
///
/// `T` is the delegate type: `dyn Transport` for single handles,
/// `dyn RequestHandle` for sequence handles.
pub struct LifecycleLock<T: ?Sized> {
    kind: HandleKind,
    config: HandleConfig,
    slot: ReentrantMutex<Slot<T>>,
    applied: AtomicU64,
    ignored: AtomicU64,
    deferred: AtomicU64,
}

impl<T: ?Sized> LifecycleLock<T> {
    /// Create a lock in the [`LifecycleState::Resumed`] state.
    #[must_use]
    pub fn new(kind: HandleKind, config: HandleConfig, target: Option<Arc<T>>) -> Self {
        Self::with_state(kind, config, target, LifecycleState::Resumed)
    }

    /// Create a lock whose delegate is already in `state`.
    ///
    /// No side effect runs; the caller is responsible for `target` actually
    /// being in that state.
    #[must_use]
    pub fn with_state(
        kind: HandleKind,
        config: HandleConfig,
        target: Option<Arc<T>>,
        state: LifecycleState,
    ) -> Self {
        Self {
            kind,
            config,
            slot: ReentrantMutex::new(Slot {
                state: Cell::new(state),
                applying: Cell::new(None),
                pending: Cell::new(None),
                target: RefCell::new(target),
            }),
            applied: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
            deferred: AtomicU64::new(0),
        }
    }

    /// Current lifecycle state.
    ///
    /// Blocks while another thread is applying a transition.
    pub fn state(&self) -> LifecycleState {
        self.slot.lock().state.get()
    }

    /// Handle configuration
    #[must_use]
    pub const fn config(&self) -> &HandleConfig {
        &self.config
    }

    /// Handle kind
    #[must_use]
    pub const fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Whether a delegate is currently installed.
    pub fn has_target(&self) -> bool {
        self.slot.lock().target.borrow().is_some()
    }

    /// Request a transition to `requested`.
    ///
    /// `before_change` receives the delegate (if any) and the state being
    /// entered. It runs with the lock held, exactly once per applied transition,
    /// before the new state is committed. Requests parked by re-entrant calls are
    /// applied through the same closure before this method returns.
    pub fn apply_transition<F>(&self, requested: LifecycleState, mut before_change: F) -> TransitionOutcome
    where
        F: FnMut(Option<&T>, LifecycleState),
    {
        let slot = self.slot.lock();

        if slot.applying.get().is_some() {
            let current = slot.state.get();
            let parked = match slot.pending.get() {
                Some(LifecycleState::Cancelled) => LifecycleState::Cancelled,
                _ => requested,
            };
            slot.pending.set(Some(parked));
            self.deferred.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                handle = %self.config.label,
                kind = %self.kind,
                from = %current,
                to = %requested,
                "Lifecycle transition requested from inside a side effect, deferring"
            );
            return TransitionOutcome::Deferred { current, requested };
        }

        let outcome = self.transition(&slot, requested, &mut before_change);

        while let Some(next) = slot.pending.take() {
            self.transition(&slot, next, &mut before_change);
        }

        outcome
    }

    /// Install `target` as the delegate and hand it the current state.
    ///
    /// Called from inside a side effect, the current state is the one being
    /// entered.
    ///
    /// Swap and `on_install` happen under a single lock acquisition, so no
    /// transition can slip in between. The previous delegate is released and
    /// receives no further calls through this lock.
    pub fn install<F>(&self, target: Arc<T>, on_install: F)
    where
        F: FnOnce(&T, LifecycleState),
    {
        let slot = self.slot.lock();
        let state = self.swap_target(&slot, Arc::clone(&target));
        on_install(&target, state);
    }

    /// Build a delegate for the current state and install it.
    ///
    /// `build` runs under the lock, so the state it is given cannot change
    /// before the delegate is in place. It must return a delegate that is
    /// already in that state; no lifecycle call is made on it.
    pub fn install_with<F, R>(&self, build: F) -> R
    where
        F: FnOnce(LifecycleState) -> (Arc<T>, R),
    {
        let slot = self.slot.lock();
        let state = slot.applying.get().unwrap_or_else(|| slot.state.get());
        let (target, built) = build(state);
        self.swap_target(&slot, target);
        built
    }

    fn swap_target(&self, slot: &Slot<T>, target: Arc<T>) -> LifecycleState {
        let previous = slot.target.replace(Some(target));
        let state = slot.applying.get().unwrap_or_else(|| slot.state.get());

        tracing::debug!(
            handle = %self.config.label,
            kind = %self.kind,
            state = %state,
            replaced = previous.is_some(),
            "Installing delegate"
        );

        state
    }

    /// Snapshot of this handle's counters.
    #[must_use]
    pub fn stats(&self) -> HandleStats {
        HandleStats {
            applied: self.applied.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
        }
    }

    fn transition<F>(&self, slot: &Slot<T>, requested: LifecycleState, before_change: &mut F) -> TransitionOutcome
    where
        F: FnMut(Option<&T>, LifecycleState),
    {
        let outcome = TransitionOutcome::decide(slot.state.get(), requested);

        match outcome {
            TransitionOutcome::Applied { from, to } => {
                tracing::debug!(
                    handle = %self.config.label,
                    kind = %self.kind,
                    from = %from,
                    to = %to,
                    "Applying lifecycle transition"
                );

                // Clone out so a re-entrant install can swap the delegate meanwhile
                let target = slot.target.borrow().clone();
                {
                    let _applying = ApplyingGuard::enter(slot, to);
                    before_change(target.as_deref(), to);
                }
                slot.state.set(to);

                self.applied.fetch_add(1, Ordering::Relaxed);
                if self.config.record_metrics {
                    LifecycleMetrics::record_transition(self.kind, to);
                }
            }
            TransitionOutcome::Ignored { current, requested } => {
                tracing::trace!(
                    handle = %self.config.label,
                    kind = %self.kind,
                    state = %current,
                    requested = %requested,
                    "Ignoring lifecycle transition"
                );

                self.ignored.fetch_add(1, Ordering::Relaxed);
                if self.config.record_metrics {
                    LifecycleMetrics::record_ignored(self.kind, requested);
                }
            }
            TransitionOutcome::Deferred { .. } => {}
        }

        outcome
    }
}

impl<T: ?Sized> std::fmt::Debug for LifecycleLock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleLock")
            .field("kind", &self.kind)
            .field("label", &self.config.label)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Per-handle transition counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleStats {
    /// Transitions whose side effect ran
    pub applied: u64,
    /// Requests dropped by the transition table
    pub ignored: u64,
    /// Requests parked because they arrived from inside a side effect
    pub deferred: u64,
}
