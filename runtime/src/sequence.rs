//! A request handle over a chain of dependent steps.
//!
//! A multi-step operation (fetch an upload token, then upload, then confirm)
//! is controlled through one [`SequenceRequestHandle`]. Whatever drives the
//! chain installs each step's handle with
//! [`SequenceRequestHandle::set_current_request`] as the chain advances.
//!
//! # Propagation
//!
//! Lifecycle calls on the sequence reach whichever step is current at that
//! moment. A step installed later is immediately brought to the sequence's own
//! state: a sequence suspended before step two exists keeps step two suspended
//! from the moment it is attached, and a cancelled sequence cancels every step
//! attached after the cancellation.
//!
//! # Lock ordering
//!
//! Delegated calls run with the sequence lock held and take the step's own
//! lock, so locks are always acquired sequence first, step second. Steps must
//! not hold their own lock while calling into the sequence.

use crate::config::HandleConfig;
use crate::lock::{HandleStats, LifecycleLock};
use crate::metrics::LifecycleMetrics;
use crate::single::SingleRequestHandle;
use crate::task::RequestCompletion;
use request_lifecycle_core::{HandleKind, LifecycleState, RequestHandle};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sequence handle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceStats {
    /// Transition counters of the sequence itself
    pub transitions: HandleStats,
    /// Number of steps installed so far
    pub steps_attached: u64,
}

/// Request handle for a sequence of dependent requests.
///
/// Cloning is cheap; the driver typically keeps one clone to install steps
/// while the caller keeps another to resume, suspend or cancel.
///
/// # Example
///
/// ```rust
/// use request_lifecycle_core::{LifecycleState, RequestHandle};
/// use request_lifecycle_runtime::{SequenceRequestHandle, SingleRequestHandle};
///
/// let sequence = SequenceRequestHandle::new();
/// sequence.cancel();
///
/// // A step attached after cancellation is cancelled on arrival
/// let step = SingleRequestHandle::empty();
/// sequence.set_current_request(step.clone());
///
/// assert_eq!(step.state(), LifecycleState::Cancelled);
/// ```
#[derive(Debug, Clone)]
pub struct SequenceRequestHandle {
    inner: Arc<SequenceInner>,
}

#[derive(Debug)]
struct SequenceInner {
    lock: LifecycleLock<dyn RequestHandle>,
    steps_attached: AtomicU64,
}

impl Default for SequenceRequestHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceRequestHandle {
    /// Create a sequence with no current step.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HandleConfig::default())
    }

    /// Create a sequence with no current step and the given configuration.
    #[must_use]
    pub fn with_config(config: HandleConfig) -> Self {
        Self {
            inner: Arc::new(SequenceInner {
                lock: LifecycleLock::new(HandleKind::Sequence, config, None),
                steps_attached: AtomicU64::new(0),
            }),
        }
    }

    /// Create a sequence whose first step is already known.
    ///
    /// The step is stored as the current step without any lifecycle call.
    /// Both start out resumed, so the step is expected to be running already;
    /// unlike [`Self::set_current_request`] it does not receive `resume()`.
    #[must_use]
    pub fn with_first_step(step: impl RequestHandle + 'static, config: HandleConfig) -> Self {
        let step: Arc<dyn RequestHandle> = Arc::new(step);
        Self {
            inner: Arc::new(SequenceInner {
                lock: LifecycleLock::new(HandleKind::Sequence, config, Some(step)),
                steps_attached: AtomicU64::new(1),
            }),
        }
    }

    /// Make `step` the current step of the sequence.
    ///
    /// Under a single lock acquisition the previous step is released (it gets
    /// no further lifecycle calls from this sequence) and `step` receives the
    /// call matching the sequence's current state: `resume` when resumed,
    /// `suspend` when suspended, `cancel` when cancelled.
    pub fn set_current_request(&self, step: impl RequestHandle + 'static) {
        let step: Arc<dyn RequestHandle> = Arc::new(step);

        self.inner.lock.install(step, |step, state| {
            self.count_attached(state);
            step.apply_state(state);
        });
    }

    /// Spawn `future` as the next step of the sequence.
    ///
    /// The future runs on the current tokio runtime behind a
    /// [`SingleRequestHandle`] that becomes the current step. The task is
    /// spawned under the sequence lock already in the sequence's state: a
    /// suspended sequence spawns it suspended, and a cancelled sequence spawns
    /// it aborted, so the future is never polled and the completion resolves
    /// to [`RequestError::Cancelled`](crate::error::RequestError::Cancelled).
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn_step<F>(&self, future: F) -> RequestCompletion<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let step_config = self.inner.lock.config().clone();

        self.inner.lock.install_with(|state| {
            let (step, completion) = SingleRequestHandle::spawn_in(future, step_config, state);
            self.count_attached(state);
            let step: Arc<dyn RequestHandle> = Arc::new(step);
            (step, completion)
        })
    }

    /// Current lifecycle state of the sequence
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.inner.lock.state()
    }

    /// Whether a step has been installed
    #[must_use]
    pub fn has_current_request(&self) -> bool {
        self.inner.lock.has_target()
    }

    /// Handle configuration
    #[must_use]
    pub fn config(&self) -> &HandleConfig {
        self.inner.lock.config()
    }

    /// Counters for this sequence
    #[must_use]
    pub fn stats(&self) -> SequenceStats {
        SequenceStats {
            transitions: self.inner.lock.stats(),
            steps_attached: self.inner.steps_attached.load(Ordering::Relaxed),
        }
    }

    fn count_attached(&self, state: LifecycleState) {
        self.inner.steps_attached.fetch_add(1, Ordering::Relaxed);
        if self.inner.lock.config().record_metrics {
            LifecycleMetrics::record_step_attached(state);
        }
    }

    fn request(&self, state: LifecycleState) {
        self.inner.lock.apply_transition(state, |step, to| {
            if let Some(step) = step {
                step.apply_state(to);
            }
        });
    }
}

impl RequestHandle for SequenceRequestHandle {
    fn resume(&self) {
        self.request(LifecycleState::Resumed);
    }

    fn suspend(&self) {
        self.request(LifecycleState::Suspended);
    }

    fn cancel(&self) {
        self.request(LifecycleState::Cancelled);
    }

    fn state(&self) -> LifecycleState {
        self.inner.lock.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use request_lifecycle_testing::{Call, RecordingHandle};

    fn quiet() -> SequenceRequestHandle {
        SequenceRequestHandle::with_config(HandleConfig::builder().record_metrics(false).build())
    }

    #[test]
    fn test_calls_without_step_only_change_state() {
        let sequence = quiet();
        assert!(!sequence.has_current_request());

        sequence.suspend();
        assert_eq!(sequence.state(), LifecycleState::Suspended);

        sequence.cancel();
        assert_eq!(sequence.state(), LifecycleState::Cancelled);
    }

    #[test]
    fn test_resumed_sequence_resumes_new_step() {
        let sequence = quiet();
        let step = RecordingHandle::new();

        sequence.set_current_request(step.clone());

        assert_eq!(step.calls(), vec![Call::Resume]);
        assert!(sequence.has_current_request());
    }

    #[test]
    fn test_suspended_sequence_suspends_new_step() {
        let sequence = quiet();
        sequence.suspend();

        let step_b = RecordingHandle::new();
        sequence.set_current_request(step_b.clone());

        assert_eq!(step_b.calls(), vec![Call::Suspend]);
    }

    #[test]
    fn test_cancelled_sequence_cancels_new_step_and_nothing_else() {
        let sequence = quiet();
        sequence.cancel();

        let step_c = RecordingHandle::new();
        sequence.set_current_request(step_c.clone());

        sequence.resume();
        sequence.suspend();
        sequence.cancel();

        assert_eq!(step_c.calls(), vec![Call::Cancel]);
    }

    #[test]
    fn test_calls_reach_current_step_only() {
        let sequence = quiet();
        let first = RecordingHandle::new();
        let second = RecordingHandle::new();

        sequence.set_current_request(first.clone());
        sequence.suspend();

        sequence.set_current_request(second.clone());
        sequence.resume();
        sequence.cancel();

        assert_eq!(first.calls(), vec![Call::Resume, Call::Suspend]);
        assert_eq!(
            second.calls(),
            vec![Call::Suspend, Call::Resume, Call::Cancel]
        );
    }

    #[test]
    fn test_self_transition_does_not_reach_step() {
        let sequence = quiet();
        let step = RecordingHandle::new();
        sequence.set_current_request(step.clone());

        sequence.resume();
        sequence.resume();

        assert_eq!(step.calls(), vec![Call::Resume]);
        assert_eq!(sequence.stats().transitions.ignored, 2);
    }

    #[test]
    fn test_nested_sequences_propagate() {
        let outer = quiet();
        let inner = quiet();
        let leaf = RecordingHandle::new();

        inner.set_current_request(leaf.clone());
        outer.set_current_request(inner.clone());
        outer.suspend();
        outer.cancel();

        assert_eq!(inner.state(), LifecycleState::Cancelled);
        assert_eq!(
            leaf.calls(),
            vec![Call::Resume, Call::Suspend, Call::Cancel]
        );
    }

    #[test]
    fn test_stats_count_attached_steps() {
        let sequence = quiet();

        sequence.set_current_request(RecordingHandle::new());
        sequence.set_current_request(RecordingHandle::new());
        sequence.cancel();

        let stats = sequence.stats();
        assert_eq!(stats.steps_attached, 2);
        assert_eq!(stats.transitions.applied, 1);
    }

    #[test]
    fn test_with_first_step_stores_step_without_call() {
        let step = RecordingHandle::new();
        let sequence = SequenceRequestHandle::with_first_step(
            step.clone(),
            HandleConfig::builder().record_metrics(false).build(),
        );

        assert!(step.calls().is_empty());
        assert!(sequence.has_current_request());
        assert_eq!(sequence.stats().steps_attached, 1);

        sequence.cancel();

        assert_eq!(step.calls(), vec![Call::Cancel]);
    }
}
