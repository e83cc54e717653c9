//! A request handle over exactly one transport primitive.

use crate::config::HandleConfig;
use crate::lock::{HandleStats, LifecycleLock};
use crate::task::{RequestCompletion, spawn_request_in};
use request_lifecycle_core::{HandleKind, LifecycleState, RequestHandle, Transport};
use std::future::Future;
use std::sync::Arc;

/// Forward the lifecycle call matching `state` to a transport.
fn dispatch(transport: Option<&dyn Transport>, state: LifecycleState) {
    let Some(transport) = transport else {
        return;
    };

    match state {
        LifecycleState::Resumed => transport.resume(),
        LifecycleState::Suspended => transport.suspend(),
        LifecycleState::Cancelled => transport.cancel(),
    }
}

/// Request handle wrapping a single transport primitive.
///
/// Cloning is cheap and every clone controls the same request. The transport
/// is optional: a handle created without one (for example because building the
/// request failed) still tracks its state and can be cancelled, it just has
/// nothing to forward to.
///
/// # Example
///
/// ```rust
/// use request_lifecycle_core::{LifecycleState, RequestHandle, Transport};
/// use request_lifecycle_runtime::SingleRequestHandle;
///
/// struct Noop;
///
/// impl Transport for Noop {
///     fn resume(&self) {}
///     fn suspend(&self) {}
///     fn cancel(&self) {}
/// }
///
/// let handle = SingleRequestHandle::new(Noop);
/// handle.suspend();
/// handle.cancel();
/// handle.resume(); // ignored, cancellation is permanent
///
/// assert_eq!(handle.state(), LifecycleState::Cancelled);
/// ```
#[derive(Debug, Clone)]
pub struct SingleRequestHandle {
    lock: Arc<LifecycleLock<dyn Transport>>,
}

impl SingleRequestHandle {
    /// Wrap `transport` with the default configuration.
    #[must_use]
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_config(Some(Arc::new(transport)), HandleConfig::default())
    }

    /// Create a handle with no transport attached.
    #[must_use]
    pub fn empty() -> Self {
        Self::with_config(None, HandleConfig::default())
    }

    /// Create a handle from an optional shared transport and a configuration.
    #[must_use]
    pub fn with_config(transport: Option<Arc<dyn Transport>>, config: HandleConfig) -> Self {
        Self {
            lock: Arc::new(LifecycleLock::new(HandleKind::Single, config, transport)),
        }
    }

    /// Spawn `future` on the current tokio runtime and wrap it in a handle.
    ///
    /// Returns the handle together with the completion of the spawned request.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn<F>(future: F, config: HandleConfig) -> (Self, RequestCompletion<F::Output>)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        Self::spawn_in(future, config, LifecycleState::Resumed)
    }

    /// Spawn `future` with its handle and transport already in `initial`.
    ///
    /// A `Suspended` request is not polled until resumed, and a `Cancelled`
    /// one is never polled at all. No lifecycle call is needed to get there,
    /// so there is no window in which the task runs in the wrong state.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn spawn_in<F>(
        future: F,
        config: HandleConfig,
        initial: LifecycleState,
    ) -> (Self, RequestCompletion<F::Output>)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let (transport, completion) = spawn_request_in(future, initial);
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let handle = Self {
            lock: Arc::new(LifecycleLock::with_state(
                HandleKind::Single,
                config,
                Some(transport),
                initial,
            )),
        };
        (handle, completion)
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.lock.state()
    }

    /// Whether a transport is attached
    #[must_use]
    pub fn has_transport(&self) -> bool {
        self.lock.has_target()
    }

    /// Handle configuration
    #[must_use]
    pub fn config(&self) -> &HandleConfig {
        self.lock.config()
    }

    /// Transition counters for this handle
    #[must_use]
    pub fn stats(&self) -> HandleStats {
        self.lock.stats()
    }

    /// Request `state`, forwarding to the transport if the edge is legal.
    fn request(&self, state: LifecycleState) {
        self.lock
            .apply_transition(state, |transport, to| dispatch(transport, to));
    }
}

impl RequestHandle for SingleRequestHandle {
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
        self.lock.state()
    }
}
