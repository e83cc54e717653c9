//! Capability traits at the two seams of the controller.
//!
//! - [`Transport`] is consumed: whatever actually performs the network I/O.
//! - [`RequestHandle`] is exposed: what a caller holds to control a request.
//!
//! Both are synchronous and infallible. Implementations are shared across
//! threads, hence the `Send + Sync` bounds.

use crate::state::LifecycleState;
use std::sync::Arc;

/// The underlying network operation that can be told to resume, suspend or cancel.
///
/// The controller places no constraints on what these calls do internally,
/// only that they return once the request has been issued. Each call is made at
/// most once per legal lifecycle transition.
///
/// # Example
///
/// ```ignore
/// struct HttpTask { /* ... */ }
///
/// impl Transport for HttpTask {
///     fn resume(&self) { self.inner.resume() }
///     fn suspend(&self) { self.inner.suspend() }
///     fn cancel(&self) { self.inner.cancel() }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Start or continue the operation
    fn resume(&self);

    /// Pause the operation
    fn suspend(&self);

    /// Abort the operation
    fn cancel(&self);
}

/// A cancellable handle over one or more in-flight operations.
///
/// `resume`, `suspend` and `cancel` are requests to move to a lifecycle state.
/// Requests that are not legal from the current state are silently ignored, so
/// every method is safe to call at any time from any thread.
pub trait RequestHandle: Send + Sync {
    /// Request the [`LifecycleState::Resumed`] state
    fn resume(&self);

    /// Request the [`LifecycleState::Suspended`] state
    fn suspend(&self);

    /// Request the [`LifecycleState::Cancelled`] state
    fn cancel(&self);

    /// Current lifecycle state
    fn state(&self) -> LifecycleState;

    /// Issue the lifecycle call that matches `state`.
    ///
    /// Sequence handles use this to bring a freshly attached step in line with
    /// their own state.
    fn apply_state(&self, state: LifecycleState) {
        match state {
            LifecycleState::Resumed => self.resume(),
            LifecycleState::Suspended => self.suspend(),
            LifecycleState::Cancelled => self.cancel(),
        }
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn resume(&self) {
        (**self).resume();
    }

    fn suspend(&self) {
        (**self).suspend();
    }

    fn cancel(&self) {
        (**self).cancel();
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn resume(&self) {
        (**self).resume();
    }

    fn suspend(&self) {
        (**self).suspend();
    }

    fn cancel(&self) {
        (**self).cancel();
    }
}

impl<H: RequestHandle + ?Sized> RequestHandle for Arc<H> {
    fn resume(&self) {
        (**self).resume();
    }

    fn suspend(&self) {
        (**self).suspend();
    }

    fn cancel(&self) {
        (**self).cancel();
    }

    fn state(&self) -> LifecycleState {
        (**self).state()
    }
}

impl<H: RequestHandle + ?Sized> RequestHandle for Box<H> {
    fn resume(&self) {
        (**self).resume();
    }

    fn suspend(&self) {
        (**self).suspend();
    }

    fn cancel(&self) {
        (**self).cancel();
    }

    fn state(&self) -> LifecycleState {
        (**self).state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Journal {
        calls: Mutex<Vec<LifecycleState>>,
    }

    impl RequestHandle for Journal {
        fn resume(&self) {
            self.calls.lock().unwrap().push(LifecycleState::Resumed);
        }

        fn suspend(&self) {
            self.calls.lock().unwrap().push(LifecycleState::Suspended);
        }

        fn cancel(&self) {
            self.calls.lock().unwrap().push(LifecycleState::Cancelled);
        }

        fn state(&self) -> LifecycleState {
            self.calls
                .lock()
                .unwrap()
                .last()
                .copied()
                .unwrap_or_default()
        }
    }

    #[test]
    fn test_apply_state_dispatches_matching_call() {
        let journal = Journal::default();

        journal.apply_state(LifecycleState::Suspended);
        journal.apply_state(LifecycleState::Resumed);
        journal.apply_state(LifecycleState::Cancelled);

        assert_eq!(
            *journal.calls.lock().unwrap(),
            vec![
                LifecycleState::Suspended,
                LifecycleState::Resumed,
                LifecycleState::Cancelled
            ]
        );
    }

    #[test]
    fn test_arc_forwards_to_inner_handle() {
        let journal = Arc::new(Journal::default());
        let shared: Arc<dyn RequestHandle> = Arc::clone(&journal) as Arc<dyn RequestHandle>;

        shared.suspend();

        assert_eq!(shared.state(), LifecycleState::Suspended);
        assert_eq!(journal.calls.lock().unwrap().len(), 1);
    }
}
