//! Recording doubles for both seams of the controller.
//!
//! Unlike real handles these doubles apply no transition table: every call is
//! recorded, which is what tests need to prove that a handle forwarded a call
//! (or did not).

use parking_lot::Mutex;
use request_lifecycle_core::{LifecycleState, RequestHandle, Transport};
use std::sync::Arc;

/// One lifecycle call observed by a recording double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    /// `resume()` was called
    Resume,
    /// `suspend()` was called
    Suspend,
    /// `cancel()` was called
    Cancel,
}

impl Call {
    /// The call that requests `state`.
    #[must_use]
    pub const fn for_state(state: LifecycleState) -> Self {
        match state {
            LifecycleState::Resumed => Self::Resume,
            LifecycleState::Suspended => Self::Suspend,
            LifecycleState::Cancelled => Self::Cancel,
        }
    }

    /// The state this call requests.
    #[must_use]
    pub const fn target(self) -> LifecycleState {
        match self {
            Self::Resume => LifecycleState::Resumed,
            Self::Suspend => LifecycleState::Suspended,
            Self::Cancel => LifecycleState::Cancelled,
        }
    }
}

/// Shared, ordered log of calls.
#[derive(Debug, Clone, Default)]
struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    fn push(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn snapshot(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn count(&self, call: Call) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Transport that records every call it receives.
///
/// Clones share the same log, so a test can keep one clone while the handle
/// under test owns another.
///
/// # Example
///
/// ```
/// use request_lifecycle_core::Transport;
/// use request_lifecycle_testing::{Call, RecordingTransport};
///
/// let transport = RecordingTransport::new();
/// transport.clone().cancel();
/// assert_eq!(transport.calls(), vec![Call::Cancel]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    log: CallLog,
}

impl RecordingTransport {
    /// Create a transport with an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls received so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.log.snapshot()
    }

    /// Number of times `call` was received
    #[must_use]
    pub fn count(&self, call: Call) -> usize {
        self.log.count(call)
    }

    /// Forget every recorded call
    pub fn clear(&self) {
        self.log.clear();
    }
}

impl Transport for RecordingTransport {
    fn resume(&self) {
        self.log.push(Call::Resume);
    }

    fn suspend(&self) {
        self.log.push(Call::Suspend);
    }

    fn cancel(&self) {
        self.log.push(Call::Cancel);
    }
}

/// Request handle that records every call it receives.
///
/// Used as a sequence step. Its reported state is the target of the last call
/// received, or `Resumed` if none.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandle {
    log: CallLog,
}

impl RecordingHandle {
    /// Create a handle with an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls received so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.log.snapshot()
    }

    /// Number of times `call` was received
    #[must_use]
    pub fn count(&self, call: Call) -> usize {
        self.log.count(call)
    }
}

impl RequestHandle for RecordingHandle {
    fn resume(&self) {
        self.log.push(Call::Resume);
    }

    fn suspend(&self) {
        self.log.push(Call::Suspend);
    }

    fn cancel(&self) {
        self.log.push(Call::Cancel);
    }

    fn state(&self) -> LifecycleState {
        self.log
            .snapshot()
            .last()
            .map_or(LifecycleState::Resumed, |call| call.target())
    }
}
