//! Given-When-Then scenarios for single and sequence handles

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use request_lifecycle_core::{LifecycleState, RequestHandle, Transport};
use request_lifecycle_runtime::{HandleConfig, SequenceRequestHandle, SingleRequestHandle};
use request_lifecycle_testing::{Call, LifecycleTest, RecordingHandle, RecordingTransport, assertions};
use std::sync::{Arc, OnceLock};

fn quiet() -> HandleConfig {
    HandleConfig::builder().record_metrics(false).build()
}

fn single(transport: &RecordingTransport) -> SingleRequestHandle {
    SingleRequestHandle::with_config(Some(Arc::new(transport.clone())), quiet())
}

// ============================================================================
// Single handle
// ============================================================================

#[test]
fn test_suspended_request_resumes() {
    let transport = RecordingTransport::new();
    let observed = transport.clone();

    LifecycleTest::new(single(&transport))
        .given(&[Call::Suspend])
        .when(Call::Resume)
        .then_state(LifecycleState::Resumed)
        .then(move |_| assert_eq!(observed.calls(), vec![Call::Suspend, Call::Resume]))
        .run();
}

#[test]
fn test_cancelled_request_ignores_everything() {
    let transport = RecordingTransport::new();
    let observed = transport.clone();

    LifecycleTest::new(single(&transport))
        .given(&[Call::Cancel])
        .when(Call::Resume)
        .when(Call::Suspend)
        .when(Call::Cancel)
        .then_state(LifecycleState::Cancelled)
        .then(move |handle| {
            assert_eq!(observed.calls(), vec![Call::Cancel]);
            assert_eq!(handle.stats().ignored, 3);
        })
        .run();
}

#[test]
fn test_repeated_suspend_forwards_once() {
    let transport = RecordingTransport::new();
    let observed = transport.clone();

    LifecycleTest::new(single(&transport))
        .when(Call::Suspend)
        .when(Call::Suspend)
        .then_state(LifecycleState::Suspended)
        .then(move |_| assertions::assert_call_count(&observed.calls(), Call::Suspend, 1))
        .run();
}

#[test]
fn test_missing_transport_still_tracks_state() {
    LifecycleTest::new(SingleRequestHandle::with_config(None, quiet()))
        .when(Call::Suspend)
        .when(Call::Cancel)
        .then_state(LifecycleState::Cancelled)
        .then(|handle| {
            assert!(!handle.has_transport());
            assert_eq!(handle.stats().applied, 2);
        })
        .run();
}

/// Transport that calls back into its own handle while being cancelled.
struct Reentrant {
    handle: OnceLock<SingleRequestHandle>,
    log: RecordingTransport,
}

impl Transport for Reentrant {
    fn resume(&self) {
        self.log.resume();
    }

    fn suspend(&self) {
        self.log.suspend();
    }

    fn cancel(&self) {
        self.log.cancel();
        if let Some(handle) = self.handle.get() {
            handle.cancel();
            handle.resume();
        }
    }
}

#[test]
fn test_reentrant_calls_from_transport_do_not_deadlock() {
    let log = RecordingTransport::new();
    let transport = Arc::new(Reentrant {
        handle: OnceLock::new(),
        log: log.clone(),
    });
    let handle = SingleRequestHandle::with_config(Some(transport.clone()), quiet());
    transport.handle.set(handle.clone()).unwrap();

    handle.cancel();

    assert_eq!(log.calls(), vec![Call::Cancel]);
    assert_eq!(handle.state(), LifecycleState::Cancelled);
    assert_eq!(handle.stats().deferred, 2);
}

// ============================================================================
// Sequence handle
// ============================================================================

#[test]
fn test_sequence_scenario_cancel_before_second_step() {
    let first = RecordingHandle::new();
    let second = RecordingHandle::new();
    let sequence = SequenceRequestHandle::with_first_step(first.clone(), quiet());

    LifecycleTest::new(sequence.clone())
        .when(Call::Suspend)
        .when(Call::Cancel)
        .then_state(LifecycleState::Cancelled)
        .run();

    sequence.set_current_request(second.clone());

    assert_eq!(first.calls(), vec![Call::Suspend, Call::Cancel]);
    assert_eq!(second.calls(), vec![Call::Cancel]);
}

#[test]
fn test_sequence_of_single_handles() {
    let upload = RecordingTransport::new();
    let step = single(&upload);
    let sequence = SequenceRequestHandle::with_config(quiet());

    sequence.suspend();
    sequence.set_current_request(step.clone());
    sequence.resume();
    sequence.cancel();

    assert_eq!(step.state(), LifecycleState::Cancelled);
    assert_eq!(upload.calls(), vec![Call::Suspend, Call::Resume, Call::Cancel]);
}

#[test]
fn test_sequence_step_installed_from_side_effect() {
    let sequence = SequenceRequestHandle::with_config(quiet());
    let replacement = RecordingHandle::new();

    /// Step that swaps in the next step when suspended.
    struct Advancing {
        sequence: SequenceRequestHandle,
        next: RecordingHandle,
        log: RecordingHandle,
    }

    impl RequestHandle for Advancing {
        fn resume(&self) {
            self.log.resume();
        }

        fn suspend(&self) {
            self.log.suspend();
            self.sequence.set_current_request(self.next.clone());
        }

        fn cancel(&self) {
            self.log.cancel();
        }

        fn state(&self) -> LifecycleState {
            self.log.state()
        }
    }

    let advancing_log = RecordingHandle::new();
    sequence.set_current_request(Advancing {
        sequence: sequence.clone(),
        next: replacement.clone(),
        log: advancing_log.clone(),
    });

    sequence.suspend();
    sequence.cancel();

    assert_eq!(advancing_log.calls(), vec![Call::Resume, Call::Suspend]);
    // Installed while the suspend was being applied, so it starts suspended
    assert_eq!(replacement.calls(), vec![Call::Suspend, Call::Cancel]);
    assert_eq!(sequence.state(), LifecycleState::Cancelled);
}
