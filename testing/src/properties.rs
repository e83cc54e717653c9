//! Property-based testing utilities using proptest.
//!
//! [`ReferenceModel`] is a plain re-statement of the transition table with no
//! locking. Property tests feed the same call sequence to a real handle and to
//! the model and compare the resulting state and forwarded calls.

use crate::mocks::Call;
use proptest::prelude::*;
use request_lifecycle_core::LifecycleState;

/// Strategy producing any single lifecycle call
pub fn arb_call() -> impl Strategy<Value = Call> {
    prop_oneof![Just(Call::Resume), Just(Call::Suspend), Just(Call::Cancel)]
}

/// Strategy producing sequences of up to `max_len` lifecycle calls
pub fn arb_calls(max_len: usize) -> impl Strategy<Value = Vec<Call>> {
    prop::collection::vec(arb_call(), 0..=max_len)
}

/// Strategy producing any lifecycle state
pub fn arb_state() -> impl Strategy<Value = LifecycleState> {
    prop_oneof![
        Just(LifecycleState::Resumed),
        Just(LifecycleState::Suspended),
        Just(LifecycleState::Cancelled),
    ]
}

/// Unsynchronized model of a handle's lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceModel {
    state: LifecycleState,
    forwarded: Vec<Call>,
}

impl ReferenceModel {
    /// Start in `Resumed` with nothing forwarded
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one call; returns whether it changed the state
    pub fn apply(&mut self, call: Call) -> bool {
        let target = call.target();
        if self.state.can_transition_to(target) {
            self.state = target;
            self.forwarded.push(call);
            true
        } else {
            false
        }
    }

    /// Apply every call in order
    #[must_use]
    pub fn run(calls: &[Call]) -> Self {
        let mut model = Self::new();
        for call in calls {
            model.apply(*call);
        }
        model
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Calls that a handle would forward to its delegate
    #[must_use]
    pub fn forwarded(&self) -> &[Call] {
        &self.forwarded
    }
}
