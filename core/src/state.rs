//! Lifecycle states and the transition table.
//!
//! A request handle is always in exactly one [`LifecycleState`]. Callers ask for
//! a target state; the table below decides whether the request is honoured.
//!
//! | current \ target | Resumed | Suspended | Cancelled |
//! |------------------|---------|-----------|-----------|
//! | Resumed          | ignored | applied   | applied   |
//! | Suspended        | applied | ignored   | applied   |
//! | Cancelled        | ignored | ignored   | ignored   |
//!
//! Ignored requests are not errors. `cancel()` on a cancelled handle is always
//! safe to call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current intent of a request handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// The request is running (initial state)
    #[default]
    Resumed,
    /// The request is paused and may be resumed
    Suspended,
    /// The request was cancelled; terminal
    Cancelled,
}

impl LifecycleState {
    /// All states, in declaration order.
    pub const ALL: [Self; 3] = [Self::Resumed, Self::Suspended, Self::Cancelled];

    /// Whether moving from `self` to `target` is a legal edge.
    ///
    /// Self-transitions and every transition out of [`LifecycleState::Cancelled`]
    /// are illegal.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Resumed, Self::Suspended | Self::Cancelled)
                | (Self::Suspended, Self::Resumed | Self::Cancelled)
        )
    }

    /// Check if this state is terminal
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Stable lowercase name, used for log fields and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resumed => "resumed",
            Self::Suspended => "suspended",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of asking a handle to move to a target state.
///
/// The public lifecycle methods discard this value. It exists so that the
/// locking layer can feed logs, metrics and per-handle statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The side effect ran and the state was committed
    Applied {
        /// State before the transition
        from: LifecycleState,
        /// State after the transition
        to: LifecycleState,
    },
    /// The request was dropped without a side effect
    Ignored {
        /// State the handle stayed in
        current: LifecycleState,
        /// State that was requested
        requested: LifecycleState,
    },
    /// The request arrived from inside the handle's own side effect and will be
    /// applied once the running transition has been committed
    Deferred {
        /// State observed when the request arrived
        current: LifecycleState,
        /// State that was requested
        requested: LifecycleState,
    },
}

impl TransitionOutcome {
    /// Decide the outcome of requesting `requested` while in `current`.
    #[must_use]
    pub const fn decide(current: LifecycleState, requested: LifecycleState) -> Self {
        if current.can_transition_to(requested) {
            Self::Applied {
                from: current,
                to: requested,
            }
        } else {
            Self::Ignored { current, requested }
        }
    }

    /// Check if the transition was applied
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// State the handle is in once the outcome has been committed.
    ///
    /// For a deferred request this is the state observed on arrival.
    #[must_use]
    pub const fn resulting_state(self) -> LifecycleState {
        match self {
            Self::Applied { to, .. } => to,
            Self::Ignored { current, .. } | Self::Deferred { current, .. } => current,
        }
    }
}

/// Which concrete shape a handle has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// Wraps a single transport primitive
    Single,
    /// Wraps the current step of a multi-step operation
    Sequence,
}

impl HandleKind {
    /// Stable lowercase name, used for log fields and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Sequence => "sequence",
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
