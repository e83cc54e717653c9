//! # Request Lifecycle Core
//!
//! Core traits and types for cancellable request lifecycles.
//!
//! This crate defines the vocabulary shared by every request handle: the
//! lifecycle states, the transition table, and the two capability traits at the
//! edges of the controller.
//!
//! ## Core Concepts
//!
//! - **Lifecycle state**: `Resumed`, `Suspended` or `Cancelled` (terminal)
//! - **Transport**: the underlying network operation that can be resumed,
//!   suspended or cancelled
//! - **Request handle**: what a caller holds to control one request, or a whole
//!   sequence of dependent requests, from any thread
//!
//! ## Example
//!
//! ```
//! use request_lifecycle_core::{LifecycleState, TransitionOutcome};
//!
//! // Suspending a running request is applied
//! let outcome = TransitionOutcome::decide(LifecycleState::Resumed, LifecycleState::Suspended);
//! assert!(outcome.is_applied());
//!
//! // Nothing leaves Cancelled
//! let outcome = TransitionOutcome::decide(LifecycleState::Cancelled, LifecycleState::Resumed);
//! assert_eq!(outcome.resulting_state(), LifecycleState::Cancelled);
//! ```

/// Lifecycle states and the transition table
pub mod state;

/// Transport and request handle capability traits
pub mod handle;

// Re-export commonly used items
pub use handle::{RequestHandle, Transport};
pub use state::{HandleKind, LifecycleState, TransitionOutcome};
