//! # Request Lifecycle Runtime
//!
//! Thread-safe request handles with resume/suspend/cancel semantics.
//!
//! ## Core Components
//!
//! - **`SingleRequestHandle`**: controls exactly one transport primitive
//! - **`SequenceRequestHandle`**: controls a chain of dependent requests through
//!   whichever step is current, and brings every newly attached step to the
//!   sequence's own state
//! - **`LifecycleLock`**: the re-entrant lock and state cell both handles are
//!   built on
//! - **`TaskTransport`**: a transport driving a spawned tokio task
//!
//! Every lifecycle method may be called from any thread at any time. Requests
//! that the transition table does not allow (suspending a suspended handle,
//! anything on a cancelled handle) are silently ignored, and each delegated
//! side effect fires at most once per applied transition.
//!
//! ## Example
//!
//! ```rust
//! use request_lifecycle_core::{LifecycleState, RequestHandle};
//! use request_lifecycle_runtime::{HandleConfig, SequenceRequestHandle};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sequence = SequenceRequestHandle::with_config(HandleConfig::builder().label("upload").build());
//!
//! let token = sequence.spawn_step(async { "token" }).await;
//! assert_eq!(token.ok(), Some("token"));
//!
//! sequence.cancel();
//!
//! // Steps spawned after cancellation never run
//! let upload = sequence.spawn_step(std::future::pending::<()>()).await;
//! assert!(upload.is_err());
//! assert_eq!(sequence.state(), LifecycleState::Cancelled);
//! # }
//! ```

/// Handle configuration
pub mod config;

/// Re-entrant lock and lifecycle state cell shared by all handles
pub mod lock;

/// Single-transport request handles
pub mod single;

/// Multi-step request handles
pub mod sequence;

/// Tokio task transport
pub mod task;

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for spawned requests
pub mod error {
    use thiserror::Error;
    use tokio::task::JoinError;

    /// Errors returned when awaiting a spawned request
    ///
    /// Lifecycle calls themselves never fail; only the outcome of a request
    /// run on the task transport can.
    #[derive(Error, Debug)]
    pub enum RequestError {
        /// The request was cancelled before it finished
        #[error("Request was cancelled")]
        Cancelled,

        /// The request's task panicked
        #[error("Request task panicked: {0}")]
        Panicked(String),
    }

    impl RequestError {
        /// Check if this error is a cancellation
        #[must_use]
        pub const fn is_cancelled(&self) -> bool {
            matches!(self, Self::Cancelled)
        }
    }

    impl From<JoinError> for RequestError {
        fn from(err: JoinError) -> Self {
            if err.is_cancelled() {
                Self::Cancelled
            } else {
                Self::Panicked(err.to_string())
            }
        }
    }
}

// Re-export commonly used items
pub use config::HandleConfig;
pub use error::RequestError;
pub use lock::{HandleStats, LifecycleLock};
pub use request_lifecycle_core::{HandleKind, LifecycleState, RequestHandle, Transport, TransitionOutcome};
pub use sequence::{SequenceRequestHandle, SequenceStats};
pub use single::SingleRequestHandle;
pub use task::{RequestCompletion, TaskTransport, spawn_request, spawn_request_in};
