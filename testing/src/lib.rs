//! # Request Lifecycle Testing
//!
//! Testing utilities and helpers for request lifecycle handles.
//!
//! This crate provides:
//! - Recording doubles for the `Transport` and `RequestHandle` seams
//! - A Given-When-Then harness for driving handles
//! - Property-based testing strategies and a reference model
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```
//! use request_lifecycle_core::{RequestHandle, Transport};
//! use request_lifecycle_testing::{Call, RecordingHandle, RecordingTransport};
//!
//! let transport = RecordingTransport::new();
//! transport.suspend();
//!
//! let step = RecordingHandle::new();
//! step.cancel();
//!
//! assert_eq!(transport.calls(), vec![Call::Suspend]);
//! assert_eq!(step.calls(), vec![Call::Cancel]);
//! ```

/// Recording doubles for transports and request handles
pub mod mocks;


/// Property-based testing utilities
pub mod properties;

/// Test helpers and utilities
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a `tracing` subscriber that writes through the test harness.
    ///
    /// Filtering follows `RUST_LOG`. Safe to call from every test; only the
    /// first call installs anything.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }
}

// Re-export commonly used items
pub use helpers::init_test_tracing;
pub use lifecycle_test::{LifecycleTest, assertions};
pub use mocks::{Call, RecordingHandle, RecordingTransport};
pub use properties::ReferenceModel;
