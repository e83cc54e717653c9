//! Prometheus metrics for request lifecycles.
//!
//! Handles report through the global [`metrics`] facade; nothing is recorded
//! until a recorder is installed. [`MetricsServer`] installs a Prometheus
//! recorder and renders the exposition text.
//!
//! # Example
//!
//! ```rust,no_run
//! use request_lifecycle_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! if let Some(text) = server.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use request_lifecycle_core::{HandleKind, LifecycleState};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Owns the installed recorder; the rendered text is served by whatever HTTP
/// layer the application already runs on `addr`.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address the scrape endpoint is served on (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::Install` if the recorder cannot be installed for a
    /// reason other than a recorder already being present.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    // Several servers in one process (tests) share the first recorder
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "request_lifecycle_transitions_total",
        "Total number of lifecycle transitions applied"
    );
    describe_counter!(
        "request_lifecycle_transitions_ignored_total",
        "Total number of lifecycle requests ignored (self-transition or cancelled handle)"
    );
    describe_counter!(
        "request_lifecycle_steps_attached_total",
        "Total number of steps attached to sequence handles"
    );
    describe_counter!(
        "request_lifecycle_tasks_spawned_total",
        "Total number of requests spawned on the task transport"
    );
}

/// Lifecycle metrics recorder.
pub struct LifecycleMetrics;

impl LifecycleMetrics {
    /// Record an applied transition.
    pub fn record_transition(kind: HandleKind, to: LifecycleState) {
        counter!(
            "request_lifecycle_transitions_total",
            "kind" => kind.as_str(),
            "to" => to.as_str()
        )
        .increment(1);
    }

    /// Record an ignored transition request.
    pub fn record_ignored(kind: HandleKind, requested: LifecycleState) {
        counter!(
            "request_lifecycle_transitions_ignored_total",
            "kind" => kind.as_str(),
            "to" => requested.as_str()
        )
        .increment(1);
    }

    /// Record a step attached to a sequence in the given state.
    pub fn record_step_attached(state: LifecycleState) {
        counter!("request_lifecycle_steps_attached_total", "state" => state.as_str()).increment(1);
    }

    /// Record a request spawned on the task transport.
    pub fn record_task_spawned() {
        counter!("request_lifecycle_tasks_spawned_total").increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
    }

    #[test]
    fn test_lifecycle_metrics_render() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        server.start().unwrap();

        LifecycleMetrics::record_transition(HandleKind::Single, LifecycleState::Suspended);
        LifecycleMetrics::record_ignored(HandleKind::Sequence, LifecycleState::Resumed);
        LifecycleMetrics::record_step_attached(LifecycleState::Cancelled);

        // Another test may have installed the recorder first
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("request_lifecycle_transitions_total"));
            assert!(rendered.contains("request_lifecycle_transitions_ignored_total"));
            assert!(rendered.contains("request_lifecycle_steps_attached_total"));
        }
    }
}
