//! Per-handle configuration.
//!
//! # Example
//!
//! ```rust
//! use request_lifecycle_runtime::config::HandleConfig;
//!
//! let config = HandleConfig::builder()
//!     .label("avatar-upload")
//!     .record_metrics(false)
//!     .build();
//!
//! assert_eq!(config.label, "avatar-upload");
//! assert!(!config.record_metrics);
//! ```

use std::borrow::Cow;

/// Default label attached to log lines of unlabelled handles.
pub const DEFAULT_LABEL: &str = "request";

/// Handle configuration.
///
/// # Default Values
///
/// - `label`: `"request"`
/// - `record_metrics`: `true`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleConfig {
    /// Label emitted in the `handle` field of every log line
    pub label: Cow<'static, str>,
    /// Whether transitions are reported to the global `metrics` recorder
    pub record_metrics: bool,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            label: Cow::Borrowed(DEFAULT_LABEL),
            record_metrics: true,
        }
    }
}

impl HandleConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub const fn builder() -> HandleConfigBuilder {
        HandleConfigBuilder {
            label: None,
            record_metrics: Some(true),
        }
    }

    /// Set the label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }
}

/// Builder for [`HandleConfig`].
#[derive(Debug, Clone)]
pub struct HandleConfigBuilder {
    label: Option<Cow<'static, str>>,
    record_metrics: Option<bool>,
}

impl HandleConfigBuilder {
    /// Set the label used in log lines.
    #[must_use]
    pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Enable or disable metric recording.
    #[must_use]
    pub const fn record_metrics(mut self, enabled: bool) -> Self {
        self.record_metrics = Some(enabled);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> HandleConfig {
        HandleConfig {
            label: self.label.unwrap_or(Cow::Borrowed(DEFAULT_LABEL)),
            record_metrics: self.record_metrics.unwrap_or(true),
        }
    }
}
