//! Structured health reporting for agent lifecycle events.

use std::sync::Arc;

use qga_config::{ChannelEndpoint, Config};

use crate::bootstrap::BootstrapError;
use crate::channel::{ChannelError, DialOutcome};
use crate::dispatch::{DispatchError, SessionSummary};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the host channel is dialled.
    fn channel_dialling(&self, endpoint: &ChannelEndpoint);

    /// Invoked once the host channel is usable.
    fn channel_ready(&self, endpoint: &ChannelEndpoint, outcome: &DialOutcome);

    /// Invoked when dialling fails.
    fn channel_failed(&self, endpoint: &ChannelEndpoint, error: &ChannelError);

    /// Invoked when the request loop ends cleanly.
    fn session_finished(&self, summary: &SessionSummary);

    /// Invoked when the request loop ends on a fatal error.
    fn session_failed(&self, error: &DispatchError);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn channel_dialling(&self, endpoint: &ChannelEndpoint) {
        (**self).channel_dialling(endpoint);
    }

    fn channel_ready(&self, endpoint: &ChannelEndpoint, outcome: &DialOutcome) {
        (**self).channel_ready(endpoint, outcome);
    }

    fn channel_failed(&self, endpoint: &ChannelEndpoint, error: &ChannelError) {
        (**self).channel_failed(endpoint, error);
    }

    fn session_finished(&self, summary: &SessionSummary) {
        (**self).session_finished(summary);
    }

    fn session_failed(&self, error: &DispatchError) {
        (**self).session_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting agent bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            endpoint = %config.endpoint(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            blacklisted = config.blacklist().len(),
            "agent bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "agent bootstrap failed"
        );
    }

    fn channel_dialling(&self, endpoint: &ChannelEndpoint) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "channel_dialling",
            endpoint = %endpoint,
            "waiting for host channel"
        );
    }

    fn channel_ready(&self, endpoint: &ChannelEndpoint, outcome: &DialOutcome) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "channel_ready",
            endpoint = %endpoint,
            attempts = outcome.attempts,
            elapsed_ms = outcome.elapsed.as_millis(),
            "host channel ready"
        );
    }

    fn channel_failed(&self, endpoint: &ChannelEndpoint, error: &ChannelError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "channel_failed",
            endpoint = %endpoint,
            timeout = error.is_timeout(),
            error = %error,
            "host channel unavailable"
        );
    }

    fn session_finished(&self, summary: &SessionSummary) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "session_finished",
            responses = summary.responses,
            errors = summary.errors,
            "request loop finished"
        );
    }

    fn session_failed(&self, error: &DispatchError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "session_failed",
            error = %error,
            "request loop aborted"
        );
    }
}
