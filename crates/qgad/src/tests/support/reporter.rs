//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;

use qga_config::{ChannelEndpoint, Config};

use crate::bootstrap::BootstrapError;
use crate::channel::{ChannelError, DialOutcome};
use crate::dispatch::{DispatchError, SessionSummary};
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ChannelDialling,
    ChannelReady { attempts: u32 },
    ChannelFailed { timeout: bool },
    SessionFinished(SessionSummary),
    SessionFailed(String),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn channel_dialling(&self, _endpoint: &ChannelEndpoint) {
        self.record(HealthEvent::ChannelDialling);
    }

    fn channel_ready(&self, _endpoint: &ChannelEndpoint, outcome: &DialOutcome) {
        self.record(HealthEvent::ChannelReady {
            attempts: outcome.attempts,
        });
    }

    fn channel_failed(&self, _endpoint: &ChannelEndpoint, error: &ChannelError) {
        self.record(HealthEvent::ChannelFailed {
            timeout: error.is_timeout(),
        });
    }

    fn session_finished(&self, summary: &SessionSummary) {
        self.record(HealthEvent::SessionFinished(*summary));
    }

    fn session_failed(&self, error: &DispatchError) {
        self.record(HealthEvent::SessionFailed(error.to_string()));
    }
}
