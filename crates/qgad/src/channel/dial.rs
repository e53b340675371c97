//! Bounded retry loop for establishing the host channel.

use std::time::{Duration, Instant};

use nix::poll::{PollFlags, PollTimeout};
use tracing::{debug, info};

use super::{CHANNEL_TARGET, Channel, ChannelError, Wait};

const INITIAL_BACKOFF: Duration = Duration::from_millis(10);
const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Retry schedule for [`Channel::dial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialPolicy {
    timeout: Duration,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl DialPolicy {
    /// Policy with the default exponential backoff bounded by `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }

    /// Overrides the backoff bounds.
    #[must_use]
    pub const fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Total budget for becoming ready.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Summary of a successful dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialOutcome {
    /// Open attempts made, including the successful one.
    pub attempts: u32,
    /// Time spent dialling.
    pub elapsed: Duration,
}

impl Channel {
    /// Opens the channel, retrying transient failures until `timeout`.
    ///
    /// # Errors
    ///
    /// See [`Channel::dial`].
    pub fn dial_timeout(&mut self, timeout: Duration) -> Result<DialOutcome, ChannelError> {
        self.dial(&DialPolicy::new(timeout))
    }

    /// Opens the channel according to `policy`.
    ///
    /// The first attempt happens immediately. Transient failures are retried
    /// with exponential backoff, never sleeping past the deadline; a final
    /// attempt is made at the deadline itself. Failed attempts retain no
    /// descriptor, and a close request aborts the wait.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::ConnectTimeout`] when the channel never became
    /// ready, [`ChannelError::Closed`] when a close request interrupted the
    /// dial, and the underlying open error for permanent failures.
    pub fn dial(&mut self, policy: &DialPolicy) -> Result<DialOutcome, ChannelError> {
        let started = Instant::now();
        let deadline = started.checked_add(policy.timeout);
        let mut backoff = policy.initial_backoff;
        let mut attempts = 0_u32;

        loop {
            attempts = attempts.saturating_add(1);
            let error = match self.open() {
                Ok(()) => {
                    let outcome = DialOutcome {
                        attempts,
                        elapsed: started.elapsed(),
                    };
                    info!(
                        target: CHANNEL_TARGET,
                        endpoint = %self.endpoint,
                        attempts,
                        elapsed_ms = outcome.elapsed.as_millis(),
                        "channel ready"
                    );
                    return Ok(outcome);
                }
                Err(error) if error.is_retryable() => error,
                Err(error) => return Err(error),
            };

            let remaining =
                deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()));
            if remaining.is_some_and(|remaining| remaining.is_zero()) {
                return Err(ChannelError::ConnectTimeout {
                    endpoint: self.endpoint.to_string(),
                    timeout: policy.timeout,
                    attempts,
                    last_error: match error {
                        ChannelError::NotReady { source, .. } => Some(source),
                        _ => None,
                    },
                });
            }

            let pause = remaining.map_or(backoff, |remaining| backoff.min(remaining));
            debug!(
                target: CHANNEL_TARGET,
                endpoint = %self.endpoint,
                attempts,
                error = %error,
                pause_ms = pause.as_millis(),
                "channel not ready; retrying"
            );
            if self.pause(pause)? == Wait::Closed {
                return Err(ChannelError::Closed {
                    endpoint: self.endpoint.to_string(),
                });
            }
            backoff = backoff.saturating_mul(2).min(policy.max_backoff);
        }
    }

    fn pause(&self, duration: Duration) -> Result<Wait, ChannelError> {
        let millis = u16::try_from(duration.as_millis()).unwrap_or(u16::MAX);
        self.wait_for(None, PollFlags::empty(), PollTimeout::from(millis))
            .map_err(|source| ChannelError::Wake { source })
    }
}
