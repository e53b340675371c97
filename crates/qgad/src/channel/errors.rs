//! Error types for host channel operations.

use std::io;
use std::time::Duration;

use nix::errno::Errno;
use thiserror::Error;

/// Errors surfaced while opening, dialling, or closing the host channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The resource exists but is not usable yet; dialling retries these.
    #[error("channel {endpoint} is not ready: {source}")]
    NotReady {
        /// Endpoint description.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The channel did not become ready before the dial deadline.
    #[error(
        "channel {endpoint} not ready after {attempts} attempt(s) within {} ms",
        timeout.as_millis()
    )]
    ConnectTimeout {
        /// Endpoint description.
        endpoint: String,
        /// Dial budget that elapsed.
        timeout: Duration,
        /// Open attempts made.
        attempts: u32,
        /// Last transient error, if any.
        #[source]
        last_error: Option<io::Error>,
    },
    /// Opening the resource failed for a reason retrying will not fix.
    #[error("failed to open channel {endpoint}: {source}")]
    ConnectFailure {
        /// Endpoint description.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Configuring the serial line discipline failed.
    #[error("failed to configure serial line {endpoint}: {source}")]
    SerialSetup {
        /// Endpoint description.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: Errno,
    },
    /// Binding the unix listener failed.
    #[error("failed to bind unix listener at {path}: {source}")]
    BindUnix {
        /// Socket path.
        path: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Another process is accepting on the socket path.
    #[error("existing unix socket {path} is already in use")]
    UnixInUse {
        /// Socket path.
        path: String,
    },
    /// The socket path exists but is not a socket.
    #[error("unix socket path {path} is not a socket")]
    UnixNotSocket {
        /// Socket path.
        path: String,
    },
    /// Inspecting the existing socket path failed.
    #[error("failed to read metadata for unix socket {path}: {source}")]
    UnixMetadata {
        /// Socket path.
        path: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Connecting to the existing socket to look for a listener failed.
    #[error("failed to connect to existing unix socket {path}: {source}")]
    UnixConnect {
        /// Socket path.
        path: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Removing a stale socket file failed.
    #[error("failed to remove stale unix socket {path}: {source}")]
    UnixCleanup {
        /// Socket path.
        path: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The channel was asked to open while already connected.
    #[error("channel {endpoint} is already connected")]
    AlreadyConnected {
        /// Endpoint description.
        endpoint: String,
    },
    /// A close request arrived before the channel connected.
    #[error("channel {endpoint} was closed before it connected")]
    Closed {
        /// Endpoint description.
        endpoint: String,
    },
    /// The internal wake-up pair could not be created.
    #[error("failed to create channel wake-up pair: {source}")]
    Wake {
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Releasing the descriptor reported an error.
    #[error("failed to close channel {endpoint}: {source}")]
    Close {
        /// Endpoint description.
        endpoint: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl ChannelError {
    /// Returns `true` for errors the dial loop should retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }

    /// Returns `true` when the dial budget ran out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. })
    }
}

/// Classifies an open(2) failure: missing or busy devices are transient,
/// everything else is fatal.
pub(super) fn classify_open_error(endpoint: String, source: io::Error) -> ChannelError {
    if is_transient(&source) {
        ChannelError::NotReady { endpoint, source }
    } else {
        ChannelError::ConnectFailure { endpoint, source }
    }
}

fn is_transient(error: &io::Error) -> bool {
    if matches!(
        error.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    ) {
        return true;
    }
    error.raw_os_error().is_some_and(|code| {
        [Errno::ENXIO, Errno::ENODEV, Errno::EBUSY, Errno::EAGAIN]
            .iter()
            .any(|errno| *errno as i32 == code)
    })
}
