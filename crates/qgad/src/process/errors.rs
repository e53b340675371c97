//! Defines the unified error surface for agent launch and supervision.

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use qga_config::{EndpointPreparationError, RuntimePathsError};

use crate::bootstrap::BootstrapError;
use crate::channel::ChannelError;
use crate::dispatch::DispatchError;

use super::daemonizer::DaemonizeError;
use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the agent process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the agent failed.
    #[error("agent bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// Preparing the unix socket directory failed.
    #[error("failed to prepare channel endpoint: {source}")]
    EndpointPreparation {
        /// Underlying filesystem error.
        #[source]
        source: EndpointPreparationError,
    },
    /// The state directory or pidfile parent could not be prepared.
    #[error("failed to prepare runtime paths: {source}")]
    RuntimePaths {
        /// Underlying path error.
        #[source]
        source: RuntimePathsError,
    },
    /// A live agent already owns the pidfile.
    #[error("agent already running with pid {pid}")]
    AlreadyRunning {
        /// PID recorded in the existing pidfile.
        pid: u32,
    },
    /// Removing a stale pidfile failed.
    #[error("failed to remove stale file '{path}': {source}", path = path.display())]
    Cleanup {
        /// Path of the artefact that could not be removed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the pidfile failed.
    #[error("failed to write pid file '{path}': {source}", path = path.display())]
    PidWrite {
        /// Pidfile path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another launch created the pidfile between cleanup and creation.
    #[error("pid file '{path}' appeared while starting", path = path.display())]
    PidFileExists {
        /// Pidfile path.
        path: PathBuf,
    },
    /// Probing the process named by an existing pidfile failed.
    #[error("failed to check existing process {pid}: {source}")]
    CheckProcess {
        /// PID whose liveness check failed.
        pid: u32,
        /// Underlying OS error.
        source: Errno,
    },
    /// Daemonisation failed.
    #[error("failed to daemonise: {source}")]
    Daemonize {
        /// Underlying daemonisation error.
        #[source]
        source: DaemonizeError,
    },
    /// The signal watcher could not be installed.
    #[error("failed to watch for shutdown signals: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// The host channel could not be established or released.
    #[error("host channel failed: {source}")]
    Channel {
        /// Underlying channel error.
        #[source]
        source: ChannelError,
    },
    /// The request loop stopped on a fatal error.
    #[error("request loop failed: {source}")]
    Dispatch {
        /// Underlying dispatch error.
        #[source]
        source: DispatchError,
    },
    /// Printing the command list failed.
    #[error("failed to list commands: {source}")]
    ListCommands {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Process exit status for this failure.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Dispatch { source } => source.exit_status(),
            _ => 1,
        }
    }

    /// Returns the clap error when launch stopped on flag parsing or a
    /// help/version request.
    #[must_use]
    pub fn cli_error(&self) -> Option<&clap::Error> {
        match self {
            Self::Bootstrap { source } => source.cli_error(),
            _ => None,
        }
    }
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<EndpointPreparationError> for LaunchError {
    fn from(source: EndpointPreparationError) -> Self {
        Self::EndpointPreparation { source }
    }
}

impl From<RuntimePathsError> for LaunchError {
    fn from(source: RuntimePathsError) -> Self {
        Self::RuntimePaths { source }
    }
}

impl From<DaemonizeError> for LaunchError {
    fn from(source: DaemonizeError) -> Self {
        Self::Daemonize { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

impl From<ChannelError> for LaunchError {
    fn from(source: ChannelError) -> Self {
        Self::Channel { source }
    }
}

impl From<DispatchError> for LaunchError {
    fn from(source: DispatchError) -> Self {
        Self::Dispatch { source }
    }
}
