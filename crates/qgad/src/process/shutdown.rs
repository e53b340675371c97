use std::io;
use std::thread::{self, JoinHandle};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use thiserror::Error;
use tracing::{info, warn};

use super::PROCESS_TARGET;
use crate::channel::ChannelCloser;

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Starts watching for shutdown requests; `closer` fires when one arrives.
    fn watch(&self, closer: ChannelCloser) -> Result<ShutdownWatch, ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Spawning the watcher thread failed.
    #[error("failed to spawn signal watcher: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Running watcher. [`ShutdownWatch::stop`] unregisters it and joins the thread.
#[derive(Debug)]
pub struct ShutdownWatch {
    running: Option<(Handle, JoinHandle<()>)>,
}

impl ShutdownWatch {
    /// Watch that never fires.
    #[cfg(test)]
    #[must_use]
    pub fn inert() -> Self {
        Self { running: None }
    }

    /// Stops watching and waits for the watcher thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some((handle, thread)) = self.running.take() else {
            return;
        };
        handle.close();
        if thread.join().is_err() {
            warn!(target: PROCESS_TARGET, "signal watcher panicked");
        }
    }
}

impl Drop for ShutdownWatch {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Shutdown listener that closes the channel on termination signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    /// Builds a signal listener.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn watch(&self, closer: ChannelCloser) -> Result<ShutdownWatch, ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("qga-signals".to_owned())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    info!(
                        target: PROCESS_TARGET,
                        signal,
                        "shutdown signal received; closing channel"
                    );
                    closer.close();
                }
            })
            .map_err(|source| ShutdownError::Spawn { source })?;
        Ok(ShutdownWatch {
            running: Some((handle, thread)),
        })
    }
}
