//! Agent bootstrap orchestration.

use std::io::{self, Write};
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use qga_config::{Config, ConfigError};

use crate::channel::{Channel, ChannelError, DialOutcome, DialPolicy};
use crate::commands;
use crate::dispatch::{DispatchError, Dispatcher, SessionSummary};
use crate::health::HealthReporter;
use crate::registry::{CommandRegistry, RegistryError};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the agent configuration.
    fn load(&self) -> Result<Config, ConfigError>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Config::load()
    }
}

/// Loader that hands out a pre-built configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an existing configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Built-in commands could not be registered.
    #[error("failed to build command registry: {source}")]
    Registry {
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },
}

impl BootstrapError {
    /// Returns the clap error when bootstrap stopped on flag parsing or a
    /// help/version request.
    #[must_use]
    pub fn cli_error(&self) -> Option<&clap::Error> {
        match self {
            Self::Configuration {
                source: ConfigError::Cli(error),
            } => Some(error),
            _ => None,
        }
    }
}

/// Result of a successful bootstrap invocation.
pub struct Agent {
    config: Config,
    registry: CommandRegistry,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the command table.
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Mutable access for registering additional commands before serving.
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Returns `true` when `?` was passed to the blacklist flag.
    #[must_use]
    pub fn listing_requested(&self) -> bool {
        self.registry.blacklist().is_listing_requested()
    }

    /// Writes every registered command name, one per line.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when `out` rejects the write.
    pub fn write_command_list(&self, out: &mut dyn Write) -> io::Result<()> {
        for name in self.registry.names() {
            writeln!(out, "{name}")?;
        }
        out.flush()
    }

    /// Dials the host channel within the configured budget.
    ///
    /// # Errors
    ///
    /// Returns the [`ChannelError`] reported by the dial.
    pub fn connect(&self, channel: &mut Channel) -> Result<DialOutcome, ChannelError> {
        let endpoint = channel.endpoint().clone();
        self.reporter.channel_dialling(&endpoint);
        match channel.dial(&DialPolicy::new(self.config.dial_timeout())) {
            Ok(outcome) => {
                self.reporter.channel_ready(&endpoint, &outcome);
                Ok(outcome)
            }
            Err(error) => {
                self.reporter.channel_failed(&endpoint, &error);
                Err(error)
            }
        }
    }

    /// Serves requests from the channel until it reaches end-of-stream.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on a decode or write failure.
    pub fn serve(&self, channel: &Channel) -> Result<SessionSummary, DispatchError> {
        match Dispatcher::new(&self.registry).run(channel, channel) {
            Ok(summary) => {
                self.reporter.session_finished(&summary);
                Ok(summary)
            }
            Err(error) => {
                self.reporter.session_failed(&error);
                Err(error)
            }
        }
    }
}

/// Bootstraps the agent using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, telemetry, or the command
/// table cannot be set up. The reporter is notified before returning.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Agent, BootstrapError> {
    reporter.bootstrap_starting();
    match build_agent(loader, reporter.clone()) {
        Ok(agent) => {
            reporter.bootstrap_succeeded(&agent.config);
            Ok(agent)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn build_agent(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Agent, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;

    let mut registry = CommandRegistry::new().with_blacklist(config.blacklist());
    commands::register_builtin_commands(&mut registry)
        .map_err(|source| BootstrapError::Registry { source })?;
    for name in registry.unknown_blacklist_entries() {
        warn!(
            target: BOOTSTRAP_TARGET,
            command = name,
            "blacklisted command is not registered"
        );
    }

    Ok(Agent {
        config,
        registry,
        telemetry,
        reporter,
    })
}
