//! Supervises agent launch sequencing and the serving lifetime.

use std::io::{self, Write};
use std::sync::Arc;

use tracing::info;

use crate::StructuredHealthReporter;
use crate::bootstrap::{Agent, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::channel::{Channel, ChannelCloser, ChannelError};
use crate::dispatch::SessionSummary;
use crate::health::HealthReporter;

use super::PROCESS_TARGET;
use super::daemonizer::{Daemonizer, SystemDaemonizer};
use super::errors::LaunchError;
use super::guard::PidFileGuard;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use qga_config::{Config, RuntimePaths};

/// Launch mode for the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background and detach from the controlling terminal.
    Background,
    /// Remain attached to the terminal.
    Foreground,
}

impl LaunchMode {
    /// Mode selected by the `--daemonize` flag.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        if config.daemonize {
            Self::Background
        } else {
            Self::Foreground
        }
    }
}

/// How a successful run ended. Every variant maps to exit status 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentExit {
    /// `--blacklist ?` printed the command names.
    CommandsListed,
    /// The host closed the channel.
    PeerClosed {
        /// Counters from the finished session.
        summary: SessionSummary,
    },
    /// A termination signal closed the channel.
    Interrupted,
}

/// Process-level collaborators needed to control the agent lifecycle.
pub(crate) struct ProcessControl<D, S> {
    pub(crate) daemonizer: D,
    pub(crate) shutdown: S,
}

/// Service dependencies required to construct the agent.
pub(crate) struct ServiceDeps<L> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
}

/// Collaborators required to launch the agent.
pub(crate) struct LaunchPlan<L, D, S> {
    pub(crate) process: ProcessControl<D, S>,
    pub(crate) services: ServiceDeps<L>,
}

/// Runs the agent using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when start-up fails, the channel cannot be
/// established, or the request loop stops on a fatal error.
pub fn run_agent() -> Result<AgentExit, LaunchError> {
    let plan = LaunchPlan {
        process: ProcessControl {
            daemonizer: SystemDaemonizer::new(),
            shutdown: SystemShutdownSignal::new(),
        },
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
        },
    };
    run_agent_with(plan, &mut io::stdout().lock())
}

/// Runs the agent with injected collaborators. Command listings go to `out`.
pub(crate) fn run_agent_with<L, D, S>(
    plan: LaunchPlan<L, D, S>,
    out: &mut dyn Write,
) -> Result<AgentExit, LaunchError>
where
    L: ConfigLoader,
    D: Daemonizer,
    S: ShutdownSignal,
{
    let LaunchPlan { process, services } = plan;
    let ProcessControl {
        daemonizer,
        shutdown,
    } = process;
    let ServiceDeps { loader, reporter } = services;

    let agent = bootstrap_with(&loader, reporter)?;
    if agent.listing_requested() {
        agent
            .write_command_list(out)
            .map_err(|source| LaunchError::ListCommands { source })?;
        return Ok(AgentExit::CommandsListed);
    }

    let config = agent.config();
    let mode = LaunchMode::from_config(config);
    let endpoint = config.endpoint();
    info!(
        target: PROCESS_TARGET,
        ?mode,
        endpoint = %endpoint,
        "starting agent"
    );
    endpoint.prepare_filesystem()?;
    let runtime_paths = RuntimePaths::from_config(config)?;
    let mut guard = PidFileGuard::acquire(runtime_paths.pid_path())?;
    if mode == LaunchMode::Background {
        daemonizer.daemonize(&runtime_paths)?;
    }
    guard.write_pid(std::process::id())?;

    let mut channel = Channel::new(endpoint)?;
    let closer = channel.closer();
    let watch = shutdown.watch(channel.closer())?;
    let outcome = serve_channel(&agent, &mut channel, &closer);
    watch.stop();
    let closed = channel.close();
    let exit = outcome?;
    closed?;
    info!(
        target: PROCESS_TARGET,
        ?exit,
        "shutdown sequence completed"
    );
    Ok(exit)
}

/// Dials and serves the channel. Failures caused by a close request count as
/// an interrupted run.
fn serve_channel(
    agent: &Agent,
    channel: &mut Channel,
    closer: &ChannelCloser,
) -> Result<AgentExit, LaunchError> {
    match agent.connect(channel) {
        Ok(_) => {}
        Err(ChannelError::Closed { .. }) => return Ok(AgentExit::Interrupted),
        Err(error) => return Err(error.into()),
    }
    match agent.serve(channel) {
        Ok(_) if closer.is_closed() => Ok(AgentExit::Interrupted),
        Ok(summary) => Ok(AgentExit::PeerClosed { summary }),
        Err(_) if closer.is_closed() => Ok(AgentExit::Interrupted),
        Err(error) => Err(error.into()),
    }
}
