//! Shared configuration for the guest agent.
//!
//! [`Config`] is parsed from command-line flags, with `QGA_*` environment
//! variables as fallbacks. It resolves the host channel endpoint, the command
//! blacklist, logging preferences, and the runtime paths used by the process
//! supervisor.

mod blacklist;
mod defaults;
mod logging;
mod runtime;
mod transport;

use std::ffi::OsString;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use thiserror::Error;

pub use blacklist::{Blacklist, LIST_COMMANDS_QUERY};
pub use defaults::{
    DEFAULT_DIAL_TIMEOUT_MS, DEFAULT_FSFREEZE_HOOK, DEFAULT_ISA_SERIAL_PATH, DEFAULT_LOG_FILTER,
    DEFAULT_PID_FILE, DEFAULT_STATE_DIR, DEFAULT_UNIX_LISTEN_PATH, DEFAULT_VIRTIO_SERIAL_PATH,
    VERBOSE_LOG_FILTER, default_channel_endpoint, default_dial_timeout, default_log_filter,
    default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError, LogSink};
pub use runtime::{RuntimePaths, RuntimePathsError};
pub use transport::{
    ChannelEndpoint, EndpointPreparationError, TransportMethod, TransportMethodParseError,
};

/// Resolved agent configuration.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "qemu-ga",
    version,
    about = "Guest agent answering host commands over a virtio, serial, or unix channel"
)]
pub struct Config {
    /// Log extra debugging information.
    #[arg(short = 'v', long, env = "QGA_VERBOSE")]
    pub verbose: bool,
    /// Become a daemon.
    #[arg(short = 'd', long = "daemonize", env = "QGA_DAEMONIZE")]
    pub daemonize: bool,
    /// Comma-separated list of RPCs to disable (no spaces, "?" to list available RPCs).
    #[arg(
        short = 'b',
        long = "blacklist",
        value_name = "RPCS",
        value_delimiter = ',',
        env = "QGA_BLACKLIST"
    )]
    pub blacklist: Vec<String>,
    /// Directory to store state information (absolute paths only).
    #[arg(
        short = 't',
        long = "statedir",
        value_name = "DIR",
        default_value = DEFAULT_STATE_DIR,
        env = "QGA_STATEDIR"
    )]
    pub state_dir: Utf8PathBuf,
    /// Script run on freeze/thaw with a `freeze` or `thaw` argument.
    #[arg(
        short = 'F',
        long = "fsfreeze-hook",
        value_name = "SCRIPT",
        default_value = DEFAULT_FSFREEZE_HOOK,
        env = "QGA_FSFREEZE_HOOK"
    )]
    pub fsfreeze_hook: Utf8PathBuf,
    /// Transport method: one of virtio-serial, isa-serial, or unix-listen.
    #[arg(
        short = 'm',
        long,
        value_name = "METHOD",
        default_value_t = TransportMethod::VirtioSerial,
        env = "QGA_METHOD"
    )]
    pub method: TransportMethod,
    /// Device or socket path (defaults depend on the method).
    #[arg(short = 'p', long, value_name = "PATH", env = "QGA_PATH")]
    pub path: Option<Utf8PathBuf>,
    /// Log file path, or `stderr`.
    #[arg(
        short = 'l',
        long = "logfile",
        value_name = "PATH",
        default_value = defaults::DEFAULT_LOG_SINK,
        env = "QGA_LOGFILE"
    )]
    pub log_sink: LogSink,
    /// Pidfile location.
    #[arg(
        short = 'f',
        long = "pidfile",
        value_name = "PATH",
        default_value = DEFAULT_PID_FILE,
        env = "QGA_PIDFILE"
    )]
    pub pid_file: Utf8PathBuf,
    /// Tracing filter expression (for example `info,qgad::dispatch=debug`).
    #[arg(long, value_name = "FILTER", env = "QGA_LOG_FILTER")]
    pub log_filter: Option<String>,
    /// Log record format: `json` or `compact`.
    #[arg(long, value_name = "FORMAT", default_value_t = LogFormat::Json, env = "QGA_LOG_FORMAT")]
    pub log_format: LogFormat,
    /// Milliseconds allowed for the host channel to become ready.
    #[arg(
        long = "dial-timeout-ms",
        value_name = "MS",
        default_value_t = DEFAULT_DIAL_TIMEOUT_MS,
        env = "QGA_DIAL_TIMEOUT_MS"
    )]
    pub dial_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: false,
            daemonize: false,
            blacklist: Vec::new(),
            state_dir: Utf8PathBuf::from(DEFAULT_STATE_DIR),
            fsfreeze_hook: Utf8PathBuf::from(DEFAULT_FSFREEZE_HOOK),
            method: TransportMethod::default(),
            path: None,
            log_sink: LogSink::default(),
            pid_file: Utf8PathBuf::from(DEFAULT_PID_FILE),
            log_filter: None,
            log_format: default_log_format(),
            dial_timeout_ms: DEFAULT_DIAL_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when flags fail to parse or validate. Help and
    /// version requests surface as [`ConfigError::Cli`] so callers can print
    /// them with the right exit status.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list. The first item is
    /// the program name.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Self::try_parse_from(args)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.state_dir.is_absolute() {
            return Err(ConfigError::RelativeStateDir {
                path: self.state_dir.clone(),
            });
        }
        if self.dial_timeout_ms == 0 {
            return Err(ConfigError::ZeroDialTimeout);
        }
        Ok(())
    }

    /// Endpoint for the host channel, falling back to the method's default path.
    #[must_use]
    pub fn endpoint(&self) -> ChannelEndpoint {
        match &self.path {
            Some(path) => ChannelEndpoint::new(self.method, path.clone()),
            None => ChannelEndpoint::with_default_path(self.method),
        }
    }

    /// Commands disabled for this run.
    #[must_use]
    pub fn blacklist(&self) -> Blacklist {
        Blacklist::from_entries(&self.blacklist)
    }

    /// Effective log filter: the explicit filter, else `debug` when verbose,
    /// else the default.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        match (&self.log_filter, self.verbose) {
            (Some(filter), _) => filter.as_str(),
            (None, true) => VERBOSE_LOG_FILTER,
            (None, false) => default_log_filter(),
        }
    }

    /// Log record format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Log destination.
    #[must_use]
    pub const fn log_sink(&self) -> &LogSink {
        &self.log_sink
    }

    /// Budget for establishing the host channel.
    #[must_use]
    pub const fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    /// State directory.
    #[must_use]
    pub fn state_dir(&self) -> &Utf8Path {
        self.state_dir.as_path()
    }

    /// Pidfile location.
    #[must_use]
    pub fn pid_file(&self) -> &Utf8Path {
        self.pid_file.as_path()
    }

    /// Freeze/thaw hook script.
    #[must_use]
    pub fn fsfreeze_hook(&self) -> &Utf8Path {
        self.fsfreeze_hook.as_path()
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Flag parsing failed, or help/version output was requested.
    #[error(transparent)]
    Cli(#[from] clap::Error),
    /// The state directory was not absolute.
    #[error("state directory '{path}' must be an absolute path")]
    RelativeStateDir { path: Utf8PathBuf },
    /// The dial budget was zero.
    #[error("dial timeout must be greater than zero")]
    ZeroDialTimeout,
}
