use std::time::Duration;

use crate::logging::LogFormat;
use crate::transport::{ChannelEndpoint, TransportMethod};

/// Default virtio-serial port exposed by QEMU for the guest agent.
pub const DEFAULT_VIRTIO_SERIAL_PATH: &str = "/dev/virtio-ports/org.qemu.guest_agent.0";

/// Default ISA serial device.
pub const DEFAULT_ISA_SERIAL_PATH: &str = "/dev/ttyS0";

/// Default listening socket used by the `unix-listen` method.
pub const DEFAULT_UNIX_LISTEN_PATH: &str = "/var/run/qemu-ga.sock";

/// Default directory for agent state.
pub const DEFAULT_STATE_DIR: &str = "/var/run";

/// Default pidfile location.
pub const DEFAULT_PID_FILE: &str = "/var/run/qemu-ga.pid";

/// Default fsfreeze hook script.
pub const DEFAULT_FSFREEZE_HOOK: &str = "/etc/qemu/fsfreeze-hook";

/// Default log destination keyword.
pub const DEFAULT_LOG_SINK: &str = "stderr";

/// Default log filter expression used by the agent.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Log filter applied when `--verbose` is set and no explicit filter is given.
pub const VERBOSE_LOG_FILTER: &str = "debug";

/// Default budget for establishing the host channel, in milliseconds.
pub const DEFAULT_DIAL_TIMEOUT_MS: u64 = 30_000;

/// Default log filter expression used by the agent.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the agent.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default dial budget.
#[must_use]
pub fn default_dial_timeout() -> Duration {
    Duration::from_millis(DEFAULT_DIAL_TIMEOUT_MS)
}

/// Computes the default endpoint: the virtio-serial port at its standard path.
#[must_use]
pub fn default_channel_endpoint() -> ChannelEndpoint {
    ChannelEndpoint::with_default_path(TransportMethod::default())
}
