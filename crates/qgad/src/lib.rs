//! Guest agent answering host commands over a hypervisor channel.
//!
//! The agent runs inside a virtual machine and serves JSON commands sent by
//! the host over a virtio-serial port, an ISA serial line, or a listening unix
//! socket selected through [`qga_config`]. Start-up loads configuration,
//! initialises structured telemetry, builds the [`CommandRegistry`] with the
//! configured blacklist, and dials the channel within a bounded budget.
//!
//! Requests are handled one at a time:
//!
//! 1. **Decode**: the next JSON value is read from the channel. Whitespace
//!    and newlines between values are insignificant.
//! 2. **Route**: the `execute` name is looked up; unknown and blacklisted
//!    commands are answered with `CommandNotFound` and `CommandDisabled`
//!    errors without running a handler.
//! 3. **Respond**: exactly one `return` or `error` object is written back,
//!    echoing the request `id` when one was supplied.
//!
//! End-of-stream between values ends the session cleanly. Malformed JSON and
//! write failures are fatal. Termination signals close the channel, which
//! unblocks the pending read and ends the session at the next boundary.

mod bootstrap;
pub mod channel;
pub mod codec;
pub mod commands;
pub mod dispatch;
mod health;
mod process;
pub mod protocol;
pub mod registry;
mod telemetry;

pub use bootstrap::{
    Agent, BootstrapError, ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{AgentExit, LaunchError, LaunchMode, run_agent};
pub use registry::{CommandHandler, CommandRegistry};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
