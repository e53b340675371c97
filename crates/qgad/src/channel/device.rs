//! Character-device transports: virtio-serial ports and ISA serial lines.

use std::fs::{File, OpenOptions};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;

use nix::fcntl::OFlag;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::termios::{
    BaudRate, SetArg, SpecialCharacterIndices, cfmakeraw, cfsetspeed, tcgetattr, tcsetattr,
};
use qga_config::ChannelEndpoint;
use tracing::debug;

use super::errors::classify_open_error;
use super::{CHANNEL_TARGET, ChannelError};

/// Line speed applied to ISA serial ports.
const SERIAL_BAUD: BaudRate = BaudRate::B38400;

/// Opens a virtio-serial port.
///
/// The port node exists as soon as the device is plugged, but the host end
/// may not be attached yet. A zero-timeout poll reporting `POLLHUP` means
/// nobody is listening; the descriptor is dropped and the attempt reported
/// as not ready.
pub(super) fn open_virtio_serial(endpoint: &ChannelEndpoint) -> Result<File, ChannelError> {
    ensure_host_attached(open_device(endpoint)?, endpoint)
}

/// Hands `file` back when the host side is attached and drops it otherwise.
fn ensure_host_attached(file: File, endpoint: &ChannelEndpoint) -> Result<File, ChannelError> {
    if host_disconnected(&file, endpoint)? {
        return Err(ChannelError::NotReady {
            endpoint: endpoint.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "host side of the port is not connected",
            ),
        });
    }
    Ok(file)
}

/// Opens an ISA serial line and switches it to raw 8N1 at 38400 baud.
///
/// Reads return as soon as a single byte is available.
pub(super) fn open_isa_serial(endpoint: &ChannelEndpoint) -> Result<File, ChannelError> {
    let file = open_device(endpoint)?;
    configure_serial(&file).map_err(|source| ChannelError::SerialSetup {
        endpoint: endpoint.to_string(),
        source,
    })?;
    Ok(file)
}

fn open_device(endpoint: &ChannelEndpoint) -> Result<File, ChannelError> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags((OFlag::O_NONBLOCK | OFlag::O_NOCTTY).bits())
        .open(endpoint.path().as_std_path())
        .map_err(|source| classify_open_error(endpoint.to_string(), source))
}

fn host_disconnected(file: &File, endpoint: &ChannelEndpoint) -> Result<bool, ChannelError> {
    let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN)];
    let ready = poll(&mut fds, PollTimeout::ZERO).map_err(|errno| {
        classify_open_error(endpoint.to_string(), std::io::Error::from(errno))
    })?;
    if ready == 0 {
        return Ok(false);
    }
    let hung_up = fds
        .first()
        .and_then(|pfd| pfd.revents())
        .is_some_and(|events| events.contains(PollFlags::POLLHUP));
    if hung_up {
        debug!(
            target: CHANNEL_TARGET,
            endpoint = %endpoint,
            "virtio-serial port reports POLLHUP"
        );
    }
    Ok(hung_up)
}

fn configure_serial(file: &File) -> nix::Result<()> {
    let mut termios = tcgetattr(file)?;
    cfmakeraw(&mut termios);
    cfsetspeed(&mut termios, SERIAL_BAUD)?;
    termios.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
    termios.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
    tcsetattr(file, SetArg::TCSANOW, &termios)
}
