//! Host channel: a bidirectional byte stream to the hypervisor.
//!
//! A [`Channel`] wraps one of three transports selected by the configured
//! [`TransportMethod`]: a virtio-serial port, an ISA serial line, or a
//! listening unix socket. Descriptors are opened non-blocking and
//! close-on-exec; blocking reads and writes are emulated with `poll(2)` over
//! the channel descriptor and an internal wake-up socket so that a
//! [`ChannelCloser`] can interrupt them from another thread.

mod closer;
mod device;
mod dial;
mod errors;
mod unix;


use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd, IntoRawFd};
use std::os::unix::net::{UnixListener, UnixStream};

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use qga_config::{ChannelEndpoint, TransportMethod};
use tracing::{info, warn};

pub use closer::ChannelCloser;
pub use dial::{DialOutcome, DialPolicy};
pub use errors::ChannelError;

use closer::WakeReceiver;
use unix::UnixChannel;

pub(crate) const CHANNEL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::channel");

/// Lifecycle of a [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No descriptor is held.
    Unconnected,
    /// An open attempt is in progress.
    Connecting,
    /// The transport is open and usable.
    Connected,
    /// The channel was closed; it cannot be reopened.
    Closed,
}

/// Bidirectional byte stream to the host.
///
/// Reading and writing go through `&Channel`, so one value can serve as both
/// the request source and the response sink of the dispatch loop.
#[derive(Debug)]
pub struct Channel {
    endpoint: ChannelEndpoint,
    state: ChannelState,
    transport: Option<Transport>,
    closer: ChannelCloser,
    wake: WakeReceiver,
}

#[derive(Debug)]
enum Transport {
    Device(File),
    Unix(UnixChannel),
}

/// Borrowed view of the descriptor to use for the next I/O attempt.
enum Io<'a> {
    Device(&'a File),
    Peer(&'a UnixStream),
    Accepting(&'a UnixListener),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Ready,
    TimedOut,
    Closed,
}

impl Channel {
    /// Creates an unconnected channel for the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Wake`] when the internal wake-up pair cannot be
    /// created.
    pub fn new(endpoint: ChannelEndpoint) -> Result<Self, ChannelError> {
        let (closer, wake) =
            closer::wake_pair().map_err(|source| ChannelError::Wake { source })?;
        Ok(Self {
            endpoint,
            state: ChannelState::Unconnected,
            transport: None,
            closer,
            wake,
        })
    }

    /// Endpoint this channel targets.
    #[must_use]
    pub fn endpoint(&self) -> &ChannelEndpoint {
        &self.endpoint
    }

    /// Current lifecycle state. A pending close request reports `Closed`.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        if self.closer.is_closed() {
            ChannelState::Closed
        } else {
            self.state
        }
    }

    /// Returns a handle that can close this channel from another thread.
    #[must_use]
    pub fn closer(&self) -> ChannelCloser {
        self.closer.clone()
    }

    /// Makes a single attempt to open the transport.
    ///
    /// On failure the channel returns to [`ChannelState::Unconnected`] and no
    /// descriptor is retained.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NotReady`] for transient conditions such as a
    /// missing device node or an unattached virtio port, and other variants
    /// for permanent failures.
    pub fn open(&mut self) -> Result<(), ChannelError> {
        match self.state() {
            ChannelState::Closed => {
                return Err(ChannelError::Closed {
                    endpoint: self.endpoint.to_string(),
                });
            }
            ChannelState::Connected => {
                return Err(ChannelError::AlreadyConnected {
                    endpoint: self.endpoint.to_string(),
                });
            }
            ChannelState::Unconnected | ChannelState::Connecting => {}
        }

        self.state = ChannelState::Connecting;
        match self.open_transport() {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = ChannelState::Connected;
                info!(
                    target: CHANNEL_TARGET,
                    endpoint = %self.endpoint,
                    "channel connected"
                );
                Ok(())
            }
            Err(error) => {
                self.state = ChannelState::Unconnected;
                Err(error)
            }
        }
    }

    fn open_transport(&self) -> Result<Transport, ChannelError> {
        match self.endpoint.method() {
            TransportMethod::VirtioSerial => {
                device::open_virtio_serial(&self.endpoint).map(Transport::Device)
            }
            TransportMethod::IsaSerial => {
                device::open_isa_serial(&self.endpoint).map(Transport::Device)
            }
            TransportMethod::UnixListen => {
                UnixChannel::bind(self.endpoint.path()).map(Transport::Unix)
            }
        }
    }

    /// Releases the transport. Safe to call more than once.
    ///
    /// Pending reads on other handles observe end-of-stream.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Close`] when the kernel reports a close error
    /// and [`ChannelError::UnixCleanup`] when the socket file cannot be
    /// removed.
    pub fn close(&mut self) -> Result<(), ChannelError> {
        self.closer.close();
        self.state = ChannelState::Closed;
        let Some(transport) = self.transport.take() else {
            return Ok(());
        };
        info!(
            target: CHANNEL_TARGET,
            endpoint = %self.endpoint,
            "closing channel"
        );
        match transport {
            Transport::Device(file) => {
                nix::unistd::close(file.into_raw_fd()).map_err(|errno| ChannelError::Close {
                    endpoint: self.endpoint.to_string(),
                    source: io::Error::from(errno),
                })
            }
            Transport::Unix(unix) => unix.shutdown(),
        }
    }

    fn connected(&self) -> io::Result<&Transport> {
        self.transport
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "channel is not connected"))
    }

    fn read_some(&self, buf: &mut [u8]) -> io::Result<usize> {
        let transport = self.connected()?;
        loop {
            if self.closer.is_closed() {
                return Ok(0);
            }
            let pending = match transport.io()? {
                Io::Device(mut file) => match file.read(buf) {
                    Ok(read) => return Ok(read),
                    Err(error) if is_transient(&error) => file.as_fd(),
                    Err(error) => return Err(error),
                },
                Io::Peer(mut stream) => match stream.read(buf) {
                    Ok(read) => return Ok(read),
                    Err(error) if is_transient(&error) => stream.as_fd(),
                    Err(error) => return Err(error),
                },
                Io::Accepting(listener) => listener.as_fd(),
            };
            let wait = self.wait_for(Some(pending), PollFlags::POLLIN, PollTimeout::NONE)?;
            if wait == Wait::Closed {
                return Ok(0);
            }
        }
    }

    /// Writes through to the transport. A close request does not abort a
    /// write on a connected transport; the close is observed by the next
    /// read. A wait ends early only when the descriptor is not writable.
    fn write_some(&self, buf: &[u8]) -> io::Result<usize> {
        let transport = self.connected()?;
        loop {
            let (pending, events) = match transport.io()? {
                Io::Device(mut file) => match file.write(buf) {
                    Ok(written) => return Ok(written),
                    Err(error) if is_transient(&error) => (file.as_fd(), PollFlags::POLLOUT),
                    Err(error) => return Err(error),
                },
                Io::Peer(mut stream) => match stream.write(buf) {
                    Ok(written) => return Ok(written),
                    Err(error) if is_transient(&error) => (stream.as_fd(), PollFlags::POLLOUT),
                    Err(error) => return Err(error),
                },
                Io::Accepting(_) if self.closer.is_closed() => return Err(closed_error()),
                Io::Accepting(listener) => (listener.as_fd(), PollFlags::POLLIN),
            };
            if self.wait_for(Some(pending), events, PollTimeout::NONE)? == Wait::Closed {
                return Err(closed_error());
            }
        }
    }

    /// Blocks until `fd` reports `events`, the timeout elapses, or a close
    /// request arrives. A ready descriptor wins over a close request. With no
    /// descriptor this is an interruptible sleep.
    fn wait_for(
        &self,
        fd: Option<BorrowedFd<'_>>,
        events: PollFlags,
        timeout: PollTimeout,
    ) -> io::Result<Wait> {
        loop {
            let mut fds = Vec::with_capacity(2);
            fds.push(PollFd::new(self.wake.as_stream().as_fd(), PollFlags::POLLIN));
            if let Some(fd) = fd {
                fds.push(PollFd::new(fd, events));
            }
            match poll(&mut fds, timeout) {
                Ok(0) if self.closer.is_closed() => return Ok(Wait::Closed),
                Ok(0) => return Ok(Wait::TimedOut),
                Ok(_) => {
                    if has_events(fds.get(1)) {
                        return Ok(Wait::Ready);
                    }
                    return Ok(if has_events(fds.first()) {
                        Wait::Closed
                    } else {
                        Wait::Ready
                    });
                }
                Err(Errno::EINTR) => {}
                Err(errno) => return Err(io::Error::from(errno)),
            }
        }
    }
}

impl Transport {
    fn io(&self) -> io::Result<Io<'_>> {
        match self {
            Self::Device(file) => Ok(Io::Device(file)),
            Self::Unix(unix) => Ok(match unix.try_accept()? {
                Some(peer) => Io::Peer(peer),
                None => Io::Accepting(unix.listener()),
            }),
        }
    }
}

impl Read for &Channel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (*self).read_some(buf)
    }
}

impl Write for &Channel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (*self).write_some(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!(
                target: CHANNEL_TARGET,
                error = %error,
                "failed to close channel on drop"
            );
        }
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

fn has_events(fd: Option<&PollFd<'_>>) -> bool {
    fd.and_then(|pfd| pfd.revents())
        .is_some_and(|revents| !revents.is_empty())
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "channel closed")
}
