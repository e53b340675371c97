//! Listening unix socket transport.
//!
//! The agent binds the socket and the host connects as a client. The first
//! read or write accepts the peer; subsequent I/O uses that stream.

use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use super::{CHANNEL_TARGET, ChannelError};

#[derive(Debug)]
pub(super) struct UnixChannel {
    path: Utf8PathBuf,
    listener: UnixListener,
    peer: OnceCell<UnixStream>,
}

impl UnixChannel {
    pub(super) fn bind(path: &Utf8Path) -> Result<Self, ChannelError> {
        let listener = bind_unix(path.as_std_path())?;
        listener
            .set_nonblocking(true)
            .map_err(|source| ChannelError::BindUnix {
                path: path.to_string(),
                source,
            })?;
        info!(
            target: CHANNEL_TARGET,
            path = %path,
            "unix channel listening"
        );
        Ok(Self {
            path: path.to_path_buf(),
            listener,
            peer: OnceCell::new(),
        })
    }

    pub(super) fn listener(&self) -> &UnixListener {
        &self.listener
    }

    pub(super) fn peer(&self) -> Option<&UnixStream> {
        self.peer.get()
    }

    /// Tries to accept the host connection without blocking.
    ///
    /// Returns `Ok(None)` when no client is waiting yet.
    pub(super) fn try_accept(&self) -> io::Result<Option<&UnixStream>> {
        if let Some(peer) = self.peer.get() {
            return Ok(Some(peer));
        }
        match self.listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(true)?;
                info!(
                    target: CHANNEL_TARGET,
                    path = %self.path,
                    "host connected to unix channel"
                );
                Ok(Some(self.peer.get_or_init(|| stream)))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Drops the sockets and removes the socket file.
    pub(super) fn shutdown(self) -> Result<(), ChannelError> {
        let Self { path, listener, peer } = self;
        drop(peer);
        drop(listener);
        match fs::remove_file(path.as_std_path()) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ChannelError::UnixCleanup {
                path: path.to_string(),
                source,
            }),
        }
    }
}

fn bind_unix(path: &Path) -> Result<UnixListener, ChannelError> {
    if path.exists() {
        let metadata = fs::symlink_metadata(path).map_err(|source| ChannelError::UnixMetadata {
            path: path.display().to_string(),
            source,
        })?;
        if !metadata.file_type().is_socket() {
            return Err(ChannelError::UnixNotSocket {
                path: path.display().to_string(),
            });
        }
        match UnixStream::connect(path) {
            Ok(_stream) => {
                return Err(ChannelError::UnixInUse {
                    path: path.display().to_string(),
                });
            }
            Err(error)
                if error.kind() == io::ErrorKind::ConnectionRefused
                    || error.kind() == io::ErrorKind::NotFound =>
            {
                warn!(
                    target: CHANNEL_TARGET,
                    path = %path.display(),
                    "removing stale unix socket"
                );
                fs::remove_file(path).map_err(|source| ChannelError::UnixCleanup {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            Err(error) => {
                return Err(ChannelError::UnixConnect {
                    path: path.display().to_string(),
                    source: error,
                });
            }
        }
    }

    UnixListener::bind(path).map_err(|source| ChannelError::BindUnix {
        path: path.display().to_string(),
        source,
    })
}
