use std::fmt;
use std::fs::DirBuilder;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, VariantNames};
use thiserror::Error;

use crate::defaults::{
    DEFAULT_ISA_SERIAL_PATH, DEFAULT_UNIX_LISTEN_PATH, DEFAULT_VIRTIO_SERIAL_PATH,
};

/// Transport used to reach the host.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    Display,
    VariantNames,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum TransportMethod {
    /// Paravirtualised character device (`/dev/virtio-ports/...`).
    #[default]
    VirtioSerial,
    /// Emulated 16550 serial line.
    IsaSerial,
    /// Listening unix domain socket; the host connects as a client.
    UnixListen,
}

impl TransportMethod {
    /// Path used when the operator does not supply one.
    #[must_use]
    pub const fn default_path(self) -> &'static str {
        match self {
            Self::VirtioSerial => DEFAULT_VIRTIO_SERIAL_PATH,
            Self::IsaSerial => DEFAULT_ISA_SERIAL_PATH,
            Self::UnixListen => DEFAULT_UNIX_LISTEN_PATH,
        }
    }
}

/// Errors encountered while parsing a [`TransportMethod`] from text.
pub type TransportMethodParseError = strum::ParseError;

/// Declarative description of the host channel: a method and a path.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChannelEndpoint {
    method: TransportMethod,
    path: Utf8PathBuf,
}

impl ChannelEndpoint {
    /// Builds an endpoint for the given method and path.
    #[must_use]
    pub fn new(method: TransportMethod, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    /// Builds an endpoint using the method's conventional path.
    #[must_use]
    pub fn with_default_path(method: TransportMethod) -> Self {
        Self::new(method, method.default_path())
    }

    /// Transport method.
    #[must_use]
    pub const fn method(&self) -> TransportMethod {
        self.method
    }

    /// Device or socket path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.path.as_path()
    }

    /// Returns the socket path when the endpoint listens on a unix socket.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self.method {
            TransportMethod::UnixListen => Some(self.path.as_path()),
            TransportMethod::VirtioSerial | TransportMethod::IsaSerial => None,
        }
    }

    /// Ensures the socket's parent directory exists with restrictive permissions.
    ///
    /// Device-backed endpoints need no preparation.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointPreparationError`] when the socket path has no parent
    /// or the directory cannot be created.
    pub fn prepare_filesystem(&self) -> Result<(), EndpointPreparationError> {
        let Some(path) = self.unix_path() else {
            return Ok(());
        };
        let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) else {
            return Err(EndpointPreparationError::MissingParent {
                path: path.to_path_buf(),
            });
        };

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        if let Err(source) = builder.create(parent.as_std_path())
            && source.kind() != std::io::ErrorKind::AlreadyExists
        {
            return Err(EndpointPreparationError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            });
        }

        Ok(())
    }
}

impl fmt::Display for ChannelEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.method, self.path)
    }
}

/// Errors raised when preparing the filesystem for an endpoint.
#[derive(Debug, Error)]
pub enum EndpointPreparationError {
    /// Parent directory is missing when creating a unix socket path.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent { path: Utf8PathBuf },
    /// Failed to create the socket directory.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}
