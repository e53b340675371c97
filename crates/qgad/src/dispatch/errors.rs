//! Errors that end a dispatch session.

use thiserror::Error;

use crate::codec::CodecError;

/// Fatal dispatch failures. Per-request failures never surface here; they
/// are answered with error responses.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request stream could not be decoded.
    #[error("failed to decode request: {source}")]
    Decode {
        #[source]
        source: CodecError,
    },
    /// A response could not be written back to the host.
    #[error("failed to write response: {source}")]
    Write {
        #[source]
        source: CodecError,
    },
}

impl DispatchError {
    /// Process exit status for this failure.
    #[must_use]
    pub const fn exit_status(&self) -> u8 {
        match self {
            Self::Decode { .. } | Self::Write { .. } => 1,
        }
    }
}
