use std::io;

use thiserror::Error;

/// Errors raised while framing JSON on the channel.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input was not valid JSON.
    #[error("malformed JSON at line {line}, column {column}: {source}")]
    Malformed {
        line: usize,
        column: usize,
        #[source]
        source: serde_json::Error,
    },
    /// The stream ended in the middle of a value.
    #[error("stream ended inside a JSON value: {source}")]
    Truncated {
        #[source]
        source: serde_json::Error,
    },
    /// The underlying reader or writer failed.
    #[error("channel I/O failed: {source}")]
    Io {
        #[source]
        source: io::Error,
    },
    /// A response could not be serialised.
    #[error("failed to serialise response: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}

impl CodecError {
    pub(super) fn from_decode(error: serde_json::Error) -> Self {
        if error.is_io() {
            Self::Io {
                source: io::Error::from(error),
            }
        } else if error.is_eof() {
            Self::Truncated { source: error }
        } else {
            Self::Malformed {
                line: error.line(),
                column: error.column(),
                source: error,
            }
        }
    }
}
