//! JSON framing over a byte stream.
//!
//! Requests are a whitespace-separated stream of JSON values with no other
//! delimiter; responses are written one value per line. Numbers keep their
//! exact textual form, so integers wider than 64 bits survive a round trip.

mod errors;

use std::io::{Read, Write};

use serde_json::de::IoRead;
use serde_json::{Deserializer, StreamDeserializer, Value};

pub use errors::CodecError;

use crate::protocol::{Frame, Response};

/// Pulls JSON values off a reader one at a time.
pub struct FrameDecoder<R: Read> {
    stream: StreamDeserializer<'static, IoRead<R>, Value>,
}

impl<R: Read> FrameDecoder<R> {
    /// Wraps `reader`. The reader is consumed lazily, one value at a time.
    pub fn new(reader: R) -> Self {
        Self {
            stream: Deserializer::from_reader(reader).into_iter::<Value>(),
        }
    }

    /// Decodes the next value.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between values.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] when the stream ends inside a value,
    /// [`CodecError::Malformed`] for invalid JSON, and [`CodecError::Io`]
    /// when the underlying reader fails.
    pub fn decode_next(&mut self) -> Result<Option<Frame>, CodecError> {
        match self.stream.next() {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(Frame::from_value(value))),
            Some(Err(error)) => Err(CodecError::from_decode(error)),
        }
    }
}

/// Writes responses as newline-terminated JSON.
pub struct FrameEncoder<W: Write> {
    writer: W,
}

impl<W: Write> FrameEncoder<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialises `response`, appends `\n`, writes it in one call, and
    /// flushes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Serialize`] or [`CodecError::Io`].
    pub fn encode(&mut self, response: &Response) -> Result<(), CodecError> {
        let mut payload =
            serde_json::to_vec(response).map_err(|source| CodecError::Serialize { source })?;
        payload.push(b'\n');
        self.writer
            .write_all(&payload)
            .map_err(|source| CodecError::Io { source })?;
        self.writer
            .flush()
            .map_err(|source| CodecError::Io { source })
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
