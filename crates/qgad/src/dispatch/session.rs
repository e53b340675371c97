//! Per-channel request loop.

use std::io::{Read, Write};
use std::ops::ControlFlow;

use tracing::{debug, error, info, trace, warn};

use super::{DISPATCH_TARGET, DispatchError};
use crate::codec::{FrameDecoder, FrameEncoder};
use crate::protocol::{ErrorClass, Frame, Request, Response};
use crate::registry::{Arguments, CommandContext, CommandRegistry};

/// Position of a [`Session`] in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Between requests.
    Idle,
    /// Waiting for the next JSON value.
    Decoding,
    /// Running an allowed command.
    Executing,
    /// Answering a request that will not run: unknown, disabled, or invalid.
    Skipping,
    /// The stream ended or failed; no response follows.
    Terminating,
    /// Writing the response.
    Encoding,
    /// The session is over.
    Closed,
}

/// Counters reported when a session ends cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Responses written.
    pub responses: u64,
    /// Responses that carried an error.
    pub errors: u64,
}

/// Routes decoded frames to command handlers.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'r> {
    registry: &'r CommandRegistry,
}

impl<'r> Dispatcher<'r> {
    /// Creates a dispatcher routing to `registry`.
    #[must_use]
    pub const fn new(registry: &'r CommandRegistry) -> Self {
        Self { registry }
    }

    /// Starts a session over the given reader and writer.
    pub fn session<R: Read, W: Write>(&self, reader: R, writer: W) -> Session<'r, R, W> {
        Session {
            dispatcher: *self,
            decoder: FrameDecoder::new(reader),
            encoder: FrameEncoder::new(writer),
            state: DispatchState::Idle,
            summary: SessionSummary::default(),
        }
    }

    /// Serves requests until end-of-stream.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on a decode or write failure.
    pub fn run<R: Read, W: Write>(
        &self,
        reader: R,
        writer: W,
    ) -> Result<SessionSummary, DispatchError> {
        self.session(reader, writer).run()
    }

    /// Builds the response for one frame.
    #[must_use]
    pub fn respond(&self, frame: Frame) -> Response {
        self.route(frame).1
    }

    fn route(&self, frame: Frame) -> (DispatchState, Response) {
        let request = match frame {
            Frame::Request(request) => request,
            Frame::Invalid { id, reason } => {
                warn!(target: DISPATCH_TARGET, %reason, "rejecting invalid request");
                let response = Response::error(
                    ErrorClass::GenericError,
                    format!("Invalid request: {reason}"),
                    id,
                );
                return (DispatchState::Skipping, response);
            }
        };
        let Request {
            execute,
            arguments,
            id,
        } = request;

        let Ok(handler) = self.registry.lookup(&execute) else {
            debug!(target: DISPATCH_TARGET, command = %execute, "unknown command");
            let response = Response::error(
                ErrorClass::CommandNotFound,
                format!("The command {execute} has not been found"),
                id,
            );
            return (DispatchState::Skipping, response);
        };
        if self.registry.is_blacklisted(&execute) {
            debug!(target: DISPATCH_TARGET, command = %execute, "command disabled");
            let response = Response::error(
                ErrorClass::CommandDisabled,
                format!("The command {execute} has been disabled for this instance"),
                id,
            );
            return (DispatchState::Skipping, response);
        }

        trace!(target: DISPATCH_TARGET, command = %execute, "executing command");
        let arguments = Arguments::new(arguments);
        let response = match handler.call(&CommandContext::new(self.registry), &arguments) {
            Ok(value) => Response::success(value, id),
            Err(failure) => {
                debug!(
                    target: DISPATCH_TARGET,
                    command = %execute,
                    error = %failure,
                    "command failed"
                );
                Response::error(failure.class(), failure.to_string(), id)
            }
        };
        (DispatchState::Executing, response)
    }
}

/// One request loop bound to a reader and a writer.
pub struct Session<'r, R: Read, W: Write> {
    dispatcher: Dispatcher<'r>,
    decoder: FrameDecoder<R>,
    encoder: FrameEncoder<W>,
    state: DispatchState,
    summary: SessionSummary,
}

impl<R: Read, W: Write> Session<'_, R, W> {
    /// Current state.
    #[must_use]
    pub const fn state(&self) -> DispatchState {
        self.state
    }

    /// Counters so far.
    #[must_use]
    pub const fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Serves requests until the session closes.
    ///
    /// # Errors
    ///
    /// See [`Session::step`].
    pub fn run(mut self) -> Result<SessionSummary, DispatchError> {
        loop {
            if let ControlFlow::Break(summary) = self.step()? {
                return Ok(summary);
            }
        }
    }

    /// Handles exactly one request, or observes the end of the stream.
    ///
    /// Returns `Break` with the final counters once the peer closes the
    /// stream. Calling `step` after the session closed returns `Break`
    /// again without reading.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Decode`] for malformed, truncated, or
    /// unreadable input and [`DispatchError::Write`] when the response cannot
    /// be written. The session is closed afterwards.
    pub fn step(&mut self) -> Result<ControlFlow<SessionSummary>, DispatchError> {
        if self.state == DispatchState::Closed {
            return Ok(ControlFlow::Break(self.summary));
        }

        self.transition(DispatchState::Decoding);
        let frame = match self.decoder.decode_next() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.transition(DispatchState::Terminating);
                info!(
                    target: DISPATCH_TARGET,
                    responses = self.summary.responses,
                    "host closed the channel"
                );
                self.transition(DispatchState::Closed);
                return Ok(ControlFlow::Break(self.summary));
            }
            Err(source) => {
                self.transition(DispatchState::Terminating);
                error!(target: DISPATCH_TARGET, error = %source, "request stream corrupted");
                self.transition(DispatchState::Closed);
                return Err(DispatchError::Decode { source });
            }
        };

        let (state, response) = self.dispatcher.route(frame);
        self.transition(state);

        self.transition(DispatchState::Encoding);
        if let Err(source) = self.encoder.encode(&response) {
            error!(target: DISPATCH_TARGET, error = %source, "failed to write response");
            self.transition(DispatchState::Closed);
            return Err(DispatchError::Write { source });
        }
        self.summary.responses += 1;
        if response.error_class().is_some() {
            self.summary.errors += 1;
        }

        self.transition(DispatchState::Idle);
        Ok(ControlFlow::Continue(()))
    }

    fn transition(&mut self, next: DispatchState) {
        trace!(
            target: DISPATCH_TARGET,
            from = ?self.state,
            to = ?next,
            "dispatch state change"
        );
        self.state = next;
    }
}
