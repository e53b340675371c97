//! Request dispatch loop.
//!
//! A [`Session`] reads one JSON value at a time from the channel, routes it
//! through the [`CommandRegistry`](crate::registry::CommandRegistry), and
//! writes exactly one response before reading the next value. Requests are
//! strictly sequential.
//!
//! End-of-stream between values is a normal shutdown. Malformed or truncated
//! JSON and write failures end the session with a [`DispatchError`]; every
//! other failure becomes an error response and the loop continues.

mod errors;
mod session;


pub use errors::DispatchError;
pub use session::{DispatchState, Dispatcher, Session, SessionSummary};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
