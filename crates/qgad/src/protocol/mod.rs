//! Wire types exchanged with the host.
//!
//! Requests arrive as JSON objects naming a command in `execute`; every
//! consumed request produces exactly one [`Response`].

mod request;
mod response;

pub use request::{Frame, Request};
pub use response::{ErrorBody, ErrorClass, Response};
