//! Behavioural suites for the guest agent.

mod behaviour;
mod channel_behaviour;
mod support;
