//! An asynchronous WAMP client.
//!
//! The protocol lives in [`connection::Connection`], a synchronous state machine that correlates
//! requests and responses for the publisher, subscriber, caller, and callee roles. A
//! [`peer::Peer`] owns one connection inside a Tokio task and drives it over a
//! [`transport::transport::Transport`].

pub mod connection;
pub mod core;
pub mod message;
pub mod peer;
pub mod role;
pub mod serializer;
pub mod transport;
