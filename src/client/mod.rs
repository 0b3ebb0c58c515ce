//! The `client` module defines the representation of one live connection.
//!
//! A `Client` couples the client-supplied identifier with the broker-internal
//! connection key and the outbound channel the transport drains into the
//! socket.

pub mod connection;
pub use connection::Client;
