//! The `transport` module handles network communication with clients.
//!
//! It defines the JSON control protocol spoken over WebSocket and implements
//! the server itself: accepting connections, decoding frames into broker
//! handler calls, and draining each client's outbound channel into its
//! socket. Frame encoding/decoding lives entirely here; the broker core only
//! ever sees decoded events.

pub mod message;
pub mod websocket;
