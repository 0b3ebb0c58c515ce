//! # lampmq
//!
//! `lampmq` is a small in-process MQTT-style broker: it tracks live client
//! connections, their topic subscriptions, and fans published messages out to
//! every matching subscriber. The reference transport speaks a JSON control
//! protocol over WebSockets; the broker core only ever sees decoded events.
//!
//! ## Core Modules
//!
//! - `broker`: the event dispatcher plus the client registry and topic
//!   subscription index it owns.
//! - `client`: the record kept for one live connection.
//! - `config`: file- and environment-layered server configuration.
//! - `transport`: the WebSocket server and the frame protocol.
//! - `utils`: error taxonomy and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
