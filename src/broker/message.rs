//! Message definitions for the broker
//!
//! `Message` is the frame delivered to subscribers on publish. Notes on
//! fields:
//! - `topic`: literal topic name used for routing (no wildcards)
//! - `payload`: opaque body carried through unchanged
//! - `timestamp`: milliseconds since Unix epoch, stamped by the broker upon
//!   publish
//! - `qos`: delivery mode requested by the publisher, carried through as an
//!   opaque attribute (0/1/2)

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename = "message")]
pub struct Message {
    pub topic: String,
    pub payload: String,
    pub timestamp: i64,
    pub qos: u8,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>, qos: u8) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            timestamp: Utc::now().timestamp_millis(),
            qos,
        }
    }
}
