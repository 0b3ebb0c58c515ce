//! Client representation
//!
//! `Client` models a connected client and holds the sending side of a
//! per-client channel used by the broker to push messages. Delivery is a
//! non-blocking channel send; the transport's send loop does the socket I/O.

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::registry::ConnectionKey;
use crate::utils::error::BrokerError;

#[derive(Debug)]
pub struct Client {
    /// Client-supplied identifier (the MQTT client-id).
    pub id: String,

    /// Broker-internal key, allocated by the registry at connect.
    pub connection_key: ConnectionKey,

    /// Milliseconds since Unix epoch at registration.
    pub connected_at: i64,

    /// Channel to send outbound frames to the client.
    pub sender: UnboundedSender<WsMessage>,
}

impl Client {
    pub fn new(
        id: impl Into<String>,
        connection_key: ConnectionKey,
        sender: UnboundedSender<WsMessage>,
    ) -> Self {
        Self {
            id: id.into(),
            connection_key,
            connected_at: Utc::now().timestamp_millis(),
            sender,
        }
    }

    /// Push one frame onto the client's outbound channel. Fails only when the
    /// send loop has already shut down (connection is going away).
    pub fn deliver(&self, frame: WsMessage) -> Result<(), BrokerError> {
        self.sender
            .send(frame)
            .map_err(|e| BrokerError::DeliveryFailure {
                key: self.connection_key,
                reason: e.to_string(),
            })
    }
}
