use serde::{Deserialize, Serialize};

/// Frames sent by clients, tagged by `type`.
///
/// `connect` must be the first frame on a socket; everything else is refused
/// until it has been acknowledged.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "connect")]
    Connect { client_id: String },

    #[serde(rename = "subscribe")]
    Subscribe { topic: String },

    #[serde(rename = "unsubscribe")]
    Unsubscribe { topic: String },

    #[serde(rename = "publish")]
    Publish {
        topic: String,
        payload: String,
        qos: Option<u8>,
    },

    #[serde(rename = "disconnect")]
    Disconnect,
}

/// Control frames sent by the server. Published messages reach subscribers
/// as `message`-tagged frames serialized by the broker.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "connack")]
    ConnAck { connection_key: String },

    #[serde(rename = "error")]
    Error { message: String },
}
