//! WebSocket transport
//!
//! A minimal WebSocket server that translates protocol JSON frames into
//! broker operations. Responsibilities:
//! - Accept TCP/WebSocket connections
//! - Enforce a connect-first order: the `connect` frame registers the client
//!   and yields the connection key every later frame on the socket resolves to
//! - Spawn a send loop per connection that drains the client's outbound
//!   channel into the socket
//! - Tear down broker state when the socket goes away, relying on the
//!   broker's idempotent disconnect so racing paths are harmless

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use std::sync::{Arc, Mutex};

use crate::broker::Broker;
use crate::broker::registry::ConnectionKey;
use crate::transport::message::{ClientFrame, ServerFrame};

/// Binds `addr` and serves connections until the task is dropped.
pub async fn start_websocket_server(addr: String, broker: Arc<Mutex<Broker>>) {
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr, error = %e, "failed to bind listener");
            return;
        }
    };

    info!("broker listening on ws://{addr}");
    serve(listener, broker).await;
}

/// Accept loop over an already-bound listener, split out so callers (and
/// tests) can bind an ephemeral port first.
pub async fn serve(listener: TcpListener, broker: Arc<Mutex<Broker>>) {
    while let Ok((stream, _)) = listener.accept().await {
        tokio::spawn(handle_connection(stream, broker.clone()));
    }
}

async fn handle_connection(stream: TcpStream, broker: Arc<Mutex<Broker>>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(error = %e, "websocket handshake failed");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Channel the broker delivers into; the send loop drains it.
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(msg).await {
                debug!(error = %e, "send loop closed");
                break;
            }
        }
    });

    // Set once the connect frame has been accepted.
    let mut connection_key: Option<ConnectionKey> = None;

    while let Some(Ok(msg)) = ws_receiver.next().await {
        if !msg.is_text() {
            continue;
        }
        let text = match msg.to_text() {
            Ok(text) => text,
            Err(_) => continue,
        };

        match serde_json::from_str::<ClientFrame>(text) {
            Ok(ClientFrame::Connect { client_id }) => {
                if connection_key.is_some() {
                    send_control(&tx, &ServerFrame::Error {
                        message: "already connected".to_string(),
                    });
                    continue;
                }

                let result = broker
                    .lock()
                    .unwrap()
                    .handle_connect(&client_id, tx.clone());
                match result {
                    Ok(key) => {
                        connection_key = Some(key);
                        send_control(&tx, &ServerFrame::ConnAck {
                            connection_key: key.to_string(),
                        });
                    }
                    Err(e) => {
                        warn!(client = %client_id, error = %e, "connect refused");
                        send_control(&tx, &ServerFrame::Error {
                            message: e.to_string(),
                        });
                        break;
                    }
                }
            }

            Ok(ClientFrame::Disconnect) => break,

            Ok(frame) => match connection_key {
                Some(key) => handle_frame(&broker, key, frame),
                None => {
                    warn!("frame received before connect");
                    send_control(&tx, &ServerFrame::Error {
                        message: "must connect first".to_string(),
                    });
                    break;
                }
            },

            Err(err) => {
                warn!(error = %err, frame = %text.chars().take(100).collect::<String>(),
                    "invalid client frame");
            }
        }
    }

    // Socket is gone or the client said goodbye; either way tear down once.
    // handle_disconnect is idempotent, so a racing cleanup is harmless.
    if let Some(key) = connection_key {
        broker.lock().unwrap().handle_disconnect(&key);
    }
}

/// Dispatches one post-connect frame to the broker.
pub(crate) fn handle_frame(broker: &Mutex<Broker>, key: ConnectionKey, frame: ClientFrame) {
    let mut broker = broker.lock().unwrap();
    match frame {
        ClientFrame::Subscribe { topic } => broker.handle_subscribe(&topic, key),
        ClientFrame::Unsubscribe { topic } => broker.handle_unsubscribe(&topic, &key),
        ClientFrame::Publish {
            topic,
            payload,
            qos,
        } => {
            broker.handle_publish(&topic, payload, qos.unwrap_or(0));
        }
        // handled by the read loop before dispatch
        ClientFrame::Connect { .. } | ClientFrame::Disconnect => {}
    }
}

fn send_control(tx: &mpsc::UnboundedSender<WsMessage>, frame: &ServerFrame) {
    match serde_json::to_string(frame) {
        Ok(json) => {
            let _ = tx.send(WsMessage::text(json));
        }
        Err(e) => warn!(error = %e, "failed to serialize control frame"),
    }
}
