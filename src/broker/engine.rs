//! Broker event dispatcher
//!
//! The `Broker` owns the client registry and the topic subscription index and
//! is the only place that mutates both. It consumes the decoded connection
//! events (connect, disconnect, subscribe, unsubscribe, publish) and performs
//! publish fan-out over the per-client outbound channels.
//!
//! Concurrency and usage notes:
//! - The public API here is synchronous and designed to be held behind a
//!   lock (for example `Arc<Mutex<Broker>>`) by the transport layer. Each
//!   connection's events arrive in order; mutual exclusion across
//!   connections comes from the lock.
//! - Fan-out works on the snapshot returned by `matching_subscribers`, and
//!   delivery is a non-blocking channel send, so no network I/O happens
//!   while the lock is held.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::message::Message;
use crate::broker::registry::{ClientRegistry, ConnectionKey};
use crate::broker::subscriptions::SubscriptionIndex;
use crate::config::BrokerSettings;
use crate::utils::error::BrokerError;

#[derive(Debug)]
pub struct Broker {
    pub(crate) registry: ClientRegistry,
    pub(crate) subscriptions: SubscriptionIndex,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(&BrokerSettings::default())
    }
}

impl Broker {
    pub fn new(settings: &BrokerSettings) -> Self {
        Self {
            registry: ClientRegistry::new(settings.max_connections),
            subscriptions: SubscriptionIndex::new(settings.wildcard_subscriptions),
        }
    }

    /// Registers a new connection and returns its key. The transport keeps
    /// the key and passes it with every later event on the same socket.
    /// Refusal (registry at capacity) fails this connect attempt only.
    pub fn handle_connect(
        &mut self,
        client_id: &str,
        sender: UnboundedSender<WsMessage>,
    ) -> Result<ConnectionKey, BrokerError> {
        let key = self.registry.connect(client_id, sender)?;
        info!(client = client_id, %key, "client connected");
        Ok(key)
    }

    /// Tears down all state for `key`. Subscriptions are purged before the
    /// registry record is dropped, so a publish snapshotting in between never
    /// sees the dead connection. Idempotent.
    pub fn handle_disconnect(&mut self, key: &ConnectionKey) {
        self.subscriptions.remove_client(key);
        if let Some(client) = self.registry.get(key) {
            info!(client = %client.id, %key, "client disconnected");
        }
        self.registry.disconnect(key);
    }

    pub fn handle_subscribe(&mut self, filter: &str, key: ConnectionKey) {
        self.subscriptions.subscribe(filter, key);
        info!(%key, topic = filter, "subscribed");
    }

    pub fn handle_unsubscribe(&mut self, filter: &str, key: &ConnectionKey) {
        self.subscriptions.unsubscribe(filter, key);
        info!(%key, topic = filter, "unsubscribed");
    }

    /// Fans a published payload out to the snapshot of matching subscribers,
    /// the publisher included when it is subscribed. Returns the number of
    /// successful deliveries.
    ///
    /// A key in the snapshot but missing from the registry is a stale
    /// reference left by a racing disconnect: it is skipped and purged.
    /// A failed send is isolated to that subscriber.
    pub fn handle_publish(&mut self, topic: &str, payload: String, qos: u8) -> usize {
        let snapshot = self.subscriptions.matching_subscribers(topic);
        if snapshot.is_empty() {
            debug!(topic, "publish matched no subscribers");
            return 0;
        }

        let msg = Message::new(topic, payload, qos);
        let text = match serde_json::to_string(&msg) {
            Ok(json) => json,
            Err(e) => {
                warn!(topic, error = %e, "failed to serialize message");
                return 0;
            }
        };
        let frame = WsMessage::text(text);

        let mut delivered = 0;
        let mut stale = Vec::new();
        for key in &snapshot {
            match self.registry.get(key) {
                Some(client) => match client.deliver(frame.clone()) {
                    Ok(()) => delivered += 1,
                    Err(e) => warn!(error = %e, "dropping undeliverable message"),
                },
                None => stale.push(*key),
            }
        }

        for key in stale {
            debug!(error = %BrokerError::StaleReference { key }, "purging dead subscription");
            self.subscriptions.remove_client(&key);
        }

        info!(topic, delivered, "published");
        delivered
    }
}
