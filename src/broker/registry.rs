//! Client registry
//!
//! Owns the record for every live connection, keyed by a broker-allocated
//! `ConnectionKey`. The registry touches nothing but its own state; purging
//! subscriptions on disconnect is the dispatcher's job.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::client::Client;
use crate::utils::error::BrokerError;

/// Broker-internal identifier for one live connection. Distinct from the
/// client-supplied id, and never reused while the connection is open.
pub type ConnectionKey = Uuid;

#[derive(Debug)]
pub struct ClientRegistry {
    clients: HashMap<ConnectionKey, Client>,
    max_connections: usize,
}

impl ClientRegistry {
    /// Key allocation re-draws this many times before failing the connect.
    const MAX_KEY_ATTEMPTS: u32 = 8;

    pub fn new(max_connections: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_connections,
        }
    }

    /// Registers a connection and hands back its key.
    ///
    /// Refuses when `max_connections` records are live. A fresh key is drawn
    /// until it collides with no live key, so a new client can never inherit
    /// a dead client's subscriptions.
    pub fn connect(
        &mut self,
        id: &str,
        sender: UnboundedSender<WsMessage>,
    ) -> Result<ConnectionKey, BrokerError> {
        if self.clients.len() >= self.max_connections {
            return Err(BrokerError::ConnectionLimit {
                limit: self.max_connections,
            });
        }

        let key = self.allocate_key()?;
        self.clients.insert(key, Client::new(id, key, sender));
        Ok(key)
    }

    fn allocate_key(&self) -> Result<ConnectionKey, BrokerError> {
        for _ in 0..Self::MAX_KEY_ATTEMPTS {
            let key = Uuid::new_v4();
            if !self.clients.contains_key(&key) {
                return Ok(key);
            }
            debug!(%key, "connection key collision, re-drawing");
        }
        Err(BrokerError::DuplicateConnectionKey {
            attempts: Self::MAX_KEY_ATTEMPTS,
        })
    }

    /// Removes the record for `key`. Unknown keys are a no-op so the
    /// transport-level and application-level disconnect paths can race.
    pub fn disconnect(&mut self, key: &ConnectionKey) {
        self.clients.remove(key);
    }

    pub fn get(&self, key: &ConnectionKey) -> Option<&Client> {
        self.clients.get(key)
    }

    pub fn contains(&self, key: &ConnectionKey) -> bool {
        self.clients.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
