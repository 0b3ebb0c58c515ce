//! Broker error taxonomy.
//!
//! None of these are fatal to the broker process. Connect refusals
//! (`ConnectionLimit`, `DuplicateConnectionKey`) surface to the transport,
//! which reports them to the offending client only. The rest are handled
//! where they occur and logged.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BrokerError {
    /// Connection key allocation kept colliding with live keys. Fails the
    /// current connect attempt only; existing clients are untouched.
    #[error("connection key allocation collided {attempts} times")]
    DuplicateConnectionKey { attempts: u32 },

    /// The registry is at capacity, so the connect attempt is refused.
    #[error("connection limit of {limit} reached")]
    ConnectionLimit { limit: usize },

    /// A subscription referenced a connection no longer in the registry.
    /// Skipped during fan-out and purged lazily.
    #[error("stale subscription reference to connection {key}")]
    StaleReference { key: Uuid },

    /// Delivery to a single subscriber failed. Isolated to that subscriber;
    /// the rest of the fan-out continues.
    #[error("delivery to connection {key} failed: {reason}")]
    DeliveryFailure { key: Uuid, reason: String },
}
