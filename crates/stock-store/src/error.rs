use thiserror::Error;

use common::{Quantity, StockRecordId, Version};

use crate::record::StockKey;

/// Errors that can occur when mutating or reading stock records.
#[derive(Debug, Error)]
pub enum StockStoreError {
    /// A debit would take on-hand stock below the reserved quantity and the
    /// location does not allow negative stock.
    #[error(
        "Insufficient stock on record {record_id}: on hand {on_hand}, reserved {reserved}, requested delta {requested}"
    )]
    InsufficientStock {
        record_id: StockRecordId,
        on_hand: Quantity,
        reserved: Quantity,
        requested: Quantity,
    },

    /// A reserved total would exceed the on-hand quantity without an
    /// override.
    #[error(
        "Over-reservation on record {record_id}: on hand {on_hand}, requested reserved total {requested}"
    )]
    OverReservation {
        record_id: StockRecordId,
        on_hand: Quantity,
        requested: Quantity,
    },

    /// A record with the same natural key already exists with a different
    /// quantity.
    #[error("Stock record already exists for {key}")]
    DuplicateKey { key: StockKey },

    /// The expected version did not match the stored version. The caller
    /// should re-read and re-validate; the store never retries on its own.
    #[error(
        "Concurrent modification of record {record_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        record_id: StockRecordId,
        expected: Version,
        actual: Version,
    },

    /// No record with the given id or key.
    #[error("Stock record not found: {0}")]
    RecordNotFound(StockRecordId),

    /// A record still holding stock or reservations cannot be removed.
    #[error("Stock record {record_id} still holds stock or reservations")]
    RecordInUse { record_id: StockRecordId },

    /// A quantity argument that is invalid regardless of state (negative
    /// reserved total, non-positive debit, negative initial quantity).
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: Quantity },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for stock store operations.
pub type Result<T> = std::result::Result<T, StockStoreError>;
