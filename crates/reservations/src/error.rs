use thiserror::Error;

use common::{Quantity, ReservationId, StockRecordId, Version};
use stock_store::StockStoreError;

use crate::status::ReservationStatus;

/// Errors from the reservation persistence layer.
#[derive(Debug, Error)]
pub enum ReservationStoreError {
    /// A concurrency conflict occurred when writing a reservation.
    #[error(
        "Concurrency conflict for reservation {reservation_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        reservation_id: ReservationId,
        expected: Version,
        actual: Version,
    },

    /// The reservation was not found.
    #[error("Reservation not found: {0}")]
    NotFound(ReservationId),

    /// A reservation with this ID already exists.
    #[error("Reservation already exists: {0}")]
    AlreadyExists(ReservationId),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for reservation store operations.
pub type StoreResult<T> = std::result::Result<T, ReservationStoreError>;

/// Errors from ledger operations, wrapping the component layers.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The requested transition is not legal from the current status.
    #[error("Cannot {action} reservation {reservation_id} in {current} status")]
    InvalidTransition {
        reservation_id: ReservationId,
        current: ReservationStatus,
        action: &'static str,
    },

    /// The claim exceeds what the stock record can cover.
    #[error(
        "Insufficient available stock on record {stock_record_id}: available {available}, requested {requested}"
    )]
    InsufficientAvailable {
        stock_record_id: StockRecordId,
        available: Quantity,
        requested: Quantity,
    },

    /// Reservation quantities must be positive and within the claim.
    #[error("Invalid reservation quantity: {quantity}")]
    InvalidQuantity { quantity: Quantity },

    /// The reservation was not found.
    #[error("Reservation not found: {0}")]
    NotFound(ReservationId),

    /// A stock store error occurred.
    #[error("Stock store error: {0}")]
    Stock(#[from] StockStoreError),

    /// A reservation store error occurred.
    #[error("Reservation store error: {0}")]
    Store(#[from] ReservationStoreError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
