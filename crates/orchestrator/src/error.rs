use chrono::{DateTime, Utc};
use thiserror::Error;

use common::{ItemId, LocationId, Quantity};
use kardex::JournalError;
use reservations::LedgerError;
use stock_store::{StockKey, StockStoreError};

use crate::ports::LookupError;

/// Errors from orchestrated operations, wrapping the component layers.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The catalog does not know this item.
    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),

    /// The location registry does not know this location.
    #[error("Unknown location: {0}")]
    UnknownLocation(LocationId),

    /// No stock record exists for this item/location bucket.
    #[error("No stock record for {key}")]
    NoStockAtLocation { key: StockKey },

    /// A quantity argument that is invalid for the operation (zero or
    /// wrongly signed).
    #[error("Invalid quantity for {operation}: {quantity}")]
    InvalidQuantity {
        operation: &'static str,
        quantity: Quantity,
    },

    /// The caller-specified deadline passed before the operation could
    /// commit. No effect remains.
    #[error("Deadline {deadline} exceeded")]
    DeadlineExceeded { deadline: DateTime<Utc> },

    /// A collaborator lookup failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// A stock store error occurred.
    #[error("Stock store error: {0}")]
    Stock(#[from] StockStoreError),

    /// A reservation ledger error occurred.
    #[error("Reservation ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A movement journal error occurred.
    #[error("Movement journal error: {0}")]
    Journal(#[from] JournalError),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;
