use thiserror::Error;

use common::Quantity;

use crate::movement::MovementType;

/// Errors that can occur when interacting with the movement journal.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Movement quantities are positive magnitudes; zero and negative
    /// values are rejected at append time.
    #[error("Movement quantity must be positive, got {quantity}")]
    NonPositiveQuantity { quantity: Quantity },

    /// A transfer leg was appended without its counterpart fields.
    #[error("{movement_type} movement is missing {missing}")]
    IncompleteTransferLeg {
        movement_type: MovementType,
        missing: &'static str,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for journal operations.
pub type Result<T> = std::result::Result<T, JournalError>;
