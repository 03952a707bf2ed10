//! The reservation entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{LocationId, Quantity, Reference, ReservationId, StockRecordId, Version};

use crate::status::ReservationStatus;

/// A claim against one stock record's available quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique identifier for this reservation.
    pub id: ReservationId,

    /// The stock record this claim is held against.
    pub stock_record_id: StockRecordId,

    /// The location of the claimed stock, denormalized for listings.
    pub location_id: LocationId,

    /// The claimed quantity. Always positive; partial releases shrink it.
    pub quantity: Quantity,

    /// Who requested the reservation.
    pub reserved_by: String,

    /// The order, project or customer this claim belongs to.
    pub reference: Option<Reference>,

    /// When an active reservation lapses and is swept into `Expired`.
    pub expires_at: Option<DateTime<Utc>>,

    /// Free-form notes from the requester.
    pub notes: Option<String>,

    /// Current lifecycle status.
    pub status: ReservationStatus,

    /// The reason supplied to `reject` or `cancel`, if any.
    pub status_reason: Option<String>,

    /// Optimistic-concurrency version, bumped on every write.
    pub version: Version,

    /// When the reservation was created.
    pub created_at: DateTime<Utc>,

    /// When the reservation was last written.
    pub updated_at: DateTime<Utc>,
}

/// Everything a caller supplies to request a reservation.
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub stock_record_id: StockRecordId,
    pub quantity: Quantity,
    pub reserved_by: String,
    pub reference: Option<Reference>,
    pub expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl ReservationRequest {
    /// Creates a request with the required fields.
    pub fn new(
        stock_record_id: StockRecordId,
        quantity: Quantity,
        reserved_by: impl Into<String>,
    ) -> Self {
        Self {
            stock_record_id,
            quantity,
            reserved_by: reserved_by.into(),
            reference: None,
            expires_at: None,
            notes: None,
        }
    }

    /// Attaches a reference.
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Sets an expiry deadline.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Attaches requester notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Materializes the request into a reservation in the given status.
    pub fn into_reservation(
        self,
        location_id: LocationId,
        status: ReservationStatus,
        now: DateTime<Utc>,
    ) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            stock_record_id: self.stock_record_id,
            location_id,
            quantity: self.quantity,
            reserved_by: self.reserved_by,
            reference: self.reference,
            expires_at: self.expires_at,
            notes: self.notes,
            status,
            status_reason: None,
            version: Version::first(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Reservation {
    /// Returns true if this reservation has an expiry in the past.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| deadline < now)
    }
}
