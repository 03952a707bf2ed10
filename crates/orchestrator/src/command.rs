//! Commands accepted by the orchestrator.
//!
//! Each command carries everything one public operation needs, plus an
//! optional deadline. A deadline that passes before the operation commits
//! aborts it with no partial effect.

use chrono::{DateTime, Utc};

use common::{ItemId, LocationId, Quantity, Reference, ReservationId, StockRecordId};
use stock_store::StockKey;

/// Command to receive stock at a location.
#[derive(Debug, Clone)]
pub struct ReceiveStock {
    /// The item being received.
    pub item_id: ItemId,

    /// Where the stock arrives.
    pub location_id: LocationId,

    /// How much arrives. Must be positive.
    pub quantity: Quantity,

    /// Lot number, when lot-tracked.
    pub lot_number: Option<String>,

    /// Serial number, when serial-tracked.
    pub serial_number: Option<String>,

    /// Expiry of the received stock, if perishable.
    pub expiration_date: Option<DateTime<Utc>>,

    /// The purchase order or document behind the receipt.
    pub reference: Option<Reference>,

    /// Who performed the receipt.
    pub performed_by: Option<String>,

    /// Abort if the operation has not committed by this instant.
    pub deadline: Option<DateTime<Utc>>,
}

impl ReceiveStock {
    /// Creates a receive command.
    pub fn new(item_id: ItemId, location_id: LocationId, quantity: Quantity) -> Self {
        Self {
            item_id,
            location_id,
            quantity,
            lot_number: None,
            serial_number: None,
            expiration_date: None,
            reference: None,
            performed_by: None,
            deadline: None,
        }
    }

    /// Qualifies the receipt with a lot number.
    pub fn with_lot(mut self, lot_number: impl Into<String>) -> Self {
        self.lot_number = Some(lot_number.into());
        self
    }

    /// Qualifies the receipt with a serial number.
    pub fn with_serial(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Sets the expiry of the received stock.
    pub fn with_expiration(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    /// Attaches the originating document.
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Records who performed the receipt.
    pub fn with_performed_by(mut self, performed_by: impl Into<String>) -> Self {
        self.performed_by = Some(performed_by.into());
        self
    }

    /// Sets the commit deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The stock bucket this receipt lands in.
    pub fn stock_key(&self) -> StockKey {
        key_with_tracking(
            self.item_id,
            self.location_id,
            &self.lot_number,
            &self.serial_number,
        )
    }
}

/// Command to ship stock out of a location.
#[derive(Debug, Clone)]
pub struct ShipStock {
    /// The item being shipped.
    pub item_id: ItemId,

    /// Where the stock leaves from.
    pub location_id: LocationId,

    /// How much leaves. Must be positive.
    pub quantity: Quantity,

    /// Lot number, when lot-tracked.
    pub lot_number: Option<String>,

    /// Serial number, when serial-tracked.
    pub serial_number: Option<String>,

    /// The sales order or document behind the shipment.
    pub reference: Option<Reference>,

    /// Who performed the shipment.
    pub performed_by: Option<String>,

    /// Abort if the operation has not committed by this instant.
    pub deadline: Option<DateTime<Utc>>,
}

impl ShipStock {
    /// Creates a ship command.
    pub fn new(item_id: ItemId, location_id: LocationId, quantity: Quantity) -> Self {
        Self {
            item_id,
            location_id,
            quantity,
            lot_number: None,
            serial_number: None,
            reference: None,
            performed_by: None,
            deadline: None,
        }
    }

    /// Qualifies the shipment with a lot number.
    pub fn with_lot(mut self, lot_number: impl Into<String>) -> Self {
        self.lot_number = Some(lot_number.into());
        self
    }

    /// Attaches the originating document.
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Records who performed the shipment.
    pub fn with_performed_by(mut self, performed_by: impl Into<String>) -> Self {
        self.performed_by = Some(performed_by.into());
        self
    }

    /// Sets the commit deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The stock bucket the shipment draws from.
    pub fn stock_key(&self) -> StockKey {
        key_with_tracking(
            self.item_id,
            self.location_id,
            &self.lot_number,
            &self.serial_number,
        )
    }
}

/// Command to move stock between two locations.
#[derive(Debug, Clone)]
pub struct TransferStock {
    /// The item being moved.
    pub item_id: ItemId,

    /// The location the stock leaves.
    pub source_location_id: LocationId,

    /// The location the stock arrives at.
    pub destination_location_id: LocationId,

    /// How much moves. Must be positive.
    pub quantity: Quantity,

    /// Lot number, when lot-tracked.
    pub lot_number: Option<String>,

    /// Serial number, when serial-tracked.
    pub serial_number: Option<String>,

    /// Who performed the transfer.
    pub performed_by: Option<String>,

    /// Abort if both legs have not committed by this instant.
    pub deadline: Option<DateTime<Utc>>,
}

impl TransferStock {
    /// Creates a transfer command.
    pub fn new(
        item_id: ItemId,
        source_location_id: LocationId,
        destination_location_id: LocationId,
        quantity: Quantity,
    ) -> Self {
        Self {
            item_id,
            source_location_id,
            destination_location_id,
            quantity,
            lot_number: None,
            serial_number: None,
            performed_by: None,
            deadline: None,
        }
    }

    /// Qualifies the transfer with a lot number.
    pub fn with_lot(mut self, lot_number: impl Into<String>) -> Self {
        self.lot_number = Some(lot_number.into());
        self
    }

    /// Records who performed the transfer.
    pub fn with_performed_by(mut self, performed_by: impl Into<String>) -> Self {
        self.performed_by = Some(performed_by.into());
        self
    }

    /// Sets the commit deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The stock bucket at the source location.
    pub fn source_key(&self) -> StockKey {
        key_with_tracking(
            self.item_id,
            self.source_location_id,
            &self.lot_number,
            &self.serial_number,
        )
    }

    /// The stock bucket at the destination location.
    pub fn destination_key(&self) -> StockKey {
        key_with_tracking(
            self.item_id,
            self.destination_location_id,
            &self.lot_number,
            &self.serial_number,
        )
    }
}

/// Command to correct an on-hand quantity.
#[derive(Debug, Clone)]
pub struct AdjustStock {
    /// The item being corrected.
    pub item_id: ItemId,

    /// The location of the correction.
    pub location_id: LocationId,

    /// Signed correction. Positive adds stock, negative removes it.
    /// Must be non-zero.
    pub delta: Quantity,

    /// Why the correction happened. Required: adjustments without a
    /// reason are indistinguishable from shrinkage.
    pub reason: String,

    /// Lot number, when lot-tracked.
    pub lot_number: Option<String>,

    /// Serial number, when serial-tracked.
    pub serial_number: Option<String>,

    /// Who performed the adjustment.
    pub performed_by: Option<String>,

    /// Abort if the operation has not committed by this instant.
    pub deadline: Option<DateTime<Utc>>,
}

impl AdjustStock {
    /// Creates an adjust command.
    pub fn new(
        item_id: ItemId,
        location_id: LocationId,
        delta: Quantity,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            item_id,
            location_id,
            delta,
            reason: reason.into(),
            lot_number: None,
            serial_number: None,
            performed_by: None,
            deadline: None,
        }
    }

    /// Qualifies the adjustment with a lot number.
    pub fn with_lot(mut self, lot_number: impl Into<String>) -> Self {
        self.lot_number = Some(lot_number.into());
        self
    }

    /// Records who performed the adjustment.
    pub fn with_performed_by(mut self, performed_by: impl Into<String>) -> Self {
        self.performed_by = Some(performed_by.into());
        self
    }

    /// Sets the commit deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The stock bucket being corrected.
    pub fn stock_key(&self) -> StockKey {
        key_with_tracking(
            self.item_id,
            self.location_id,
            &self.lot_number,
            &self.serial_number,
        )
    }
}

/// Command to reserve stock against a record.
#[derive(Debug, Clone)]
pub struct ReserveStock {
    /// The stock record to claim against.
    pub stock_record_id: StockRecordId,

    /// How much to claim. Must be positive.
    pub quantity: Quantity,

    /// Who requests the reservation.
    pub reserved_by: String,

    /// The order, project or customer the claim belongs to.
    pub reference: Option<Reference>,

    /// When an active reservation lapses.
    pub expires_at: Option<DateTime<Utc>>,

    /// Free-form requester notes.
    pub notes: Option<String>,

    /// Abort if the operation has not committed by this instant.
    pub deadline: Option<DateTime<Utc>>,
}

impl ReserveStock {
    /// Creates a reserve command.
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
            deadline: None,
        }
    }

    /// Attaches the claiming document.
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Sets when the claim lapses.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Attaches requester notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets the commit deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Command to approve a pending reservation.
#[derive(Debug, Clone)]
pub struct ApproveReservation {
    /// The reservation to approve.
    pub reservation_id: ReservationId,

    /// Abort if the operation has not committed by this instant.
    pub deadline: Option<DateTime<Utc>>,
}

impl ApproveReservation {
    /// Creates an approve command.
    pub fn new(reservation_id: ReservationId) -> Self {
        Self {
            reservation_id,
            deadline: None,
        }
    }

    /// Sets the commit deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Command to reject a pending reservation.
#[derive(Debug, Clone)]
pub struct RejectReservation {
    /// The reservation to reject.
    pub reservation_id: ReservationId,

    /// Why approval was denied.
    pub reason: Option<String>,

    /// Abort if the operation has not committed by this instant.
    pub deadline: Option<DateTime<Utc>>,
}

impl RejectReservation {
    /// Creates a reject command.
    pub fn new(reservation_id: ReservationId) -> Self {
        Self {
            reservation_id,
            reason: None,
            deadline: None,
        }
    }

    /// Records why the reservation was rejected.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the commit deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Command to release an active reservation, fully or in part.
#[derive(Debug, Clone)]
pub struct ReleaseReservation {
    /// The reservation to release.
    pub reservation_id: ReservationId,

    /// Release only this much and keep the rest claimed. `None` releases
    /// the whole claim.
    pub quantity: Option<Quantity>,

    /// Abort if the operation has not committed by this instant.
    pub deadline: Option<DateTime<Utc>>,
}

impl ReleaseReservation {
    /// Creates a full-release command.
    pub fn new(reservation_id: ReservationId) -> Self {
        Self {
            reservation_id,
            quantity: None,
            deadline: None,
        }
    }

    /// Releases only part of the claim.
    pub fn partial(reservation_id: ReservationId, quantity: Quantity) -> Self {
        Self {
            reservation_id,
            quantity: Some(quantity),
            deadline: None,
        }
    }

    /// Sets the commit deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Command to cancel a pending or active reservation.
#[derive(Debug, Clone)]
pub struct CancelReservation {
    /// The reservation to cancel.
    pub reservation_id: ReservationId,

    /// Why the reservation was withdrawn.
    pub reason: Option<String>,

    /// Abort if the operation has not committed by this instant.
    pub deadline: Option<DateTime<Utc>>,
}

impl CancelReservation {
    /// Creates a cancel command.
    pub fn new(reservation_id: ReservationId) -> Self {
        Self {
            reservation_id,
            reason: None,
            deadline: None,
        }
    }

    /// Records why the reservation was cancelled.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the commit deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Command to consume an active reservation: the reserved stock leaves.
#[derive(Debug, Clone)]
pub struct ConsumeReservation {
    /// The reservation to consume.
    pub reservation_id: ReservationId,

    /// Who consumed the stock.
    pub performed_by: Option<String>,

    /// Abort if the operation has not committed by this instant.
    pub deadline: Option<DateTime<Utc>>,
}

impl ConsumeReservation {
    /// Creates a consume command.
    pub fn new(reservation_id: ReservationId) -> Self {
        Self {
            reservation_id,
            performed_by: None,
            deadline: None,
        }
    }

    /// Records who consumed the stock.
    pub fn with_performed_by(mut self, performed_by: impl Into<String>) -> Self {
        self.performed_by = Some(performed_by.into());
        self
    }

    /// Sets the commit deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

fn key_with_tracking(
    item_id: ItemId,
    location_id: LocationId,
    lot_number: &Option<String>,
    serial_number: &Option<String>,
) -> StockKey {
    let mut key = StockKey::new(item_id, location_id);
    key.lot_number = lot_number.clone();
    key.serial_number = serial_number.clone();
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_key_carries_tracking_qualifiers() {
        let cmd = ReceiveStock::new(ItemId::new(), LocationId::new(), Quantity::new(10))
            .with_lot("LOT-3")
            .with_serial("SN-9");

        let key = cmd.stock_key();
        assert_eq!(key.lot_number.as_deref(), Some("LOT-3"));
        assert_eq!(key.serial_number.as_deref(), Some("SN-9"));
    }

    #[test]
    fn transfer_keys_differ_only_by_location() {
        let cmd = TransferStock::new(
            ItemId::new(),
            LocationId::new(),
            LocationId::new(),
            Quantity::new(5),
        )
        .with_lot("LOT-3");

        let source = cmd.source_key();
        let destination = cmd.destination_key();
        assert_eq!(source.item_id, destination.item_id);
        assert_eq!(source.lot_number, destination.lot_number);
        assert_ne!(source.location_id, destination.location_id);
    }

    #[test]
    fn release_partial_sets_quantity() {
        let full = ReleaseReservation::new(ReservationId::new());
        assert!(full.quantity.is_none());

        let partial = ReleaseReservation::partial(ReservationId::new(), Quantity::new(3));
        assert_eq!(partial.quantity, Some(Quantity::new(3)));
    }
}
