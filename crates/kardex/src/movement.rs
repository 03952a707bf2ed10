//! Movement entries and their classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{ItemId, LocationId, MovementId, Quantity, Reference};

/// Whether a movement type adds stock, removes stock, or leaves the
/// on-hand quantity untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
    Neutral,
}

/// The kind of quantity-affecting event a movement records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Receipt,
    Return,
    AdjustmentIn,
    AdjustmentOut,
    TransferIn,
    TransferOut,
    Production,
    Shipment,
    Consumption,
    Damage,
    Expiration,
    Installation,
    Reserve,
    Release,
    Count,
    Relocation,
}

impl MovementType {
    /// The direction this movement type drives the on-hand quantity.
    ///
    /// `Reserve`/`Release` shift quantity between reserved and available
    /// without changing on-hand, and `Count`/`Relocation` record
    /// observations, so all four are neutral.
    pub fn direction(&self) -> Direction {
        match self {
            MovementType::Receipt
            | MovementType::Return
            | MovementType::AdjustmentIn
            | MovementType::TransferIn
            | MovementType::Production => Direction::Inbound,

            MovementType::AdjustmentOut
            | MovementType::TransferOut
            | MovementType::Shipment
            | MovementType::Consumption
            | MovementType::Damage
            | MovementType::Expiration
            | MovementType::Installation => Direction::Outbound,

            MovementType::Reserve
            | MovementType::Release
            | MovementType::Count
            | MovementType::Relocation => Direction::Neutral,
        }
    }

    /// Returns true for the two legs of a transfer.
    pub fn is_transfer_leg(&self) -> bool {
        matches!(self, MovementType::TransferIn | MovementType::TransferOut)
    }

    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Receipt => "receipt",
            MovementType::Return => "return",
            MovementType::AdjustmentIn => "adjustment_in",
            MovementType::AdjustmentOut => "adjustment_out",
            MovementType::TransferIn => "transfer_in",
            MovementType::TransferOut => "transfer_out",
            MovementType::Production => "production",
            MovementType::Shipment => "shipment",
            MovementType::Consumption => "consumption",
            MovementType::Damage => "damage",
            MovementType::Expiration => "expiration",
            MovementType::Installation => "installation",
            MovementType::Reserve => "reserve",
            MovementType::Release => "release",
            MovementType::Count => "count",
            MovementType::Relocation => "relocation",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Processing status of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    /// Recorded but the stock effect has not been confirmed yet.
    #[default]
    Pending,

    /// The stock effect has been applied (terminal state).
    Completed,

    /// Abandoned before the stock effect was applied (terminal state).
    Cancelled,

    /// The stock effect was attempted and rejected (terminal state).
    Failed,
}

impl MovementStatus {
    /// Returns true if no further status change is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MovementStatus::Pending)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Pending => "pending",
            MovementStatus::Completed => "completed",
            MovementStatus::Cancelled => "cancelled",
            MovementStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable journal entry.
///
/// `quantity` is always a positive magnitude; the direction of the stock
/// effect comes from the movement type (see [`Movement::signed_delta`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    /// Unique identifier for this entry.
    pub id: MovementId,

    /// What kind of event this records.
    pub movement_type: MovementType,

    /// Processing status.
    pub status: MovementStatus,

    /// The item whose quantity changed.
    pub item_id: ItemId,

    /// The location where the change happened.
    pub location_id: LocationId,

    /// Positive magnitude of the change.
    pub quantity: Quantity,

    /// For `transfer_in`: the location the stock came from.
    pub source_location_id: Option<LocationId>,

    /// For `transfer_out`: the location the stock went to.
    pub destination_location_id: Option<LocationId>,

    /// External document or linked entity this movement belongs to.
    /// Both legs of a transfer share a transfer reference.
    pub reference: Option<Reference>,

    /// Free-form reason, e.g. for adjustments.
    pub reason: Option<String>,

    /// Who triggered the movement.
    pub performed_by: Option<String>,

    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,

    /// When the stock effect was confirmed, for completed movements.
    pub processed_at: Option<DateTime<Utc>>,
}

impl Movement {
    /// Creates a new movement builder.
    pub fn builder() -> MovementBuilder {
        MovementBuilder::default()
    }

    /// The signed on-hand delta this movement represents.
    pub fn signed_delta(&self) -> Quantity {
        match self.movement_type.direction() {
            Direction::Inbound => self.quantity,
            Direction::Outbound => -self.quantity,
            Direction::Neutral => Quantity::zero(),
        }
    }
}

/// Builder for constructing movements.
#[derive(Debug, Default)]
pub struct MovementBuilder {
    id: Option<MovementId>,
    movement_type: Option<MovementType>,
    status: Option<MovementStatus>,
    item_id: Option<ItemId>,
    location_id: Option<LocationId>,
    quantity: Option<Quantity>,
    source_location_id: Option<LocationId>,
    destination_location_id: Option<LocationId>,
    reference: Option<Reference>,
    reason: Option<String>,
    performed_by: Option<String>,
    created_at: Option<DateTime<Utc>>,
    processed_at: Option<DateTime<Utc>>,
}

impl MovementBuilder {
    /// Sets the movement ID. If not set, a new ID will be generated.
    pub fn id(mut self, id: MovementId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the movement type.
    pub fn movement_type(mut self, movement_type: MovementType) -> Self {
        self.movement_type = Some(movement_type);
        self
    }

    /// Sets the status. Defaults to `Pending`.
    pub fn status(mut self, status: MovementStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the item.
    pub fn item_id(mut self, item_id: ItemId) -> Self {
        self.item_id = Some(item_id);
        self
    }

    /// Sets the location.
    pub fn location_id(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Sets the quantity magnitude.
    pub fn quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Sets the source location for a `transfer_in` leg.
    pub fn source_location(mut self, location_id: LocationId) -> Self {
        self.source_location_id = Some(location_id);
        self
    }

    /// Sets the destination location for a `transfer_out` leg.
    pub fn destination_location(mut self, location_id: LocationId) -> Self {
        self.destination_location_id = Some(location_id);
        self
    }

    /// Sets the reference.
    pub fn reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Sets the reason.
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets who performed the movement.
    pub fn performed_by(mut self, performed_by: impl Into<String>) -> Self {
        self.performed_by = Some(performed_by.into());
        self
    }

    /// Sets the creation timestamp. If not set, the current time is used.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Sets the processing timestamp.
    pub fn processed_at(mut self, processed_at: DateTime<Utc>) -> Self {
        self.processed_at = Some(processed_at);
        self
    }

    /// Builds the movement.
    ///
    /// # Panics
    ///
    /// Panics if required fields (movement_type, item_id, location_id,
    /// quantity) are not set.
    pub fn build(self) -> Movement {
        Movement {
            id: self.id.unwrap_or_default(),
            movement_type: self.movement_type.expect("movement_type is required"),
            status: self.status.unwrap_or_default(),
            item_id: self.item_id.expect("item_id is required"),
            location_id: self.location_id.expect("location_id is required"),
            quantity: self.quantity.expect("quantity is required"),
            source_location_id: self.source_location_id,
            destination_location_id: self.destination_location_id,
            reference: self.reference,
            reason: self.reason,
            performed_by: self.performed_by,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            processed_at: self.processed_at,
        }
    }

    /// Tries to build the movement, returning None if required fields are
    /// missing.
    pub fn try_build(self) -> Option<Movement> {
        Some(Movement {
            id: self.id.unwrap_or_default(),
            movement_type: self.movement_type?,
            status: self.status.unwrap_or_default(),
            item_id: self.item_id?,
            location_id: self.location_id?,
            quantity: self.quantity?,
            source_location_id: self.source_location_id,
            destination_location_id: self.destination_location_id,
            reference: self.reference,
            reason: self.reason,
            performed_by: self.performed_by,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            processed_at: self.processed_at,
        })
    }
}
