//! The journal trait and append validation.

use async_trait::async_trait;

use common::{ItemId, LocationId, MovementId, Reference, ReferenceKind};

use crate::movement::{Movement, MovementType};
use crate::{JournalError, Result};

/// Filter for querying journal entries.
///
/// Listings are reverse-chronological; `limit`/`offset` make them
/// restartable pages.
#[derive(Debug, Clone, Default)]
pub struct MovementQuery {
    pub item_id: Option<ItemId>,
    pub location_id: Option<LocationId>,
    pub movement_type: Option<MovementType>,
    pub reference: Option<Reference>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl MovementQuery {
    /// Creates an empty query that matches all movements.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by item.
    pub fn item_id(mut self, item_id: ItemId) -> Self {
        self.item_id = Some(item_id);
        self
    }

    /// Filters by location.
    pub fn location_id(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Filters by movement type.
    pub fn movement_type(mut self, movement_type: MovementType) -> Self {
        self.movement_type = Some(movement_type);
        self
    }

    /// Filters by reference.
    pub fn reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the movement matches every set filter.
    pub fn matches(&self, movement: &Movement) -> bool {
        if let Some(item_id) = self.item_id
            && movement.item_id != item_id
        {
            return false;
        }
        if let Some(location_id) = self.location_id
            && movement.location_id != location_id
        {
            return false;
        }
        if let Some(movement_type) = self.movement_type
            && movement.movement_type != movement_type
        {
            return false;
        }
        if let Some(reference) = &self.reference
            && movement.reference.as_ref() != Some(reference)
        {
            return false;
        }
        true
    }
}

/// Checks that a movement is well-formed before it enters the journal.
///
/// Transfer legs must name their counterpart location and carry a shared
/// transfer reference so the linked pair can be recovered later.
pub fn validate_movement(movement: &Movement) -> Result<()> {
    if !movement.quantity.is_positive() {
        return Err(JournalError::NonPositiveQuantity {
            quantity: movement.quantity,
        });
    }

    match movement.movement_type {
        MovementType::TransferIn => {
            if movement.source_location_id.is_none() {
                return Err(JournalError::IncompleteTransferLeg {
                    movement_type: movement.movement_type,
                    missing: "source_location_id",
                });
            }
            require_transfer_reference(movement)?;
        }
        MovementType::TransferOut => {
            if movement.destination_location_id.is_none() {
                return Err(JournalError::IncompleteTransferLeg {
                    movement_type: movement.movement_type,
                    missing: "destination_location_id",
                });
            }
            require_transfer_reference(movement)?;
        }
        _ => {}
    }

    Ok(())
}

fn require_transfer_reference(movement: &Movement) -> Result<()> {
    match &movement.reference {
        Some(reference) if reference.kind == ReferenceKind::Transfer => Ok(()),
        _ => Err(JournalError::IncompleteTransferLeg {
            movement_type: movement.movement_type,
            missing: "transfer reference",
        }),
    }
}

/// Append-only journal of stock movements.
#[async_trait]
pub trait MovementJournal: Send + Sync {
    /// Appends a movement after validation. Entries are never mutated.
    async fn append(&self, movement: Movement) -> Result<Movement>;

    /// Gets a single movement by ID.
    async fn get(&self, id: MovementId) -> Result<Option<Movement>>;

    /// Queries movements with filters, newest first.
    async fn query(&self, query: MovementQuery) -> Result<Vec<Movement>>;

    /// Lists movements for an item, newest first.
    async fn list_by_item(
        &self,
        item_id: ItemId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Movement>> {
        self.query(
            MovementQuery::new()
                .item_id(item_id)
                .limit(limit)
                .offset(offset),
        )
        .await
    }

    /// Lists movements at a location, newest first.
    async fn list_by_location(
        &self,
        location_id: LocationId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Movement>> {
        self.query(
            MovementQuery::new()
                .location_id(location_id)
                .limit(limit)
                .offset(offset),
        )
        .await
    }

    /// Lists all movements sharing a reference, e.g. both legs of a
    /// transfer, newest first.
    async fn list_by_reference(&self, reference: &Reference) -> Result<Vec<Movement>> {
        self.query(MovementQuery::new().reference(reference.clone()))
            .await
    }
}
