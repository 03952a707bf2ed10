//! The public stock and reservation operations.
//!
//! Every operation validates its preconditions before the first write,
//! mutates stock through the version-guarded store, and journals the
//! movement only after the stock mutation commits. A failure between the
//! two rolls the stock change back, so a journal entry never describes a
//! state change that did not happen, and a quantity change whose journal
//! write fails does not survive.

use common::{Clock, Quantity, Reference, ReservationId, StockRecordId, Version};
use kardex::{
    Movement, MovementBuilder, MovementJournal, MovementStatus, MovementType, validate_movement,
};
use reservations::{
    LedgerError, Reservation, ReservationLedger, ReservationRequest, ReservationStatus,
    ReservationStore,
};
use stock_store::{NewStockRecord, StockKey, StockPolicy, StockRecord, StockStore, StockStoreError};
use uuid::Uuid;

use crate::command::{
    AdjustStock, ApproveReservation, CancelReservation, ConsumeReservation, ReceiveStock,
    RejectReservation, ReleaseReservation, ReserveStock, ShipStock, TransferStock,
};
use crate::error::{OrchestratorError, Result};
use crate::ports::{CatalogLookup, LocationLookup, ResolvedItem};

/// Result of a stock-level operation: the record after the change and the
/// journal entry that recorded it.
#[derive(Debug, Clone)]
pub struct StockChange {
    /// The stock record after the mutation.
    pub record: StockRecord,

    /// The journalled movement.
    pub movement: Movement,
}

/// Result of a transfer: both post-transfer records and the linked
/// movement pair.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// The source record after the debit.
    pub source: StockRecord,

    /// The destination record after the credit.
    pub destination: StockRecord,

    /// The `transfer_out` leg at the source.
    pub outbound: Movement,

    /// The `transfer_in` leg at the destination.
    pub inbound: Movement,

    /// The id both legs share in their transfer reference.
    pub transfer_id: String,
}

/// Result of a reservation operation. `movement` is `None` when the
/// transition had no journalled stock effect (pending creation, reject,
/// idempotent retry of an already-reached state).
#[derive(Debug, Clone)]
pub struct ReservationChange {
    /// The reservation after the transition.
    pub reservation: Reservation,

    /// The journalled movement, when the transition produced one.
    pub movement: Option<Movement>,
}

/// Composes the stock store, reservation ledger and movement journal into
/// the atomic public operations.
///
/// The orchestrator owns all writes: the leaf components are never driven
/// directly by external callers. Dependencies arrive at construction; no
/// process-wide singletons.
pub struct Orchestrator<S, J, R, Cat, Loc, C> {
    stock: S,
    journal: J,
    ledger: ReservationLedger<S, R, C>,
    catalog: Cat,
    locations: Loc,
    clock: C,
}

impl<S, J, R, Cat, Loc, C> Orchestrator<S, J, R, Cat, Loc, C>
where
    S: StockStore + Clone,
    J: MovementJournal,
    R: ReservationStore,
    Cat: CatalogLookup,
    Loc: LocationLookup,
    C: Clock + Clone,
{
    /// Creates an orchestrator in direct-reservation mode.
    pub fn new(stock: S, journal: J, reservations: R, catalog: Cat, locations: Loc, clock: C) -> Self {
        let ledger = ReservationLedger::new(stock.clone(), reservations, clock.clone());
        Self {
            stock,
            journal,
            ledger,
            catalog,
            locations,
            clock,
        }
    }

    /// Switches reservations to the approval workflow: `reserve` creates
    /// pending claims that activate on `approve_reservation`.
    pub fn with_approval_workflow(mut self) -> Self {
        self.ledger = self.ledger.require_approval();
        self
    }

    /// The stock store behind this orchestrator.
    pub fn stock(&self) -> &S {
        &self.stock
    }

    /// The movement journal behind this orchestrator.
    pub fn journal(&self) -> &J {
        &self.journal
    }

    /// The reservation ledger behind this orchestrator.
    pub fn ledger(&self) -> &ReservationLedger<S, R, C> {
        &self.ledger
    }

    /// Reads the current stock record for a bucket.
    pub async fn stock_level(&self, key: &StockKey) -> Result<Option<StockRecord>> {
        Ok(self.stock.get(key).await?)
    }

    /// Receives stock at a location, creating the record on first receipt.
    #[tracing::instrument(skip(self, cmd), fields(item_id = %cmd.item_id, location_id = %cmd.location_id, quantity = %cmd.quantity))]
    pub async fn receive(&self, cmd: ReceiveStock) -> Result<StockChange> {
        metrics::counter!("orchestrator_operations_total", "operation" => "receive").increment(1);
        self.check_deadline(cmd.deadline)?;
        self.require_positive("receive", cmd.quantity)?;
        self.resolve_item(cmd.item_id).await?;
        let policy = self.resolve_policy(cmd.location_id).await?;

        let movement = self
            .stock_movement(MovementType::Receipt, &cmd.stock_key(), cmd.quantity)
            .maybe_reference(cmd.reference.clone())
            .maybe_performed_by(cmd.performed_by.clone())
            .build();
        validate_movement(&movement)?;

        let key = cmd.stock_key();
        let record = match self.stock.get(&key).await? {
            Some(existing) => {
                self.stock
                    .apply_delta(existing.id, cmd.quantity, existing.version, policy)
                    .await?
            }
            None => {
                // First receipt: the record starts empty and the receipt
                // delta brings it to the received quantity, so the journal
                // is the sole source of the level.
                let mut new = NewStockRecord::new(key, Quantity::zero());
                if let Some(expiry) = cmd.expiration_date {
                    new = new.with_expiration(expiry);
                }
                let created = self.stock.create_if_absent(new).await?;
                self.stock
                    .apply_delta(created.id, cmd.quantity, created.version, policy)
                    .await?
            }
        };

        match self.journal.append(movement).await {
            Ok(movement) => {
                tracing::info!(record_id = %record.id, on_hand = %record.on_hand, "stock received");
                Ok(StockChange { record, movement })
            }
            Err(e) => {
                self.compensate_delta(record.id, -cmd.quantity, record.version)
                    .await;
                Err(e.into())
            }
        }
    }

    /// Ships stock out of a location.
    #[tracing::instrument(skip(self, cmd), fields(item_id = %cmd.item_id, location_id = %cmd.location_id, quantity = %cmd.quantity))]
    pub async fn ship(&self, cmd: ShipStock) -> Result<StockChange> {
        metrics::counter!("orchestrator_operations_total", "operation" => "ship").increment(1);
        self.check_deadline(cmd.deadline)?;
        self.require_positive("ship", cmd.quantity)?;
        self.resolve_item(cmd.item_id).await?;
        let policy = self.resolve_policy(cmd.location_id).await?;

        let key = cmd.stock_key();
        let existing = self
            .stock
            .get(&key)
            .await?
            .ok_or(OrchestratorError::NoStockAtLocation { key })?;

        let movement = self
            .stock_movement(MovementType::Shipment, &cmd.stock_key(), cmd.quantity)
            .maybe_reference(cmd.reference.clone())
            .maybe_performed_by(cmd.performed_by.clone())
            .build();
        validate_movement(&movement)?;

        let record = self
            .stock
            .apply_delta(existing.id, -cmd.quantity, existing.version, policy)
            .await?;

        match self.journal.append(movement).await {
            Ok(movement) => {
                tracing::info!(record_id = %record.id, on_hand = %record.on_hand, "stock shipped");
                Ok(StockChange { record, movement })
            }
            Err(e) => {
                self.compensate_delta(record.id, cmd.quantity, record.version)
                    .await;
                Err(e.into())
            }
        }
    }

    /// Corrects an on-hand quantity with a signed delta.
    #[tracing::instrument(skip(self, cmd), fields(item_id = %cmd.item_id, location_id = %cmd.location_id, delta = %cmd.delta))]
    pub async fn adjust(&self, cmd: AdjustStock) -> Result<StockChange> {
        metrics::counter!("orchestrator_operations_total", "operation" => "adjust").increment(1);
        self.check_deadline(cmd.deadline)?;
        if cmd.delta.is_zero() {
            return Err(OrchestratorError::InvalidQuantity {
                operation: "adjust",
                quantity: cmd.delta,
            });
        }
        self.resolve_item(cmd.item_id).await?;
        let policy = self.resolve_policy(cmd.location_id).await?;

        let key = cmd.stock_key();
        let existing = self
            .stock
            .get(&key)
            .await?
            .ok_or(OrchestratorError::NoStockAtLocation { key })?;

        let movement_type = if cmd.delta.is_positive() {
            MovementType::AdjustmentIn
        } else {
            MovementType::AdjustmentOut
        };
        let movement = self
            .stock_movement(movement_type, &cmd.stock_key(), cmd.delta.abs())
            .reason(cmd.reason.clone())
            .maybe_performed_by(cmd.performed_by.clone())
            .build();
        validate_movement(&movement)?;

        let record = self
            .stock
            .apply_delta(existing.id, cmd.delta, existing.version, policy)
            .await?;

        match self.journal.append(movement).await {
            Ok(movement) => {
                tracing::info!(record_id = %record.id, on_hand = %record.on_hand, reason = %cmd.reason, "stock adjusted");
                Ok(StockChange { record, movement })
            }
            Err(e) => {
                self.compensate_delta(record.id, -cmd.delta, record.version)
                    .await;
                Err(e.into())
            }
        }
    }

    /// Moves stock between two locations as a linked movement pair.
    ///
    /// Both legs commit or neither does: a failure on the credit leg or
    /// either journal write rolls the committed legs back.
    #[tracing::instrument(skip(self, cmd), fields(item_id = %cmd.item_id, from = %cmd.source_location_id, to = %cmd.destination_location_id, quantity = %cmd.quantity))]
    pub async fn transfer(&self, cmd: TransferStock) -> Result<TransferOutcome> {
        metrics::counter!("orchestrator_operations_total", "operation" => "transfer").increment(1);
        let started = std::time::Instant::now();
        self.check_deadline(cmd.deadline)?;
        self.require_positive("transfer", cmd.quantity)?;
        self.resolve_item(cmd.item_id).await?;
        let source_policy = self.resolve_policy(cmd.source_location_id).await?;
        let destination_policy = self.resolve_policy(cmd.destination_location_id).await?;

        let source_key = cmd.source_key();
        let source = self
            .stock
            .get(&source_key)
            .await?
            .ok_or(OrchestratorError::NoStockAtLocation { key: source_key })?;

        let transfer_id = Uuid::new_v4().to_string();
        let reference = Reference::transfer(transfer_id.clone());

        let outbound = self
            .stock_movement(MovementType::TransferOut, &cmd.source_key(), cmd.quantity)
            .destination_location(cmd.destination_location_id)
            .reference(reference.clone())
            .maybe_performed_by(cmd.performed_by.clone())
            .build();
        let inbound = self
            .stock_movement(MovementType::TransferIn, &cmd.destination_key(), cmd.quantity)
            .source_location(cmd.source_location_id)
            .reference(reference)
            .maybe_performed_by(cmd.performed_by.clone())
            .build();
        validate_movement(&outbound)?;
        validate_movement(&inbound)?;

        let debited = self
            .stock
            .apply_delta(source.id, -cmd.quantity, source.version, source_policy)
            .await?;

        if let Err(e) = self.check_deadline(cmd.deadline) {
            self.compensate_delta(debited.id, cmd.quantity, debited.version)
                .await;
            return Err(e);
        }

        let credited = match self.credit_destination(&cmd, destination_policy).await {
            Ok(record) => record,
            Err(e) => {
                self.compensate_delta(debited.id, cmd.quantity, debited.version)
                    .await;
                return Err(e);
            }
        };

        let outbound = match self.journal.append(outbound).await {
            Ok(movement) => movement,
            Err(e) => {
                self.rollback_transfer(&debited, &credited, cmd.quantity).await;
                return Err(e.into());
            }
        };
        let inbound = match self.journal.append(inbound).await {
            Ok(movement) => movement,
            Err(e) => {
                tracing::error!(transfer_id = %transfer_id, error = %e, "inbound leg failed to journal, rolling back both legs");
                self.rollback_transfer(&debited, &credited, cmd.quantity).await;
                return Err(e.into());
            }
        };

        metrics::histogram!("orchestrator_transfer_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(transfer_id = %transfer_id, "transfer completed");
        Ok(TransferOutcome {
            source: debited,
            destination: credited,
            outbound,
            inbound,
            transfer_id,
        })
    }

    /// Reserves stock against a record.
    ///
    /// In direct mode the reservation activates immediately and a
    /// `reserve` movement is journalled; under the approval workflow the
    /// claim stays pending and nothing is journalled until approval.
    #[tracing::instrument(skip(self, cmd), fields(stock_record_id = %cmd.stock_record_id, quantity = %cmd.quantity))]
    pub async fn reserve(&self, cmd: ReserveStock) -> Result<ReservationChange> {
        metrics::counter!("orchestrator_operations_total", "operation" => "reserve").increment(1);
        self.check_deadline(cmd.deadline)?;

        let record = self.load_record(cmd.stock_record_id).await?;
        let policy = self.resolve_policy(record.location_id).await?;

        let mut request =
            ReservationRequest::new(cmd.stock_record_id, cmd.quantity, cmd.reserved_by.clone());
        if let Some(reference) = cmd.reference.clone() {
            request = request.with_reference(reference);
        }
        if let Some(expires_at) = cmd.expires_at {
            request = request.with_expiry(expires_at);
        }
        if let Some(notes) = cmd.notes.clone() {
            request = request.with_notes(notes);
        }

        let reservation = self.ledger.create(request, policy).await?;
        if !reservation.status.holds_stock() {
            return Ok(ReservationChange {
                reservation,
                movement: None,
            });
        }

        let movement = self
            .reservation_movement(&reservation, MovementType::Reserve, reservation.quantity, None)
            .await?;
        match self.journal.append(movement).await {
            Ok(movement) => Ok(ReservationChange {
                reservation,
                movement: Some(movement),
            }),
            Err(e) => {
                // Undo the fresh claim so no capacity stays held without a
                // journal trail.
                if let Err(cancel_err) = self
                    .ledger
                    .cancel(reservation.id, Some("movement journal unavailable".to_string()))
                    .await
                {
                    tracing::error!(
                        reservation_id = %reservation.id,
                        error = %cancel_err,
                        "failed to undo reservation after journal failure"
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Approves a pending reservation; the reserved increment and the
    /// `reserve` movement land here, not at creation.
    #[tracing::instrument(skip(self, cmd), fields(reservation_id = %cmd.reservation_id))]
    pub async fn approve_reservation(&self, cmd: ApproveReservation) -> Result<ReservationChange> {
        metrics::counter!("orchestrator_operations_total", "operation" => "approve").increment(1);
        self.check_deadline(cmd.deadline)?;

        let current = self.load_reservation(cmd.reservation_id).await?;
        if current.status.holds_stock() {
            return Ok(ReservationChange {
                reservation: current,
                movement: None,
            });
        }

        let policy = self.resolve_policy(current.location_id).await?;
        let approved = self.ledger.approve(cmd.reservation_id, policy).await?;

        let movement = self
            .reservation_movement(&approved, MovementType::Reserve, approved.quantity, None)
            .await?;
        let movement = self.append_audit(&approved, movement).await?;
        Ok(ReservationChange {
            reservation: approved,
            movement: Some(movement),
        })
    }

    /// Rejects a pending reservation. No stock effect, nothing journalled.
    #[tracing::instrument(skip(self, cmd), fields(reservation_id = %cmd.reservation_id))]
    pub async fn reject_reservation(&self, cmd: RejectReservation) -> Result<Reservation> {
        metrics::counter!("orchestrator_operations_total", "operation" => "reject").increment(1);
        self.check_deadline(cmd.deadline)?;
        Ok(self.ledger.reject(cmd.reservation_id, cmd.reason).await?)
    }

    /// Releases an active reservation, fully or in part.
    #[tracing::instrument(skip(self, cmd), fields(reservation_id = %cmd.reservation_id))]
    pub async fn release_reservation(&self, cmd: ReleaseReservation) -> Result<ReservationChange> {
        metrics::counter!("orchestrator_operations_total", "operation" => "release").increment(1);
        self.check_deadline(cmd.deadline)?;

        let current = self.load_reservation(cmd.reservation_id).await?;
        if current.status == ReservationStatus::Released {
            return Ok(ReservationChange {
                reservation: current,
                movement: None,
            });
        }

        let amount = cmd.quantity.unwrap_or(current.quantity);
        let released = self.ledger.release(cmd.reservation_id, cmd.quantity).await?;

        let movement = self
            .reservation_movement(&released, MovementType::Release, amount, None)
            .await?;
        let movement = self.append_audit(&released, movement).await?;
        Ok(ReservationChange {
            reservation: released,
            movement: Some(movement),
        })
    }

    /// Cancels a pending or active reservation. Only a cancellation that
    /// actually returned held stock journals a `release` movement.
    #[tracing::instrument(skip(self, cmd), fields(reservation_id = %cmd.reservation_id))]
    pub async fn cancel_reservation(&self, cmd: CancelReservation) -> Result<ReservationChange> {
        metrics::counter!("orchestrator_operations_total", "operation" => "cancel").increment(1);
        self.check_deadline(cmd.deadline)?;

        let current = self.load_reservation(cmd.reservation_id).await?;
        if current.status == ReservationStatus::Cancelled {
            return Ok(ReservationChange {
                reservation: current,
                movement: None,
            });
        }
        let held_stock = current.status.holds_stock();

        let cancelled = self.ledger.cancel(cmd.reservation_id, cmd.reason).await?;
        if !held_stock {
            return Ok(ReservationChange {
                reservation: cancelled,
                movement: None,
            });
        }

        let movement = self
            .reservation_movement(&cancelled, MovementType::Release, current.quantity, None)
            .await?;
        let movement = self.append_audit(&cancelled, movement).await?;
        Ok(ReservationChange {
            reservation: cancelled,
            movement: Some(movement),
        })
    }

    /// Consumes an active reservation: the reserved stock physically
    /// leaves, debiting both quantities, and a `consumption` movement is
    /// journalled.
    #[tracing::instrument(skip(self, cmd), fields(reservation_id = %cmd.reservation_id))]
    pub async fn consume_reservation(&self, cmd: ConsumeReservation) -> Result<ReservationChange> {
        metrics::counter!("orchestrator_operations_total", "operation" => "consume").increment(1);
        self.check_deadline(cmd.deadline)?;

        let current = self.load_reservation(cmd.reservation_id).await?;
        if current.status == ReservationStatus::Consumed {
            return Ok(ReservationChange {
                reservation: current,
                movement: None,
            });
        }

        let consumed = self.ledger.consume(cmd.reservation_id).await?;

        let movement = self
            .reservation_movement(
                &consumed,
                MovementType::Consumption,
                consumed.quantity,
                cmd.performed_by.clone(),
            )
            .await?;
        let movement = self.append_audit(&consumed, movement).await?;
        Ok(ReservationChange {
            reservation: consumed,
            movement: Some(movement),
        })
    }

    /// Expires every lapsed active reservation, journalling a `release`
    /// movement per expiry. Each reservation is its own atomic unit; one
    /// failure never blocks the rest of the sweep.
    #[tracing::instrument(skip(self))]
    pub async fn expire_due(&self) -> Result<Vec<ReservationChange>> {
        let now = self.clock.now();
        let expired = self.ledger.expire_due(now).await?;
        metrics::counter!("orchestrator_reservations_expired_total").increment(expired.len() as u64);

        let mut changes = Vec::with_capacity(expired.len());
        for reservation in expired {
            let movement = match self
                .reservation_movement(&reservation, MovementType::Release, reservation.quantity, None)
                .await
            {
                Ok(movement) => match self.journal.append(movement).await {
                    Ok(movement) => Some(movement),
                    Err(e) => {
                        tracing::warn!(reservation_id = %reservation.id, error = %e, "expiry movement not journalled");
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(reservation_id = %reservation.id, error = %e, "expiry movement not journalled");
                    None
                }
            };
            changes.push(ReservationChange {
                reservation,
                movement,
            });
        }
        Ok(changes)
    }

    fn check_deadline(&self, deadline: Option<chrono::DateTime<chrono::Utc>>) -> Result<()> {
        if let Some(deadline) = deadline
            && self.clock.now() > deadline
        {
            return Err(OrchestratorError::DeadlineExceeded { deadline });
        }
        Ok(())
    }

    fn require_positive(&self, operation: &'static str, quantity: Quantity) -> Result<()> {
        if !quantity.is_positive() {
            return Err(OrchestratorError::InvalidQuantity {
                operation,
                quantity,
            });
        }
        Ok(())
    }

    async fn resolve_item(&self, item_id: common::ItemId) -> Result<ResolvedItem> {
        self.catalog
            .resolve_item(item_id)
            .await?
            .ok_or(OrchestratorError::UnknownItem(item_id))
    }

    async fn resolve_policy(&self, location_id: common::LocationId) -> Result<StockPolicy> {
        let location = self
            .locations
            .resolve_location(location_id)
            .await?
            .ok_or(OrchestratorError::UnknownLocation(location_id))?;
        Ok(StockPolicy {
            allow_negative: location.allows_negative_stock,
        })
    }

    async fn load_record(&self, id: StockRecordId) -> Result<StockRecord> {
        self.stock
            .get_by_id(id)
            .await?
            .ok_or(OrchestratorError::Stock(StockStoreError::RecordNotFound(id)))
    }

    async fn load_reservation(&self, id: ReservationId) -> Result<Reservation> {
        self.ledger
            .get(id)
            .await?
            .ok_or(OrchestratorError::Ledger(LedgerError::NotFound(id)))
    }

    /// Starts a completed movement for a stock bucket at the current time.
    fn stock_movement(
        &self,
        movement_type: MovementType,
        key: &StockKey,
        quantity: Quantity,
    ) -> MovementBuilder {
        let now = self.clock.now();
        Movement::builder()
            .movement_type(movement_type)
            .status(MovementStatus::Completed)
            .item_id(key.item_id)
            .location_id(key.location_id)
            .quantity(quantity)
            .created_at(now)
            .processed_at(now)
    }

    /// Builds the journal entry for a reservation transition. The item is
    /// read off the backing stock record; the entry references the
    /// reservation so its full history is one journal query away.
    async fn reservation_movement(
        &self,
        reservation: &Reservation,
        movement_type: MovementType,
        quantity: Quantity,
        performed_by: Option<String>,
    ) -> Result<Movement> {
        let record = self.load_record(reservation.stock_record_id).await?;
        let now = self.clock.now();
        Ok(Movement::builder()
            .movement_type(movement_type)
            .status(MovementStatus::Completed)
            .item_id(record.item_id)
            .location_id(reservation.location_id)
            .quantity(quantity)
            .reference(Reference::reservation(reservation.id.to_string()))
            .performed_by(performed_by.unwrap_or_else(|| reservation.reserved_by.clone()))
            .created_at(now)
            .processed_at(now)
            .build())
    }

    /// Journals a transition's movement. The reservation transition is
    /// already committed and the ledger is its source of truth, so a
    /// journal failure here surfaces the error but does not revert the
    /// transition; the gap is reconstructible from the reservation row.
    async fn append_audit(&self, reservation: &Reservation, movement: Movement) -> Result<Movement> {
        match self.journal.append(movement).await {
            Ok(movement) => Ok(movement),
            Err(e) => {
                tracing::error!(
                    reservation_id = %reservation.id,
                    status = %reservation.status,
                    error = %e,
                    "reservation transition committed but not journalled"
                );
                Err(e.into())
            }
        }
    }

    async fn credit_destination(
        &self,
        cmd: &TransferStock,
        policy: StockPolicy,
    ) -> Result<StockRecord> {
        let key = cmd.destination_key();
        let record = match self.stock.get(&key).await? {
            Some(existing) => {
                self.stock
                    .apply_delta(existing.id, cmd.quantity, existing.version, policy)
                    .await?
            }
            None => {
                let created = self
                    .stock
                    .create_if_absent(NewStockRecord::new(key, Quantity::zero()))
                    .await?;
                self.stock
                    .apply_delta(created.id, cmd.quantity, created.version, policy)
                    .await?
            }
        };
        Ok(record)
    }

    async fn rollback_transfer(
        &self,
        debited: &StockRecord,
        credited: &StockRecord,
        quantity: Quantity,
    ) {
        self.compensate_delta(credited.id, -quantity, credited.version)
            .await;
        self.compensate_delta(debited.id, quantity, debited.version)
            .await;
    }

    /// Best-effort inverse of a committed stock delta.
    async fn compensate_delta(&self, id: StockRecordId, delta: Quantity, version: Version) {
        if let Err(e) = self
            .stock
            .apply_delta(id, delta, version, StockPolicy::allow_negative())
            .await
        {
            tracing::error!(record_id = %id, error = %e, "failed to roll back stock delta");
        }
    }
}

trait MovementBuilderExt {
    fn maybe_reference(self, reference: Option<Reference>) -> Self;
    fn maybe_performed_by(self, performed_by: Option<String>) -> Self;
}

impl MovementBuilderExt for MovementBuilder {
    fn maybe_reference(self, reference: Option<Reference>) -> Self {
        match reference {
            Some(reference) => self.reference(reference),
            None => self,
        }
    }

    fn maybe_performed_by(self, performed_by: Option<String>) -> Self {
        match performed_by {
            Some(performed_by) => self.performed_by(performed_by),
            None => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use common::{ItemId, LocationId, ManualClock};
    use kardex::InMemoryMovementJournal;
    use reservations::InMemoryReservationStore;
    use stock_store::InMemoryStockStore;

    use crate::ports::{InMemoryCatalog, InMemoryLocations};

    type TestOrchestrator = Orchestrator<
        InMemoryStockStore,
        InMemoryMovementJournal,
        InMemoryReservationStore,
        InMemoryCatalog,
        InMemoryLocations,
        ManualClock,
    >;

    struct Fixture {
        orchestrator: TestOrchestrator,
        catalog: InMemoryCatalog,
        locations: InMemoryLocations,
        clock: ManualClock,
    }

    fn fixture() -> Fixture {
        let catalog = InMemoryCatalog::new();
        let locations = InMemoryLocations::new();
        let clock = ManualClock::starting_at(Utc::now());
        let orchestrator = Orchestrator::new(
            InMemoryStockStore::new(),
            InMemoryMovementJournal::new(),
            InMemoryReservationStore::new(),
            catalog.clone(),
            locations.clone(),
            clock.clone(),
        );
        Fixture {
            orchestrator,
            catalog,
            locations,
            clock,
        }
    }

    #[tokio::test]
    async fn receive_rejects_unknown_item() {
        let f = fixture();
        let location_id = f.locations.register();

        let result = f
            .orchestrator
            .receive(ReceiveStock::new(ItemId::new(), location_id, Quantity::new(10)))
            .await;
        assert!(matches!(result, Err(OrchestratorError::UnknownItem(_))));
    }

    #[tokio::test]
    async fn receive_rejects_unknown_location() {
        let f = fixture();
        let item_id = f.catalog.register("bolt");

        let result = f
            .orchestrator
            .receive(ReceiveStock::new(item_id, LocationId::new(), Quantity::new(10)))
            .await;
        assert!(matches!(result, Err(OrchestratorError::UnknownLocation(_))));
    }

    #[tokio::test]
    async fn receive_rejects_non_positive_quantity() {
        let f = fixture();
        let item_id = f.catalog.register("bolt");
        let location_id = f.locations.register();

        let result = f
            .orchestrator
            .receive(ReceiveStock::new(item_id, location_id, Quantity::zero()))
            .await;
        assert!(matches!(
            result,
            Err(OrchestratorError::InvalidQuantity {
                operation: "receive",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn ship_without_a_record_fails() {
        let f = fixture();
        let item_id = f.catalog.register("bolt");
        let location_id = f.locations.register();

        let result = f
            .orchestrator
            .ship(ShipStock::new(item_id, location_id, Quantity::new(1)))
            .await;
        assert!(matches!(
            result,
            Err(OrchestratorError::NoStockAtLocation { .. })
        ));
    }

    #[tokio::test]
    async fn adjust_rejects_zero_delta() {
        let f = fixture();
        let item_id = f.catalog.register("bolt");
        let location_id = f.locations.register();

        let result = f
            .orchestrator
            .adjust(AdjustStock::new(item_id, location_id, Quantity::zero(), "count"))
            .await;
        assert!(matches!(
            result,
            Err(OrchestratorError::InvalidQuantity { .. })
        ));
    }

    #[tokio::test]
    async fn expired_deadline_aborts_before_any_write() {
        let f = fixture();
        let item_id = f.catalog.register("bolt");
        let location_id = f.locations.register();
        let deadline = f.clock.now() - Duration::seconds(1);

        let result = f
            .orchestrator
            .receive(
                ReceiveStock::new(item_id, location_id, Quantity::new(10))
                    .with_deadline(deadline),
            )
            .await;
        assert!(matches!(
            result,
            Err(OrchestratorError::DeadlineExceeded { .. })
        ));

        let key = StockKey::new(item_id, location_id);
        assert!(f.orchestrator.stock_level(&key).await.unwrap().is_none());
        assert_eq!(f.orchestrator.journal().movement_count().await, 0);
    }

    #[tokio::test]
    async fn failed_lookup_surfaces() {
        let f = fixture();
        let item_id = f.catalog.register("bolt");
        let location_id = f.locations.register();
        f.catalog.set_fail_lookups(true);

        let result = f
            .orchestrator
            .receive(ReceiveStock::new(item_id, location_id, Quantity::new(10)))
            .await;
        assert!(matches!(result, Err(OrchestratorError::Lookup(_))));
    }
}
