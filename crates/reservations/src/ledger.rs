//! The reservation ledger service.
//!
//! Sequencing rule for every transition with a stock effect: the stock
//! record is written first, then the reservation. If the reservation write
//! fails, the stock effect is rolled back before the error propagates, so
//! no caller observes a reserved quantity without a matching reservation.

use chrono::{DateTime, Utc};

use common::{Clock, Quantity, ReservationId, StockRecordId};
use stock_store::{StockPolicy, StockRecord, StockStore, StockStoreError};

use crate::error::{LedgerError, Result};
use crate::reservation::{Reservation, ReservationRequest};
use crate::status::ReservationStatus;
use crate::store::ReservationStore;

/// Service keeping reservations and stock-record quantities consistent.
///
/// Pending reservations claim capacity optimistically: they count against
/// the record's on-hand quantity for admission but only touch `reserved`
/// at approval. All transitions are idempotent when retried against the
/// same target status.
pub struct ReservationLedger<S, R, C> {
    stock: S,
    reservations: R,
    clock: C,
    approval_required: bool,
}

impl<S, R, C> ReservationLedger<S, R, C>
where
    S: StockStore,
    R: ReservationStore,
    C: Clock,
{
    /// Creates a ledger in direct mode: reservations activate on creation.
    pub fn new(stock: S, reservations: R, clock: C) -> Self {
        Self {
            stock,
            reservations,
            clock,
            approval_required: false,
        }
    }

    /// Switches the ledger to the approval workflow: reservations are
    /// created `pending` and activate on `approve`.
    pub fn require_approval(mut self) -> Self {
        self.approval_required = true;
        self
    }

    /// Loads a reservation by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.reservations.get(id).await?)
    }

    /// Lists all reservations held against a stock record.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_record(
        &self,
        stock_record_id: StockRecordId,
    ) -> Result<Vec<Reservation>> {
        Ok(self.reservations.list_by_stock_record(stock_record_id).await?)
    }

    /// Creates a reservation against a stock record.
    ///
    /// Admission is checked against the record's on-hand quantity minus
    /// all capacity-claiming reservations, so a pending reservation can
    /// never be structurally doomed at approval time.
    #[tracing::instrument(skip(self, request), fields(stock_record_id = %request.stock_record_id))]
    pub async fn create(
        &self,
        request: ReservationRequest,
        policy: StockPolicy,
    ) -> Result<Reservation> {
        if !request.quantity.is_positive() {
            return Err(LedgerError::InvalidQuantity {
                quantity: request.quantity,
            });
        }

        let record = self.load_record(request.stock_record_id).await?;

        let claimed = self.claimed_quantity(record.id).await?;
        if !policy.allow_negative && claimed + request.quantity > record.on_hand {
            return Err(LedgerError::InsufficientAvailable {
                stock_record_id: record.id,
                available: record.on_hand - claimed,
                requested: request.quantity,
            });
        }

        let now = self.clock.now();

        if self.approval_required {
            return self.admit_pending(request, record, policy, now).await;
        }

        let reservation =
            request.into_reservation(record.location_id, ReservationStatus::Active, now);
        let stock_after = self
            .stock
            .set_reserved(
                record.id,
                record.reserved + reservation.quantity,
                record.version,
                policy,
            )
            .await
            .map_err(|e| Self::admission_error(&record, reservation.quantity, e))?;

        match self.reservations.insert(reservation).await {
            Ok(stored) => {
                tracing::info!(reservation_id = %stored.id, quantity = %stored.quantity, "reservation activated");
                Ok(stored)
            }
            Err(e) => {
                self.rollback_reserved(record.id, record.reserved, stock_after.version)
                    .await;
                Err(e.into())
            }
        }
    }

    /// Admits a pending reservation under the approval workflow.
    ///
    /// A pending claim touches no stock quantity, so the admission check
    /// alone cannot serialize two racing creates. The row is inserted
    /// first, the admission is then stamped with a version-guarded no-op
    /// write to the stock record, and the claim sum is re-read after the
    /// stamp. Stamps totally order admissions, and every admission that
    /// stamped earlier has already inserted its row, so the re-read sees
    /// all of them. A stamp conflict voids the provisional row and
    /// surfaces to the caller for re-read and retry.
    async fn admit_pending(
        &self,
        request: ReservationRequest,
        record: StockRecord,
        policy: StockPolicy,
        now: DateTime<Utc>,
    ) -> Result<Reservation> {
        let reservation =
            request.into_reservation(record.location_id, ReservationStatus::Pending, now);
        let pending = self.reservations.insert(reservation).await?;

        if let Err(e) = self
            .stock
            .set_reserved(
                record.id,
                record.reserved,
                record.version,
                StockPolicy::allow_negative(),
            )
            .await
        {
            self.void_pending(pending, "admission superseded by a concurrent write")
                .await;
            return Err(LedgerError::Stock(e));
        }

        let claimed = self.claimed_quantity(record.id).await?;
        if !policy.allow_negative && claimed > record.on_hand {
            let quantity = pending.quantity;
            self.void_pending(pending, "insufficient capacity at admission")
                .await;
            return Err(LedgerError::InsufficientAvailable {
                stock_record_id: record.id,
                available: record.on_hand - (claimed - quantity),
                requested: quantity,
            });
        }

        tracing::info!(reservation_id = %pending.id, quantity = %pending.quantity, "reservation pending approval");
        Ok(pending)
    }

    /// Best-effort cancellation of a provisional pending row that lost
    /// its admission.
    async fn void_pending(&self, pending: Reservation, reason: &str) {
        let mut cancelled = pending;
        cancelled.status = ReservationStatus::Cancelled;
        cancelled.status_reason = Some(reason.to_string());
        if let Err(e) = self.reservations.update(cancelled).await {
            tracing::error!(error = %e, "failed to void provisional reservation");
        }
    }

    /// Approves a pending reservation, applying the reserved increment now.
    #[tracing::instrument(skip(self))]
    pub async fn approve(&self, id: ReservationId, policy: StockPolicy) -> Result<Reservation> {
        let reservation = self.load(id).await?;

        if reservation.status == ReservationStatus::Active {
            return Ok(reservation);
        }
        if !reservation.status.can_approve() {
            return Err(LedgerError::InvalidTransition {
                reservation_id: id,
                current: reservation.status,
                action: "approve",
            });
        }

        let record = self.load_record(reservation.stock_record_id).await?;
        let stock_after = self
            .stock
            .set_reserved(
                record.id,
                record.reserved + reservation.quantity,
                record.version,
                policy,
            )
            .await
            .map_err(|e| Self::admission_error(&record, reservation.quantity, e))?;

        let mut approved = reservation;
        approved.status = ReservationStatus::Active;

        match self.reservations.update(approved).await {
            Ok(stored) => Ok(stored),
            Err(e) => {
                self.rollback_reserved(record.id, record.reserved, stock_after.version)
                    .await;
                Err(e.into())
            }
        }
    }

    /// Rejects a pending reservation. No stock effect: a pending claim
    /// never held reserved quantity.
    #[tracing::instrument(skip(self))]
    pub async fn reject(
        &self,
        id: ReservationId,
        reason: Option<String>,
    ) -> Result<Reservation> {
        let reservation = self.load(id).await?;

        if reservation.status == ReservationStatus::Rejected {
            return Ok(reservation);
        }
        if !reservation.status.can_reject() {
            return Err(LedgerError::InvalidTransition {
                reservation_id: id,
                current: reservation.status,
                action: "reject",
            });
        }

        let mut rejected = reservation;
        rejected.status = ReservationStatus::Rejected;
        rejected.status_reason = reason;
        Ok(self.reservations.update(rejected).await?)
    }

    /// Releases an active reservation back to the available pool.
    ///
    /// With `partial`, only that amount is released and the reservation
    /// stays active with a reduced quantity.
    #[tracing::instrument(skip(self))]
    pub async fn release(
        &self,
        id: ReservationId,
        partial: Option<Quantity>,
    ) -> Result<Reservation> {
        let reservation = self.load(id).await?;

        if reservation.status == ReservationStatus::Released {
            return Ok(reservation);
        }
        if !reservation.status.can_release() {
            return Err(LedgerError::InvalidTransition {
                reservation_id: id,
                current: reservation.status,
                action: "release",
            });
        }

        let amount = partial.unwrap_or(reservation.quantity);
        if !amount.is_positive() || amount > reservation.quantity {
            return Err(LedgerError::InvalidQuantity { quantity: amount });
        }

        self.release_stock_and_update(reservation, amount, ReservationStatus::Released, None)
            .await
    }

    /// Cancels a pending or active reservation.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        &self,
        id: ReservationId,
        reason: Option<String>,
    ) -> Result<Reservation> {
        let reservation = self.load(id).await?;

        if reservation.status == ReservationStatus::Cancelled {
            return Ok(reservation);
        }
        if !reservation.status.can_cancel() {
            return Err(LedgerError::InvalidTransition {
                reservation_id: id,
                current: reservation.status,
                action: "cancel",
            });
        }

        if reservation.status.holds_stock() {
            let amount = reservation.quantity;
            return self
                .release_stock_and_update(reservation, amount, ReservationStatus::Cancelled, reason)
                .await;
        }

        // Pending: nothing was reserved yet.
        let mut cancelled = reservation;
        cancelled.status = ReservationStatus::Cancelled;
        cancelled.status_reason = reason;
        Ok(self.reservations.update(cancelled).await?)
    }

    /// Consumes an active reservation: the reserved stock physically
    /// leaves, so both `reserved` and `on_hand` drop by the quantity.
    #[tracing::instrument(skip(self))]
    pub async fn consume(&self, id: ReservationId) -> Result<Reservation> {
        let reservation = self.load(id).await?;

        if reservation.status == ReservationStatus::Consumed {
            return Ok(reservation);
        }
        if !reservation.status.can_consume() {
            return Err(LedgerError::InvalidTransition {
                reservation_id: id,
                current: reservation.status,
                action: "consume",
            });
        }

        let record = self.load_record(reservation.stock_record_id).await?;
        let stock_after = self
            .stock
            .debit_reserved(
                record.id,
                reservation.quantity,
                record.version,
                StockPolicy::allow_negative(),
            )
            .await?;

        let mut consumed = reservation;
        consumed.status = ReservationStatus::Consumed;
        let quantity = consumed.quantity;

        match self.reservations.update(consumed).await {
            Ok(stored) => {
                tracing::info!(reservation_id = %id, %quantity, "reservation consumed");
                Ok(stored)
            }
            Err(e) => {
                self.rollback_debit(record.id, quantity, record.reserved, stock_after.version)
                    .await;
                Err(e.into())
            }
        }
    }

    /// Expires a lapsed active reservation, with the same stock effect
    /// as a full release. Normally driven by [`Self::expire_due`].
    #[tracing::instrument(skip(self))]
    pub async fn expire(&self, id: ReservationId) -> Result<Reservation> {
        let reservation = self.load(id).await?;

        if reservation.status == ReservationStatus::Expired {
            return Ok(reservation);
        }
        if !reservation.status.can_expire() {
            return Err(LedgerError::InvalidTransition {
                reservation_id: id,
                current: reservation.status,
                action: "expire",
            });
        }

        let amount = reservation.quantity;
        self.release_stock_and_update(reservation, amount, ReservationStatus::Expired, None)
            .await
    }

    /// Sweeps every active reservation whose expiry lies before `now`.
    ///
    /// Each expiry is its own atomic unit: a failure on one reservation
    /// is logged and skipped, never leaving it half-transitioned, and the
    /// sweep continues with the rest.
    #[tracing::instrument(skip(self))]
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>> {
        let due = self.reservations.list_expiring(now).await?;
        let mut expired = Vec::with_capacity(due.len());

        for reservation in due {
            match self.expire(reservation.id).await {
                Ok(stored) => expired.push(stored),
                Err(e) => {
                    tracing::warn!(
                        reservation_id = %reservation.id,
                        error = %e,
                        "expiry sweep skipped reservation"
                    );
                }
            }
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired lapsed reservations");
        }
        Ok(expired)
    }

    /// Sum of quantities over all capacity-claiming reservations on a
    /// record (pending and active).
    async fn claimed_quantity(&self, stock_record_id: StockRecordId) -> Result<Quantity> {
        let reservations = self.reservations.list_by_stock_record(stock_record_id).await?;
        Ok(reservations
            .iter()
            .filter(|r| r.status.claims_capacity())
            .map(|r| r.quantity)
            .fold(Quantity::zero(), |acc, q| acc + q))
    }

    /// Decrements the record's reserved quantity by `amount`, then writes
    /// the reservation in its new status. Lowering `reserved` can never
    /// worsen the stock invariant, so the override policy is used.
    async fn release_stock_and_update(
        &self,
        reservation: Reservation,
        amount: Quantity,
        target: ReservationStatus,
        reason: Option<String>,
    ) -> Result<Reservation> {
        let record = self.load_record(reservation.stock_record_id).await?;
        let stock_after = self
            .stock
            .set_reserved(
                record.id,
                record.reserved - amount,
                record.version,
                StockPolicy::allow_negative(),
            )
            .await?;

        let mut changed = reservation;
        if amount == changed.quantity {
            changed.status = target;
            changed.status_reason = reason;
        } else {
            changed.quantity = changed.quantity - amount;
        }

        match self.reservations.update(changed).await {
            Ok(stored) => Ok(stored),
            Err(e) => {
                self.rollback_reserved(record.id, record.reserved, stock_after.version)
                    .await;
                Err(e.into())
            }
        }
    }

    async fn load(&self, id: ReservationId) -> Result<Reservation> {
        self.reservations
            .get(id)
            .await?
            .ok_or(LedgerError::NotFound(id))
    }

    async fn load_record(&self, id: StockRecordId) -> Result<StockRecord> {
        self.stock
            .get_by_id(id)
            .await
            .map_err(LedgerError::Stock)?
            .ok_or(LedgerError::Stock(StockStoreError::RecordNotFound(id)))
    }

    fn admission_error(
        record: &StockRecord,
        requested: Quantity,
        e: StockStoreError,
    ) -> LedgerError {
        match e {
            StockStoreError::OverReservation { .. } => LedgerError::InsufficientAvailable {
                stock_record_id: record.id,
                available: record.available(),
                requested,
            },
            other => LedgerError::Stock(other),
        }
    }

    /// Best-effort restore of a reserved quantity after a failed
    /// reservation write.
    async fn rollback_reserved(
        &self,
        record_id: StockRecordId,
        reserved: Quantity,
        version: common::Version,
    ) {
        if let Err(e) = self
            .stock
            .set_reserved(record_id, reserved, version, StockPolicy::allow_negative())
            .await
        {
            tracing::error!(%record_id, error = %e, "failed to roll back reserved quantity");
        }
    }

    /// Best-effort undo of a consume debit: re-credit on-hand, then
    /// restore the reserved total.
    async fn rollback_debit(
        &self,
        record_id: StockRecordId,
        quantity: Quantity,
        reserved: Quantity,
        version: common::Version,
    ) {
        let credited = match self
            .stock
            .apply_delta(record_id, quantity, version, StockPolicy::allow_negative())
            .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(%record_id, error = %e, "failed to roll back consume debit");
                return;
            }
        };

        self.rollback_reserved(record_id, reserved, credited.version)
            .await;
    }
}
