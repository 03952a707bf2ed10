//! Reservation persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use common::{ReservationId, StockRecordId};

use crate::reservation::Reservation;
use crate::StoreResult;

/// Storage for reservations.
///
/// `update` is version-guarded: the passed reservation's `version` must
/// match the stored row, and the stored copy comes back with the version
/// bumped. Two racing transitions on one reservation therefore serialize;
/// the loser gets a `ConcurrencyConflict`.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Inserts a new reservation. Fails if the ID is already taken.
    async fn insert(&self, reservation: Reservation) -> StoreResult<Reservation>;

    /// Gets a reservation by ID.
    async fn get(&self, id: ReservationId) -> StoreResult<Option<Reservation>>;

    /// Writes an updated reservation, guarded by its current version.
    /// Returns the stored copy with the version bumped.
    async fn update(&self, reservation: Reservation) -> StoreResult<Reservation>;

    /// Lists all reservations held against a stock record, oldest first.
    async fn list_by_stock_record(
        &self,
        stock_record_id: StockRecordId,
    ) -> StoreResult<Vec<Reservation>>;

    /// Lists active reservations whose expiry lies before `deadline`.
    async fn list_expiring(&self, deadline: DateTime<Utc>) -> StoreResult<Vec<Reservation>>;
}
