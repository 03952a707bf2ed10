use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use common::{ReservationId, StockRecordId};

use crate::reservation::Reservation;
use crate::store::ReservationStore;
use crate::{ReservationStoreError, StoreResult};

/// In-memory reservation store for testing.
#[derive(Clone, Default)]
pub struct InMemoryReservationStore {
    reservations: Arc<RwLock<HashMap<ReservationId, Reservation>>>,
}

impl InMemoryReservationStore {
    /// Creates a new empty in-memory reservation store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of reservations stored.
    pub async fn reservation_count(&self) -> usize {
        self.reservations.read().await.len()
    }

    /// Clears all reservations.
    pub async fn clear(&self) {
        self.reservations.write().await.clear();
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn insert(&self, reservation: Reservation) -> StoreResult<Reservation> {
        let mut store = self.reservations.write().await;
        if store.contains_key(&reservation.id) {
            return Err(ReservationStoreError::AlreadyExists(reservation.id));
        }
        store.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn get(&self, id: ReservationId) -> StoreResult<Option<Reservation>> {
        Ok(self.reservations.read().await.get(&id).cloned())
    }

    async fn update(&self, reservation: Reservation) -> StoreResult<Reservation> {
        let mut store = self.reservations.write().await;
        let current = store
            .get(&reservation.id)
            .ok_or(ReservationStoreError::NotFound(reservation.id))?;

        if current.version != reservation.version {
            return Err(ReservationStoreError::ConcurrencyConflict {
                reservation_id: reservation.id,
                expected: reservation.version,
                actual: current.version,
            });
        }

        let mut stored = reservation;
        stored.version = stored.version.next();
        stored.updated_at = Utc::now();
        store.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_by_stock_record(
        &self,
        stock_record_id: StockRecordId,
    ) -> StoreResult<Vec<Reservation>> {
        let store = self.reservations.read().await;
        let mut reservations: Vec<_> = store
            .values()
            .filter(|r| r.stock_record_id == stock_record_id)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.created_at);
        Ok(reservations)
    }

    async fn list_expiring(&self, deadline: DateTime<Utc>) -> StoreResult<Vec<Reservation>> {
        let store = self.reservations.read().await;
        let mut reservations: Vec<_> = store
            .values()
            .filter(|r| r.status.can_expire() && r.is_expired_at(deadline))
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.expires_at);
        Ok(reservations)
    }
}
