use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::{Quantity, StockRecordId, Version};

use crate::record::{NewStockRecord, StockKey, StockRecord};
use crate::store::{check_mutation, StockFilter, StockPolicy, StockStore};
use crate::{Result, StockStoreError};

#[derive(Default)]
struct State {
    records: HashMap<StockRecordId, StockRecord>,
    by_key: HashMap<StockKey, StockRecordId>,
}

impl State {
    fn locked(
        &mut self,
        id: StockRecordId,
        expected_version: Version,
    ) -> Result<&mut StockRecord> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or(StockStoreError::RecordNotFound(id))?;

        if record.version != expected_version {
            return Err(StockStoreError::ConcurrencyConflict {
                record_id: id,
                expected: expected_version,
                actual: record.version,
            });
        }

        Ok(record)
    }
}

/// In-memory stock store.
///
/// Mutations run under a single write lock, so the version check and the
/// write are one atomic step, matching the guarantee of the PostgreSQL
/// implementation's guarded UPDATE.
#[derive(Clone, Default)]
pub struct InMemoryStockStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStockStore {
    /// Creates an empty in-memory stock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records stored.
    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }

    /// Clears all records.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.records.clear();
        state.by_key.clear();
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn get(&self, key: &StockKey) -> Result<Option<StockRecord>> {
        let state = self.state.read().await;
        Ok(state
            .by_key
            .get(key)
            .and_then(|id| state.records.get(id))
            .cloned())
    }

    async fn get_by_id(&self, id: StockRecordId) -> Result<Option<StockRecord>> {
        let state = self.state.read().await;
        Ok(state.records.get(&id).cloned())
    }

    async fn list(&self, filter: StockFilter) -> Result<Vec<StockRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<_> = state
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn create_if_absent(&self, new: NewStockRecord) -> Result<StockRecord> {
        if new.initial_on_hand.is_negative() {
            return Err(StockStoreError::InvalidQuantity {
                quantity: new.initial_on_hand,
            });
        }

        let mut state = self.state.write().await;

        if let Some(id) = state.by_key.get(&new.key) {
            let existing = &state.records[id];
            if existing.on_hand == new.initial_on_hand {
                return Ok(existing.clone());
            }
            return Err(StockStoreError::DuplicateKey {
                key: new.key.clone(),
            });
        }

        let record = new.into_record(Utc::now());
        state.by_key.insert(record.key(), record.id);
        state.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn apply_delta(
        &self,
        id: StockRecordId,
        delta: Quantity,
        expected_version: Version,
        policy: StockPolicy,
    ) -> Result<StockRecord> {
        if delta.is_zero() {
            return Err(StockStoreError::InvalidQuantity { quantity: delta });
        }

        let mut state = self.state.write().await;
        let record = state.locked(id, expected_version)?;

        let (on_hand, reserved) = check_mutation(
            record,
            record.on_hand + delta,
            record.reserved,
            delta,
            policy,
        )?;

        record.on_hand = on_hand;
        record.reserved = reserved;
        record.version = record.version.next();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn set_reserved(
        &self,
        id: StockRecordId,
        new_reserved: Quantity,
        expected_version: Version,
        policy: StockPolicy,
    ) -> Result<StockRecord> {
        let mut state = self.state.write().await;
        let record = state.locked(id, expected_version)?;

        let (on_hand, reserved) =
            check_mutation(record, record.on_hand, new_reserved, new_reserved, policy)?;

        record.on_hand = on_hand;
        record.reserved = reserved;
        record.version = record.version.next();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn debit_reserved(
        &self,
        id: StockRecordId,
        quantity: Quantity,
        expected_version: Version,
        policy: StockPolicy,
    ) -> Result<StockRecord> {
        if !quantity.is_positive() {
            return Err(StockStoreError::InvalidQuantity { quantity });
        }

        let mut state = self.state.write().await;
        let record = state.locked(id, expected_version)?;

        let (on_hand, reserved) = check_mutation(
            record,
            record.on_hand - quantity,
            record.reserved - quantity,
            -quantity,
            policy,
        )?;

        record.on_hand = on_hand;
        record.reserved = reserved;
        record.version = record.version.next();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn remove(&self, id: StockRecordId, expected_version: Version) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state.locked(id, expected_version)?;

        if !record.is_empty() {
            return Err(StockStoreError::RecordInUse { record_id: id });
        }

        let key = record.key();
        state.records.remove(&id);
        state.by_key.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ItemId, LocationId};

    fn new_record(on_hand: i64) -> NewStockRecord {
        NewStockRecord::new(
            StockKey::new(ItemId::new(), LocationId::new()),
            Quantity::new(on_hand),
        )
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = InMemoryStockStore::new();
        let new = new_record(100);
        let key = new.key.clone();

        let created = store.create_if_absent(new).await.unwrap();
        assert_eq!(created.on_hand, Quantity::new(100));
        assert_eq!(created.version, Version::first());

        let fetched = store.get(&key).await.unwrap().unwrap();
        assert_eq!(fetched, created);

        let by_id = store.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);
    }

    #[tokio::test]
    async fn create_is_idempotent_for_matching_quantity() {
        let store = InMemoryStockStore::new();
        let new = new_record(100);

        let first = store.create_if_absent(new.clone()).await.unwrap();
        let second = store.create_if_absent(new).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.record_count().await, 1);
    }

    #[tokio::test]
    async fn create_conflicts_on_differing_quantity() {
        let store = InMemoryStockStore::new();
        let new = new_record(100);
        let mut conflicting = new.clone();
        conflicting.initial_on_hand = Quantity::new(50);

        store.create_if_absent(new).await.unwrap();
        let result = store.create_if_absent(conflicting).await;
        assert!(matches!(result, Err(StockStoreError::DuplicateKey { .. })));
    }

    #[tokio::test]
    async fn create_rejects_negative_initial_quantity() {
        let store = InMemoryStockStore::new();
        let result = store.create_if_absent(new_record(-5)).await;
        assert!(matches!(
            result,
            Err(StockStoreError::InvalidQuantity { .. })
        ));
    }

    #[tokio::test]
    async fn apply_delta_bumps_version() {
        let store = InMemoryStockStore::new();
        let r = store.create_if_absent(new_record(100)).await.unwrap();

        let updated = store
            .apply_delta(
                r.id,
                Quantity::new(-40),
                r.version,
                StockPolicy::deny_negative(),
            )
            .await
            .unwrap();

        assert_eq!(updated.on_hand, Quantity::new(60));
        assert_eq!(updated.version, Version::new(2));
    }

    #[tokio::test]
    async fn apply_delta_stale_version_conflicts() {
        let store = InMemoryStockStore::new();
        let r = store.create_if_absent(new_record(100)).await.unwrap();

        store
            .apply_delta(
                r.id,
                Quantity::new(-10),
                r.version,
                StockPolicy::deny_negative(),
            )
            .await
            .unwrap();

        // Second write with the original version must lose.
        let result = store
            .apply_delta(
                r.id,
                Quantity::new(-10),
                r.version,
                StockPolicy::deny_negative(),
            )
            .await;

        assert!(matches!(
            result,
            Err(StockStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn apply_delta_cannot_undercut_reserved() {
        let store = InMemoryStockStore::new();
        let r = store.create_if_absent(new_record(100)).await.unwrap();
        let r = store
            .set_reserved(
                r.id,
                Quantity::new(80),
                r.version,
                StockPolicy::deny_negative(),
            )
            .await
            .unwrap();

        let result = store
            .apply_delta(
                r.id,
                Quantity::new(-30),
                r.version,
                StockPolicy::deny_negative(),
            )
            .await;

        assert!(matches!(
            result,
            Err(StockStoreError::InsufficientStock { .. })
        ));

        // The failed mutation left the record untouched.
        let current = store.get_by_id(r.id).await.unwrap().unwrap();
        assert_eq!(current.on_hand, Quantity::new(100));
        assert_eq!(current.version, r.version);
    }

    #[tokio::test]
    async fn apply_delta_negative_allowed_with_override() {
        let store = InMemoryStockStore::new();
        let r = store.create_if_absent(new_record(10)).await.unwrap();

        let updated = store
            .apply_delta(
                r.id,
                Quantity::new(-25),
                r.version,
                StockPolicy::allow_negative(),
            )
            .await
            .unwrap();

        assert_eq!(updated.on_hand, Quantity::new(-15));
    }

    #[tokio::test]
    async fn set_reserved_rejects_over_reservation() {
        let store = InMemoryStockStore::new();
        let r = store.create_if_absent(new_record(100)).await.unwrap();

        let result = store
            .set_reserved(
                r.id,
                Quantity::new(150),
                r.version,
                StockPolicy::deny_negative(),
            )
            .await;

        assert!(matches!(result, Err(StockStoreError::OverReservation { .. })));
    }

    #[tokio::test]
    async fn debit_reserved_decrements_both_quantities() {
        let store = InMemoryStockStore::new();
        let r = store.create_if_absent(new_record(100)).await.unwrap();
        let r = store
            .set_reserved(
                r.id,
                Quantity::new(20),
                r.version,
                StockPolicy::deny_negative(),
            )
            .await
            .unwrap();

        let updated = store
            .debit_reserved(
                r.id,
                Quantity::new(20),
                r.version,
                StockPolicy::deny_negative(),
            )
            .await
            .unwrap();

        assert_eq!(updated.on_hand, Quantity::new(80));
        assert_eq!(updated.reserved, Quantity::zero());
        assert_eq!(updated.available(), Quantity::new(80));
    }

    #[tokio::test]
    async fn debit_reserved_rejects_more_than_reserved() {
        let store = InMemoryStockStore::new();
        let r = store.create_if_absent(new_record(100)).await.unwrap();
        let r = store
            .set_reserved(
                r.id,
                Quantity::new(10),
                r.version,
                StockPolicy::deny_negative(),
            )
            .await
            .unwrap();

        let result = store
            .debit_reserved(
                r.id,
                Quantity::new(20),
                r.version,
                StockPolicy::deny_negative(),
            )
            .await;

        assert!(matches!(
            result,
            Err(StockStoreError::InvalidQuantity { .. })
        ));
    }

    #[tokio::test]
    async fn remove_only_when_empty() {
        let store = InMemoryStockStore::new();
        let r = store.create_if_absent(new_record(10)).await.unwrap();

        let result = store.remove(r.id, r.version).await;
        assert!(matches!(result, Err(StockStoreError::RecordInUse { .. })));

        let r = store
            .apply_delta(
                r.id,
                Quantity::new(-10),
                r.version,
                StockPolicy::deny_negative(),
            )
            .await
            .unwrap();

        store.remove(r.id, r.version).await.unwrap();
        assert_eq!(store.record_count().await, 0);
        assert!(store.get_by_id(r.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_item() {
        let store = InMemoryStockStore::new();
        let a = store.create_if_absent(new_record(1)).await.unwrap();
        store.create_if_absent(new_record(2)).await.unwrap();

        let all = store.list(StockFilter::all()).await.unwrap();
        assert_eq!(all.len(), 2);

        let only_a = store
            .list(StockFilter::all().item(a.item_id))
            .await
            .unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].id, a.id);
    }

    #[tokio::test]
    async fn not_found_by_id() {
        let store = InMemoryStockStore::new();
        let result = store
            .apply_delta(
                StockRecordId::new(),
                Quantity::new(1),
                Version::first(),
                StockPolicy::deny_negative(),
            )
            .await;
        assert!(matches!(result, Err(StockStoreError::RecordNotFound(_))));
    }
}
