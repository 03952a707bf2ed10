use async_trait::async_trait;

use common::{ItemId, LocationId, Quantity, StockRecordId, Version};

use crate::record::{NewStockRecord, StockKey, StockRecord};
use crate::Result;

/// Per-location invariant policy, resolved by the caller from the location
/// configuration before invoking a mutation.
///
/// With `allow_negative` set, the `reserved <= on_hand` and
/// `on_hand >= 0` checks are skipped; this is the single override switch
/// for locations that operationally run negative (e.g. drop-ship staging).
#[derive(Debug, Clone, Copy, Default)]
pub struct StockPolicy {
    /// Permit on-hand quantity below the reserved quantity (and below zero).
    pub allow_negative: bool,
}

impl StockPolicy {
    /// The default policy: invariants enforced.
    pub fn deny_negative() -> Self {
        Self {
            allow_negative: false,
        }
    }

    /// Policy for locations configured to allow negative stock.
    pub fn allow_negative() -> Self {
        Self {
            allow_negative: true,
        }
    }
}

/// Filter for listing stock records.
#[derive(Debug, Clone, Default)]
pub struct StockFilter {
    /// Restrict to one item.
    pub item_id: Option<ItemId>,

    /// Restrict to one location.
    pub location_id: Option<LocationId>,

    /// Restrict to one lot.
    pub lot_number: Option<String>,
}

impl StockFilter {
    /// An empty filter matching every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts the filter to an item.
    pub fn item(mut self, item_id: ItemId) -> Self {
        self.item_id = Some(item_id);
        self
    }

    /// Restricts the filter to a location.
    pub fn location(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// Restricts the filter to a lot number.
    pub fn lot(mut self, lot_number: impl Into<String>) -> Self {
        self.lot_number = Some(lot_number.into());
        self
    }

    /// Returns true if the record matches this filter.
    pub fn matches(&self, record: &StockRecord) -> bool {
        if let Some(item_id) = self.item_id
            && record.item_id != item_id
        {
            return false;
        }
        if let Some(location_id) = self.location_id
            && record.location_id != location_id
        {
            return false;
        }
        if let Some(ref lot) = self.lot_number
            && record.lot_number.as_deref() != Some(lot.as_str())
        {
            return false;
        }
        true
    }
}

/// Core trait for stock record stores.
///
/// Implementations must be thread-safe (Send + Sync) and must apply each
/// mutation atomically under the record's version guard: a check-then-write
/// must never interleave with another writer.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Looks up a record by natural key.
    async fn get(&self, key: &StockKey) -> Result<Option<StockRecord>>;

    /// Looks up a record by id.
    async fn get_by_id(&self, id: StockRecordId) -> Result<Option<StockRecord>>;

    /// Lists records matching the filter, oldest first.
    async fn list(&self, filter: StockFilter) -> Result<Vec<StockRecord>>;

    /// Creates a record unless its natural key already exists.
    ///
    /// When the key exists with the same on-hand quantity the existing
    /// record is returned (idempotent create); a differing quantity is a
    /// `DuplicateKey` conflict.
    async fn create_if_absent(&self, new: NewStockRecord) -> Result<StockRecord>;

    /// Adds a signed delta to the on-hand quantity.
    ///
    /// Fails with `InsufficientStock` when the result would drop below the
    /// reserved quantity and the policy does not allow negatives, and with
    /// `ConcurrencyConflict` when `expected_version` is stale.
    async fn apply_delta(
        &self,
        id: StockRecordId,
        delta: Quantity,
        expected_version: Version,
        policy: StockPolicy,
    ) -> Result<StockRecord>;

    /// Replaces the reserved total.
    ///
    /// Fails with `OverReservation` when the new total exceeds the on-hand
    /// quantity without an override, and with `ConcurrencyConflict` on a
    /// stale version.
    async fn set_reserved(
        &self,
        id: StockRecordId,
        new_reserved: Quantity,
        expected_version: Version,
        policy: StockPolicy,
    ) -> Result<StockRecord>;

    /// Decrements both the reserved and on-hand quantities by the same
    /// amount, in one guarded mutation.
    ///
    /// This is the consume path: reserved stock physically leaves, and no
    /// reader may observe one decrement without the other.
    async fn debit_reserved(
        &self,
        id: StockRecordId,
        quantity: Quantity,
        expected_version: Version,
        policy: StockPolicy,
    ) -> Result<StockRecord>;

    /// Removes a record that holds no stock and no reservations.
    ///
    /// Fails with `RecordInUse` while either quantity is non-zero.
    async fn remove(&self, id: StockRecordId, expected_version: Version) -> Result<()>;
}

/// Validates the quantity state transition shared by every backend.
///
/// Returns the new (on_hand, reserved) pair, or the error a compliant store
/// must surface. Backends that can express the check inside a guarded
/// UPDATE use this only to classify failures.
pub fn check_mutation(
    record: &StockRecord,
    new_on_hand: Quantity,
    new_reserved: Quantity,
    requested: Quantity,
    policy: StockPolicy,
) -> Result<(Quantity, Quantity)> {
    use crate::StockStoreError;

    if new_reserved.is_negative() {
        return Err(StockStoreError::InvalidQuantity {
            quantity: new_reserved,
        });
    }

    if !policy.allow_negative && new_on_hand < new_reserved {
        // A reserved-total change reads as over-reservation, a stock debit
        // as insufficiency.
        if new_reserved != record.reserved {
            return Err(StockStoreError::OverReservation {
                record_id: record.id,
                on_hand: record.on_hand,
                requested: new_reserved,
            });
        }
        return Err(StockStoreError::InsufficientStock {
            record_id: record.id,
            on_hand: record.on_hand,
            reserved: record.reserved,
            requested,
        });
    }

    Ok((new_on_hand, new_reserved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NewStockRecord;
    use crate::StockStoreError;
    use chrono::Utc;

    fn record(on_hand: i64, reserved: i64) -> StockRecord {
        let mut r = NewStockRecord::new(
            StockKey::new(ItemId::new(), LocationId::new()),
            Quantity::new(on_hand),
        )
        .into_record(Utc::now());
        r.reserved = Quantity::new(reserved);
        r
    }

    #[test]
    fn check_mutation_accepts_valid_debit() {
        let r = record(100, 20);
        let out = check_mutation(
            &r,
            Quantity::new(50),
            r.reserved,
            Quantity::new(-50),
            StockPolicy::deny_negative(),
        );
        assert!(out.is_ok());
    }

    #[test]
    fn check_mutation_rejects_debit_below_reserved() {
        let r = record(100, 60);
        let out = check_mutation(
            &r,
            Quantity::new(50),
            r.reserved,
            Quantity::new(-50),
            StockPolicy::deny_negative(),
        );
        assert!(matches!(
            out,
            Err(StockStoreError::InsufficientStock { .. })
        ));
    }

    #[test]
    fn check_mutation_rejects_over_reservation() {
        let r = record(100, 0);
        let out = check_mutation(
            &r,
            r.on_hand,
            Quantity::new(150),
            Quantity::new(150),
            StockPolicy::deny_negative(),
        );
        assert!(matches!(out, Err(StockStoreError::OverReservation { .. })));
    }

    #[test]
    fn check_mutation_override_permits_negative() {
        let r = record(10, 0);
        let out = check_mutation(
            &r,
            Quantity::new(-5),
            r.reserved,
            Quantity::new(-15),
            StockPolicy::allow_negative(),
        );
        assert!(out.is_ok());
    }

    #[test]
    fn check_mutation_rejects_negative_reserved_total() {
        let r = record(10, 0);
        let out = check_mutation(
            &r,
            r.on_hand,
            Quantity::new(-1),
            Quantity::new(-1),
            StockPolicy::allow_negative(),
        );
        assert!(matches!(out, Err(StockStoreError::InvalidQuantity { .. })));
    }

    #[test]
    fn filter_matches_by_item_location_and_lot() {
        let r = record(1, 0);
        assert!(StockFilter::all().matches(&r));
        assert!(StockFilter::all().item(r.item_id).matches(&r));
        assert!(!StockFilter::all().item(ItemId::new()).matches(&r));
        assert!(!StockFilter::all().lot("LOT-1").matches(&r));
    }
}
