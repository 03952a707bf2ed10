//! Stock record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{ItemId, LocationId, Quantity, StockRecordId, Version};

/// Natural key of a stock record.
///
/// One record exists per (item, location) pair, further qualified by lot
/// and/or serial number when the item is tracked at that granularity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockKey {
    /// The catalogued item.
    pub item_id: ItemId,

    /// The location holding the stock.
    pub location_id: LocationId,

    /// Lot number, when lot-tracked.
    pub lot_number: Option<String>,

    /// Serial number, when serial-tracked.
    pub serial_number: Option<String>,
}

impl StockKey {
    /// Creates a key for untracked stock of an item at a location.
    pub fn new(item_id: ItemId, location_id: LocationId) -> Self {
        Self {
            item_id,
            location_id,
            lot_number: None,
            serial_number: None,
        }
    }

    /// Qualifies the key with a lot number.
    pub fn with_lot(mut self, lot_number: impl Into<String>) -> Self {
        self.lot_number = Some(lot_number.into());
        self
    }

    /// Qualifies the key with a serial number.
    pub fn with_serial(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }
}

impl std::fmt::Display for StockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.item_id, self.location_id)?;
        if let Some(ref lot) = self.lot_number {
            write!(f, "/lot:{}", lot)?;
        }
        if let Some(ref serial) = self.serial_number {
            write!(f, "/sn:{}", serial)?;
        }
        Ok(())
    }
}

/// Versioned free-form annotations on a stock record.
///
/// A closed, versioned schema instead of an open string map, so the fields
/// the invariants depend on can never hide inside untyped metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum StockMeta {
    /// No annotations.
    #[default]
    None,

    /// Current annotation schema.
    V1(StockMetaV1),
}

/// Schema version 1 of stock record annotations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockMetaV1 {
    /// Operator note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Free-form labels for filtering and reporting.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Quantity state for one item at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    /// Unique identifier.
    pub id: StockRecordId,

    /// The catalogued item.
    pub item_id: ItemId,

    /// The location holding the stock.
    pub location_id: LocationId,

    /// Lot number, when lot-tracked.
    pub lot_number: Option<String>,

    /// Serial number, when serial-tracked.
    pub serial_number: Option<String>,

    /// When the stock expires, for perishable lots.
    pub expiration_date: Option<DateTime<Utc>>,

    /// Physical quantity at the location.
    pub on_hand: Quantity,

    /// Portion of `on_hand` withheld by active reservations.
    pub reserved: Quantity,

    /// Versioned annotations.
    pub meta: StockMeta,

    /// Optimistic concurrency stamp; increments on every mutation.
    pub version: Version,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the record was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// Returns the quantity free to ship or reserve: `on_hand - reserved`.
    pub fn available(&self) -> Quantity {
        self.on_hand - self.reserved
    }

    /// Returns the record's natural key.
    pub fn key(&self) -> StockKey {
        StockKey {
            item_id: self.item_id,
            location_id: self.location_id,
            lot_number: self.lot_number.clone(),
            serial_number: self.serial_number.clone(),
        }
    }

    /// Returns true if both quantities are zero.
    pub fn is_empty(&self) -> bool {
        self.on_hand.is_zero() && self.reserved.is_zero()
    }
}

/// Input for creating a stock record.
#[derive(Debug, Clone)]
pub struct NewStockRecord {
    /// Natural key of the record to create.
    pub key: StockKey,

    /// Quantity on hand at creation (first receipt).
    pub initial_on_hand: Quantity,

    /// Expiry of the received stock, if perishable.
    pub expiration_date: Option<DateTime<Utc>>,

    /// Annotations.
    pub meta: StockMeta,
}

impl NewStockRecord {
    /// Creates input with no expiry and empty annotations.
    pub fn new(key: StockKey, initial_on_hand: Quantity) -> Self {
        Self {
            key,
            initial_on_hand,
            expiration_date: None,
            meta: StockMeta::default(),
        }
    }

    /// Sets the expiration date.
    pub fn with_expiration(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    /// Sets the annotations.
    pub fn with_meta(mut self, meta: StockMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Materializes the record with a fresh id at version 1.
    pub fn into_record(self, now: DateTime<Utc>) -> StockRecord {
        StockRecord {
            id: StockRecordId::new(),
            item_id: self.key.item_id,
            location_id: self.key.location_id,
            lot_number: self.key.lot_number,
            serial_number: self.key.serial_number,
            expiration_date: self.expiration_date,
            on_hand: self.initial_on_hand,
            reserved: Quantity::zero(),
            meta: self.meta,
            version: Version::first(),
            created_at: now,
            updated_at: now,
        }
    }
}
