//! Authoritative per-(item, location) stock quantity state.
//!
//! A [`StockRecord`] tracks how much of one item is on hand at one location
//! (optionally qualified by lot or serial number) and how much of that is
//! reserved. Every mutation is guarded by an optimistic version check; the
//! caller supplies the version it read, and a stale version is rejected
//! rather than retried.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::{ItemId, LocationId, Quantity, StockRecordId, Version};
pub use error::{Result, StockStoreError};
pub use memory::InMemoryStockStore;
pub use postgres::PostgresStockStore;
pub use record::{NewStockRecord, StockKey, StockMeta, StockMetaV1, StockRecord};
pub use store::{StockFilter, StockPolicy, StockStore};
