//! Reservation ledger.
//!
//! A [`Reservation`] is a claim against one stock record's available
//! quantity. This crate owns the reservation state machine and the
//! [`ReservationLedger`] service that keeps reservation transitions and
//! stock-record quantities consistent.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod reservation;
pub mod status;
pub mod store;

pub use common::{LocationId, Quantity, Reference, ReservationId, StockRecordId, Version};
pub use error::{LedgerError, ReservationStoreError, Result, StoreResult};
pub use ledger::ReservationLedger;
pub use memory::InMemoryReservationStore;
pub use postgres::PostgresReservationStore;
pub use reservation::{Reservation, ReservationRequest};
pub use status::ReservationStatus;
pub use store::ReservationStore;
