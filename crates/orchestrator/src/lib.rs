//! Public operations over the stock store, reservation ledger and
//! movement journal.
//!
//! External callers go through the [`Orchestrator`]: it validates
//! preconditions, resolves the per-location negative-stock policy from the
//! location registry, applies the stock and reservation effects, and
//! journals the movements. The [`ExpirySweeper`] runs the one background
//! activity, the periodic reservation-expiry sweep.

pub mod command;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod sweeper;

pub use command::{
    AdjustStock, ApproveReservation, CancelReservation, ConsumeReservation, ReceiveStock,
    RejectReservation, ReleaseReservation, ReserveStock, ShipStock, TransferStock,
};
pub use error::{OrchestratorError, Result};
pub use orchestrator::{Orchestrator, ReservationChange, StockChange, TransferOutcome};
pub use ports::{
    CatalogLookup, InMemoryCatalog, InMemoryLocations, LocationLookup, LookupError, ResolvedItem,
    ResolvedLocation,
};
pub use sweeper::ExpirySweeper;
