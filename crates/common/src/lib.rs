//! Shared types for the stock and reservation ledger.

pub mod clock;
pub mod ids;
pub mod quantity;
pub mod reference;
pub mod version;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{ItemId, LocationId, MovementId, ReservationId, StockRecordId};
pub use quantity::Quantity;
pub use reference::{Reference, ReferenceKind};
pub use version::Version;
