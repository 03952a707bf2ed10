//! Append-only movement journal (kardex).
//!
//! Every quantity-affecting event in the system lands here as an immutable
//! [`Movement`]. Corrections are new compensating movements, never edits.

pub mod error;
pub mod journal;
pub mod memory;
pub mod movement;
pub mod postgres;

pub use common::{ItemId, LocationId, MovementId, Quantity, Reference, ReferenceKind};
pub use error::{JournalError, Result};
pub use journal::{MovementJournal, MovementQuery, validate_movement};
pub use memory::InMemoryMovementJournal;
pub use movement::{Direction, Movement, MovementBuilder, MovementStatus, MovementType};
pub use postgres::PostgresMovementJournal;
