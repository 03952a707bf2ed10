//! Reservation state machine.

use serde::{Deserialize, Serialize};

/// The status of a reservation in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──┬──► Active ──┬──► Released
///           │             ├──► Consumed
///           │             ├──► Expired
///           │             └──► Cancelled
///           ├──► Rejected
///           └──► Cancelled
/// ```
///
/// Transitions are one-way; no status ever reverts to an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Requested but awaiting approval; claims capacity optimistically
    /// without touching the stock record's reserved quantity.
    #[default]
    Pending,

    /// Approved and counted in the stock record's reserved quantity.
    Active,

    /// Returned to the available pool (terminal state).
    Released,

    /// The reserved stock physically left (terminal state).
    Consumed,

    /// Lapsed past its expiry and released by the sweep (terminal state).
    Expired,

    /// Withdrawn before or after activation (terminal state).
    Cancelled,

    /// Approval was denied; never held capacity (terminal state).
    Rejected,
}

impl ReservationStatus {
    /// Returns true if the reservation can be approved in this status.
    pub fn can_approve(&self) -> bool {
        matches!(self, ReservationStatus::Pending)
    }

    /// Returns true if the reservation can be rejected in this status.
    pub fn can_reject(&self) -> bool {
        matches!(self, ReservationStatus::Pending)
    }

    /// Returns true if the reservation can be released in this status.
    pub fn can_release(&self) -> bool {
        matches!(self, ReservationStatus::Active)
    }

    /// Returns true if the reservation can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Active)
    }

    /// Returns true if the reservation can be consumed in this status.
    pub fn can_consume(&self) -> bool {
        matches!(self, ReservationStatus::Active)
    }

    /// Returns true if the reservation can expire in this status.
    pub fn can_expire(&self) -> bool {
        matches!(self, ReservationStatus::Active)
    }

    /// Returns true if this reservation is counted in the stock record's
    /// reserved quantity.
    pub fn holds_stock(&self) -> bool {
        matches!(self, ReservationStatus::Active)
    }

    /// Returns true if this reservation claims capacity against the stock
    /// record's on-hand quantity (pending claims are optimistic, active
    /// claims are materialized).
    pub fn claims_capacity(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Active)
    }

    /// Returns true if this is a terminal status (no further transitions
    /// possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Released
                | ReservationStatus::Consumed
                | ReservationStatus::Expired
                | ReservationStatus::Cancelled
                | ReservationStatus::Rejected
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Active => "active",
            ReservationStatus::Released => "released",
            ReservationStatus::Consumed => "consumed",
            ReservationStatus::Expired => "expired",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_pending() {
        assert_eq!(ReservationStatus::default(), ReservationStatus::Pending);
    }

    #[test]
    fn only_pending_can_approve_or_reject() {
        assert!(ReservationStatus::Pending.can_approve());
        assert!(ReservationStatus::Pending.can_reject());
        for status in [
            ReservationStatus::Active,
            ReservationStatus::Released,
            ReservationStatus::Consumed,
            ReservationStatus::Expired,
            ReservationStatus::Cancelled,
            ReservationStatus::Rejected,
        ] {
            assert!(!status.can_approve(), "{status}");
            assert!(!status.can_reject(), "{status}");
        }
    }

    #[test]
    fn only_active_can_release_consume_or_expire() {
        assert!(ReservationStatus::Active.can_release());
        assert!(ReservationStatus::Active.can_consume());
        assert!(ReservationStatus::Active.can_expire());
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Released,
            ReservationStatus::Consumed,
            ReservationStatus::Expired,
            ReservationStatus::Cancelled,
            ReservationStatus::Rejected,
        ] {
            assert!(!status.can_release(), "{status}");
            assert!(!status.can_consume(), "{status}");
            assert!(!status.can_expire(), "{status}");
        }
    }

    #[test]
    fn pending_and_active_can_cancel() {
        assert!(ReservationStatus::Pending.can_cancel());
        assert!(ReservationStatus::Active.can_cancel());
        assert!(!ReservationStatus::Released.can_cancel());
        assert!(!ReservationStatus::Rejected.can_cancel());
    }

    #[test]
    fn only_active_holds_stock() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Released,
            ReservationStatus::Consumed,
            ReservationStatus::Expired,
            ReservationStatus::Cancelled,
            ReservationStatus::Rejected,
        ] {
            assert!(!status.holds_stock(), "{status}");
        }
        assert!(ReservationStatus::Active.holds_stock());
    }

    #[test]
    fn pending_and_active_claim_capacity() {
        assert!(ReservationStatus::Pending.claims_capacity());
        assert!(ReservationStatus::Active.claims_capacity());
        assert!(!ReservationStatus::Expired.claims_capacity());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(!ReservationStatus::Active.is_terminal());
        for status in [
            ReservationStatus::Released,
            ReservationStatus::Consumed,
            ReservationStatus::Expired,
            ReservationStatus::Cancelled,
            ReservationStatus::Rejected,
        ] {
            assert!(status.is_terminal(), "{status}");
        }
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&ReservationStatus::Active).unwrap();
        assert_eq!(json, "\"active\"");
    }
}
