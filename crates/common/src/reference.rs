//! Cross-entity references.

use serde::{Deserialize, Serialize};

/// What kind of external or internal record a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// A project consuming or reserving stock.
    Project,
    /// A sales or purchase order.
    Order,
    /// A customer record.
    Customer,
    /// The shared id that links the two legs of a stock transfer.
    Transfer,
    /// A reservation whose transition produced the referencing record.
    Reservation,
    /// Anything else; the id carries the meaning.
    Other,
}

impl ReferenceKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Project => "project",
            ReferenceKind::Order => "order",
            ReferenceKind::Customer => "customer",
            ReferenceKind::Transfer => "transfer",
            ReferenceKind::Reservation => "reservation",
            ReferenceKind::Other => "other",
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed pointer from a movement or reservation to the record that caused
/// it.
///
/// The id is an opaque string: external systems (orders, projects) use their
/// own identifier formats, and internal references store the UUID rendered
/// as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// The kind of referenced record.
    pub kind: ReferenceKind,

    /// The referenced record's identifier.
    pub id: String,
}

impl Reference {
    /// Creates a reference.
    pub fn new(kind: ReferenceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Creates a transfer-pair reference from the shared transfer id.
    pub fn transfer(id: impl Into<String>) -> Self {
        Self::new(ReferenceKind::Transfer, id)
    }

    /// Creates a reference to a reservation.
    pub fn reservation(id: impl Into<String>) -> Self {
        Self::new(ReferenceKind::Reservation, id)
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_display() {
        let r = Reference::new(ReferenceKind::Order, "SO-1042");
        assert_eq!(r.to_string(), "order:SO-1042");
    }

    #[test]
    fn reference_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ReferenceKind::Transfer).unwrap();
        assert_eq!(json, "\"transfer\"");
    }

    #[test]
    fn reference_roundtrip() {
        let r = Reference::transfer("7b9d");
        let json = serde_json::to_string(&r).unwrap();
        let back: Reference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
