//! Collaborator lookup ports.
//!
//! The catalog and location registry live outside the core; the
//! orchestrator only reads them, for validation and for the per-location
//! negative-stock policy. In-memory implementations back the tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use common::{ItemId, LocationId};

/// A lookup collaborator failed to answer.
#[derive(Debug, Error)]
#[error("Lookup failed: {0}")]
pub struct LookupError(pub String);

/// Catalog data for an item that exists.
#[derive(Debug, Clone)]
pub struct ResolvedItem {
    /// Name for display and error messages.
    pub display_name: String,
}

/// Registry data for a location that exists.
#[derive(Debug, Clone)]
pub struct ResolvedLocation {
    /// Whether this location may run negative or over-reserved stock.
    /// The single override switch for the stock invariants.
    pub allows_negative_stock: bool,

    /// Parent location in the location tree, if any.
    pub parent_id: Option<LocationId>,
}

/// Read-only view of the item catalog.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Resolves an item, or `None` if the catalog does not know it.
    async fn resolve_item(
        &self,
        item_id: ItemId,
    ) -> std::result::Result<Option<ResolvedItem>, LookupError>;
}

/// Read-only view of the location registry.
#[async_trait]
pub trait LocationLookup: Send + Sync {
    /// Resolves a location, or `None` if the registry does not know it.
    async fn resolve_location(
        &self,
        location_id: LocationId,
    ) -> std::result::Result<Option<ResolvedLocation>, LookupError>;
}

#[derive(Debug, Default)]
struct CatalogState {
    items: HashMap<ItemId, ResolvedItem>,
    fail_lookups: bool,
}

/// In-memory catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an item and returns its id.
    pub fn register(&self, display_name: impl Into<String>) -> ItemId {
        let item_id = ItemId::new();
        self.state.write().unwrap().items.insert(
            item_id,
            ResolvedItem {
                display_name: display_name.into(),
            },
        );
        item_id
    }

    /// Configures the catalog to fail every lookup.
    pub fn set_fail_lookups(&self, fail: bool) {
        self.state.write().unwrap().fail_lookups = fail;
    }
}

#[async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn resolve_item(
        &self,
        item_id: ItemId,
    ) -> std::result::Result<Option<ResolvedItem>, LookupError> {
        let state = self.state.read().unwrap();
        if state.fail_lookups {
            return Err(LookupError("catalog unavailable".to_string()));
        }
        Ok(state.items.get(&item_id).cloned())
    }
}

#[derive(Debug, Default)]
struct LocationState {
    locations: HashMap<LocationId, ResolvedLocation>,
    fail_lookups: bool,
}

/// In-memory location registry for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocations {
    state: Arc<RwLock<LocationState>>,
}

impl InMemoryLocations {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a location with the default policy and returns its id.
    pub fn register(&self) -> LocationId {
        self.register_with(false, None)
    }

    /// Registers a location that allows negative stock.
    pub fn register_negative_allowed(&self) -> LocationId {
        self.register_with(true, None)
    }

    /// Registers a location with an explicit policy and parent.
    pub fn register_with(
        &self,
        allows_negative_stock: bool,
        parent_id: Option<LocationId>,
    ) -> LocationId {
        let location_id = LocationId::new();
        self.state.write().unwrap().locations.insert(
            location_id,
            ResolvedLocation {
                allows_negative_stock,
                parent_id,
            },
        );
        location_id
    }

    /// Configures the registry to fail every lookup.
    pub fn set_fail_lookups(&self, fail: bool) {
        self.state.write().unwrap().fail_lookups = fail;
    }
}

#[async_trait]
impl LocationLookup for InMemoryLocations {
    async fn resolve_location(
        &self,
        location_id: LocationId,
    ) -> std::result::Result<Option<ResolvedLocation>, LookupError> {
        let state = self.state.read().unwrap();
        if state.fail_lookups {
            return Err(LookupError("location registry unavailable".to_string()));
        }
        Ok(state.locations.get(&location_id).cloned())
    }
}
