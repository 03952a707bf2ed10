use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use common::MovementId;

use crate::journal::{MovementJournal, MovementQuery, validate_movement};
use crate::movement::Movement;
use crate::Result;

/// In-memory movement journal for testing.
///
/// Entries are kept in append order; listings walk the log backwards so
/// results come out newest first, matching the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryMovementJournal {
    movements: Arc<RwLock<Vec<Movement>>>,
}

impl InMemoryMovementJournal {
    /// Creates a new empty in-memory journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of entries.
    pub async fn movement_count(&self) -> usize {
        self.movements.read().await.len()
    }

    /// Clears all entries.
    pub async fn clear(&self) {
        self.movements.write().await.clear();
    }
}

#[async_trait]
impl MovementJournal for InMemoryMovementJournal {
    async fn append(&self, movement: Movement) -> Result<Movement> {
        validate_movement(&movement)?;

        let mut log = self.movements.write().await;
        log.push(movement.clone());
        Ok(movement)
    }

    async fn get(&self, id: MovementId) -> Result<Option<Movement>> {
        let log = self.movements.read().await;
        Ok(log.iter().find(|m| m.id == id).cloned())
    }

    async fn query(&self, query: MovementQuery) -> Result<Vec<Movement>> {
        let log = self.movements.read().await;
        let movements = log
            .iter()
            .rev()
            .filter(|m| query.matches(m))
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(movements)
    }
}
