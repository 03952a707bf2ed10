use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{ItemId, LocationId, MovementId, Quantity, Reference, ReferenceKind};

use crate::journal::{MovementJournal, MovementQuery, validate_movement};
use crate::movement::{Movement, MovementStatus, MovementType};
use crate::Result;

const MOVEMENT_COLUMNS: &str = "id, movement_type, status, item_id, location_id, quantity, \
     source_location_id, destination_location_id, reference_kind, reference_id, \
     reason, performed_by, created_at, processed_at";

/// PostgreSQL-backed movement journal.
///
/// The movements table carries no UPDATE or DELETE path; the only write is
/// the INSERT in [`MovementJournal::append`].
#[derive(Clone)]
pub struct PostgresMovementJournal {
    pool: PgPool,
}

impl PostgresMovementJournal {
    /// Creates a new PostgreSQL movement journal.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_movement(row: PgRow) -> Result<Movement> {
        let movement_type: MovementType =
            serde_json::from_value(serde_json::Value::String(row.try_get("movement_type")?))?;
        let status: MovementStatus =
            serde_json::from_value(serde_json::Value::String(row.try_get("status")?))?;

        let reference = match (
            row.try_get::<Option<String>, _>("reference_kind")?,
            row.try_get::<Option<String>, _>("reference_id")?,
        ) {
            (Some(kind), Some(id)) => {
                let kind: ReferenceKind = serde_json::from_value(serde_json::Value::String(kind))?;
                Some(Reference::new(kind, id))
            }
            _ => None,
        };

        Ok(Movement {
            id: MovementId::from_uuid(row.try_get::<Uuid, _>("id")?),
            movement_type,
            status,
            item_id: ItemId::from_uuid(row.try_get::<Uuid, _>("item_id")?),
            location_id: LocationId::from_uuid(row.try_get::<Uuid, _>("location_id")?),
            quantity: Quantity::new(row.try_get("quantity")?),
            source_location_id: row
                .try_get::<Option<Uuid>, _>("source_location_id")?
                .map(LocationId::from_uuid),
            destination_location_id: row
                .try_get::<Option<Uuid>, _>("destination_location_id")?
                .map(LocationId::from_uuid),
            reference,
            reason: row.try_get("reason")?,
            performed_by: row.try_get("performed_by")?,
            created_at: row.try_get("created_at")?,
            processed_at: row.try_get("processed_at")?,
        })
    }
}

#[async_trait]
impl MovementJournal for PostgresMovementJournal {
    async fn append(&self, movement: Movement) -> Result<Movement> {
        validate_movement(&movement)?;

        sqlx::query(
            r#"
            INSERT INTO movements
                (id, movement_type, status, item_id, location_id, quantity,
                 source_location_id, destination_location_id, reference_kind, reference_id,
                 reason, performed_by, created_at, processed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(movement.id.as_uuid())
        .bind(movement.movement_type.as_str())
        .bind(movement.status.as_str())
        .bind(movement.item_id.as_uuid())
        .bind(movement.location_id.as_uuid())
        .bind(movement.quantity.units())
        .bind(movement.source_location_id.map(|id| id.as_uuid()))
        .bind(movement.destination_location_id.map(|id| id.as_uuid()))
        .bind(movement.reference.as_ref().map(|r| r.kind.as_str()))
        .bind(movement.reference.as_ref().map(|r| r.id.as_str()))
        .bind(&movement.reason)
        .bind(&movement.performed_by)
        .bind(movement.created_at)
        .bind(movement.processed_at)
        .execute(&self.pool)
        .await?;

        Ok(movement)
    }

    async fn get(&self, id: MovementId) -> Result<Option<Movement>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_movement).transpose()
    }

    async fn query(&self, query: MovementQuery) -> Result<Vec<Movement>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM movements
            WHERE ($1::uuid IS NULL OR item_id = $1)
              AND ($2::uuid IS NULL OR location_id = $2)
              AND ($3::text IS NULL OR movement_type = $3)
              AND ($4::text IS NULL OR (reference_kind = $4 AND reference_id = $5))
            ORDER BY created_at DESC, id DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(query.item_id.map(|id| id.as_uuid()))
        .bind(query.location_id.map(|id| id.as_uuid()))
        .bind(query.movement_type.map(|t| t.as_str()))
        .bind(query.reference.as_ref().map(|r| r.kind.as_str()))
        .bind(query.reference.as_ref().map(|r| r.id.as_str()))
        .bind(query.limit.map(|l| l as i64).unwrap_or(i64::MAX))
        .bind(query.offset.unwrap_or(0) as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_movement).collect()
    }
}
