use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{LocationId, Quantity, Reference, ReferenceKind, ReservationId, StockRecordId, Version};

use crate::reservation::Reservation;
use crate::status::ReservationStatus;
use crate::store::ReservationStore;
use crate::{ReservationStoreError, StoreResult};

const RESERVATION_COLUMNS: &str = "id, stock_record_id, location_id, quantity, reserved_by, \
     reference_kind, reference_id, expires_at, notes, status, status_reason, \
     version, created_at, updated_at";

/// PostgreSQL-backed reservation store.
#[derive(Clone)]
pub struct PostgresReservationStore {
    pool: PgPool,
}

impl PostgresReservationStore {
    /// Creates a new PostgreSQL reservation store.
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

    fn row_to_reservation(row: PgRow) -> StoreResult<Reservation> {
        let status: ReservationStatus =
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

        Ok(Reservation {
            id: ReservationId::from_uuid(row.try_get::<Uuid, _>("id")?),
            stock_record_id: StockRecordId::from_uuid(row.try_get::<Uuid, _>("stock_record_id")?),
            location_id: LocationId::from_uuid(row.try_get::<Uuid, _>("location_id")?),
            quantity: Quantity::new(row.try_get("quantity")?),
            reserved_by: row.try_get("reserved_by")?,
            reference,
            expires_at: row.try_get("expires_at")?,
            notes: row.try_get("notes")?,
            status,
            status_reason: row.try_get("status_reason")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl ReservationStore for PostgresReservationStore {
    async fn insert(&self, reservation: Reservation) -> StoreResult<Reservation> {
        sqlx::query(
            r#"
            INSERT INTO reservations
                (id, stock_record_id, location_id, quantity, reserved_by,
                 reference_kind, reference_id, expires_at, notes, status, status_reason,
                 version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(reservation.id.as_uuid())
        .bind(reservation.stock_record_id.as_uuid())
        .bind(reservation.location_id.as_uuid())
        .bind(reservation.quantity.units())
        .bind(&reservation.reserved_by)
        .bind(reservation.reference.as_ref().map(|r| r.kind.as_str()))
        .bind(reservation.reference.as_ref().map(|r| r.id.as_str()))
        .bind(reservation.expires_at)
        .bind(&reservation.notes)
        .bind(reservation.status.as_str())
        .bind(&reservation.status_reason)
        .bind(reservation.version.as_i64())
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("reservations_pkey")
            {
                return ReservationStoreError::AlreadyExists(reservation.id);
            }
            ReservationStoreError::Database(e)
        })?;

        Ok(reservation)
    }

    async fn get(&self, id: ReservationId) -> StoreResult<Option<Reservation>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_reservation).transpose()
    }

    async fn update(&self, reservation: Reservation) -> StoreResult<Reservation> {
        let row: Option<PgRow> = sqlx::query(&format!(
            r#"
            UPDATE reservations
            SET quantity = $2, status = $3, status_reason = $4, expires_at = $5,
                notes = $6, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $7
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(reservation.id.as_uuid())
        .bind(reservation.quantity.units())
        .bind(reservation.status.as_str())
        .bind(&reservation.status_reason)
        .bind(reservation.expires_at)
        .bind(&reservation.notes)
        .bind(reservation.version.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_reservation(row),
            None => match self.get(reservation.id).await? {
                Some(current) => Err(ReservationStoreError::ConcurrencyConflict {
                    reservation_id: reservation.id,
                    expected: reservation.version,
                    actual: current.version,
                }),
                None => Err(ReservationStoreError::NotFound(reservation.id)),
            },
        }
    }

    async fn list_by_stock_record(
        &self,
        stock_record_id: StockRecordId,
    ) -> StoreResult<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE stock_record_id = $1
            ORDER BY created_at ASC
            "#
        ))
        .bind(stock_record_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn list_expiring(&self, deadline: DateTime<Utc>) -> StoreResult<Vec<Reservation>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE status = 'active' AND expires_at IS NOT NULL AND expires_at < $1
            ORDER BY expires_at ASC
            "#
        ))
        .bind(deadline)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_reservation).collect()
    }
}
