use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use common::{ItemId, LocationId, Quantity, StockRecordId, Version};

use crate::record::{NewStockRecord, StockKey, StockMeta, StockRecord};
use crate::store::{StockFilter, StockPolicy, StockStore};
use crate::{Result, StockStoreError};

const RECORD_COLUMNS: &str = "id, item_id, location_id, lot_number, serial_number, \
     expiration_date, on_hand, reserved, meta, version, created_at, updated_at";

/// PostgreSQL-backed stock record store.
///
/// Every mutation is a single guarded UPDATE: the optimistic version check
/// and the `on_hand >= reserved` invariant both live in the WHERE clause, so
/// concurrent writers can never observe a half-applied change. When the
/// UPDATE matches no row, the record is re-read once to decide whether the
/// failure was a missing record, a stale version, or an invariant violation.
#[derive(Clone)]
pub struct PostgresStockStore {
    pool: PgPool,
}

impl PostgresStockStore {
    /// Creates a new PostgreSQL stock store.
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

    fn row_to_record(row: PgRow) -> Result<StockRecord> {
        let meta_json: serde_json::Value = row.try_get("meta")?;
        let meta: StockMeta = serde_json::from_value(meta_json)?;

        Ok(StockRecord {
            id: StockRecordId::from_uuid(row.try_get::<Uuid, _>("id")?),
            item_id: ItemId::from_uuid(row.try_get::<Uuid, _>("item_id")?),
            location_id: LocationId::from_uuid(row.try_get::<Uuid, _>("location_id")?),
            lot_number: row.try_get("lot_number")?,
            serial_number: row.try_get("serial_number")?,
            expiration_date: row.try_get("expiration_date")?,
            on_hand: Quantity::new(row.try_get("on_hand")?),
            reserved: Quantity::new(row.try_get("reserved")?),
            meta,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Explains a guarded UPDATE that matched no row.
    async fn classify_failed_write(
        &self,
        id: StockRecordId,
        expected_version: Version,
        violation: impl FnOnce(&StockRecord) -> StockStoreError,
    ) -> StockStoreError {
        match self.get_by_id(id).await {
            Ok(Some(record)) => {
                if record.version != expected_version {
                    StockStoreError::ConcurrencyConflict {
                        record_id: id,
                        expected: expected_version,
                        actual: record.version,
                    }
                } else {
                    violation(&record)
                }
            }
            Ok(None) => StockStoreError::RecordNotFound(id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl StockStore for PostgresStockStore {
    async fn get(&self, key: &StockKey) -> Result<Option<StockRecord>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM stock_records
            WHERE item_id = $1
              AND location_id = $2
              AND lot_number IS NOT DISTINCT FROM $3
              AND serial_number IS NOT DISTINCT FROM $4
            "#
        ))
        .bind(key.item_id.as_uuid())
        .bind(key.location_id.as_uuid())
        .bind(&key.lot_number)
        .bind(&key.serial_number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn get_by_id(&self, id: StockRecordId) -> Result<Option<StockRecord>> {
        let row: Option<PgRow> = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM stock_records WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn list(&self, filter: StockFilter) -> Result<Vec<StockRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM stock_records
            WHERE ($1::uuid IS NULL OR item_id = $1)
              AND ($2::uuid IS NULL OR location_id = $2)
              AND ($3::text IS NULL OR lot_number = $3)
            ORDER BY created_at ASC
            "#
        ))
        .bind(filter.item_id.map(|id| id.as_uuid()))
        .bind(filter.location_id.map(|id| id.as_uuid()))
        .bind(&filter.lot_number)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn create_if_absent(&self, new: NewStockRecord) -> Result<StockRecord> {
        if new.initial_on_hand.is_negative() {
            return Err(StockStoreError::InvalidQuantity {
                quantity: new.initial_on_hand,
            });
        }

        let record = new.into_record(chrono::Utc::now());
        let meta_json = serde_json::to_value(&record.meta)?;

        let inserted: Option<PgRow> = sqlx::query(&format!(
            r#"
            INSERT INTO stock_records
                (id, item_id, location_id, lot_number, serial_number,
                 expiration_date, on_hand, reserved, meta, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (item_id, location_id, (COALESCE(lot_number, '')), (COALESCE(serial_number, '')))
                DO NOTHING
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(record.id.as_uuid())
        .bind(record.item_id.as_uuid())
        .bind(record.location_id.as_uuid())
        .bind(&record.lot_number)
        .bind(&record.serial_number)
        .bind(record.expiration_date)
        .bind(record.on_hand.units())
        .bind(record.reserved.units())
        .bind(meta_json)
        .bind(record.version.as_i64())
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Self::row_to_record(row);
        }

        // Lost the race: another writer holds the key. Idempotent only when
        // the existing record matches the requested quantity.
        let key = record.key();
        match self.get(&key).await? {
            Some(existing) if existing.on_hand == record.on_hand => Ok(existing),
            Some(_) => Err(StockStoreError::DuplicateKey { key }),
            None => Err(StockStoreError::DuplicateKey { key }),
        }
    }

    async fn apply_delta(
        &self,
        id: StockRecordId,
        delta: Quantity,
        expected_version: Version,
        policy: StockPolicy,
    ) -> Result<StockRecord> {
        if delta.is_zero() {
            return Err(StockStoreError::InvalidQuantity { quantity: delta });
        }

        let row: Option<PgRow> = sqlx::query(&format!(
            r#"
            UPDATE stock_records
            SET on_hand = on_hand + $2, version = version + 1, updated_at = NOW()
            WHERE id = $1
              AND version = $3
              AND ($4 OR on_hand + $2 >= reserved)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(delta.units())
        .bind(expected_version.as_i64())
        .bind(policy.allow_negative)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_record(row),
            None => Err(self
                .classify_failed_write(id, expected_version, |record| {
                    StockStoreError::InsufficientStock {
                        record_id: id,
                        on_hand: record.on_hand,
                        reserved: record.reserved,
                        requested: delta,
                    }
                })
                .await),
        }
    }

    async fn set_reserved(
        &self,
        id: StockRecordId,
        new_reserved: Quantity,
        expected_version: Version,
        policy: StockPolicy,
    ) -> Result<StockRecord> {
        if new_reserved.is_negative() {
            return Err(StockStoreError::InvalidQuantity {
                quantity: new_reserved,
            });
        }

        let row: Option<PgRow> = sqlx::query(&format!(
            r#"
            UPDATE stock_records
            SET reserved = $2, version = version + 1, updated_at = NOW()
            WHERE id = $1
              AND version = $3
              AND ($4 OR on_hand >= $2)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(new_reserved.units())
        .bind(expected_version.as_i64())
        .bind(policy.allow_negative)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_record(row),
            None => Err(self
                .classify_failed_write(id, expected_version, |record| {
                    StockStoreError::OverReservation {
                        record_id: id,
                        on_hand: record.on_hand,
                        requested: new_reserved,
                    }
                })
                .await),
        }
    }

    async fn debit_reserved(
        &self,
        id: StockRecordId,
        quantity: Quantity,
        expected_version: Version,
        policy: StockPolicy,
    ) -> Result<StockRecord> {
        if !quantity.is_positive() {
            return Err(StockStoreError::InvalidQuantity { quantity });
        }

        let row: Option<PgRow> = sqlx::query(&format!(
            r#"
            UPDATE stock_records
            SET on_hand = on_hand - $2, reserved = reserved - $2,
                version = version + 1, updated_at = NOW()
            WHERE id = $1
              AND version = $3
              AND reserved >= $2
              AND ($4 OR on_hand - $2 >= reserved - $2)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(quantity.units())
        .bind(expected_version.as_i64())
        .bind(policy.allow_negative)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_record(row),
            None => Err(self
                .classify_failed_write(id, expected_version, |record| {
                    if record.reserved < quantity {
                        StockStoreError::InvalidQuantity { quantity }
                    } else {
                        StockStoreError::InsufficientStock {
                            record_id: id,
                            on_hand: record.on_hand,
                            reserved: record.reserved,
                            requested: -quantity,
                        }
                    }
                })
                .await),
        }
    }

    async fn remove(&self, id: StockRecordId, expected_version: Version) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM stock_records
            WHERE id = $1 AND version = $2 AND on_hand = 0 AND reserved = 0
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected_version.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // Reservation rows reference the record, so the FK rejects the delete.
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return StockStoreError::RecordInUse { record_id: id };
            }
            StockStoreError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(self
                .classify_failed_write(id, expected_version, |_| StockStoreError::RecordInUse {
                    record_id: id,
                })
                .await);
        }

        Ok(())
    }
}
