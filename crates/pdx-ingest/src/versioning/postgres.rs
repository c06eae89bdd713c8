//! PostgreSQL document store
//!
//! Versions live in `partner_versions`. A partial unique index on
//! `entity_id WHERE status = 'active'` keeps a second active version out at
//! the storage level, and [`DocumentStore::supersede`] runs in a single
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

use super::store::DocumentStore;
use super::types::{StoredVersion, VersionStatus};
use crate::config::DatabaseConfig;
use crate::error::{IngestError, Result};

#[derive(Debug, sqlx::FromRow)]
struct VersionRow {
    id: Uuid,
    entity_id: String,
    record: serde_json::Value,
    locations: Vec<String>,
    version: i32,
    status: Option<String>,
    last_modified: DateTime<Utc>,
}

impl TryFrom<VersionRow> for StoredVersion {
    type Error = IngestError;

    fn try_from(row: VersionRow) -> Result<Self> {
        Ok(StoredVersion {
            id: row.id,
            entity_id: row.entity_id,
            record: serde_json::from_value(row.record)?,
            locations: row.locations.into_iter().collect(),
            version: u32::try_from(row.version)
                .map_err(|_| IngestError::Store(format!("Invalid version {}", row.version)))?,
            status: row.status.as_deref().unwrap_or_default().parse()?,
            last_modified: row.last_modified,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, entity_id, record, locations, version, status, last_modified FROM partner_versions";

/// Turn a unique-index violation into a per-record store error
fn map_conflict(error: sqlx::Error, entity_id: &str) -> IngestError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.is_unique_violation() {
            return IngestError::Store(format!(
                "Concurrent active version for {entity_id}: {db_err}"
            ));
        }
    }
    IngestError::Database(error)
}

/// [`DocumentStore`] backed by PostgreSQL
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        info!(max_connections = config.max_connections, "Database connection pool created");
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn insert_with<'e, E>(executor: E, version: &StoredVersion) -> Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let record = serde_json::to_value(&version.record)?;
    let locations: Vec<String> = version.locations.iter().cloned().collect();

    sqlx::query(
        r#"
        INSERT INTO partner_versions
            (id, entity_id, record, locations, version, status, last_modified)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(version.id)
    .bind(&version.entity_id)
    .bind(record)
    .bind(locations)
    .bind(version.version as i32)
    .bind(version.status.as_str())
    .bind(version.last_modified)
    .execute(executor)
    .await
    .map_err(|e| map_conflict(e, &version.entity_id))?;

    Ok(())
}

async fn retire_with<'e, E>(executor: E, id: Uuid, at: DateTime<Utc>) -> Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE partner_versions
        SET status = $2, last_modified = $3
        WHERE id = $1 AND status = 'active'
        "#,
    )
    .bind(id)
    .bind(VersionStatus::Retired.as_str())
    .bind(at)
    .execute(executor)
    .await?;

    if result.rows_affected() != 1 {
        return Err(IngestError::Store(format!("No active document {id}")));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_active(&self, entity_id: &str) -> Result<Option<StoredVersion>> {
        let row: Option<VersionRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE entity_id = $1 AND status = 'active'"
        ))
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoredVersion::try_from).transpose()
    }

    async fn insert(&self, version: &StoredVersion) -> Result<()> {
        insert_with(&self.pool, version).await
    }

    async fn set_locations(
        &self,
        id: Uuid,
        locations: &BTreeSet<String>,
        last_modified: DateTime<Utc>,
    ) -> Result<()> {
        let locations: Vec<String> = locations.iter().cloned().collect();
        let result = sqlx::query(
            "UPDATE partner_versions SET locations = $2, last_modified = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(locations)
        .bind(last_modified)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() != 1 {
            return Err(IngestError::Store(format!("No document {id}")));
        }
        Ok(())
    }

    async fn supersede(&self, old_id: Uuid, successor: &StoredVersion) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        retire_with(&mut *tx, old_id, successor.last_modified).await?;
        insert_with(&mut *tx, successor).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn history(&self, entity_id: &str) -> Result<Vec<StoredVersion>> {
        let rows: Vec<VersionRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE entity_id = $1 ORDER BY version"))
                .bind(entity_id)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(StoredVersion::try_from).collect()
    }
}
