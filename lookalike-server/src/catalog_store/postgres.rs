//! PostgreSQL implementation of the catalog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lookalike_core::{Catalog, CatalogEntry, ImageHash, LookalikeError, NewCatalogEntry};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::CatalogStoreError;

/// PostgreSQL-backed catalog.
///
/// Hashes are stored as lowercase hex text under a unique index, so
/// concurrent inserts of the same image are serialized by the database.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

/// Row type for database queries.
#[derive(FromRow)]
struct CatalogRow {
    id: Uuid,
    image_hash: String,
    locator: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CatalogRow> for CatalogEntry {
    type Error = CatalogStoreError;

    fn try_from(row: CatalogRow) -> Result<Self, Self::Error> {
        let hash = ImageHash::from_hex(&row.image_hash)
            .map_err(|e| CatalogStoreError::CorruptRow(format!("entry {}: {}", row.id, e)))?;
        Ok(Self {
            id: row.id,
            hash,
            locator: row.locator,
            created_at: row.created_at,
        })
    }
}

/// Convert rows, logging and dropping the ones whose hash does not parse.
fn entries_from_rows(rows: Vec<CatalogRow>) -> Vec<CatalogEntry> {
    rows.into_iter()
        .filter_map(|row| {
            let entry_id = row.id;
            match CatalogEntry::try_from(row) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(%entry_id, error = %e, "Skipping corrupt catalog row");
                    None
                }
            }
        })
        .collect()
}

impl PostgresCatalog {
    /// Connect to the database and run migrations.
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, CatalogStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(database_url)
            .await
            .map_err(|e| CatalogStoreError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| CatalogStoreError::Migration(e.to_string()))?;

        tracing::info!(
            max_connections,
            min_connections,
            "Catalog store connected and migrations applied"
        );

        Ok(Self { pool })
    }

    /// Create a catalog from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_all(&self) -> Result<Vec<CatalogEntry>, CatalogStoreError> {
        let rows: Vec<CatalogRow> = sqlx::query_as(
            r#"
            SELECT id, image_hash, locator, created_at
            FROM catalog_entries
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(entries_from_rows(rows))
    }

    async fn fetch_by_hash(
        &self,
        hash: &ImageHash,
    ) -> Result<Option<CatalogEntry>, CatalogStoreError> {
        let row: Option<CatalogRow> = sqlx::query_as(
            r#"
            SELECT id, image_hash, locator, created_at
            FROM catalog_entries
            WHERE image_hash = $1
            "#,
        )
        .bind(hash.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CatalogEntry::try_from).transpose()
    }

    async fn store(&self, entry: &NewCatalogEntry) -> Result<CatalogEntry, CatalogStoreError> {
        let row: Option<CatalogRow> = sqlx::query_as(
            r#"
            INSERT INTO catalog_entries (id, image_hash, locator)
            VALUES ($1, $2, $3)
            ON CONFLICT (image_hash) DO NOTHING
            RETURNING id, image_hash, locator, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.hash.as_str())
        .bind(&entry.locator)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| CatalogStoreError::Duplicate(entry.hash.to_string()))?;

        tracing::debug!(locator = %row.locator, hash = %row.image_hash, "Stored catalog entry");

        row.try_into()
    }

    async fn count_rows(&self) -> Result<i64, CatalogStoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_entries")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn find_all(&self) -> lookalike_core::Result<Vec<CatalogEntry>> {
        Ok(self.fetch_all().await?)
    }

    async fn find_by_hash(&self, hash: &ImageHash) -> lookalike_core::Result<Option<CatalogEntry>> {
        Ok(self.fetch_by_hash(hash).await?)
    }

    async fn insert(&self, entry: NewCatalogEntry) -> lookalike_core::Result<CatalogEntry> {
        Ok(self.store(&entry).await?)
    }

    async fn count(&self) -> lookalike_core::Result<usize> {
        let count = self.count_rows().await?;
        usize::try_from(count)
            .map_err(|_| LookalikeError::Storage(format!("invalid row count {}", count)))
    }
}
