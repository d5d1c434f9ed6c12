use crate::application::ports::DurableStore;
use crate::domain::value_objects::StoreRegion;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

/// SQLite-backed [`DurableStore`]. All regions share the `store_entries`
/// table, keyed by `(region, entry_key)`, with values stored as JSON text.
pub struct SqliteDurableStore {
    pool: Pool<Sqlite>,
}

impl SqliteDurableStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Opens the pool and applies pending migrations.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl DurableStore for SqliteDurableStore {
    async fn get(&self, region: StoreRegion, key: &str) -> Result<Option<Value>, AppError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM store_entries WHERE region = ? AND entry_key = ?",
        )
        .bind(region.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(text,)| serde_json::from_str(&text).map_err(Into::into))
            .transpose()
    }

    async fn set(&self, region: StoreRegion, key: &str, value: Value) -> Result<(), AppError> {
        let text = serde_json::to_string(&value)?;
        sqlx::query(
            "INSERT INTO store_entries (region, entry_key, value, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (region, entry_key)
             DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(region.as_str())
        .bind(key)
        .bind(text)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, region: StoreRegion, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM store_entries WHERE region = ? AND entry_key = ?")
            .bind(region.as_str())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn entries(&self, region: StoreRegion) -> Result<Vec<(String, Value)>, AppError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT entry_key, value FROM store_entries WHERE region = ? ORDER BY entry_key",
        )
        .bind(region.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(key, text)| {
                let value = serde_json::from_str(&text)?;
                Ok((key, value))
            })
            .collect()
    }

    async fn clear(&self, region: StoreRegion) -> Result<(), AppError> {
        sqlx::query("DELETE FROM store_entries WHERE region = ?")
            .bind(region.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
