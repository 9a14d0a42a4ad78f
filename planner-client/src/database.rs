use async_trait::async_trait;
use planner_core::SyncResult;
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

use crate::queries::Queries;

/// String key-value persistence underneath the to-do cache.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> SyncResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> SyncResult<()>;
    async fn remove(&self, key: &str) -> SyncResult<()>;
}

pub struct ClientDatabase {
    pub pool: SqlitePool,
}

impl ClientDatabase {
    pub async fn new(database_url: &str) -> SyncResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Opens the database and brings the schema up to date.
    pub async fn open(database_url: &str) -> SyncResult<Self> {
        let db = Self::new(database_url).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> SyncResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for ClientDatabase {
    async fn get(&self, key: &str) -> SyncResult<Option<String>> {
        let row = sqlx::query(Queries::GET_VALUE)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        sqlx::query(Queries::UPSERT_VALUE)
            .bind(key)
            .bind(value)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> SyncResult<()> {
        sqlx::query(Queries::DELETE_VALUE)
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
