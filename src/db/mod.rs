/// Database Module
///
/// This module handles all PostgreSQL database operations including:
/// - Connection management (a single connection per run)
/// - Schema initialization
/// - The `RecordStore` seam the pipeline writes through
pub mod schema;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::EtlError;
use crate::etl::dataset::DatasetDescriptor;
use crate::etl::load;
use crate::models::HourlyRecord;

/// Storage operations the pipeline driver depends on
#[async_trait]
pub trait RecordStore {
    /// Create the dataset tables if they do not exist yet
    async fn ensure_schema(&self, datasets: &[DatasetDescriptor]) -> Result<(), EtlError>;

    /// Upsert one dataset's records atomically, returning the number of rows written
    async fn upsert(
        &self,
        dataset: &DatasetDescriptor,
        records: &[HourlyRecord],
        batch_size: usize,
    ) -> Result<u64, EtlError>;

    /// Release the connection. Safe to call more than once.
    async fn close(&self);
}

pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open a single PostgreSQL connection and verify it answers
    pub async fn connect(database_url: &str) -> Result<Self, EtlError> {
        if database_url.trim().is_empty() {
            return Err(EtlError::Config("database connection string is empty".to_string()));
        }

        let pool =
            PgPoolOptions::new().max_connections(1).connect(database_url).await.map_err(EtlError::Connection)?;

        let database = Self { pool };
        database.test_connection().await?;

        tracing::info!("Connected to PostgreSQL");
        Ok(database)
    }

    /// Test the database connection
    pub async fn test_connection(&self) -> Result<(), EtlError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(EtlError::Connection)?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for Database {
    async fn ensure_schema(&self, datasets: &[DatasetDescriptor]) -> Result<(), EtlError> {
        schema::ensure_schema(&self.pool, datasets).await
    }

    async fn upsert(
        &self,
        dataset: &DatasetDescriptor,
        records: &[HourlyRecord],
        batch_size: usize,
    ) -> Result<u64, EtlError> {
        load::upsert(&self.pool, dataset, records, batch_size).await
    }

    async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            tracing::info!("Database connection closed");
        }
    }
}
