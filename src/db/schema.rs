/// Schema Module
///
/// Idempotent DDL for the dataset tables. Every table has the same shape:
/// (date, hour, value) with a composite primary key and range checks.
use sqlx::PgPool;

use crate::error::EtlError;
use crate::etl::dataset::{DatasetDescriptor, ValueDerivation};

/// `CREATE TABLE IF NOT EXISTS` statement for one dataset table.
///
/// The hour check allows 24 even though transformed hours never exceed 23.
pub fn create_table_sql(dataset: &DatasetDescriptor) -> String {
    let value = dataset.value_column;
    let value_check = match dataset.derivation {
        ValueDerivation::Passthrough => format!("{} >= 0", value),
        ValueDerivation::CapacityFactor { .. } => format!("{} BETWEEN 0 AND 1", value),
    };

    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            date DATE NOT NULL,
            hour INTEGER NOT NULL CHECK (hour BETWEEN 0 AND 24),
            {value} NUMERIC NOT NULL CHECK ({value_check}),
            PRIMARY KEY (date, hour)
        )
        "#,
        table = dataset.table,
        value = value,
        value_check = value_check,
    )
}

/// Create every dataset table in one transaction; nothing is kept if any statement fails
pub async fn ensure_schema(pool: &PgPool, datasets: &[DatasetDescriptor]) -> Result<(), EtlError> {
    let mut tx = pool.begin().await.map_err(EtlError::Schema)?;

    for dataset in datasets {
        let sql = create_table_sql(dataset);
        let result = sqlx::query(&sql).execute(&mut *tx).await;

        if let Err(e) = result {
            tracing::error!("Failed to create table {}: {}", dataset.table, e);
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!("Rollback after schema failure also failed: {}", rollback_err);
            }
            return Err(EtlError::Schema(e));
        }
    }

    tx.commit().await.map_err(EtlError::Schema)?;

    tracing::info!("Schema ready ({} tables)", datasets.len());
    Ok(())
}
