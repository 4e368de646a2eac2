/// Load Module
///
/// Handles storing transformed records into the PostgreSQL database.
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::config::MAX_BATCH_SIZE;
use crate::error::EtlError;
use crate::etl::dataset::DatasetDescriptor;
use crate::models::HourlyRecord;

/// Build one multi-row upsert statement for a slice of records.
///
/// Uses UPSERT logic (ON CONFLICT DO UPDATE) so re-running over revised source data
/// always leaves the latest figures in the table.
pub fn upsert_query(dataset: &DatasetDescriptor, records: &[HourlyRecord]) -> QueryBuilder<'static, Postgres> {
    let mut builder =
        QueryBuilder::new(format!("INSERT INTO {} (date, hour, {}) ", dataset.table, dataset.value_column));

    builder.push_values(records, |mut b, record| {
        b.push_bind(record.date).push_bind(record.hour).push_bind(record.value);
    });

    builder.push(format!(
        " ON CONFLICT (date, hour) DO UPDATE SET {column} = EXCLUDED.{column}",
        column = dataset.value_column
    ));

    builder
}

/// Upsert every record of a dataset within a single database transaction
///
/// Records are split into statements of at most `batch_size` rows (bounded by the bind
/// parameter limit). Either all chunks commit or the whole dataset rolls back.
///
/// Returns the number of rows inserted or updated.
pub async fn upsert(
    pool: &PgPool,
    dataset: &DatasetDescriptor,
    records: &[HourlyRecord],
    batch_size: usize,
) -> Result<u64, EtlError> {
    if records.is_empty() {
        tracing::info!("{}: nothing to write", dataset.name());
        return Ok(0);
    }

    let name = dataset.name();
    let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);

    // Start a database transaction
    let mut tx = pool.begin().await.map_err(|e| EtlError::from_write(name, dataset.table, e))?;

    let mut rows_written = 0;

    for (index, chunk) in records.chunks(batch_size).enumerate() {
        let mut builder = upsert_query(dataset, chunk);
        let result = builder.build().execute(&mut *tx).await;

        match result {
            Ok(done) => {
                rows_written += done.rows_affected();
                tracing::debug!("{}: chunk {} wrote {} rows", name, index + 1, done.rows_affected());
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("{}: rollback failed: {}", name, rollback_err);
                }
                return Err(EtlError::from_write(name, dataset.table, e));
            }
        }
    }

    // Commit the transaction
    tx.commit().await.map_err(|e| EtlError::from_write(name, dataset.table, e))?;

    tracing::info!("{}: upserted {} rows into {}", name, rows_written, dataset.table);
    Ok(rows_written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn record(day: u32, hour: i32) -> HourlyRecord {
        HourlyRecord::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), hour, dec!(8500))
    }

    #[test]
    fn test_upsert_statement_shape() {
        let records = vec![record(1, 0), record(1, 1)];
        let builder = upsert_query(&DatasetDescriptor::load(), &records);
        let sql = builder.sql();

        assert!(sql.starts_with("INSERT INTO load_curves (date, hour, load_mw) VALUES "));
        assert!(sql.contains("$6"));
        assert!(!sql.contains("$7"));
        assert!(sql.ends_with("ON CONFLICT (date, hour) DO UPDATE SET load_mw = EXCLUDED.load_mw"));
        assert!(!sql.contains("DO NOTHING"));
    }

    #[test]
    fn test_generation_upsert_updates_factor() {
        let records = vec![record(2, 12)];
        let builder = upsert_query(&DatasetDescriptor::solar(dec!(7345.4)), &records);

        assert!(builder.sql().starts_with("INSERT INTO solar_generation (date, hour, generation_factor) VALUES "));
        assert!(builder.sql().contains("SET generation_factor = EXCLUDED.generation_factor"));
    }
}
