/// ETL Module
///
/// The per-dataset stages of the pipeline:
/// - Extract: read a workbook sheet or CSV file into a `SourceTable`
/// - Transform: validate columns and derive normalized hourly records
/// - Load: upsert the records into the dataset's PostgreSQL table
pub mod dataset;
pub mod extract;
pub mod load;
pub mod transform;
