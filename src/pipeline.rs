/// Pipeline Module
///
/// Orchestrates the complete ETL run: connect → schema → (extract → transform → load) per
/// dataset → close. A failing dataset is recorded and the next one still runs; only
/// connection and schema errors end the run early.
use std::path::Path;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::{Config, DatasetSource};
use crate::db::{Database, RecordStore};
use crate::error::EtlError;
use crate::etl::dataset::DatasetDescriptor;
use crate::etl::{extract, transform};
use crate::models::DatasetKind;

/// What happened to one dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetOutcome {
    Loaded { rows_read: usize, records: usize, rows_written: u64 },
    Skipped { reason: String },
    Failed { kind: String, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    pub dataset: DatasetKind,
    pub table: String,
    pub source: Option<String>,
    #[serde(flatten)]
    pub outcome: DatasetOutcome,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

/// Pipeline execution summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub datasets: Vec<DatasetReport>,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.datasets.iter().filter(|r| matches!(r.outcome, DatasetOutcome::Failed { .. })).count()
    }

    pub fn loaded(&self) -> usize {
        self.datasets.iter().filter(|r| matches!(r.outcome, DatasetOutcome::Loaded { .. })).count()
    }

    pub fn skipped(&self) -> usize {
        self.datasets.iter().filter(|r| matches!(r.outcome, DatasetOutcome::Skipped { .. })).count()
    }

    pub fn rows_written(&self) -> u64 {
        self.datasets
            .iter()
            .map(|r| match r.outcome {
                DatasetOutcome::Loaded { rows_written, .. } => rows_written,
                _ => 0,
            })
            .sum()
    }
}

fn serialize_secs<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Configuration for pipeline execution
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub solar_capacity_mw: Decimal,
    pub wind_capacity_mw: Decimal,
    pub batch_size: usize,
    pub sources: Vec<DatasetSource>,
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            solar_capacity_mw: config.solar_capacity_mw,
            wind_capacity_mw: config.wind_capacity_mw,
            batch_size: config.batch_size,
            sources: config.sources.clone(),
        }
    }
}

/// Connect, run every configured dataset, and always close the connection
pub async fn run(config: &Config) -> Result<RunSummary, EtlError> {
    println!("\n💾 Connecting to PostgreSQL database...");
    let database = Database::connect(&config.database_url).await?;
    println!("✅ Database connected successfully!");

    run_with(&database, PipelineConfig::from(config)).await
}

/// Run the pipeline against an open store, closing it on every exit path
pub async fn run_with<S: RecordStore + Sync>(store: &S, config: PipelineConfig) -> Result<RunSummary, EtlError> {
    let result = Pipeline::new(store, config).run().await;

    store.close().await;
    result
}

/// Main ETL Pipeline
pub struct Pipeline<'a, S: RecordStore> {
    store: &'a S,
    config: PipelineConfig,
}

impl<'a, S: RecordStore + Sync> Pipeline<'a, S> {
    pub fn new(store: &'a S, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    fn descriptor(&self, kind: DatasetKind) -> DatasetDescriptor {
        DatasetDescriptor::for_kind(kind, self.config.solar_capacity_mw, self.config.wind_capacity_mw)
    }

    /// Run the pipeline over every configured dataset
    pub async fn run(&self) -> Result<RunSummary, EtlError> {
        let start_time = Instant::now();
        let mut summary = RunSummary::default();

        // All tables are created even for datasets without a source this run
        let descriptors: Vec<DatasetDescriptor> = DatasetKind::ALL.iter().map(|kind| self.descriptor(*kind)).collect();

        println!("📋 Ensuring database schema...");
        self.store.ensure_schema(&descriptors).await?;

        println!("\n🚀 Starting ETL Pipeline...");
        println!("   📦 Batch size: {} rows per statement", self.config.batch_size);

        for source in &self.config.sources {
            let descriptor = self.descriptor(source.kind);
            let report = self.process_dataset(source, &descriptor).await?;
            print_report(&report);
            summary.datasets.push(report);
        }

        summary.elapsed = start_time.elapsed();

        println!("\n✅ Pipeline complete!");
        print_final_stats(&summary);

        Ok(summary)
    }

    /// Extract, transform and load one dataset. Dataset-level errors become a `Failed` outcome;
    /// fatal ones (a lost connection) are returned and end the run.
    async fn process_dataset(
        &self,
        source: &DatasetSource,
        dataset: &DatasetDescriptor,
    ) -> Result<DatasetReport, EtlError> {
        let started = Instant::now();
        let name = dataset.name();

        let outcome = match &source.path {
            None => {
                tracing::info!("{}: no source file configured, skipping", name);
                DatasetOutcome::Skipped { reason: "no source file configured".to_string() }
            }
            Some(path) if !path.exists() => {
                tracing::warn!("{}: source file {} not found, skipping", name, path.display());
                DatasetOutcome::Skipped { reason: format!("source file {} not found", path.display()) }
            }
            Some(path) => match self.load_dataset(path, source.sheet.as_deref(), dataset).await {
                Ok(outcome) => outcome,
                Err(e) if e.is_fatal() => {
                    tracing::error!("{} aborted the run ({}): {}", name, e.kind(), e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("{} failed ({}): {}", name, e.kind(), e);
                    DatasetOutcome::Failed { kind: e.kind().to_string(), message: e.to_string() }
                }
            },
        };

        Ok(DatasetReport {
            dataset: dataset.kind,
            table: dataset.table.to_string(),
            source: source.path.as_ref().map(|p| p.display().to_string()),
            outcome,
            elapsed: started.elapsed(),
        })
    }

    async fn load_dataset(
        &self,
        path: &Path,
        sheet: Option<&str>,
        dataset: &DatasetDescriptor,
    ) -> Result<DatasetOutcome, EtlError> {
        let name = dataset.name();
        tracing::info!("{}: reading {}", name, path.display());

        let table = extract::read_source(path, sheet, name)?;
        let output = transform::transform(&table, dataset)?;

        tracing::info!("{}: {} rows read, {} records to write", name, output.rows_read, output.records.len());

        let rows_written = self.store.upsert(dataset, &output.records, self.config.batch_size).await?;

        Ok(DatasetOutcome::Loaded { rows_read: output.rows_read, records: output.records.len(), rows_written })
    }
}

fn print_report(report: &DatasetReport) {
    match &report.outcome {
        DatasetOutcome::Loaded { rows_read, records, rows_written } => println!(
            "   ✅ {} → {}: {} rows read, {} records, {} rows upserted ({:.2}s)",
            report.dataset,
            report.table,
            rows_read,
            records,
            rows_written,
            report.elapsed.as_secs_f64()
        ),
        DatasetOutcome::Skipped { reason } => println!("   ⏭️  {} skipped: {}", report.dataset, reason),
        DatasetOutcome::Failed { kind, message } => {
            println!("   ❌ {} failed [{}]: {}", report.dataset, kind, message)
        }
    }
}

/// Print final statistics
fn print_final_stats(summary: &RunSummary) {
    println!("\n📊 Pipeline Statistics:");
    println!("   ⏱️  Total time: {:.2}s", summary.elapsed.as_secs_f64());
    println!(
        "   📦 Datasets: {} loaded, {} skipped, {} failed",
        summary.loaded(),
        summary.skipped(),
        summary.failed()
    );
    println!("   💾 Rows upserted: {}", summary.rows_written());
}
