/// Grid ETL
///
/// An ETL pipeline that loads hourly electrical load, solar and wind generation
/// spreadsheets into PostgreSQL.
mod cli;
mod config;
mod db;
mod error;
mod etl;
mod models;
mod pipeline;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use config::Config;
use pipeline::RunSummary;

/// Exit code when at least one dataset failed but the run itself completed
const EXIT_DATASET_FAILURE: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    cli.validate()?;

    println!("🚀 Starting Grid ETL...");

    // Resolve configuration before touching any file or the database
    let config = Config::from_env(&cli).context("Invalid configuration")?;

    println!("⚡ Solar capacity: {} MW", config.solar_capacity_mw);
    println!("🌬️  Wind capacity: {} MW", config.wind_capacity_mw);

    let summary = pipeline::run(&config).await.context("Pipeline execution failed")?;

    if cli.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary).context("Failed to serialize run summary")?);
    }

    tracing::info!("Grid ETL finished in {:.2}s", summary.elapsed.as_secs_f64());

    Ok(ExitCode::from(exit_code(&summary)))
}

fn exit_code(summary: &RunSummary) -> u8 {
    if summary.failed() > 0 {
        EXIT_DATASET_FAILURE
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatasetKind;
    use crate::pipeline::{DatasetOutcome, DatasetReport};
    use std::time::Duration;

    fn report(outcome: DatasetOutcome) -> DatasetReport {
        DatasetReport {
            dataset: DatasetKind::Load,
            table: "load_curves".to_string(),
            source: None,
            outcome,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_exit_code_reflects_dataset_failures() {
        let ok = RunSummary {
            datasets: vec![report(DatasetOutcome::Skipped { reason: "no source file configured".into() })],
            elapsed: Duration::ZERO,
        };
        assert_eq!(exit_code(&ok), 0);

        let failed = RunSummary {
            datasets: vec![report(DatasetOutcome::Failed {
                kind: "SourceFormatError".into(),
                message: "missing required column(s): Hr_End".into(),
            })],
            elapsed: Duration::ZERO,
        };
        assert_eq!(exit_code(&failed), EXIT_DATASET_FAILURE);
    }
}
