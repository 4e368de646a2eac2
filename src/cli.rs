/// CLI Module
///
/// Command-line interface configuration using clap.
use std::path::PathBuf;

use clap::Parser;
use rust_decimal::Decimal;

/// Grid ETL - hourly load, solar and wind loader
///
/// Extract hourly grid series from spreadsheet exports, normalize generation into capacity
/// factors, and upsert them into PostgreSQL
#[derive(Parser, Debug, Default)]
#[command(name = "grid-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Load workbook or CSV (columns Date, Hr_End, RT_Demand)
    #[arg(short = 'l', long, value_name = "FILE")]
    pub load_file: Option<PathBuf>,

    /// Sheet holding the load data (defaults to the first sheet)
    #[arg(long, value_name = "SHEET")]
    pub load_sheet: Option<String>,

    /// Solar workbook or CSV (columns local_day, LOCAL_HOUR_END, tot_solar_mwh)
    #[arg(short = 's', long, value_name = "FILE")]
    pub solar_file: Option<PathBuf>,

    /// Sheet holding the solar data (defaults to the first sheet)
    #[arg(long, value_name = "SHEET")]
    pub solar_sheet: Option<String>,

    /// Wind workbook or CSV (columns local_day, local_hour_end, tot_wind_mwh)
    #[arg(short = 'w', long, value_name = "FILE")]
    pub wind_file: Option<PathBuf>,

    /// Sheet holding the wind data (defaults to the first sheet)
    #[arg(long, value_name = "SHEET")]
    pub wind_sheet: Option<String>,

    /// Database connection URL (overrides DATABASE_URL env var)
    #[arg(short = 'd', long, value_name = "URL")]
    pub database_url: Option<String>,

    /// Solar nameplate capacity in MW (overrides SOLAR_CAPACITY_MW env var)
    #[arg(long, value_name = "MW")]
    pub solar_capacity_mw: Option<Decimal>,

    /// Wind nameplate capacity in MW (overrides WIND_CAPACITY_MW env var)
    #[arg(long, value_name = "MW")]
    pub wind_capacity_mw: Option<Decimal>,

    /// Rows per INSERT statement (capped by the PostgreSQL bind limit)
    #[arg(short = 'b', long, value_name = "ROWS")]
    pub batch_size: Option<usize>,

    /// Print the run summary as JSON after the console report
    #[arg(long)]
    pub summary_json: bool,
}

impl Cli {
    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == Some(0) {
            anyhow::bail!("Batch size must be greater than 0");
        }

        if self.load_file.is_none() && self.solar_file.is_none() && self.wind_file.is_none() {
            tracing::warn!("No source files given; every dataset will be skipped");
        }

        Ok(())
    }
}
