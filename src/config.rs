/// Configuration Module
///
/// Resolves CLI flags and environment variables into one explicit `Config` that is handed to
/// the pipeline. Nothing downstream reads the environment.
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::cli::Cli;
use crate::error::EtlError;
use crate::models::DatasetKind;

/// Solar fleet nameplate capacity in MW
pub const DEFAULT_SOLAR_CAPACITY_MW: Decimal = dec!(7345.4);

/// Wind fleet nameplate capacity in MW
pub const DEFAULT_WIND_CAPACITY_MW: Decimal = dec!(4000);

/// PostgreSQL accepts at most 65535 bind parameters per statement; each record binds three.
pub const MAX_BATCH_SIZE: usize = 65_535 / 3;

/// Where to read one dataset from
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSource {
    pub kind: DatasetKind,
    /// `None` means the dataset is not configured for this run
    pub path: Option<PathBuf>,
    /// Sheet name; `None` reads the first sheet
    pub sheet: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub solar_capacity_mw: Decimal,
    pub wind_capacity_mw: Decimal,
    pub batch_size: usize,
    pub sources: Vec<DatasetSource>,
}

impl Config {
    /// Build the config from CLI arguments and the process environment
    pub fn from_env(cli: &Cli) -> Result<Self, EtlError> {
        Self::resolve(cli, |key| std::env::var(key).ok())
    }

    /// Build the config with an injectable environment lookup.
    ///
    /// CLI flags win over environment variables. `DATABASE_URL` falls back to `POSTGRES_URL`.
    pub fn resolve<F>(cli: &Cli, env: F) -> Result<Self, EtlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let database_url = non_blank(cli.database_url.clone())
            .or_else(|| non_blank(env("DATABASE_URL")))
            .or_else(|| non_blank(env("POSTGRES_URL")))
            .ok_or_else(|| {
                EtlError::Config("DATABASE_URL not found in environment. Please check your .env file".to_string())
            })?;

        let solar_capacity_mw =
            capacity(cli.solar_capacity_mw, &env, "SOLAR_CAPACITY_MW", DEFAULT_SOLAR_CAPACITY_MW)?;
        let wind_capacity_mw = capacity(cli.wind_capacity_mw, &env, "WIND_CAPACITY_MW", DEFAULT_WIND_CAPACITY_MW)?;

        let batch_size = match cli.batch_size {
            Some(0) => return Err(EtlError::Config("batch size must be greater than 0".to_string())),
            Some(size) => size.min(MAX_BATCH_SIZE),
            None => MAX_BATCH_SIZE,
        };

        let sources = vec![
            DatasetSource { kind: DatasetKind::Load, path: cli.load_file.clone(), sheet: cli.load_sheet.clone() },
            DatasetSource { kind: DatasetKind::Solar, path: cli.solar_file.clone(), sheet: cli.solar_sheet.clone() },
            DatasetSource { kind: DatasetKind::Wind, path: cli.wind_file.clone(), sheet: cli.wind_sheet.clone() },
        ];

        Ok(Self { database_url, solar_capacity_mw, wind_capacity_mw, batch_size, sources })
    }
}

fn capacity<F>(flag: Option<Decimal>, env: &F, key: &str, default: Decimal) -> Result<Decimal, EtlError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match flag {
        Some(value) => value,
        None => match env(key) {
            Some(raw) => Decimal::from_str(raw.trim())
                .map_err(|e| EtlError::Config(format!("{} is not a number ({:?}): {}", key, raw, e)))?,
            None => default,
        },
    };

    if value <= Decimal::ZERO {
        return Err(EtlError::Config(format!("{} must be positive, got {}", key, value)));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_missing_database_url_is_config_error() {
        let err = Config::resolve(&Cli::default(), env_of(&[])).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_blank_database_url_is_missing() {
        let err = Config::resolve(&Cli::default(), env_of(&[("DATABASE_URL", "   ")])).unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_postgres_url_fallback() {
        let env = env_of(&[("POSTGRES_URL", "postgres://localhost/grid")]);
        let config = Config::resolve(&Cli::default(), env).unwrap();
        assert_eq!(config.database_url, "postgres://localhost/grid");
    }

    #[test]
    fn test_cli_overrides_environment() {
        let cli = Cli {
            database_url: Some("postgres://cli/grid".to_string()),
            wind_capacity_mw: Some(dec!(2500)),
            ..Default::default()
        };
        let env = env_of(&[("DATABASE_URL", "postgres://env/grid"), ("WIND_CAPACITY_MW", "9999")]);

        let config = Config::resolve(&cli, env).unwrap();
        assert_eq!(config.database_url, "postgres://cli/grid");
        assert_eq!(config.wind_capacity_mw, dec!(2500));
        assert_eq!(config.solar_capacity_mw, DEFAULT_SOLAR_CAPACITY_MW);
    }

    #[test]
    fn test_capacity_from_environment() {
        let env = env_of(&[("DATABASE_URL", "postgres://env/grid"), ("SOLAR_CAPACITY_MW", " 8000.5 ")]);
        let config = Config::resolve(&Cli::default(), env).unwrap();
        assert_eq!(config.solar_capacity_mw, dec!(8000.5));
    }

    #[test]
    fn test_rejects_bad_capacity() {
        let env = env_of(&[("DATABASE_URL", "postgres://env/grid"), ("SOLAR_CAPACITY_MW", "abc")]);
        assert!(matches!(Config::resolve(&Cli::default(), env), Err(EtlError::Config(_))));

        let cli = Cli { wind_capacity_mw: Some(Decimal::ZERO), ..Default::default() };
        let env = env_of(&[("DATABASE_URL", "postgres://env/grid")]);
        assert!(matches!(Config::resolve(&cli, env), Err(EtlError::Config(_))));
    }

    #[test]
    fn test_batch_size_is_capped() {
        let cli = Cli { batch_size: Some(1_000_000), ..Default::default() };
        let config = Config::resolve(&cli, env_of(&[("DATABASE_URL", "postgres://env/grid")])).unwrap();
        assert_eq!(config.batch_size, MAX_BATCH_SIZE);
    }

    #[test]
    fn test_sources_follow_dataset_order() {
        let cli = Cli {
            solar_file: Some(PathBuf::from("solar.xlsx")),
            solar_sheet: Some("Hourly".to_string()),
            ..Default::default()
        };
        let config = Config::resolve(&cli, env_of(&[("DATABASE_URL", "postgres://env/grid")])).unwrap();

        let kinds: Vec<DatasetKind> = config.sources.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, DatasetKind::ALL.to_vec());
        assert!(config.sources[0].path.is_none());
        assert_eq!(config.sources[1].sheet.as_deref(), Some("Hourly"));
    }
}
