/// Error Module
///
/// Error taxonomy for the grid ETL. Fatal errors (config, connection, schema) abort the run;
/// everything else is scoped to a single dataset and reported in the run summary.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot connect to database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("schema initialization failed: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("{dataset}: source format error: {message}")]
    SourceFormat { dataset: String, message: String },

    #[error("{dataset}: constraint violation writing {table}: {source}")]
    ConstraintViolation {
        dataset: String,
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode {}: {message}", path.display())]
    Spreadsheet { path: PathBuf, message: String },

    #[error("{dataset}: database error: {source}")]
    Database {
        dataset: String,
        #[source]
        source: sqlx::Error,
    },
}

impl EtlError {
    pub fn source_format(dataset: &str, message: impl Into<String>) -> Self {
        Self::SourceFormat { dataset: dataset.to_string(), message: message.into() }
    }

    /// Fatal errors stop the whole run; the rest only fail their dataset.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Connection(_) | Self::Schema(_))
    }

    /// Short name used in summaries and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::Connection(_) => "ConnectionError",
            Self::Schema(_) => "SchemaError",
            Self::SourceFormat { .. } | Self::Spreadsheet { .. } => "SourceFormatError",
            Self::ConstraintViolation { .. } => "ConstraintViolation",
            Self::Io { .. } => "IOError",
            Self::Database { .. } => "DatabaseError",
        }
    }

    /// Classify a write failure for a dataset.
    ///
    /// A lost connection is fatal since every later dataset would fail the same way.
    pub fn from_write(dataset: &str, table: &str, err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut) {
            return Self::Connection(err);
        }

        let is_constraint = err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|code| is_key_conflict(&code))
            .unwrap_or(false);

        if is_constraint {
            Self::ConstraintViolation { dataset: dataset.to_string(), table: table.to_string(), source: err }
        } else {
            Self::Database { dataset: dataset.to_string(), source: err }
        }
    }
}

/// SQLSTATE class 23 is an integrity constraint violation. 21000 is raised when one
/// `ON CONFLICT DO UPDATE` statement carries the same key twice.
fn is_key_conflict(code: &str) -> bool {
    code.starts_with("23") || code == "21000"
}
