/// Data Models Module
///
/// Core data structures shared by the transform and load stages.
/// All three datasets (load, solar, wind) produce the same record shape; the dataset
/// descriptor decides which table and value column a record set belongs to.
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// One hourly observation keyed by (date, hour)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyRecord {
    pub date: NaiveDate,
    /// Hour-starting convention, 0-23 for well-formed sources
    pub hour: i32,
    /// `load_mw` for the load dataset, `generation_factor` for solar and wind
    pub value: Decimal,
}

impl HourlyRecord {
    pub fn new(date: NaiveDate, hour: i32, value: Decimal) -> Self {
        Self { date, hour, value }
    }

    pub fn key(&self) -> (NaiveDate, i32) {
        (self.date, self.hour)
    }
}

/// The datasets the pipeline knows how to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Load,
    Solar,
    Wind,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 3] = [DatasetKind::Load, DatasetKind::Solar, DatasetKind::Wind];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Solar => "solar",
            Self::Wind => "wind",
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
