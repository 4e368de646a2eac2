/// Transform Module
///
/// Turns a decoded source table into hourly records for one dataset:
/// - validate the required columns
/// - parse dates and hour-ending labels (shifting hours to the 0-23 convention)
/// - treat missing values as zero, then apply the dataset's value derivation
/// - collapse duplicate keys where the dataset asks for it
use std::collections::HashSet;
use std::str::FromStr;

use calamine::Data;
use chrono::{Days, NaiveDate};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use super::dataset::DatasetDescriptor;
use super::extract::SourceTable;
use crate::error::EtlError;
use crate::models::HourlyRecord;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

const EMPTY_CELL: &Data = &Data::Empty;

/// Result of transforming one source table
#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    pub records: Vec<HourlyRecord>,
    /// Data rows present in the source, including skipped ones
    pub rows_read: usize,
    /// Rows without a date (blank or footer rows)
    pub blank_rows: usize,
    /// Rows dropped because their (date, hour) key was already seen
    pub duplicates_dropped: usize,
}

/// Transform a source table according to a dataset descriptor
pub fn transform(table: &SourceTable, dataset: &DatasetDescriptor) -> Result<TransformOutput, EtlError> {
    let name = dataset.name();
    let columns = &dataset.columns;

    let missing: Vec<&str> =
        columns.required().into_iter().filter(|column| table.column_index(column).is_none()).collect();
    if !missing.is_empty() {
        return Err(EtlError::source_format(
            name,
            format!("missing required column(s): {} (found: {})", missing.join(", "), table.headers.join(", ")),
        ));
    }

    // Presence checked above
    let date_idx = table.column_index(columns.date).unwrap_or_default();
    let hour_idx = table.column_index(columns.hour_ending).unwrap_or_default();
    let value_idx = table.column_index(columns.value).unwrap_or_default();

    let mut output = TransformOutput { rows_read: table.rows.len(), ..Default::default() };
    let mut seen = HashSet::new();

    for (index, row) in table.rows.iter().enumerate() {
        let cell = |idx: usize| row.get(idx).unwrap_or(EMPTY_CELL);
        let row_error = |column: &str, reason: String| {
            EtlError::source_format(name, format!("row {}: column {}: {}", table.sheet_row(index), column, reason))
        };

        let date = match parse_date(cell(date_idx)).map_err(|reason| row_error(columns.date, reason))? {
            Some(date) => date,
            None => {
                output.blank_rows += 1;
                continue;
            }
        };

        let hour_ending = parse_hour_ending(cell(hour_idx)).map_err(|reason| row_error(columns.hour_ending, reason))?;
        let raw_value = parse_value(cell(value_idx)).map_err(|reason| row_error(columns.value, reason))?;

        let record = HourlyRecord::new(date, hour_ending - 1, dataset.derivation.apply(raw_value));

        if dataset.dedup_keys && !seen.insert(record.key()) {
            output.duplicates_dropped += 1;
            continue;
        }

        output.records.push(record);
    }

    if output.duplicates_dropped > 0 {
        tracing::warn!("{}: dropped {} duplicate (date, hour) rows", name, output.duplicates_dropped);
    }
    if output.blank_rows > 0 {
        tracing::debug!("{}: skipped {} rows without a date", name, output.blank_rows);
    }

    Ok(output)
}

/// Parse a date cell. `Ok(None)` means the cell is empty.
pub fn parse_date(cell: &Data) -> Result<Option<NaiveDate>, String> {
    match cell {
        Data::Empty => Ok(None),
        Data::String(s) | Data::DateTimeIso(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            parse_date_text(s).map(Some)
        }
        Data::DateTime(dt) => {
            dt.as_datetime().map(|d| Some(d.date())).ok_or_else(|| format!("invalid spreadsheet date {:?}", dt))
        }
        Data::Float(f) => from_serial(*f).map(Some),
        Data::Int(i) => from_serial(*i as f64).map(Some),
        other => Err(format!("not a date: {:?}", other)),
    }
}

fn parse_date_text(s: &str) -> Result<NaiveDate, String> {
    // Drop any time-of-day part ("2024-01-01 00:00:00", "2024-01-01T00:00:00")
    let date_part = s.split(|c: char| c == 'T' || c.is_whitespace()).next().unwrap_or(s);

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .ok_or_else(|| format!("unrecognized date '{}'", s))
}

/// Serial of 9999-12-31, the last date spreadsheets can represent
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

/// Spreadsheet serial day number (1900 date system) to a calendar date
fn from_serial(serial: f64) -> Result<NaiveDate, String> {
    if !serial.is_finite() || !(1.0..=MAX_DATE_SERIAL).contains(&serial) {
        return Err(format!("invalid date serial {}", serial));
    }

    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_days(Days::new(serial.floor() as u64)))
        .ok_or_else(|| format!("date serial {} out of range", serial))
}

/// Parse an hour-ending label (1-24). Missing values read as 0; DST markers such as `2*` are dropped
/// by taking the first run of digits.
pub fn parse_hour_ending(cell: &Data) -> Result<i32, String> {
    match cell {
        Data::Empty | Data::Error(_) => Ok(0),
        Data::Int(i) => i32::try_from(*i).map_err(|_| format!("hour {} out of range", i)),
        Data::Float(f) => integral_hour(*f),
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(0);
            }
            if let Ok(f) = s.parse::<f64>() {
                return integral_hour(f);
            }

            let digits: String =
                s.chars().skip_while(|c| !c.is_ascii_digit()).take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                return Err(format!("no hour number in '{}'", s));
            }
            digits.parse::<i32>().map_err(|_| format!("hour '{}' out of range", s))
        }
        other => Err(format!("not an hour: {:?}", other)),
    }
}

fn integral_hour(value: f64) -> Result<i32, String> {
    if !value.is_finite() || value.fract() != 0.0 || value.abs() > i32::MAX as f64 {
        return Err(format!("hour {} is not a whole number", value));
    }
    Ok(value as i32)
}

/// Parse a numeric value cell. Missing values (empty, blank, `#N/A`-style errors) read as 0.
pub fn parse_value(cell: &Data) -> Result<Decimal, String> {
    match cell {
        Data::Empty | Data::Error(_) => Ok(Decimal::ZERO),
        Data::Int(i) => Ok(Decimal::from(*i)),
        Data::Float(f) => Decimal::from_f64(*f).ok_or_else(|| format!("value {} is not representable", f)),
        Data::String(s) => {
            let cleaned = s.trim().replace(',', "");
            if cleaned.is_empty() {
                return Ok(Decimal::ZERO);
            }
            Decimal::from_str(&cleaned)
                .ok()
                .or_else(|| cleaned.parse::<f64>().ok().and_then(Decimal::from_f64))
                .ok_or_else(|| format!("not a number: '{}'", s))
        }
        other => Err(format!("not a number: {:?}", other)),
    }
}
