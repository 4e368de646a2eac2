/// Extract Module
///
/// Reads one dataset's source file into memory. Workbooks (xlsx, xlsm, xlsb, xls, ods) go
/// through calamine; `.csv` files go through the csv crate. Both end up as a `SourceTable`
/// of header names and calamine cells so the transform stage only handles one shape.
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::EtlError;

/// A decoded sheet: the header row plus every data row beneath it
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Data>>,
    /// 1-based sheet row of the header, used to report data row positions
    pub header_row: usize,
}

impl SourceTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Data>>) -> Self {
        Self { headers, rows, header_row: 1 }
    }

    /// Index of a column by trimmed, case-sensitive header name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// 1-based sheet row number of the data row at `index`
    pub fn sheet_row(&self, index: usize) -> usize {
        self.header_row + index + 1
    }
}

/// Read the selected sheet (or the first one) of a workbook, or a whole CSV file
pub fn read_source(path: &Path, sheet: Option<&str>, dataset: &str) -> Result<SourceTable, EtlError> {
    let is_csv = path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("csv")).unwrap_or(false);

    let table = if is_csv {
        if let Some(sheet) = sheet {
            tracing::warn!("{}: sheet '{}' ignored for CSV source {}", dataset, sheet, path.display());
        }
        read_csv(path)?
    } else {
        read_workbook(path, sheet, dataset)?
    };

    tracing::debug!("{}: read {} data rows from {}", dataset, table.rows.len(), path.display());
    Ok(table)
}

fn read_workbook(path: &Path, sheet: Option<&str>, dataset: &str) -> Result<SourceTable, EtlError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| match e {
        calamine::Error::Io(source) => EtlError::Io { path: path.to_path_buf(), source },
        other => EtlError::Spreadsheet { path: path.to_path_buf(), message: other.to_string() },
    })?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(name) => {
            if !sheet_names.iter().any(|s| s == name) {
                return Err(EtlError::source_format(
                    dataset,
                    format!("sheet '{}' not found in {} (available: {})", name, path.display(), sheet_names.join(", ")),
                ));
            }
            name.to_string()
        }
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| EtlError::source_format(dataset, format!("{} has no sheets", path.display())))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| EtlError::Spreadsheet { path: path.to_path_buf(), message: e.to_string() })?;

    let header_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(header_text).collect(),
        None => return Err(EtlError::source_format(dataset, format!("sheet '{}' is empty", sheet_name))),
    };

    let rows: Vec<Vec<Data>> = rows.map(|row| row.to_vec()).collect();

    Ok(SourceTable { headers, rows, header_row })
}

fn read_csv(path: &Path) -> Result<SourceTable, EtlError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path).map_err(|e| csv_error(path, e))?;

    let headers: Vec<String> =
        reader.headers().map_err(|e| csv_error(path, e))?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows: Vec<Vec<Data>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        rows.push(
            record
                .iter()
                .map(|field| if field.trim().is_empty() { Data::Empty } else { Data::String(field.to_string()) })
                .collect(),
        );
    }

    Ok(SourceTable::new(headers, rows))
}

fn csv_error(path: &Path, err: csv::Error) -> EtlError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => EtlError::Io { path: path.to_path_buf(), source },
        _ => EtlError::Spreadsheet { path: path.to_path_buf(), message },
    }
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_csv_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "load.csv", " Date ,Hr_End,RT_Demand\n2024-01-01,1,8500\n2024-01-01,2,\n");

        let table = read_source(&path, None, "load").unwrap();

        assert_eq!(table.headers, vec!["Date", "Hr_End", "RT_Demand"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2], Data::String("8500".to_string()));
        assert_eq!(table.rows[1][2], Data::Empty);
        assert_eq!(table.column_index("Hr_End"), Some(1));
        assert_eq!(table.sheet_row(1), 3);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_source(&dir.path().join("nope.csv"), None, "wind").unwrap_err();
        assert_eq!(err.kind(), "IOError");
    }

    #[test]
    fn test_garbage_workbook_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "solar.xlsx", "this is not a zip archive");

        let err = read_source(&path, Some("Solar"), "solar").unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(err, EtlError::Spreadsheet { .. } | EtlError::Io { .. }));
    }

    #[test]
    fn test_column_lookup_is_case_sensitive() {
        let table = SourceTable::new(vec!["local_day".into(), "LOCAL_HOUR_END".into()], vec![]);
        assert_eq!(table.column_index("LOCAL_HOUR_END"), Some(1));
        assert_eq!(table.column_index("local_hour_end"), None);
    }
}
