//! CSV-backed asset data adapter.
//!
//! One file per symbol under a base directory, named `SYMBOL.csv`, with a
//! header row naming at least `date` and `close`. `dividend` and
//! `split_ratio` columns are optional; blank cells take the no-event
//! defaults (0.0 dividend, 1.0 split ratio).

use crate::domain::asset::AssetRecord;
use crate::domain::error::KilnError;
use crate::ports::data_port::AssetDataPort;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

impl CsvDataAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        CsvDataAdapter {
            base_path: base_path.into(),
        }
    }

    fn file_for(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

impl AssetDataPort for CsvDataAdapter {
    fn fetch_records(&self, symbol: &str) -> Result<Vec<AssetRecord>, KilnError> {
        let path = self.file_for(symbol);
        let mut reader = csv::Reader::from_path(&path).map_err(|e| KilnError::Data {
            reason: format!("{}: {e}", path.display()),
        })?;

        let headers = reader.headers().map_err(|e| KilnError::Data {
            reason: format!("{}: {e}", path.display()),
        })?;
        let date_col = column(headers, "date", &path)?;
        let close_col = column(headers, "close", &path)?;
        let dividend_col = headers.iter().position(|h| h == "dividend");
        let split_col = headers.iter().position(|h| h == "split_ratio");

        let mut records = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = row.map_err(|e| KilnError::Data {
                reason: format!("{}: {e}", path.display()),
            })?;
            let date = parse_date(field(&row, date_col, line, &path)?, line, &path)?;
            let close = parse_number(field(&row, close_col, line, &path)?, line, &path)?;

            let mut record = AssetRecord::new(date, close);
            if let Some(col) = dividend_col {
                let cell = field(&row, col, line, &path)?;
                if !cell.is_empty() {
                    record.dividend = parse_number(cell, line, &path)?;
                }
            }
            if let Some(col) = split_col {
                let cell = field(&row, col, line, &path)?;
                if !cell.is_empty() {
                    record.split_ratio = parse_number(cell, line, &path)?;
                }
            }
            records.push(record);
        }
        Ok(records)
    }

    fn list_symbols(&self) -> Result<Vec<String>, KilnError> {
        let entries = std::fs::read_dir(&self.base_path).map_err(|e| KilnError::Io {
            reason: format!("{}: {e}", self.base_path.display()),
        })?;
        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| KilnError::Io {
                reason: format!("{}: {e}", self.base_path.display()),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    symbols.push(stem.to_string());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}

fn column(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize, KilnError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| KilnError::Data {
            reason: format!("{}: missing column {name}", path.display()),
        })
}

fn field<'a>(
    row: &'a csv::StringRecord,
    col: usize,
    line: usize,
    path: &Path,
) -> Result<&'a str, KilnError> {
    row.get(col).map(str::trim).ok_or_else(|| KilnError::Data {
        reason: format!("{}: row {} is missing column {col}", path.display(), line + 2),
    })
}

fn parse_date(cell: &str, line: usize, path: &Path) -> Result<NaiveDate, KilnError> {
    cell.parse().map_err(|_| KilnError::Data {
        reason: format!(
            "{}: row {}: bad date {cell:?}",
            path.display(),
            line + 2
        ),
    })
}

fn parse_number(cell: &str, line: usize, path: &Path) -> Result<f64, KilnError> {
    cell.parse().map_err(|_| KilnError::Data {
        reason: format!(
            "{}: row {}: bad number {cell:?}",
            path.display(),
            line + 2
        ),
    })
}
