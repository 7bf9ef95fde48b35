//! CSV file data adapter.
//!
//! Reads `<base_path>/<symbol>.csv` with a `timestamp,open,high,low,close`
//! header and an optional `volume` column.

use crate::domain::error::RamtraderError;
use crate::domain::ohlcv::{validate_bars, Bar};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "date", alias = "time", alias = "datetime")]
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, RamtraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| RamtraderError::DataLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for row in rdr.deserialize::<CsvRow>() {
            let row = row?;
            let timestamp =
                parse_timestamp(&row.timestamp).ok_or_else(|| RamtraderError::DataInvalid {
                    symbol: symbol.to_string(),
                    reason: format!("unrecognized timestamp '{}'", row.timestamp),
                })?;
            bars.push(Bar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume.unwrap_or(0.0),
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        validate_bars(symbol, &bars)?;
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, RamtraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| RamtraderError::DataLoad {
            path: self.base_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
