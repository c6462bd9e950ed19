//! CSV file price-history adapter.
//!
//! One file per pair and timeframe: `<base_path>/<PAIR>_<timeframe>.csv`
//! with a header row and columns `timestamp,open,high,low,close,volume`.
//! Timestamps are `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or a bare
//! `YYYY-MM-DD` (midnight).

use crate::domain::error::SignalError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::timeframe::Timeframe;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, pair: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", pair, timeframe))
    }
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, SignalError> {
    record
        .get(index)
        .ok_or_else(|| SignalError::Data {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| SignalError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_price_history(
        &self,
        pair: &str,
        timeframe: Timeframe,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, SignalError> {
        let path = self.csv_path(pair, timeframe);
        let content = fs::read_to_string(&path).map_err(|e| SignalError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| SignalError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let ts_str = record.get(0).ok_or_else(|| SignalError::Data {
                reason: "missing timestamp column".into(),
            })?;
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| SignalError::Data {
                reason: format!("invalid timestamp '{}'", ts_str),
            })?;

            if timestamp < start || timestamp > end {
                continue;
            }

            bars.push(PriceBar {
                timestamp,
                open: field(&record, 1, "open")?,
                high: field(&record, 2, "high")?,
                low: field(&record, 3, "low")?,
                close: field(&record, 4, "close")?,
                volume: field(&record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        debug!(path = %path.display(), bars = bars.len(), "read price history");
        Ok(bars)
    }

    fn list_pairs(&self, timeframe: Timeframe) -> Result<Vec<String>, SignalError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SignalError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", timeframe);
        let mut pairs = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| SignalError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(pair) = name_str.strip_suffix(&suffix) {
                pairs.push(pair.to_string());
            }
        }

        pairs.sort();
        Ok(pairs)
    }
}
