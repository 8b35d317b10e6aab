//! CSV file tick data adapter.
//!
//! One file per instrument under a base directory, named after the
//! instrument with `/` replaced by `_` (`BTC/USDT` -> `BTC_USDT.csv`).
//! Expected header: `time,open,high,low,close,volume`, time in epoch
//! milliseconds, rows ascending by time.

use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::error::TicksimError;
use crate::domain::tick::Tick;
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, instrument: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.csv", instrument.replace('/', "_")))
    }
}

fn parse_field<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<T, TicksimError>
where
    T::Err: Display,
{
    let raw = record.get(index).ok_or_else(|| TicksimError::Data {
        reason: format!("missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e| TicksimError::Data {
        reason: format!("invalid {name} value {raw:?}: {e}"),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_ticks(&self, instrument: &str) -> Result<Vec<Tick>, TicksimError> {
        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path).map_err(|e| TicksimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut ticks = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TicksimError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            ticks.push(Tick {
                instrument: instrument.to_string(),
                time: parse_field(&record, 0, "time")?,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
            });
        }

        if ticks.is_empty() {
            return Err(TicksimError::NoData {
                instrument: instrument.to_string(),
            });
        }
        Ok(ticks)
    }

    fn list_instruments(&self) -> Result<Vec<String>, TicksimError> {
        let mut instruments = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    instruments.push(stem.replace('_', "/"));
                }
            }
        }
        instruments.sort();
        Ok(instruments)
    }
}
