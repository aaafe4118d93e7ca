//! Historical data providers
//!
//! The live provider pulls the most recent klines from the Binance public API in
//! a single request. The CSV provider replays a previously saved series offline.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

use crate::config::{MarketConfig, MAX_KLINES_PER_REQUEST};
use crate::error::DataFetchError;
use crate::{Bar, TimeSeries};

/// Source of a bounded historical series for one symbol and interval
pub trait DataProvider: Send + Sync {
    fn fetch(&self, symbol: &str, interval: &str) -> Result<TimeSeries, DataFetchError>;
}

// =============================================================================
// Binance Kline Fetcher
// =============================================================================

/// Fetches one page of klines from Binance. No API key needed.
#[derive(Debug, Clone)]
pub struct BinanceKlineFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
    limit: u32,
}

impl BinanceKlineFetcher {
    pub fn new(config: &MarketConfig) -> Result<Self, DataFetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;

        Ok(BinanceKlineFetcher {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limit: config.limit.clamp(1, MAX_KLINES_PER_REQUEST),
        })
    }
}

impl DataProvider for BinanceKlineFetcher {
    fn fetch(&self, symbol: &str, interval: &str) -> Result<TimeSeries, DataFetchError> {
        let url = format!("{}/klines", self.base_url);
        let params = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", self.limit.to_string()),
        ];

        debug!(
            "Fetching klines: symbol={}, interval={}, limit={}",
            symbol, interval, self.limit
        );

        let response = self.client.get(&url).query(&params).send()?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(DataFetchError::Status(response.status().as_u16()));
        }

        let rows: Vec<Vec<serde_json::Value>> = response.json()?;
        let series = parse_klines(&rows);

        if series.is_empty() {
            return Err(DataFetchError::Empty {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }

        info!("Fetched {} candles for {} {}", series.len(), symbol, interval);
        Ok(series)
    }
}

/// Map raw kline rows to bars.
///
/// Rows are `[open_time, open, high, low, close, volume, ...]`; prices arrive
/// as strings but plain numbers are accepted too. Unparsable rows are skipped.
/// The result is sorted and de-duplicated by timestamp.
pub fn parse_klines(rows: &[Vec<serde_json::Value>]) -> TimeSeries {
    let mut series: TimeSeries = rows.iter().filter_map(|row| bar_from_raw(row)).collect();

    let skipped = rows.len() - series.len();
    if skipped > 0 {
        warn!("Skipped {} malformed kline rows", skipped);
    }

    series.sort_by_key(|b| b.timestamp);
    series.dedup_by_key(|b| b.timestamp);
    series
}

fn bar_from_raw(raw: &[serde_json::Value]) -> Option<Bar> {
    if raw.len() < 6 {
        return None;
    }

    Some(Bar {
        timestamp: DateTime::<Utc>::from_timestamp_millis(raw[0].as_i64()?)?,
        high: lenient_f64(&raw[2])?,
        low: lenient_f64(&raw[3])?,
        price: lenient_f64(&raw[4])?,
        volume: lenient_f64(&raw[5])?,
    })
}

fn lenient_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        other => other.as_f64(),
    }
}

// =============================================================================
// CSV Data Provider
// =============================================================================

/// Reads `{dir}/{symbol}_{interval}.csv` with header `timestamp,price,volume,low,high`
#[derive(Debug, Clone)]
pub struct CsvDataProvider {
    pub data_dir: PathBuf,
}

impl CsvDataProvider {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        CsvDataProvider {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, symbol: &str, interval: &str) -> PathBuf {
        self.data_dir.join(format!("{}_{}.csv", symbol, interval))
    }
}

impl DataProvider for CsvDataProvider {
    fn fetch(&self, symbol: &str, interval: &str) -> Result<TimeSeries, DataFetchError> {
        let path = self.path_for(symbol, interval);
        let series = load_csv(&path)?;

        if series.is_empty() {
            return Err(DataFetchError::Empty {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }

        info!("Loaded {} bars from {}", series.len(), path.display());
        Ok(series)
    }
}

/// Load a series from a CSV file
pub fn load_csv(path: impl AsRef<Path>) -> Result<TimeSeries, DataFetchError> {
    let path = path.as_ref();
    let csv_err = |source| DataFetchError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    reader
        .deserialize::<Bar>()
        .collect::<Result<TimeSeries, _>>()
        .map_err(csv_err)
}

/// Save a series to CSV, creating parent directories as needed
pub fn save_csv(series: &[Bar], path: impl AsRef<Path>) -> Result<(), DataFetchError> {
    let path = path.as_ref();
    let csv_err = |source| DataFetchError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let io_err = |source| DataFetchError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for bar in series {
        writer.serialize(bar).map_err(csv_err)?;
    }
    writer.flush().map_err(io_err)?;

    info!("Saved {} rows to {}", series.len(), path.display());
    Ok(())
}
