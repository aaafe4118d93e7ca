//! CLI subcommands

pub mod download;
pub mod init;
pub mod optimize;
pub mod status;

use anyhow::Result;
use rsi_autotune::data::{BinanceKlineFetcher, CsvDataProvider, DataProvider};
use rsi_autotune::TunerConfig;
use std::path::PathBuf;
use tracing::info;

/// Binance by default, or the CSV files under `offline` when given
pub(crate) fn build_provider(
    config: &TunerConfig,
    offline: Option<PathBuf>,
) -> Result<Box<dyn DataProvider>> {
    match offline {
        Some(dir) => {
            info!("Using offline data from {}", dir.display());
            Ok(Box::new(CsvDataProvider::new(dir)))
        }
        None => Ok(Box::new(BinanceKlineFetcher::new(&config.market)?)),
    }
}
