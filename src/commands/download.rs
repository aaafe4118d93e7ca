//! Download command: save the current series to CSV for offline runs

use anyhow::{Context, Result};
use rsi_autotune::data::{save_csv, BinanceKlineFetcher, CsvDataProvider, DataProvider};
use rsi_autotune::TunerConfig;
use std::path::PathBuf;
use tracing::info;

pub fn run(config: TunerConfig, output: PathBuf) -> Result<()> {
    let fetcher = BinanceKlineFetcher::new(&config.market)?;
    let series = fetcher
        .fetch(&config.market.symbol, &config.market.interval)
        .with_context(|| format!("Failed to download {}", config.market.symbol))?;

    let path =
        CsvDataProvider::new(&output).path_for(&config.market.symbol, &config.market.interval);
    save_csv(&series, &path)?;
    info!("Downloaded {} candles to {}", series.len(), path.display());
    println!("Saved {} candles to {}", series.len(), path.display());

    Ok(())
}
