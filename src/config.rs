//! Configuration management
//!
//! Handles loading of the JSON configuration file with environment variable
//! overrides. Every section has defaults, so a missing or partial file is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::grid::ParameterGrid;
use crate::ParameterSet;

/// Hard per-request cap of the kline endpoint
pub const MAX_KLINES_PER_REQUEST: u32 = 1000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub market: MarketConfig,
    pub optimization: OptimizationConfig,
    pub cache: CacheConfig,
    pub grid: ParameterGrid,
    /// Parameters used whenever optimization yields nothing usable
    pub defaults: ParameterSet,
    pub live: LiveConfig,
}

impl TunerConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;
        let config: TunerConfig =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }

    /// Load from an optional file, apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => TunerConfig::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(symbol) = std::env::var("RSI_AUTOTUNE_SYMBOL") {
            self.market.symbol = symbol;
        }
        if let Ok(path) = std::env::var("RSI_AUTOTUNE_RESULTS_PATH") {
            self.cache.results_path = PathBuf::from(path);
        }
        if let Ok(ttl) = std::env::var("RSI_AUTOTUNE_TTL_HOURS") {
            self.cache.ttl_hours = ttl
                .parse()
                .with_context(|| format!("RSI_AUTOTUNE_TTL_HOURS is not an integer: {}", ttl))?;
        }
        Ok(())
    }

    /// Reject configurations the optimizer cannot run with
    pub fn validate(&self) -> Result<()> {
        let empty = self.grid.empty_axes();
        if !empty.is_empty() {
            anyhow::bail!("Grid axes must not be empty: {}", empty.join(", "));
        }
        if self.optimization.max_results == 0 {
            anyhow::bail!("optimization.max_results must be at least 1");
        }
        if self.cache.ttl_hours <= 0 {
            anyhow::bail!("cache.ttl_hours must be positive");
        }
        if self.cache.ttl().is_none() {
            anyhow::bail!("cache.ttl_hours is out of range: {}", self.cache.ttl_hours);
        }
        if !self.defaults.is_valid() {
            anyhow::bail!(
                "defaults.oversold ({}) must be below defaults.overbought ({})",
                self.defaults.oversold,
                self.defaults.overbought
            );
        }
        Ok(())
    }
}

/// Historical data source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub symbol: String,
    pub interval: String,
    pub limit: u32,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig {
            symbol: "BTCUSDT".to_string(),
            interval: "1m".to_string(),
            limit: MAX_KLINES_PER_REQUEST,
            base_url: "https://api.binance.com/api/v3".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Sweep and ranking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Leaderboard length
    pub max_results: usize,
    /// Candidates with fewer simulated trades are discarded
    pub min_trades: usize,
    /// Per-leg commission rate (0.0005 = 0.05%)
    pub commission: f64,
    /// Log progress every N evaluated candidates
    pub progress_interval: usize,
    pub parallel: bool,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        OptimizationConfig {
            max_results: 10,
            min_trades: 5,
            commission: 0.0005,
            progress_interval: 50,
            parallel: true,
        }
    }
}

/// Cache file location and validity window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub results_path: PathBuf,
    pub ttl_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            results_path: PathBuf::from("backtest_results").join("results.json"),
            ttl_hours: 24,
        }
    }
}

impl CacheConfig {
    /// Validity window, or `None` when `ttl_hours` does not fit a duration
    pub fn ttl(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_hours(self.ttl_hours)
    }
}

/// Bot settings handed to the live trading process alongside the tuned parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Testnet when true, mainnet (real money) when false
    pub use_testnet: bool,
    pub position_value_usd: f64,
    pub max_total_position_usd: f64,
    pub cycle_interval_secs: u64,
    /// Minutes to wait after each buy before buying again
    pub buy_cooldown_minutes: u64,
    /// Sell the whole position at once instead of one lot at a time
    pub sell_entire_position: bool,
}

impl Default for LiveConfig {
    fn default() -> Self {
        LiveConfig {
            use_testnet: false,
            position_value_usd: 20.0,
            max_total_position_usd: 100.0,
            cycle_interval_secs: 60,
            buy_cooldown_minutes: 5,
            sell_entire_position: true,
        }
    }
}
