//! RSI Strategy Auto-Tuning
//!
//! Periodically re-tunes the parameters of an RSI trading strategy by
//! backtesting every combination of a parameter grid against recent price
//! history, then caches the best configurations for a fixed validity window so
//! the live trading process can start without re-optimizing.
//!
//! ```no_run
//! use rsi_autotune::data::BinanceKlineFetcher;
//! use rsi_autotune::evaluator::BacktestEvaluator;
//! use rsi_autotune::initializer::Initializer;
//! use rsi_autotune::TunerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = TunerConfig::load(None)?;
//!     let provider = BinanceKlineFetcher::new(&config.market)?;
//!     let evaluator = BacktestEvaluator::new(config.optimization.commission);
//!     let initializer = Initializer::new(&config, Box::new(provider), Box::new(evaluator));
//!     let params = initializer.initialize(false);
//!     println!("Trading with {}", params);
//!     Ok(())
//! }
//! ```

pub mod backtest;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluator;
pub mod grid;
pub mod indicators;
pub mod initializer;
pub mod optimizer;
pub mod settings;
pub mod store;
pub mod strategy;
pub mod types;

pub use config::TunerConfig;
pub use types::*;
