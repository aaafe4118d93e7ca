//! Startup initializer
//!
//! Decides between the cached leaderboard and a fresh optimization run, and
//! always hands back exactly one parameter set. Any failure degrades to the
//! configured defaults.

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use crate::config::{MarketConfig, TunerConfig};
use crate::data::DataProvider;
use crate::error::RunError;
use crate::evaluator::Evaluator;
use crate::optimizer::{OptimizationReport, Optimizer};
use crate::store::ResultStore;
use crate::{EvaluationResult, ParameterSet};

/// Why the defaults were returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The data fetch failed
    NoData,
    /// The sweep produced no candidate above the trade floor
    NoResults,
    /// The cache was fresh but its leaderboard was empty or unreadable
    EmptyCache,
}

/// Where the returned parameters came from
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSource {
    Optimized,
    Cached { age: Duration },
    Default(FallbackReason),
}

/// Parameters chosen at startup, with provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub parameters: ParameterSet,
    pub source: ParameterSource,
}

/// Orchestrates fetch, optimize and cache
pub struct Initializer {
    provider: Box<dyn DataProvider>,
    evaluator: Box<dyn Evaluator>,
    optimizer: Optimizer,
    store: ResultStore,
    market: MarketConfig,
    defaults: ParameterSet,
}

impl Initializer {
    pub fn new(
        config: &TunerConfig,
        provider: Box<dyn DataProvider>,
        evaluator: Box<dyn Evaluator>,
    ) -> Self {
        Initializer {
            provider,
            evaluator,
            optimizer: Optimizer::new(config.grid.clone(), config.optimization.clone()),
            store: ResultStore::from_config(&config.cache),
            market: config.market.clone(),
            defaults: config.defaults,
        }
    }

    /// Replace the optimizer, e.g. to attach a progress bar
    pub fn with_optimizer(mut self, optimizer: Optimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn defaults(&self) -> ParameterSet {
        self.defaults
    }

    /// Best parameters to trade with
    pub fn initialize(&self, force: bool) -> ParameterSet {
        self.select(force).parameters
    }

    /// Best parameters to trade with, and where they came from
    pub fn select(&self, force: bool) -> Selection {
        let now = Utc::now();
        let cached = if force { None } else { self.store.load() };

        if !force && self.store.is_fresh_at(cached.as_ref(), now) {
            info!(
                "Using cached backtest results (less than {} hours old)",
                self.store.ttl().num_hours()
            );
            let best = cached
                .as_ref()
                .and_then(|r| Some((r.best_parameters()?, r.age_at(now)?)));
            return match best {
                Some((parameters, age)) => {
                    info!("Loaded best parameters: {}", parameters);
                    Selection {
                        parameters,
                        source: ParameterSource::Cached { age },
                    }
                }
                None => {
                    warn!("No cached strategies found, using defaults");
                    self.fallback(FallbackReason::EmptyCache)
                }
            };
        }

        if force {
            info!("Running backtest optimization (forced)");
        } else {
            info!(
                "Running backtest optimization (results older than {} hours or missing)",
                self.store.ttl().num_hours()
            );
        }

        match self.run_optimization() {
            Ok(report) => match report.best() {
                Some(best) => Selection {
                    parameters: best.parameters,
                    source: ParameterSource::Optimized,
                },
                None => self.fallback(FallbackReason::NoResults),
            },
            Err(RunError::DataFetch(e)) => {
                error!("Failed to fetch data: {}", e);
                self.fallback(FallbackReason::NoData)
            }
            Err(e @ RunError::NoQualifyingResults { .. }) => {
                warn!("{}", e);
                self.fallback(FallbackReason::NoResults)
            }
        }
    }

    /// Fetch, sweep and persist. Persistence failures are logged, not returned.
    pub fn run_optimization(&self) -> Result<OptimizationReport, RunError> {
        info!(
            "Fetching historical data ({} {}, max {} candles)",
            self.market.symbol, self.market.interval, self.market.limit
        );
        let series = self.provider.fetch(&self.market.symbol, &self.market.interval)?;

        if let (Some(first), Some(last)) = (series.first(), series.last()) {
            info!(
                "Loaded {} candles from {} to {}",
                series.len(),
                first.timestamp,
                last.timestamp
            );
        }

        let report = self.optimizer.optimize(&series, self.evaluator.as_ref());

        let Some(best) = report.best() else {
            return Err(RunError::NoQualifyingResults {
                tested: report.tested,
            });
        };
        log_best(best);

        if let Err(e) = self.store.save(&report.leaderboard, report.data_points) {
            error!(
                "Failed to save results, continuing with in-memory leaderboard: {}",
                e
            );
        }

        Ok(report)
    }

    fn fallback(&self, reason: FallbackReason) -> Selection {
        info!("Using default parameters ({:?}): {}", reason, self.defaults);
        Selection {
            parameters: self.defaults,
            source: ParameterSource::Default(reason),
        }
    }
}

fn log_best(best: &EvaluationResult) {
    info!("{}", "=".repeat(60));
    info!("BEST STRATEGY FOUND");
    info!("{}", "=".repeat(60));
    info!("Win Rate:      {:.2}%", best.win_rate);
    info!("Total Profit:  {:.2}%", best.total_profit);
    info!("Total Trades:  {}", best.total_trades);
    info!("Profit Factor: {:.2}", best.profit_factor);
    info!("Max Drawdown:  {:.2}%", best.max_drawdown);
    info!("Avg Profit:    {:.2}%", best.avg_profit);
    info!("Parameters:    {}", best.parameters);
}
