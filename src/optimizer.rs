//! Parameter sweep optimization
//!
//! Evaluates every valid grid combination against one series, drops failures
//! and under-sampled candidates, and ranks the survivors by win rate then
//! total profit. Candidates are evaluated in parallel with rayon; ranking only
//! happens once every evaluation has finished.

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tracing::{debug, info, warn};

use crate::config::OptimizationConfig;
use crate::error::EvaluationError;
use crate::evaluator::{contain, Evaluator};
use crate::grid::ParameterGrid;
use crate::{Bar, EvaluationResult, Leaderboard, ParameterSet};

/// Counts and leaderboard of one optimization pass
#[derive(Debug, Clone, Default)]
pub struct OptimizationReport {
    pub leaderboard: Leaderboard,
    /// Grid product, before the validity predicate
    pub raw_combinations: usize,
    /// Valid candidates handed to the evaluator
    pub tested: usize,
    /// Candidates whose evaluation failed
    pub failed: usize,
    /// Successful evaluations below the trade floor
    pub below_min_trades: usize,
    /// Successful evaluations that reached the trade floor
    pub qualified: usize,
    /// Bars in the evaluated series
    pub data_points: usize,
}

impl OptimizationReport {
    pub fn best(&self) -> Option<&EvaluationResult> {
        self.leaderboard.first()
    }
}

/// Grid search optimizer
pub struct Optimizer {
    grid: ParameterGrid,
    settings: OptimizationConfig,
    progress_bar: Option<ProgressBar>,
}

impl Optimizer {
    pub fn new(grid: ParameterGrid, settings: OptimizationConfig) -> Self {
        Optimizer {
            grid,
            settings,
            progress_bar: None,
        }
    }

    /// Attach a progress bar incremented once per evaluated candidate
    pub fn with_progress(mut self, progress_bar: ProgressBar) -> Self {
        self.progress_bar = Some(progress_bar);
        self
    }

    pub fn grid(&self) -> &ParameterGrid {
        &self.grid
    }

    pub fn settings(&self) -> &OptimizationConfig {
        &self.settings
    }

    /// Run the sweep. A run where nothing qualifies returns an empty leaderboard.
    pub fn optimize<E>(&self, series: &[Bar], evaluator: &E) -> OptimizationReport
    where
        E: Evaluator + ?Sized,
    {
        let raw_combinations = self.grid.raw_combinations();
        let valid = self.grid.valid_combinations();
        info!(
            "Testing {} parameter combinations ({} raw) on {} bars",
            valid,
            raw_combinations,
            series.len()
        );

        if let Some(pb) = &self.progress_bar {
            pb.set_length(valid as u64);
        }

        let evaluated = AtomicUsize::new(0);
        let evaluate = |params: &ParameterSet| {
            let outcome = contain(|| evaluator.evaluate(params, series));
            self.record_progress(evaluated.fetch_add(1, AtomicOrdering::Relaxed) + 1, valid);
            outcome
        };

        // Both paths yield outcomes in enumeration order
        let outcomes: Vec<(ParameterSet, Result<EvaluationResult, EvaluationError>)> =
            if self.settings.parallel {
                let candidates: Vec<ParameterSet> = self.grid.iter().collect();
                candidates
                    .par_iter()
                    .map(|params| (*params, evaluate(params)))
                    .collect()
            } else {
                self.grid
                    .iter()
                    .map(|params| (params, evaluate(&params)))
                    .collect()
            };

        if let Some(pb) = &self.progress_bar {
            pb.finish_and_clear();
        }

        let mut report = OptimizationReport {
            raw_combinations,
            tested: outcomes.len(),
            data_points: series.len(),
            ..OptimizationReport::default()
        };

        let mut survivors = Vec::new();
        for (params, outcome) in outcomes {
            match outcome {
                Ok(result) if result.total_trades >= self.settings.min_trades => {
                    survivors.push(result.sanitized())
                }
                Ok(_) => report.below_min_trades += 1,
                Err(e) => {
                    debug!("Candidate {} failed: {}", params, e);
                    report.failed += 1;
                }
            }
        }
        report.qualified = survivors.len();

        info!(
            "Tested {} valid combinations, {} with at least {} trades, {} failed",
            report.tested, report.qualified, self.settings.min_trades, report.failed
        );
        if survivors.is_empty() {
            warn!("No parameter combination reached the trade floor");
        }

        report.leaderboard = rank(survivors, self.settings.max_results);
        report
    }

    fn record_progress(&self, done: usize, total: usize) {
        if let Some(pb) = &self.progress_bar {
            pb.inc(1);
        }
        let interval = self.settings.progress_interval;
        if interval > 0 && done % interval == 0 {
            let pct = done as f64 / total.max(1) as f64 * 100.0;
            info!("Testing combinations: {}/{} ({:.1}%)", done, total, pct);
        }
    }
}

/// Order two results by win rate, then total profit, both descending
pub fn compare_results(a: &EvaluationResult, b: &EvaluationResult) -> Ordering {
    b.win_rate
        .total_cmp(&a.win_rate)
        .then_with(|| b.total_profit.total_cmp(&a.total_profit))
}

/// Rank results and keep the top `max_results`.
///
/// Ties on `(win_rate, total_profit)` keep their input order: the input
/// position is the final sort key.
pub fn rank(results: Vec<EvaluationResult>, max_results: usize) -> Leaderboard {
    let mut indexed: Vec<(usize, EvaluationResult)> = results.into_iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| compare_results(a, b).then(ia.cmp(ib)));
    indexed
        .into_iter()
        .take(max_results)
        .map(|(_, result)| result)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Metrics;
    use std::sync::Mutex;

    fn result(win_rate: f64, total_profit: f64, total_trades: usize) -> EvaluationResult {
        EvaluationResult::new(
            ParameterSet::default(),
            Metrics {
                total_trades,
                win_rate,
                total_profit,
                profit_factor: 1.0,
                max_drawdown: 0.0,
                avg_profit: 0.0,
            },
        )
    }

    fn metrics(total_trades: usize, win_rate: f64) -> Metrics {
        Metrics {
            total_trades,
            win_rate,
            ..Metrics::default()
        }
    }

    fn small_grid() -> ParameterGrid {
        ParameterGrid {
            rsi_period: vec![7, 14],
            oversold: vec![20.0, 70.0],
            overbought: vec![65.0, 80.0],
            take_profit: vec![0.01],
            stop_loss: vec![-0.01],
        }
    }

    fn settings(parallel: bool) -> OptimizationConfig {
        OptimizationConfig {
            parallel,
            ..OptimizationConfig::default()
        }
    }

    #[test]
    fn test_rank_orders_by_win_rate_then_profit() {
        let a = result(60.0, 10.0, 5);
        let b = result(60.0, 15.0, 5);
        let c = result(70.0, 1.0, 5);

        let ranked = rank(vec![a.clone(), b.clone(), c.clone()], 10);
        assert_eq!(ranked, vec![c, b, a]);
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let mut first = result(55.0, 4.0, 6);
        first.parameters.rsi_period = 7;
        let mut second = result(55.0, 4.0, 6);
        second.parameters.rsi_period = 14;

        let ranked = rank(vec![first.clone(), second.clone()], 10);
        assert_eq!(ranked[0].parameters.rsi_period, 7);
        assert_eq!(ranked[1].parameters.rsi_period, 14);
    }

    #[test]
    fn test_rank_truncates() {
        let results: Vec<EvaluationResult> = (0..25).map(|i| result(i as f64, 0.0, 5)).collect();
        let ranked = rank(results, 10);
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].win_rate, 24.0);
        assert_eq!(ranked[9].win_rate, 15.0);
    }

    #[test]
    fn test_only_valid_candidates_evaluated() {
        let seen = Mutex::new(Vec::new());
        let evaluator = |p: &ParameterSet, _: &[Bar]| -> Result<EvaluationResult, EvaluationError> {
            seen.lock().unwrap().push(*p);
            Ok(EvaluationResult::new(*p, metrics(5, 0.0)))
        };

        let optimizer = Optimizer::new(small_grid(), settings(true));
        let report = optimizer.optimize(&[], &evaluator);

        let seen = seen.into_inner().unwrap();
        assert!(seen.iter().all(|p| p.oversold < p.overbought));
        assert_eq!(report.raw_combinations, 8);
        // oversold 70 only pairs with overbought 80
        assert_eq!(report.tested, 6);
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_trade_floor_and_failures() {
        let evaluator = |p: &ParameterSet, _: &[Bar]| -> Result<EvaluationResult, EvaluationError> {
            match (p.rsi_period, p.overbought as i64) {
                (7, 65) => Err(EvaluationError::InvalidParameters("boom".into())),
                (7, 80) => Ok(EvaluationResult::new(*p, metrics(4, 100.0))),
                _ => Ok(EvaluationResult::new(*p, metrics(5, 40.0))),
            }
        };

        let optimizer = Optimizer::new(small_grid(), settings(false));
        let report = optimizer.optimize(&[], &evaluator);

        assert_eq!(report.tested, 6);
        assert_eq!(report.failed, 1);
        assert_eq!(report.below_min_trades, 2);
        assert_eq!(report.qualified, 3);
        assert!(report.leaderboard.iter().all(|r| r.total_trades >= 5));
        assert!(report.leaderboard.iter().all(|r| r.win_rate == 40.0));
    }

    #[test]
    fn test_zero_survivors_is_empty_report() {
        let evaluator = |p: &ParameterSet, _: &[Bar]| -> Result<EvaluationResult, EvaluationError> {
            Ok(EvaluationResult::new(*p, metrics(1, 0.0)))
        };

        let report = Optimizer::new(small_grid(), settings(true)).optimize(&[], &evaluator);
        assert!(report.leaderboard.is_empty());
        assert!(report.best().is_none());
        assert_eq!(report.below_min_trades, 6);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let evaluator = |p: &ParameterSet, _: &[Bar]| -> Result<EvaluationResult, EvaluationError> {
            // Many ties so that ordering depends on the enumeration index
            let win_rate = if p.rsi_period == 7 { 50.0 } else { 60.0 };
            Ok(EvaluationResult::new(*p, metrics(5, win_rate)))
        };

        let parallel = Optimizer::new(small_grid(), settings(true)).optimize(&[], &evaluator);
        let sequential = Optimizer::new(small_grid(), settings(false)).optimize(&[], &evaluator);

        assert_eq!(parallel.leaderboard, sequential.leaderboard);
        assert_eq!(parallel.leaderboard[0].parameters.rsi_period, 14);
        assert_eq!(parallel.leaderboard[0].parameters.oversold, 20.0);
        assert_eq!(parallel.leaderboard[0].parameters.overbought, 65.0);
    }

    #[test]
    fn test_panicking_candidate_is_counted_as_failure() {
        let evaluator = |p: &ParameterSet, _: &[Bar]| -> Result<EvaluationResult, EvaluationError> {
            if p.rsi_period == 7 && p.overbought == 65.0 {
                panic!("engine blew up");
            }
            Ok(EvaluationResult::new(*p, metrics(5, 50.0)))
        };

        for parallel in [true, false] {
            let report = Optimizer::new(small_grid(), settings(parallel)).optimize(&[], &evaluator);
            assert_eq!(report.tested, 6);
            assert_eq!(report.failed, 1);
            assert_eq!(report.qualified, 5);
            assert_eq!(report.leaderboard.len(), 5);
        }
    }

    #[test]
    fn test_non_finite_metrics_do_not_lead_ranking() {
        let evaluator = |p: &ParameterSet, _: &[Bar]| -> Result<EvaluationResult, EvaluationError> {
            let win_rate = if p.rsi_period == 7 { f64::NAN } else { 40.0 };
            Ok(EvaluationResult::new(*p, metrics(5, win_rate)))
        };

        let report = Optimizer::new(small_grid(), settings(false)).optimize(&[], &evaluator);
        let best = report.best().unwrap();
        assert_eq!(best.parameters.rsi_period, 14);
        assert_eq!(best.win_rate, 40.0);
        assert!(report.leaderboard.iter().all(|r| r.win_rate.is_finite()));
    }
}
