//! Evaluation adapter
//!
//! Wraps a strategy + backtest engine behind a single call that never unwinds
//! into the sweep: every failure comes back as an [`EvaluationError`].

use std::panic::{self, AssertUnwindSafe};

use crate::backtest::BacktestEngine;
use crate::error::EvaluationError;
use crate::strategy::RsiDoubleConfirm;
use crate::{Bar, EvaluationResult, ParameterSet};

/// Per-leg commission applied by the default evaluator (0.05%)
pub const DEFAULT_COMMISSION: f64 = 0.0005;

/// Scores one parameter set against a series
pub trait Evaluator: Send + Sync {
    fn evaluate(
        &self,
        parameters: &ParameterSet,
        series: &[Bar],
    ) -> Result<EvaluationResult, EvaluationError>;
}

impl<F> Evaluator for F
where
    F: Fn(&ParameterSet, &[Bar]) -> Result<EvaluationResult, EvaluationError> + Send + Sync,
{
    fn evaluate(
        &self,
        parameters: &ParameterSet,
        series: &[Bar],
    ) -> Result<EvaluationResult, EvaluationError> {
        self(parameters, series)
    }
}

/// Evaluator backed by [`RsiDoubleConfirm`] and [`BacktestEngine`]
#[derive(Debug, Clone)]
pub struct BacktestEvaluator {
    commission: f64,
}

impl Default for BacktestEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_COMMISSION)
    }
}

impl BacktestEvaluator {
    pub fn new(commission: f64) -> Self {
        BacktestEvaluator { commission }
    }

    fn run(
        &self,
        parameters: &ParameterSet,
        series: &[Bar],
    ) -> Result<EvaluationResult, EvaluationError> {
        let strategy = RsiDoubleConfirm::new(
            parameters.rsi_period,
            parameters.oversold,
            parameters.overbought,
        )?;
        let engine = BacktestEngine::new(
            Box::new(strategy),
            parameters.take_profit,
            parameters.stop_loss,
            self.commission,
        )?;

        let result = engine.run(series)?;
        Ok(EvaluationResult::new(*parameters, result.metrics))
    }
}

impl Evaluator for BacktestEvaluator {
    fn evaluate(
        &self,
        parameters: &ParameterSet,
        series: &[Bar],
    ) -> Result<EvaluationResult, EvaluationError> {
        contain(|| self.run(parameters, series))
    }
}

/// Run `f`, turning a panic into [`EvaluationError::Panicked`]
pub fn contain<T, F>(f: F) -> Result<T, EvaluationError>
where
    F: FnOnce() -> Result<T, EvaluationError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(EvaluationError::Panicked(msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(prices: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| Bar {
                timestamp: start + Duration::minutes(i as i64),
                price,
                volume: 1.0,
                low: price * 0.999,
                high: price * 1.001,
            })
            .collect()
    }

    #[test]
    fn test_invalid_parameters_become_failure() {
        let evaluator = BacktestEvaluator::default();
        let params = ParameterSet {
            oversold: 70.0,
            overbought: 60.0,
            ..ParameterSet::default()
        };
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + (i % 7) as f64).collect();

        let err = evaluator.evaluate(&params, &series(&prices)).unwrap_err();
        assert!(matches!(err, EvaluationError::InvalidParameters(_)));
    }

    #[test]
    fn test_short_series_becomes_failure() {
        let evaluator = BacktestEvaluator::default();
        let err = evaluator
            .evaluate(&ParameterSet::default(), &series(&[100.0, 101.0]))
            .unwrap_err();
        assert!(matches!(err, EvaluationError::InsufficientData { .. }));
    }

    #[test]
    fn test_successful_evaluation_carries_parameters() {
        let evaluator = BacktestEvaluator::default();
        let prices: Vec<f64> = (0..200)
            .map(|i| 100.0 + 5.0 * ((i as f64) / 6.0).sin())
            .collect();
        let params = ParameterSet::default();

        let result = evaluator.evaluate(&params, &series(&prices)).unwrap();
        assert_eq!(result.parameters, params);
        assert_eq!(result.total_trades, result.metrics.total_trades);
        assert!(result.win_rate.is_finite());
    }

    #[test]
    fn test_panic_is_contained() {
        let panicking = |_: &ParameterSet, _: &[Bar]| -> Result<EvaluationResult, EvaluationError> {
            panic!("engine blew up")
        };
        let err = contain(|| panicking.evaluate(&ParameterSet::default(), &[])).unwrap_err();
        assert_eq!(err, EvaluationError::Panicked("engine blew up".to_string()));
    }
}
