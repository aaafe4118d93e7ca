//! Backtesting engine
//!
//! Long-only, single-position simulator with fixed take-profit / stop-loss
//! exits and per-leg commission.

use crate::error::EvaluationError;
use crate::strategy::{Signal, SignalGenerator};
use crate::{Bar, ExitReason, Metrics, Trade, PROFIT_FACTOR_CAP};

/// Backtest engine
pub struct BacktestEngine {
    generator: Box<dyn SignalGenerator>,
    take_profit: f64,
    stop_loss: f64,
    commission: f64,
}

/// Trade log and summary of one simulation
#[derive(Debug, Clone, Default)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub metrics: Metrics,
}

impl BacktestEngine {
    /// `take_profit` is a positive fraction, `stop_loss` a negative one
    /// (0.015 = +1.5%, -0.007 = -0.7%); `commission` applies to each leg.
    pub fn new(
        generator: Box<dyn SignalGenerator>,
        take_profit: f64,
        stop_loss: f64,
        commission: f64,
    ) -> Result<Self, EvaluationError> {
        if !(take_profit.is_finite() && take_profit > 0.0) {
            return Err(EvaluationError::InvalidParameters(format!(
                "take_profit must be positive, got {}",
                take_profit
            )));
        }
        if !(stop_loss.is_finite() && stop_loss < 0.0 && stop_loss > -1.0) {
            return Err(EvaluationError::InvalidParameters(format!(
                "stop_loss must lie in (-1, 0), got {}",
                stop_loss
            )));
        }
        if !(0.0..1.0).contains(&commission) {
            return Err(EvaluationError::InvalidParameters(format!(
                "commission must lie in [0, 1), got {}",
                commission
            )));
        }

        Ok(BacktestEngine {
            generator,
            take_profit,
            stop_loss,
            commission,
        })
    }

    /// Simulate trading over the series
    pub fn run(&self, series: &[Bar]) -> Result<BacktestResult, EvaluationError> {
        let needed = self.generator.warmup() + 1;
        if series.len() < needed {
            return Err(EvaluationError::InsufficientData {
                got: series.len(),
                needed,
            });
        }
        if let Some(idx) = series.iter().position(|b| !is_valid_bar(b)) {
            return Err(EvaluationError::InvalidPrice(idx));
        }

        let prices: Vec<f64> = series.iter().map(|b| b.price).collect();
        let signals = self.generator.generate_signals(&prices);

        let mut trades = Vec::new();
        let mut open: Option<&Bar> = None;

        for (bar, signal) in series.iter().zip(&signals) {
            match open {
                Some(entry) => {
                    let stop_price = entry.price * (1.0 + self.stop_loss);
                    let target_price = entry.price * (1.0 + self.take_profit);

                    // Stop is checked first when both levels fall inside one bar
                    let exit = if bar.low <= stop_price {
                        Some((stop_price, ExitReason::StopLoss))
                    } else if bar.high >= target_price {
                        Some((target_price, ExitReason::TakeProfit))
                    } else if *signal == Signal::Sell {
                        Some((bar.price, ExitReason::Signal))
                    } else {
                        None
                    };

                    if let Some((exit_price, reason)) = exit {
                        trades.push(self.close_position(entry, bar, exit_price, reason));
                        open = None;
                    }
                }
                None if *signal == Signal::Buy => open = Some(bar),
                None => {}
            }
        }

        if let (Some(entry), Some(last)) = (open, series.last()) {
            trades.push(self.close_position(entry, last, last.price, ExitReason::EndOfData));
        }

        let metrics = calculate_metrics(&trades);
        Ok(BacktestResult { trades, metrics })
    }

    fn close_position(
        &self,
        entry: &Bar,
        exit: &Bar,
        exit_price: f64,
        reason: ExitReason,
    ) -> Trade {
        let gross = exit_price / entry.price - 1.0;
        let net = gross - 2.0 * self.commission;

        Trade {
            entry_time: entry.timestamp,
            exit_time: exit.timestamp,
            entry_price: entry.price,
            exit_price,
            return_pct: net * 100.0,
            exit_reason: reason,
        }
    }
}

fn is_valid_bar(bar: &Bar) -> bool {
    [bar.price, bar.low, bar.high]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0)
}

/// Summarize a trade log. An empty log yields all-zero metrics.
pub fn calculate_metrics(trades: &[Trade]) -> Metrics {
    if trades.is_empty() {
        return Metrics::default();
    }

    let total = trades.len() as f64;
    let wins = trades.iter().filter(|t| t.is_win()).count();
    let total_profit: f64 = trades.iter().map(|t| t.return_pct).sum();

    let gross_gains: f64 = trades
        .iter()
        .filter(|t| t.return_pct > 0.0)
        .map(|t| t.return_pct)
        .sum();
    let gross_losses: f64 = trades
        .iter()
        .filter(|t| t.return_pct < 0.0)
        .map(|t| t.return_pct.abs())
        .sum();

    let profit_factor = if gross_losses > 0.0 {
        gross_gains / gross_losses
    } else if gross_gains > 0.0 {
        PROFIT_FACTOR_CAP
    } else {
        0.0
    };

    // Drawdown of the equity curve compounded trade by trade
    let mut equity = 1.0;
    let mut peak = 1.0;
    let mut max_dd: f64 = 0.0;
    for trade in trades {
        equity *= 1.0 + trade.return_pct / 100.0;
        if equity > peak {
            peak = equity;
        }
        max_dd = max_dd.max((peak - equity) / peak);
    }

    Metrics {
        total_trades: trades.len(),
        win_rate: wins as f64 / total * 100.0,
        total_profit,
        profit_factor,
        max_drawdown: max_dd * 100.0,
        avg_profit: total_profit / total,
    }
    .sanitized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    /// Emits a fixed signal sequence regardless of prices
    struct Scripted(Vec<Signal>);

    impl SignalGenerator for Scripted {
        fn generate_signals(&self, prices: &[f64]) -> Vec<Signal> {
            let mut signals = self.0.clone();
            signals.resize(prices.len(), Signal::Hold);
            signals
        }

        fn warmup(&self) -> usize {
            1
        }
    }

    fn bars(prices: &[(f64, f64, f64)]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &(price, low, high))| Bar {
                timestamp: start + Duration::minutes(i as i64),
                price,
                volume: 1.0,
                low,
                high,
            })
            .collect()
    }

    fn trade(return_pct: f64) -> Trade {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Trade {
            entry_time: t,
            exit_time: t,
            entry_price: 100.0,
            exit_price: 100.0 * (1.0 + return_pct / 100.0),
            return_pct,
            exit_reason: ExitReason::Signal,
        }
    }

    fn engine(signals: Vec<Signal>, commission: f64) -> BacktestEngine {
        BacktestEngine::new(Box::new(Scripted(signals)), 0.02, -0.01, commission).unwrap()
    }

    #[test]
    fn test_take_profit_exit() {
        let series = bars(&[
            (100.0, 99.5, 100.5),
            (100.0, 99.5, 100.5),
            (101.0, 100.5, 102.5),
        ]);
        let result = engine(vec![Signal::Hold, Signal::Buy], 0.0)
            .run(&series)
            .unwrap();

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert_relative_eq!(trade.exit_price, 102.0, epsilon = 1e-9);
        assert_relative_eq!(trade.return_pct, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_stop_checked_before_target() {
        let series = bars(&[
            (100.0, 99.5, 100.5),
            (100.0, 98.0, 103.0),
        ]);
        let result = engine(vec![Signal::Buy], 0.0).run(&series).unwrap();

        assert_eq!(result.trades[0].exit_reason, ExitReason::StopLoss);
        assert_relative_eq!(result.trades[0].return_pct, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_signal_exit_and_commission() {
        let series = bars(&[
            (100.0, 99.9, 100.1),
            (100.5, 100.4, 100.6),
        ]);
        let result = engine(vec![Signal::Buy, Signal::Sell], 0.0005)
            .run(&series)
            .unwrap();

        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::Signal);
        // 0.5% gross minus 2 x 0.05%
        assert_relative_eq!(trade.return_pct, 0.4, epsilon = 1e-9);
    }

    #[test]
    fn test_open_position_closed_at_end() {
        let series = bars(&[
            (100.0, 99.9, 100.1),
            (100.3, 100.2, 100.4),
            (100.6, 100.5, 100.7),
        ]);
        let result = engine(vec![Signal::Buy], 0.0).run(&series).unwrap();

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::EndOfData);
        assert_relative_eq!(result.trades[0].exit_price, 100.6);
    }

    #[test]
    fn test_insufficient_data() {
        let series = bars(&[(100.0, 99.0, 101.0)]);
        let err = engine(vec![], 0.0).run(&series).unwrap_err();
        assert_eq!(err, EvaluationError::InsufficientData { got: 1, needed: 2 });
    }

    #[test]
    fn test_invalid_price() {
        let series = bars(&[(100.0, 99.0, 101.0), (f64::NAN, 99.0, 101.0)]);
        let err = engine(vec![], 0.0).run(&series).unwrap_err();
        assert_eq!(err, EvaluationError::InvalidPrice(1));
    }

    #[test]
    fn test_rejects_bad_exit_levels() {
        assert!(BacktestEngine::new(Box::new(Scripted(vec![])), 0.0, -0.01, 0.0).is_err());
        assert!(BacktestEngine::new(Box::new(Scripted(vec![])), 0.01, 0.01, 0.0).is_err());
        assert!(BacktestEngine::new(Box::new(Scripted(vec![])), 0.01, -0.01, -0.1).is_err());
    }

    #[test]
    fn test_metrics() {
        let trades = vec![trade(2.0), trade(-1.0), trade(1.0), trade(-0.5)];
        let metrics = calculate_metrics(&trades);

        assert_eq!(metrics.total_trades, 4);
        assert_relative_eq!(metrics.win_rate, 50.0);
        assert_relative_eq!(metrics.total_profit, 1.5, epsilon = 1e-9);
        assert_relative_eq!(metrics.avg_profit, 0.375, epsilon = 1e-9);
        assert_relative_eq!(metrics.profit_factor, 2.0, epsilon = 1e-9);
        // Peak 1.02, trough 1.02 * 0.99
        assert_relative_eq!(metrics.max_drawdown, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_metrics_without_losses() {
        let metrics = calculate_metrics(&[trade(1.0), trade(0.5)]);
        assert_eq!(metrics.profit_factor, PROFIT_FACTOR_CAP);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(calculate_metrics(&[]), Metrics::default());
    }
}
