//! Core data types shared by the optimizer, the result store and the live consumer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound reported for profit factor when a run has no losing trades
pub const PROFIT_FACTOR_CAP: f64 = 100.0;

/// One fixed-interval observation of the historical series.
///
/// Only the fields the strategy consumes are retained; `price` is the close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: f64,
    pub low: f64,
    pub high: f64,
}

/// Ordered bars, oldest first
pub type TimeSeries = Vec<Bar>;

/// Tunable parameters of the RSI strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub rsi_period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
}

impl ParameterSet {
    /// A set is only ever evaluated when the oversold threshold sits below the overbought one
    pub fn is_valid(&self) -> bool {
        self.oversold < self.overbought
    }
}

impl Default for ParameterSet {
    /// Fallback used whenever no optimized set is available
    fn default() -> Self {
        ParameterSet {
            rsi_period: 10,
            oversold: 20.0,
            overbought: 65.0,
            take_profit: 0.015,
            stop_loss: -0.007,
        }
    }
}

impl std::fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RSI:{} OS:{} OB:{} TP:{:.3} SL:{:.3}",
            self.rsi_period, self.oversold, self.overbought, self.take_profit, self.stop_loss
        )
    }
}

/// Summary statistics of one simulated run. Percentages are in percent units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_trades: usize,
    pub win_rate: f64,
    pub total_profit: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub avg_profit: f64,
}

impl Metrics {
    /// Replace non-finite values so the record stays valid JSON
    pub fn sanitized(self) -> Self {
        fn finite(v: f64, fallback: f64) -> f64 {
            if v.is_finite() {
                v
            } else {
                fallback
            }
        }

        Metrics {
            total_trades: self.total_trades,
            win_rate: finite(self.win_rate, 0.0),
            total_profit: finite(self.total_profit, 0.0),
            profit_factor: if self.profit_factor == f64::INFINITY {
                PROFIT_FACTOR_CAP
            } else {
                finite(self.profit_factor, 0.0)
            },
            max_drawdown: finite(self.max_drawdown, 0.0),
            avg_profit: finite(self.avg_profit, 0.0),
        }
    }
}

/// Outcome of evaluating one candidate.
///
/// The ranking fields are duplicated from `metrics` at the top level, which is
/// also how they appear in the persisted cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub parameters: ParameterSet,
    pub metrics: Metrics,
    pub total_trades: usize,
    pub win_rate: f64,
    pub total_profit: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub avg_profit: f64,
}

impl EvaluationResult {
    pub fn new(parameters: ParameterSet, metrics: Metrics) -> Self {
        EvaluationResult {
            parameters,
            metrics,
            total_trades: metrics.total_trades,
            win_rate: metrics.win_rate,
            total_profit: metrics.total_profit,
            profit_factor: metrics.profit_factor,
            max_drawdown: metrics.max_drawdown,
            avg_profit: metrics.avg_profit,
        }
    }

    /// Copy with every metric forced finite, top-level fields kept in sync
    pub fn sanitized(&self) -> Self {
        EvaluationResult::new(self.parameters, self.metrics.sanitized())
    }
}

/// Ranked evaluation results, best first
pub type Leaderboard = Vec<EvaluationResult>;

/// Why a simulated position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Signal,
    EndOfData,
}

/// A completed round trip in the simulated trade log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Net return in percent after commission on both legs
    pub return_pct: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.return_pct > 0.0
    }
}
