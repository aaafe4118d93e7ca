//! RSI double-confirmation signal generator
//!
//! Entry needs two confirmations after an oversold reading: the RSI turns up
//! and the price closes higher. Exit fires when an overbought RSI turns down.

use crate::error::EvaluationError;
use crate::indicators::rsi;

/// Trading signal for a single bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// Produces one signal per bar of a price series
pub trait SignalGenerator: Send + Sync {
    fn generate_signals(&self, prices: &[f64]) -> Vec<Signal>;

    /// Bars needed before the first signal can fire
    fn warmup(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RsiDoubleConfirm {
    period: usize,
    oversold: f64,
    overbought: f64,
}

impl RsiDoubleConfirm {
    pub fn new(period: usize, oversold: f64, overbought: f64) -> Result<Self, EvaluationError> {
        if period < 2 {
            return Err(EvaluationError::InvalidParameters(format!(
                "RSI period must be at least 2, got {}",
                period
            )));
        }
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(oversold) || !in_range(overbought) {
            return Err(EvaluationError::InvalidParameters(format!(
                "RSI thresholds must lie in [0, 100], got {} / {}",
                oversold, overbought
            )));
        }
        if oversold >= overbought {
            return Err(EvaluationError::InvalidParameters(format!(
                "oversold ({}) must be below overbought ({})",
                oversold, overbought
            )));
        }

        Ok(RsiDoubleConfirm {
            period,
            oversold,
            overbought,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl SignalGenerator for RsiDoubleConfirm {
    fn generate_signals(&self, prices: &[f64]) -> Vec<Signal> {
        let rsi_values = rsi(prices, self.period);
        let mut signals = vec![Signal::Hold; prices.len()];

        for i in 1..prices.len() {
            let (Some(prev), Some(cur)) = (rsi_values[i - 1], rsi_values[i]) else {
                continue;
            };

            if prev < self.oversold && cur > prev && prices[i] > prices[i - 1] {
                signals[i] = Signal::Buy;
            } else if prev > self.overbought && cur < prev {
                signals[i] = Signal::Sell;
            }
        }

        signals
    }

    fn warmup(&self) -> usize {
        self.period + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v_shape(down: usize, up: usize) -> Vec<f64> {
        let mut prices: Vec<f64> = (0..down).map(|i| 100.0 - i as f64).collect();
        let bottom = *prices.last().unwrap();
        prices.extend((1..=up).map(|i| bottom + i as f64));
        prices
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(RsiDoubleConfirm::new(1, 20.0, 70.0).is_err());
        assert!(RsiDoubleConfirm::new(14, 70.0, 70.0).is_err());
        assert!(RsiDoubleConfirm::new(14, 80.0, 70.0).is_err());
        assert!(RsiDoubleConfirm::new(14, -5.0, 70.0).is_err());
        assert!(RsiDoubleConfirm::new(14, 20.0, 120.0).is_err());
        assert!(RsiDoubleConfirm::new(14, 20.0, 70.0).is_ok());
    }

    #[test]
    fn test_buy_after_oversold_reversal() {
        let strategy = RsiDoubleConfirm::new(5, 20.0, 80.0).unwrap();
        let prices = v_shape(20, 3);
        let signals = strategy.generate_signals(&prices);

        assert_eq!(signals.len(), prices.len());
        // First bar of the bounce confirms both RSI and price turning up
        assert_eq!(signals[20], Signal::Buy);
        assert!(signals[..20].iter().all(|s| *s != Signal::Buy));
    }

    #[test]
    fn test_sell_after_overbought_turn() {
        let strategy = RsiDoubleConfirm::new(5, 20.0, 80.0).unwrap();
        let mut prices: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        prices.push(110.0);
        let signals = strategy.generate_signals(&prices);

        assert_eq!(signals[20], Signal::Sell);
    }

    #[test]
    fn test_no_signals_during_warmup() {
        let strategy = RsiDoubleConfirm::new(14, 20.0, 80.0).unwrap();
        let prices = v_shape(10, 3);
        let signals = strategy.generate_signals(&prices);
        assert!(signals.iter().all(|s| *s == Signal::Hold));
    }
}
