//! Parameter grid enumeration
//!
//! Generates the cartesian product of the five strategy grids for optimization.
//! Iteration order is fixed: `rsi_period` outermost, `stop_loss` innermost.

use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::ParameterSet;

/// Discrete values to test for each strategy parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterGrid {
    pub rsi_period: Vec<usize>,
    pub oversold: Vec<f64>,
    pub overbought: Vec<f64>,
    pub take_profit: Vec<f64>,
    pub stop_loss: Vec<f64>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        ParameterGrid {
            rsi_period: vec![7, 10, 14],
            oversold: vec![10.0, 15.0, 20.0, 25.0, 30.0],
            overbought: vec![60.0, 65.0, 70.0, 75.0, 80.0, 85.0],
            take_profit: vec![0.01, 0.015, 0.02, 0.025, 0.030],
            stop_loss: vec![-0.005, -0.007, -0.01, -0.015, -0.020],
        }
    }
}

impl ParameterGrid {
    /// Every combination, including the ones that fail the validity predicate
    pub fn iter_raw(&self) -> impl Iterator<Item = ParameterSet> + '_ {
        iproduct!(
            &self.rsi_period,
            &self.oversold,
            &self.overbought,
            &self.take_profit,
            &self.stop_loss
        )
        .map(
            |(&rsi_period, &oversold, &overbought, &take_profit, &stop_loss)| ParameterSet {
                rsi_period,
                oversold,
                overbought,
                take_profit,
                stop_loss,
            },
        )
    }

    /// Combinations eligible for evaluation (`oversold < overbought`).
    ///
    /// Lazy and restartable: each call starts a fresh pass in the same order.
    pub fn iter(&self) -> impl Iterator<Item = ParameterSet> + '_ {
        self.iter_raw().filter(ParameterSet::is_valid)
    }

    /// Product of the grid sizes
    pub fn raw_combinations(&self) -> usize {
        self.rsi_period.len()
            * self.oversold.len()
            * self.overbought.len()
            * self.take_profit.len()
            * self.stop_loss.len()
    }

    /// Number of combinations `iter` yields
    pub fn valid_combinations(&self) -> usize {
        let threshold_pairs = iproduct!(&self.oversold, &self.overbought)
            .filter(|(os, ob)| os < ob)
            .count();
        self.rsi_period.len() * threshold_pairs * self.take_profit.len() * self.stop_loss.len()
    }

    /// Names of any empty grids
    pub fn empty_axes(&self) -> Vec<&'static str> {
        let mut empty = Vec::new();
        if self.rsi_period.is_empty() {
            empty.push("rsi_period");
        }
        if self.oversold.is_empty() {
            empty.push("oversold");
        }
        if self.overbought.is_empty() {
            empty.push("overbought");
        }
        if self.take_profit.is_empty() {
            empty.push("take_profit");
        }
        if self.stop_loss.is_empty() {
            empty.push("stop_loss");
        }
        empty
    }
}
