//! Settings handed to the live trading process
//!
//! Built once at startup from the bot configuration and the selected
//! parameter set, then passed by value to whatever consumes it.

use serde::{Deserialize, Serialize};

use crate::config::LiveConfig;
use crate::ParameterSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSettings {
    pub use_testnet: bool,
    pub position_value_usd: f64,
    pub max_total_position_usd: f64,
    pub cycle_interval_secs: u64,
    pub buy_cooldown_minutes: u64,
    pub sell_entire_position: bool,

    // Loaded from backtest optimization
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
}

impl LiveSettings {
    pub fn new(live: &LiveConfig, parameters: ParameterSet) -> Self {
        LiveSettings {
            use_testnet: live.use_testnet,
            position_value_usd: live.position_value_usd,
            max_total_position_usd: live.max_total_position_usd,
            cycle_interval_secs: live.cycle_interval_secs,
            buy_cooldown_minutes: live.buy_cooldown_minutes,
            sell_entire_position: live.sell_entire_position,
            rsi_period: parameters.rsi_period,
            rsi_oversold: parameters.oversold,
            rsi_overbought: parameters.overbought,
            take_profit: parameters.take_profit,
            stop_loss: parameters.stop_loss,
        }
    }

    pub fn parameters(&self) -> ParameterSet {
        ParameterSet {
            rsi_period: self.rsi_period,
            oversold: self.rsi_oversold,
            overbought: self.rsi_overbought,
            take_profit: self.take_profit,
            stop_loss: self.stop_loss,
        }
    }

    /// Maximum number of concurrent positions the budget allows
    pub fn max_positions(&self) -> usize {
        if self.position_value_usd <= 0.0 {
            return 0;
        }
        (self.max_total_position_usd / self.position_value_usd).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_defaults() {
        let settings = LiveSettings::new(&LiveConfig::default(), ParameterSet::default());

        assert!(!settings.use_testnet);
        assert_eq!(settings.position_value_usd, 20.0);
        assert_eq!(settings.cycle_interval_secs, 60);
        assert_eq!(settings.rsi_period, 10);
        assert_eq!(settings.rsi_oversold, 20.0);
        assert_eq!(settings.rsi_overbought, 65.0);
        assert_eq!(settings.parameters(), ParameterSet::default());
        assert_eq!(settings.max_positions(), 5);
    }
}
