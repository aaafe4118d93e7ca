//! Init command: resolve the parameters the live process should trade with

use anyhow::Result;
use rsi_autotune::evaluator::BacktestEvaluator;
use rsi_autotune::initializer::{Initializer, ParameterSource};
use rsi_autotune::settings::LiveSettings;
use rsi_autotune::TunerConfig;
use std::path::PathBuf;
use tracing::info;

pub fn run(config: TunerConfig, force: bool, json: bool, offline: Option<PathBuf>) -> Result<()> {
    let provider = super::build_provider(&config, offline)?;
    let evaluator = BacktestEvaluator::new(config.optimization.commission);
    let initializer = Initializer::new(&config, provider, Box::new(evaluator));

    let selection = initializer.select(force);
    let settings = LiveSettings::new(&config.live, selection.parameters);
    info!("Parameter source: {:?}", selection.source);

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let source = match &selection.source {
        ParameterSource::Optimized => "fresh optimization".to_string(),
        ParameterSource::Cached { age } => format!(
            "cache ({}h {}m old)",
            age.num_hours(),
            age.num_minutes() % 60
        ),
        ParameterSource::Default(reason) => format!("defaults ({:?})", reason),
    };

    println!("\n{}", "=".repeat(60));
    println!("LIVE TRADING SETTINGS");
    println!("{}", "=".repeat(60));
    println!("Source:               {}", source);
    println!("Network:              {}", if settings.use_testnet { "testnet" } else { "MAINNET" });
    println!("Position value:       ${:.2}", settings.position_value_usd);
    println!("Max total position:   ${:.2}", settings.max_total_position_usd);
    println!("Max positions:        {}", settings.max_positions());
    println!("Cycle interval:       {}s", settings.cycle_interval_secs);
    println!("Buy cooldown:         {}m", settings.buy_cooldown_minutes);
    println!("Sell entire position: {}", settings.sell_entire_position);
    println!("RSI period:           {}", settings.rsi_period);
    println!("RSI oversold:         {}", settings.rsi_oversold);
    println!("RSI overbought:       {}", settings.rsi_overbought);
    println!("Take profit:          {:.2}%", settings.take_profit * 100.0);
    println!("Stop loss:            {:.2}%", settings.stop_loss * 100.0);
    println!("Summary:              {}", settings.parameters());
    println!("{}", "=".repeat(60));

    Ok(())
}
