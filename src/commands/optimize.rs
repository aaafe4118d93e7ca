//! Optimize command: forced full run with progress tracking

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rsi_autotune::evaluator::BacktestEvaluator;
use rsi_autotune::initializer::Initializer;
use rsi_autotune::optimizer::Optimizer;
use rsi_autotune::TunerConfig;
use std::path::PathBuf;
use tracing::info;

pub fn run(
    mut config: TunerConfig,
    top: usize,
    sequential: bool,
    offline: Option<PathBuf>,
) -> Result<()> {
    info!("Starting optimization");
    if sequential {
        config.optimization.parallel = false;
    }

    println!("\n{}", "=".repeat(70));
    println!("OPTIMIZATION SUMMARY");
    println!("{}", "=".repeat(70));
    println!("  Symbol:        {} ({})", config.market.symbol, config.market.interval);
    println!(
        "  Parameters:    {} combinations ({} raw)",
        config.grid.valid_combinations(),
        config.grid.raw_combinations()
    );
    println!("  Trade floor:   {}", config.optimization.min_trades);
    let mode = if config.optimization.parallel {
        "parallel"
    } else {
        "sequential"
    };
    println!("  Mode:          {}", mode);
    println!("{}\n", "=".repeat(70));

    let pb = ProgressBar::new(config.grid.valid_combinations() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("⚡ {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}, {per_sec:.2}]")?
            .progress_chars("█░ "),
    );

    let provider = super::build_provider(&config, offline)?;
    let evaluator = BacktestEvaluator::new(config.optimization.commission);
    let optimizer =
        Optimizer::new(config.grid.clone(), config.optimization.clone()).with_progress(pb);
    let initializer =
        Initializer::new(&config, provider, Box::new(evaluator)).with_optimizer(optimizer);

    let report = match initializer.run_optimization() {
        Ok(report) => report,
        Err(e) => {
            println!("Optimization failed: {}", e);
            println!("Live trading would fall back to defaults: {}", initializer.defaults());
            return Ok(());
        }
    };

    println!(
        "Tested {} combinations: {} qualified, {} below trade floor, {} failed",
        report.tested, report.qualified, report.below_min_trades, report.failed
    );

    let display_count = top.min(report.leaderboard.len());
    println!("\n{}", "=".repeat(100));
    println!("TOP {} OPTIMIZATION RESULTS (sorted by win rate, total profit)", display_count);
    println!("{}", "=".repeat(100));
    println!(
        "{:<6} {:>9} {:>9} {:>8} {:>8} {:>8} {:>8} | {}",
        "Rank", "WinRate%", "Profit%", "Trades", "PF", "MaxDD%", "Avg%", "Parameters"
    );
    println!("{}", "-".repeat(100));

    for (i, result) in report.leaderboard.iter().take(top).enumerate() {
        println!(
            "{:<6} {:>9.2} {:>9.2} {:>8} {:>8.2} {:>8.2} {:>8.3} | {}",
            i + 1,
            result.win_rate,
            result.total_profit,
            result.total_trades,
            result.profit_factor,
            result.max_drawdown,
            result.avg_profit,
            result.parameters
        );
    }
    println!("{}", "=".repeat(100));
    println!(
        "Saved top {} strategies to {}",
        report.leaderboard.len(),
        initializer.store().path().display()
    );

    Ok(())
}
