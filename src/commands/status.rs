//! Status command: inspect the cache file

use anyhow::Result;
use chrono::Utc;
use rsi_autotune::store::ResultStore;
use rsi_autotune::TunerConfig;

pub fn run(config: TunerConfig) -> Result<()> {
    let store = ResultStore::from_config(&config.cache);
    let now = Utc::now();

    let record = match store.try_load() {
        Ok(Some(record)) => record,
        Ok(None) => {
            println!("No cache file at {}", store.path().display());
            return Ok(());
        }
        Err(e) => {
            println!("Cache file is unusable: {}", e);
            return Ok(());
        }
    };

    let fresh = store.is_fresh_at(Some(&record), now);
    println!("\n{}", "=".repeat(70));
    println!("CACHE STATUS: {}", store.path().display());
    println!("{}", "=".repeat(70));
    match (record.last_run, record.age_at(now)) {
        (Some(last_run), Some(age)) => println!(
            "Last run:    {} ({}h {}m ago)",
            last_run.to_rfc3339(),
            age.num_hours(),
            age.num_minutes() % 60
        ),
        _ => println!("Last run:    unknown"),
    }
    println!(
        "Fresh:       {} (TTL {}h)",
        if fresh { "yes" } else { "no" },
        store.ttl().num_hours()
    );
    println!("Data points: {}", record.data_points);
    println!("Strategies:  {}", record.best_strategies.len());

    for (i, strategy) in record.best_strategies.iter().take(3).enumerate() {
        println!(
            "\n{}. Win Rate: {:.2}% | Profit: {:.2}% | Trades: {}",
            i + 1,
            strategy.win_rate,
            strategy.total_profit,
            strategy.total_trades
        );
        println!("   Parameters: {}", strategy.parameters);
    }
    println!("{}", "=".repeat(70));

    Ok(())
}
