//! ARB E-Status バッチ実行
//!
//! 実行方法:
//! ```
//! URL=https://... ROLL_NUMBERS=data/roll-number.csv cargo run --example batch_run
//! ```

use arb_scraper::{
    read_roll_number_file, ArchiveIndex, BatchRunner, ChromeLauncher, ScraperConfig,
    SessionDriver,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // .envがあれば読み込む
    if let Ok(env_path) = std::fs::canonicalize(".env") {
        println!("Loading .env from: {:?}", env_path);
        for line in std::fs::read_to_string(".env")?.lines() {
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('\'').trim_matches('"');
                if !key.starts_with('#') && !key.is_empty() {
                    std::env::set_var(key, value);
                }
            }
        }
    }

    let config = ScraperConfig::from_env();
    let roll_file =
        std::env::var("ROLL_NUMBERS").unwrap_or_else(|_| "data/roll-number.csv".to_string());
    let roll_numbers = read_roll_number_file(&roll_file)?;

    println!("=== ARB E-Status Batch ===");
    println!("URL: {}", config.base_url.as_deref().unwrap_or("(not set)"));
    println!("Roll numbers: {} (from {})", roll_numbers.len(), roll_file);
    println!("Output: {:?}", config.output_dir);
    println!("Headless: {}", config.headless);
    println!();

    let output_dir = config.output_dir.clone();
    let mut runner = BatchRunner::new(SessionDriver::new(config, ChromeLauncher));

    let report = runner.run(&roll_numbers).await;
    // ブラウザを閉じる
    runner.finish().await?;
    let report = report?;

    let summary = &report.summary;
    println!();
    println!("=== Results ===");
    println!("Completed: {}/{}", summary.completed, summary.total);
    println!("Skipped: {}", summary.skipped);
    println!("Failed: {}", summary.failed);
    println!("Appeals captured: {}", summary.appeals_captured);

    // 保存済み成果物を読み直してステータス別に集計
    let index = ArchiveIndex::load(&output_dir)?;
    println!();
    println!("Properties in {:?}: {}", output_dir, index.len());
    for (status, count) in index.status_counts() {
        println!("  {}: {}", status, count);
    }

    Ok(())
}
