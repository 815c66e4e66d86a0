/*!
 * Probe Race - Main Entry Point
 *
 * Runs the two built-in scenarios:
 * - Database calls, sequential then concurrent, with timings
 * - Chicken vs beef grocery price race
 */

use std::error::Error;
use tracing::{info, warn};

use probe_race::scenarios::{announce, db_harness, grocery_race};
use probe_race::{init_tracing, RuntimeConfig, TracingSink};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = RuntimeConfig::from_env()?;

    // Initialize structured tracing
    init_tracing(config.trace_json);

    info!(
        poll_interval_ms = config.probe.poll_interval.as_millis() as u64,
        race_deadline = ?config.race.deadline,
        item_latency_ms = config.harness.item_latency.as_millis() as u64,
        "Probe race starting..."
    );
    info!("================================================");

    let sink = TracingSink::shared();

    info!("Running database calls...");
    let report = db_harness(&config, sink.clone()).run().await;
    info!(
        results = ?report.sequential.entries,
        "Time taken for sequential calls: {}ms",
        report.sequential.elapsed_ms()
    );
    info!(
        results = ?report.concurrent.entries,
        "Time taken for concurrent calls: {}ms",
        report.concurrent.elapsed_ms()
    );
    info!("Speedup: {:.2}x", report.speedup());

    info!("================================================");
    info!("Racing chicken against beef...");
    match grocery_race(&config, sink).await {
        Ok(outcome) => {
            info!(
                elapsed_ms = outcome.elapsed_ms(),
                cancelled = outcome.cancelled(),
                "{}",
                announce(&outcome)
            );
        }
        Err(e) => warn!(error = %e, "No deal found"),
    }

    Ok(())
}
