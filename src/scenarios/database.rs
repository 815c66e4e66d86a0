/*!
 * Database Call Harness
 *
 * Five records, each "fetched" with a fixed simulated latency, run first
 * sequentially and then concurrently.
 */

use crate::config::RuntimeConfig;
use crate::core::errors::WorkError;
use crate::core::types::WorkItem;
use crate::harness::{Harness, Worker};
use crate::monitoring::SharedSink;
use std::time::Duration;

pub const DB_DATA: [&str; 5] = ["data1", "data2", "data3", "data4", "data5"];

/// The records as numbered work items
pub fn db_items() -> Vec<WorkItem<String>> {
    WorkItem::enumerate(DB_DATA.iter().map(|record| record.to_string()))
}

/// Simulated database call: wait `latency`, return the record
pub fn db_call(latency: Duration) -> impl Worker<String> {
    move |item: WorkItem<String>| async move {
        tokio::time::sleep(latency).await;
        Ok::<_, WorkError>(item.payload)
    }
}

/// Harness over `DB_DATA` using the configured latency and item timeout
pub fn db_harness(config: &RuntimeConfig, sink: SharedSink) -> Harness<String> {
    Harness::new(db_items(), db_call(config.harness.item_latency), sink)
        .with_item_timeout(config.harness.item_timeout)
}
