/*!
 * Grocery Price Race
 *
 * Chicken and beef probes watch four retailer sites. A site is sampled
 * every poll interval with a simulated price in `[0, 30)`; the first price
 * under the product's ceiling wins and is announced as a text (chicken) or
 * an email (beef).
 */

use crate::config::RuntimeConfig;
use crate::core::errors::{CheckError, RaceError};
use crate::monitoring::SharedSink;
use crate::probe::{CheckFn, MessageFn, ProbeConfig, ProbeGroup};
use crate::race::{Race, RaceOutcome};
use rand::Rng;
use std::fmt;
use std::sync::Arc;

pub const WEBSITES: [&str; 4] = ["woolworths.com.au", "coles.com.au", "aldi.com.au", "iga.com.au"];

pub const CHICKEN: &str = "chicken";
pub const BEEF: &str = "beef";

pub const MAX_CHICKEN_PRICE: f64 = 5.0;
pub const MAX_BEEF_PRICE: f64 = 10.0;

/// Upper bound (exclusive) of a simulated price
pub const PRICE_CEILING: f64 = 30.0;

/// Simulated price check, uniform in `[0, PRICE_CEILING)`
pub fn random_price(_site: &str) -> Result<f64, CheckError> {
    Ok(rand::thread_rng().gen::<f64>() * PRICE_CEILING)
}

/// How a deal is announced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    Text,
    Email,
}

impl Alert {
    /// Chicken deals go out by text, everything else by email
    pub fn for_group(group: &str) -> Self {
        if group == CHICKEN {
            Self::Text
        } else {
            Self::Email
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("Text"),
            Self::Email => f.write_str("Email"),
        }
    }
}

fn price_message() -> MessageFn {
    Arc::new(|group: &str, site: &str, price: f64| {
        format!("The price of {group} is ${price:.2} at {site}")
    })
}

/// One probe per site for `product`, satisfied at or under `max_price`
///
/// The stream keeps the default one-slot-per-site buffer, so a site that
/// finds a deal hands it off without waiting for the selector.
pub fn price_group(product: &str, max_price: f64, check: CheckFn, config: &RuntimeConfig) -> ProbeGroup {
    let formatter = price_message();
    ProbeGroup::new(product)
        .with_probes(WEBSITES.iter().map(|site| {
            ProbeConfig::with_shared_check(*site, max_price, Arc::clone(&check))
                .with_poll_interval(config.probe.poll_interval)
                .with_max_attempts(config.probe.max_attempts)
                .with_formatter(Arc::clone(&formatter))
        }))
}

/// Race chicken against beef using simulated prices
pub async fn grocery_race(config: &RuntimeConfig, sink: SharedSink) -> Result<RaceOutcome, RaceError> {
    grocery_race_with(Arc::new(random_price), config, sink).await
}

/// Race chicken against beef with a caller-supplied price check
pub async fn grocery_race_with(
    check: CheckFn,
    config: &RuntimeConfig,
    sink: SharedSink,
) -> Result<RaceOutcome, RaceError> {
    Race::new(sink)
        .with_group(price_group(CHICKEN, MAX_CHICKEN_PRICE, Arc::clone(&check), config))
        .with_group(price_group(BEEF, MAX_BEEF_PRICE, check, config))
        .with_deadline(config.race.deadline)
        .run()
        .await
}

/// Alert line for a decided race
pub fn announce(outcome: &RaceOutcome) -> String {
    let winner = &outcome.winner;
    format!(
        "{} Sent: Found a deal on {}! {}",
        Alert::for_group(&winner.group),
        winner.group,
        winner.message
    )
}
