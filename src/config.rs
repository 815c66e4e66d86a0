/*!
 * Runtime Configuration
 *
 * Settings for probes, races and the harness, read from the environment:
 *
 * | Variable                  | Default | Meaning                          |
 * |---------------------------|---------|----------------------------------|
 * | `PROBE_POLL_INTERVAL_MS`  | 500     | delay between two samples        |
 * | `PROBE_MAX_ATTEMPTS`      | 0       | polls before giving up, 0 = none |
 * | `RACE_DEADLINE_MS`        | 30000   | race deadline, 0 = none          |
 * | `HARNESS_ITEM_LATENCY_MS` | 250     | simulated work item latency      |
 * | `HARNESS_ITEM_TIMEOUT_MS` | 0       | per-item deadline, 0 = none      |
 * | `PROBE_TRACE_JSON`        | false   | JSON log output                  |
 */

use crate::core::errors::{CoreError, Result};
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::Attempt;
use crate::probe::DEFAULT_POLL_INTERVAL;
use std::str::FromStr;
use std::time::Duration;

/// Probe polling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    pub poll_interval: Duration,
    /// `None` polls until satisfied or cancelled
    pub max_attempts: Option<Attempt>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

/// Race settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceSettings {
    pub deadline: TimeoutPolicy,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            deadline: TimeoutPolicy::default_race(),
        }
    }
}

/// Harness settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessSettings {
    pub item_latency: Duration,
    pub item_timeout: TimeoutPolicy,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            item_latency: Duration::from_millis(250),
            item_timeout: TimeoutPolicy::None,
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeConfig {
    pub probe: ProbeSettings,
    pub race: RaceSettings,
    pub harness: HarnessSettings,
    pub trace_json: bool,
}

impl RuntimeConfig {
    /// Short intervals for tests and benchmarks
    pub const fn fast() -> Self {
        Self {
            probe: ProbeSettings {
                poll_interval: Duration::from_millis(5),
                max_attempts: None,
            },
            race: RaceSettings {
                deadline: TimeoutPolicy::Race(Duration::from_secs(5)),
            },
            harness: HarnessSettings {
                item_latency: Duration::from_millis(10),
                item_timeout: TimeoutPolicy::None,
            },
            trace_json: false,
        }
    }

    /// Read the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse::<u64, _>(&lookup, "PROBE_POLL_INTERVAL_MS")? {
            if ms == 0 {
                return Err(CoreError::Configuration(
                    "PROBE_POLL_INTERVAL_MS must be greater than 0".into(),
                ));
            }
            config.probe.poll_interval = Duration::from_millis(ms);
        }
        if let Some(n) = parse::<Attempt, _>(&lookup, "PROBE_MAX_ATTEMPTS")? {
            config.probe.max_attempts = Some(n).filter(|n| *n > 0);
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "RACE_DEADLINE_MS")? {
            config.race.deadline = TimeoutPolicy::race_from_millis(ms);
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "HARNESS_ITEM_LATENCY_MS")? {
            config.harness.item_latency = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "HARNESS_ITEM_TIMEOUT_MS")? {
            config.harness.item_timeout = TimeoutPolicy::item_from_millis(ms);
        }
        if let Some(raw) = lookup("PROBE_TRACE_JSON") {
            config.trace_json = parse_flag("PROBE_TRACE_JSON", &raw)?;
        }

        Ok(config)
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            CoreError::Configuration(format!("{key}={raw:?} is not valid: {e}"))
        }),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(CoreError::Configuration(format!(
            "{key}={raw:?} is not a boolean"
        ))),
    }
}
