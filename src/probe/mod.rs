/*!
 * Probes
 *
 * A probe is a long-running polling unit: it sleeps for its poll interval,
 * samples one source through a caller-supplied check function and compares
 * the sample against a threshold. The first satisfying sample is emitted on
 * the result stream and the probe stops.
 *
 * ## States
 *
 * ```text
 * Polling --check--> Polling
 *         \-------> Emitted | Errored | TimedOut | Cancelled   (terminal)
 * ```
 *
 * A probe emits at most one outcome. Check failures and exhausted attempts
 * are delivered on the stream as `ProbeError`s instead of retrying forever,
 * and the cancellation token is observed at every sleep and every send.
 */

mod dispatcher;
mod stream;

pub use dispatcher::{DispatchHandle, FanOutDispatcher, ProbeGroup};
pub use stream::{result_stream, ProbeOutcome, ResultReceiver, ResultSender, StreamCapacity};

use crate::core::errors::{CheckError, ProbeError};
use crate::core::types::{Attempt, ProbeResult};
use crate::monitoring::{Category, Event, Payload, Severity, SharedSink};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default delay between two samples of the same source
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Samples a source; must tolerate repeated concurrent calls
pub type CheckFn = Arc<dyn Fn(&str) -> Result<f64, CheckError> + Send + Sync>;

/// Renders the message of a successful result from (group, source, value)
pub type MessageFn = Arc<dyn Fn(&str, &str, f64) -> String + Send + Sync>;

/// Success predicate applied to each sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// `value <= threshold` ("cheap enough")
    #[default]
    AtMost,
    /// `value >= threshold`
    AtLeast,
}

impl Comparison {
    #[inline]
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::AtMost => value <= threshold,
            Self::AtLeast => value >= threshold,
        }
    }
}

/// Immutable description of one probe
#[derive(Clone)]
pub struct ProbeConfig {
    pub source: String,
    pub threshold: f64,
    pub poll_interval: Duration,
    pub comparison: Comparison,
    /// `None` polls until satisfied or cancelled
    pub max_attempts: Option<Attempt>,
    check: CheckFn,
    formatter: Option<MessageFn>,
}

impl ProbeConfig {
    pub fn new<F>(source: impl Into<String>, threshold: f64, check: F) -> Self
    where
        F: Fn(&str) -> Result<f64, CheckError> + Send + Sync + 'static,
    {
        Self::with_shared_check(source, threshold, Arc::new(check))
    }

    /// Reuse one check function across many probes
    pub fn with_shared_check(source: impl Into<String>, threshold: f64, check: CheckFn) -> Self {
        Self {
            source: source.into(),
            threshold,
            poll_interval: DEFAULT_POLL_INTERVAL,
            comparison: Comparison::default(),
            max_attempts: None,
            check,
            formatter: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<Attempt>) -> Self {
        self.max_attempts = max_attempts.filter(|n| *n > 0);
        self
    }

    pub fn with_formatter(mut self, formatter: MessageFn) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Take one sample of the source
    pub fn check(&self) -> Result<f64, CheckError> {
        (self.check)(&self.source)
    }

    pub fn is_satisfied(&self, value: f64) -> bool {
        self.comparison.holds(value, self.threshold)
    }

    pub fn message(&self, group: &str, value: f64) -> String {
        match &self.formatter {
            Some(render) => render(group, &self.source, value),
            None => format!(
                "{group} at {}: {value:.2} (threshold {:.2})",
                self.source, self.threshold
            ),
        }
    }
}

impl fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("source", &self.source)
            .field("threshold", &self.threshold)
            .field("poll_interval", &self.poll_interval)
            .field("comparison", &self.comparison)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Probe lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeState {
    Polling,
    Emitted,
    Errored,
    TimedOut,
    Cancelled,
}

impl ProbeState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Polling)
    }
}

/// A single polling unit bound to one source
pub struct Probe {
    group: Arc<str>,
    config: ProbeConfig,
    sink: SharedSink,
    run_id: Option<Arc<str>>,
    state: ProbeState,
    attempts: Attempt,
}

impl Probe {
    pub fn new(group: Arc<str>, config: ProbeConfig, sink: SharedSink) -> Self {
        Self {
            group,
            config,
            sink,
            run_id: None,
            state: ProbeState::Polling,
            attempts: 0,
        }
    }

    pub fn with_run_id(mut self, run_id: Option<Arc<str>>) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    pub fn attempts(&self) -> Attempt {
        self.attempts
    }

    /// Poll until a terminal state is reached, delivering at most one outcome on `tx`
    pub async fn run(mut self, tx: ResultSender, cancel: CancellationToken) -> ProbeState {
        self.emit(
            Severity::Debug,
            Payload::ProbeStarted {
                group: self.group.to_string(),
                source_label: self.config.source.clone(),
            },
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.finish_cancelled(),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            self.attempts = self.attempts.saturating_add(1);

            let outcome = match self.config.check() {
                Ok(value) if !value.is_finite() => Err(self.check_failure(
                    CheckError::InvalidSample(format!("non-finite sample {value}")),
                )),
                Ok(value) => {
                    let satisfied = self.config.is_satisfied(value);
                    self.emit(
                        Severity::Trace,
                        Payload::ProbeSampled {
                            group: self.group.to_string(),
                            source_label: self.config.source.clone(),
                            attempt: self.attempts,
                            value,
                            satisfied,
                        },
                    );

                    if satisfied {
                        Ok(self.result(value))
                    } else if self.attempts_exhausted() {
                        Err(ProbeError::Timeout {
                            source_label: self.config.source.clone(),
                            attempts: self.attempts,
                        })
                    } else {
                        continue;
                    }
                }
                Err(e) => Err(self.check_failure(e)),
            };

            return self.deliver(outcome, &tx, &cancel).await;
        }
    }

    fn attempts_exhausted(&self) -> bool {
        self.config
            .max_attempts
            .is_some_and(|max| self.attempts >= max)
    }

    fn result(&self, value: f64) -> ProbeResult {
        ProbeResult {
            group: self.group.to_string(),
            source_label: self.config.source.clone(),
            value,
            message: self.config.message(&self.group, value),
            attempts: self.attempts,
        }
    }

    fn check_failure(&self, error: CheckError) -> ProbeError {
        ProbeError::Check {
            source_label: self.config.source.clone(),
            reason: error.to_string(),
        }
    }

    /// Hand the outcome to the stream
    ///
    /// A send the receiver already took counts as delivered even if the
    /// token was cancelled meanwhile. An untaken send is withdrawn on cancel.
    async fn deliver(
        mut self,
        outcome: ProbeOutcome,
        tx: &ResultSender,
        cancel: &CancellationToken,
    ) -> ProbeState {
        let group = self.group.to_string();
        let source_label = self.config.source.clone();
        let (terminal, severity, payload) = match &outcome {
            Ok(result) => (
                ProbeState::Emitted,
                Severity::Debug,
                Payload::ProbeEmitted {
                    group,
                    source_label,
                    value: result.value,
                    attempts: result.attempts,
                },
            ),
            Err(ProbeError::Timeout { attempts, .. }) => (
                ProbeState::TimedOut,
                Severity::Warn,
                Payload::ProbeTimedOut {
                    group,
                    source_label,
                    attempts: *attempts,
                },
            ),
            Err(e) => (
                ProbeState::Errored,
                Severity::Warn,
                Payload::ProbeErrored {
                    group,
                    source_label,
                    reason: e.to_string(),
                },
            ),
        };

        if cancel.is_cancelled() {
            return self.finish_cancelled();
        }

        tokio::select! {
            biased;
            sent = tx.send_async(outcome) => match sent {
                Ok(()) => {
                    self.state = terminal;
                    self.emit(severity, payload);
                    terminal
                }
                // Receiver dropped: nobody wants the outcome any more
                Err(_) => self.finish_cancelled(),
            },
            _ = cancel.cancelled() => self.finish_cancelled(),
        }
    }

    fn finish_cancelled(&mut self) -> ProbeState {
        self.state = ProbeState::Cancelled;
        self.emit(
            Severity::Debug,
            Payload::ProbeCancelled {
                group: self.group.to_string(),
                source_label: self.config.source.clone(),
                attempts: self.attempts,
            },
        );
        self.state
    }

    fn emit(&self, severity: Severity, payload: Payload) {
        self.sink.emit(
            Event::new(severity, Category::Probe, payload).with_run_id(self.run_id.as_deref()),
        );
    }
}
