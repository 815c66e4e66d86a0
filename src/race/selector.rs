/*!
 * Race Selector
 *
 * Waits on several result streams and returns the first qualifying result.
 *
 * ## Tie-break
 *
 * Every poll walks the streams in a freshly shuffled order and takes the
 * first one that is ready, so among streams that became ready in the same
 * instant each is equally likely to win. No stream is favoured by position.
 *
 * ## Failures
 *
 * `Err` outcomes never win. They are collected and the stream is re-armed;
 * a stream that disconnects drops out. When every stream has dropped out
 * the race is `Exhausted`.
 */

use crate::core::errors::{ProbeError, RaceError};
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::ProbeResult;
use crate::probe::{ProbeOutcome, ResultReceiver};
use flume::r#async::RecvFut;
use rand::seq::SliceRandom;
use std::future::{poll_fn, Future};
use std::pin::Pin;
use std::task::Poll;
use tokio_util::sync::CancellationToken;

type PendingRecv = Pin<Box<RecvFut<'static, ProbeOutcome>>>;

/// The winning result and what was seen on the way
#[derive(Debug, Clone)]
pub struct Selection {
    pub result: ProbeResult,
    /// Index of the winning stream in the order passed to `RaceSelector::new`
    pub stream_index: usize,
    /// Failure outcomes consumed before the winner arrived
    pub failures: Vec<ProbeError>,
}

/// First-past-the-post selection over two or more streams
pub struct RaceSelector {
    streams: Vec<ResultReceiver>,
    deadline: TimeoutPolicy,
    on_decision: Option<CancellationToken>,
}

impl RaceSelector {
    pub fn new(streams: Vec<ResultReceiver>) -> Result<Self, RaceError> {
        if streams.len() < 2 {
            return Err(RaceError::TooFewStreams {
                found: streams.len(),
            });
        }
        Ok(Self {
            streams,
            deadline: TimeoutPolicy::None,
            on_decision: None,
        })
    }

    pub fn with_deadline(mut self, deadline: TimeoutPolicy) -> Self {
        self.deadline = deadline;
        self
    }

    /// Cancel `token` as soon as the race is decided, whatever the decision
    pub fn cancel_on_decision(mut self, token: CancellationToken) -> Self {
        self.on_decision = Some(token);
        self
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Block until one stream yields a qualifying result
    ///
    /// Consumes exactly one `Ok` outcome and leaves the other streams
    /// undrained.
    pub async fn select(self) -> Result<Selection, RaceError> {
        let decision = self.deadline.apply(first_ready(&self.streams)).await;

        if let Some(token) = &self.on_decision {
            token.cancel();
        }

        match decision {
            Ok(selection) => selection,
            Err(elapsed) => Err(RaceError::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
            }),
        }
    }
}

fn arm(stream: &ResultReceiver) -> PendingRecv {
    Box::pin(stream.clone().into_recv_async())
}

async fn first_ready(streams: &[ResultReceiver]) -> Result<Selection, RaceError> {
    let mut pending: Vec<Option<PendingRecv>> = streams.iter().map(|s| Some(arm(s))).collect();
    let mut order: Vec<usize> = (0..streams.len()).collect();
    let mut failures = Vec::new();

    poll_fn(|cx| loop {
        order.shuffle(&mut rand::thread_rng());
        let mut progressed = false;

        for &i in &order {
            let Some(recv) = pending[i].as_mut() else {
                continue;
            };

            let polled = recv.as_mut().poll(cx);
            match polled {
                Poll::Pending => {}
                Poll::Ready(Ok(Ok(result))) => {
                    return Poll::Ready(Ok(Selection {
                        result,
                        stream_index: i,
                        failures: std::mem::take(&mut failures),
                    }));
                }
                Poll::Ready(Ok(Err(failure))) => {
                    failures.push(failure);
                    pending[i] = Some(arm(&streams[i]));
                    progressed = true;
                }
                Poll::Ready(Err(_disconnected)) => {
                    pending[i] = None;
                    progressed = true;
                }
            }
        }

        if pending.iter().all(Option::is_none) {
            return Poll::Ready(Err(RaceError::Exhausted {
                failures: std::mem::take(&mut failures),
            }));
        }

        // Re-armed streams have not registered a waker yet
        if !progressed {
            return Poll::Pending;
        }
    })
    .await
}
