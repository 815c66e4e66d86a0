/*!
 * Completion Barrier
 *
 * Counted join point: the waiter is released only once every registered
 * unit has signalled completion. Completion is tied to dropping a
 * `CompletionToken`, so each unit signals exactly once, including when its
 * task panics or is aborted.
 */

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

struct Inner {
    outstanding: AtomicUsize,
    released: Notify,
}

/// Counted completion barrier
#[derive(Clone)]
pub struct CompletionBarrier {
    inner: Arc<Inner>,
}

impl CompletionBarrier {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                outstanding: AtomicUsize::new(0),
                released: Notify::new(),
            }),
        }
    }

    /// Track one more unit of work
    ///
    /// Must be called before the unit is spawned so the waiter cannot be
    /// released early.
    pub fn register(&self) -> CompletionToken {
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);
        CompletionToken {
            inner: Some(Arc::clone(&self.inner)),
        }
    }

    /// Units registered but not yet completed
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    /// Wait until the outstanding count reaches zero
    ///
    /// Returns immediately when nothing is registered.
    pub async fn wait(&self) {
        loop {
            let released = self.inner.released.notified();
            tokio::pin!(released);
            // Enable before checking the count so a release between the
            // check and the await is not missed.
            released.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }

            released.await;
        }
    }
}

impl Default for CompletionBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompletionBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionBarrier")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// Proof of registration with a `CompletionBarrier`
///
/// Dropping the token (or calling `complete`) signals completion.
pub struct CompletionToken {
    inner: Option<Arc<Inner>>,
}

impl CompletionToken {
    /// Signal completion explicitly
    pub fn complete(mut self) {
        self.signal();
    }

    fn signal(&mut self) {
        if let Some(inner) = self.inner.take() {
            if inner.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
                inner.released.notify_waiters();
            }
        }
    }
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        self.signal();
    }
}

impl fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionToken")
            .field("pending", &self.inner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    #[tokio::test]
    async fn test_wait_with_nothing_registered() {
        let barrier = CompletionBarrier::new();
        timeout(Duration::from_millis(100), barrier.wait())
            .await
            .expect("empty barrier must release immediately");
    }

    #[tokio::test]
    async fn test_releases_after_all_tokens_complete() {
        let barrier = CompletionBarrier::new();
        let tokens: Vec<_> = (0..3).map(|_| barrier.register()).collect();
        assert_eq!(barrier.outstanding(), 3);

        for (i, token) in tokens.into_iter().enumerate() {
            tokio::spawn(async move {
                sleep(Duration::from_millis(10 * (i as u64 + 1))).await;
                token.complete();
            });
        }

        timeout(Duration::from_secs(1), barrier.wait())
            .await
            .expect("barrier should release");
        assert_eq!(barrier.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_holds_while_a_token_is_alive() {
        let barrier = CompletionBarrier::new();
        let token = barrier.register();

        let blocked = timeout(Duration::from_millis(50), barrier.wait()).await;
        assert!(blocked.is_err());

        drop(token);
        timeout(Duration::from_millis(100), barrier.wait())
            .await
            .expect("dropping the token must release the barrier");
    }

    #[tokio::test]
    async fn test_panicking_unit_still_completes() {
        let barrier = CompletionBarrier::new();
        let token = barrier.register();

        let handle = tokio::spawn(async move {
            let _token = token;
            panic!("unit failed");
        });

        assert!(handle.await.is_err());
        timeout(Duration::from_millis(100), barrier.wait())
            .await
            .expect("panicked unit must not wedge the barrier");
    }
}
