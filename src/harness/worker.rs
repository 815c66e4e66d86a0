/*!
 * Worker Seam
 *
 * The per-item function the harness drives. Any
 * `Fn(WorkItem<P>) -> impl Future<Output = WorkOutput>` closure qualifies.
 */

use crate::core::errors::WorkError;
use crate::core::types::WorkItem;
use futures::future::BoxFuture;
use std::future::Future;

/// What a worker produces for one item
pub type WorkOutput = Result<String, WorkError>;

/// Per-item worker; must be safe to run concurrently for distinct items
pub trait Worker<P>: Send + Sync + 'static {
    fn run(&self, item: WorkItem<P>) -> BoxFuture<'static, WorkOutput>;
}

impl<P, F, Fut> Worker<P> for F
where
    F: Fn(WorkItem<P>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = WorkOutput> + Send + 'static,
{
    fn run(&self, item: WorkItem<P>) -> BoxFuture<'static, WorkOutput> {
        Box::pin(self(item))
    }
}
