/*!
 * Synchronization Primitives
 *
 * - `Accumulator`: reader/writer-locked ordered collection for concurrent producers
 * - `CompletionBarrier`: counted join point released when every unit has finished
 */

mod accumulator;
mod barrier;

pub use accumulator::Accumulator;
pub use barrier::{CompletionBarrier, CompletionToken};
