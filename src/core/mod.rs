/*!
 * Core Module
 * Fundamental types, timeout policies and error handling
 */

pub mod errors;
pub mod sync;
pub mod timeout;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use timeout::TimeoutPolicy;
pub use types::*;
