//! Async runtime utilities for Quarry.
//!
//! Provides cooperative cancellation and a blocking bridge for callers that
//! live outside an async runtime.

mod cancel;

use std::future::Future;

use common_error::{QueryError, QueryResult};
use tokio::runtime::Runtime;

pub use cancel::{CancellationHandle, CancellationToken};

/// Create a Tokio runtime for blocking operations.
pub fn get_runtime() -> QueryResult<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| QueryError::internal(format!("Failed to create runtime: {e}")))
}

/// Block on a future using a fresh current-thread runtime.
pub fn block_on<F: Future>(future: F) -> QueryResult<F::Output> {
    let runtime = get_runtime()?;
    Ok(runtime.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on() {
        let value = block_on(async { 21 * 2 }).unwrap();
        assert_eq!(value, 42);
    }
}
