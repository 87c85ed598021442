//! Cooperative cancellation.
//!
//! A [`CancellationHandle`] is held by whoever may abort a query; the paired
//! [`CancellationToken`] travels with the query and is checked at every
//! suspension point.

use std::sync::Arc;

use common_error::{QueryError, QueryResult};
use tokio::sync::watch;

/// Handle for cancelling query execution.
///
/// This handle is separate from the query itself and can be used to signal
/// cancellation from outside the pipeline.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl CancellationHandle {
    /// Create a new cancellation handle and its token.
    pub fn new() -> (Self, CancellationToken) {
        let (tx, rx) = watch::channel(false);
        let handle = Self {
            cancel_tx: Arc::new(tx),
        };
        let token = CancellationToken { cancel_rx: rx };
        (handle, token)
    }

    /// Cancel the query.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Get another token observing this handle.
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            cancel_rx: self.cancel_tx.subscribe(),
        }
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new().0
    }
}

/// Read side of a cancellation handle.
///
/// Tokens are cheap to clone and can be handed to callbacks that want to
/// abort their own waits cooperatively.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancel_rx: watch::Receiver<bool>,
}

impl CancellationToken {
    /// A token that is never cancelled.
    pub fn none() -> Self {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        Self { cancel_rx: rx }
    }

    /// A token that is already cancelled.
    pub fn cancelled_token() -> Self {
        let (tx, rx) = watch::channel(true);
        drop(tx);
        Self { cancel_rx: rx }
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Fail with `OperationCanceled` if cancellation was requested.
    pub fn check(&self) -> QueryResult<()> {
        if self.is_cancelled() {
            Err(QueryError::OperationCanceled)
        } else {
            Ok(())
        }
    }

    /// Resolve once cancellation is requested.
    ///
    /// Never resolves if the handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel_rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::none()
    }
}
