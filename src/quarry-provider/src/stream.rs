//! Element stream utilities.
//!
//! Providers hand out an [`ElementStream`] per scan: a pull-based cursor that
//! yields one element per fetch and is released when dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use common_error::{QueryError, QueryResult};
use common_runtime::CancellationToken;
use futures::stream::Stream;

// ============================================================================
// ElementStream Type
// ============================================================================

/// A stream of elements from a provider.
pub type ElementStream<T> = Pin<Box<dyn Stream<Item = QueryResult<T>> + Send>>;

// ============================================================================
// Stream Utilities
// ============================================================================

/// Create an empty `ElementStream`.
pub fn empty_stream<T: Send + 'static>() -> ElementStream<T> {
    Box::pin(futures::stream::empty())
}

// ============================================================================
// Cursor Counters
// ============================================================================

/// Counters shared between a provider and the cursors it opened.
#[derive(Debug, Default)]
pub(crate) struct CursorCounters {
    pub(crate) fetched: AtomicU64,
    pub(crate) open_cursors: AtomicU64,
}

// ============================================================================
// MemoryElementStream
// ============================================================================

/// A cancellable stream over in-memory elements.
///
/// Checks the token before every fetch. After the first error the stream is
/// exhausted. An optional injected failure fires when the cursor reaches the
/// given index.
pub struct MemoryElementStream<T> {
    elements: std::vec::IntoIter<T>,
    index: usize,
    cancel: CancellationToken,
    failure: Option<(usize, String)>,
    counters: Option<Arc<CursorCounters>>,
    done: bool,
}

impl<T> MemoryElementStream<T> {
    /// Create a new memory element stream.
    pub fn new(elements: Vec<T>, cancel: CancellationToken) -> Self {
        Self {
            elements: elements.into_iter(),
            index: 0,
            cancel,
            failure: None,
            counters: None,
            done: false,
        }
    }

    /// Fail with a provider error when the cursor reaches `index`.
    #[must_use]
    pub fn with_failure_at(mut self, index: usize, message: impl Into<String>) -> Self {
        self.failure = Some((index, message.into()));
        self
    }

    #[must_use]
    pub(crate) fn with_counters(mut self, counters: Arc<CursorCounters>) -> Self {
        counters.open_cursors.fetch_add(1, Ordering::Relaxed);
        self.counters = Some(counters);
        self
    }

    fn fail(&mut self, err: QueryError) -> Poll<Option<QueryResult<T>>> {
        self.done = true;
        Poll::Ready(Some(Err(err)))
    }
}

impl<T: Send + 'static> MemoryElementStream<T> {
    /// Create a boxed stream.
    pub fn boxed(elements: Vec<T>, cancel: CancellationToken) -> ElementStream<T> {
        Box::pin(Self::new(elements, cancel))
    }
}

impl<T> Unpin for MemoryElementStream<T> {}

impl<T> Stream for MemoryElementStream<T> {
    type Item = QueryResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        if self.cancel.is_cancelled() {
            return self.fail(QueryError::OperationCanceled);
        }
        let injected = match &self.failure {
            Some((at, message)) if *at == self.index => Some(message.clone()),
            _ => None,
        };
        if let Some(message) = injected {
            return self.fail(QueryError::provider(message));
        }

        match self.elements.next() {
            Some(element) => {
                self.index += 1;
                if let Some(counters) = &self.counters {
                    counters.fetched.fetch_add(1, Ordering::Relaxed);
                }
                Poll::Ready(Some(Ok(element)))
            }
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(self.elements.len()))
        }
    }
}

impl<T> Drop for MemoryElementStream<T> {
    fn drop(&mut self) {
        if let Some(counters) = &self.counters {
            counters.open_cursors.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

// ============================================================================
// Stream Extensions
// ============================================================================

/// Extension trait for `ElementStream`.
pub trait ElementStreamExt<T> {
    /// Collect all elements into a vector, stopping at the first error.
    fn collect_vec(self) -> Pin<Box<dyn Future<Output = QueryResult<Vec<T>>> + Send>>;
}

impl<T: Send + 'static> ElementStreamExt<T> for ElementStream<T> {
    fn collect_vec(self) -> Pin<Box<dyn Future<Output = QueryResult<Vec<T>>> + Send>> {
        use futures::StreamExt;

        Box::pin(async move {
            let mut elements = Vec::new();
            let mut stream = self;

            while let Some(result) = stream.next().await {
                elements.push(result?);
            }

            Ok(elements)
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
