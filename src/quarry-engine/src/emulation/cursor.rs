//! Emulation cursor.

use futures::StreamExt;
use log::trace;

use common_error::QueryResult;
use common_runtime::CancellationToken;
use quarry_core::Element;
use quarry_expr::SourceRef;
use quarry_provider::{ElementStream, QuerySource};

/// Cursor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Open and ready to fetch.
    Open,
    /// Source reported its end.
    Exhausted,
    /// Released.
    Closed,
}

/// Forward cursor over one source during emulation.
///
/// # Lifecycle
///
/// ```text
/// open → next* → close
/// ```
///
/// - `open()` checks cancellation, then asks the provider for a stream
/// - `next()` checks cancellation before every fetch
/// - `close()` releases the provider stream (idempotent)
///
/// Every emulated operator closes its cursors explicitly on every exit path.
/// Dropping an open cursor releases it as well.
pub struct EmulationCursor<T> {
    stream: Option<ElementStream<T>>,
    source: SourceRef,
    cancel: CancellationToken,
    state: CursorState,
    fetched: usize,
}

impl<T: Element> EmulationCursor<T> {
    /// Open a cursor over `source`.
    pub async fn open(source: &QuerySource<T>, cancel: &CancellationToken) -> QueryResult<Self> {
        cancel.check()?;
        let stream = source.scan(cancel).await?;
        trace!("Opened cursor on '{}'", source.source());

        Ok(Self {
            stream: Some(stream),
            source: source.source().clone(),
            cancel: cancel.clone(),
            state: CursorState::Open,
            fetched: 0,
        })
    }

    /// Fetch the next element, or `None` once the source is exhausted.
    pub async fn next(&mut self) -> QueryResult<Option<T>> {
        self.cancel.check()?;

        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        if self.state == CursorState::Exhausted {
            return Ok(None);
        }

        match stream.next().await.transpose()? {
            Some(element) => {
                self.fetched += 1;
                Ok(Some(element))
            }
            None => {
                self.state = CursorState::Exhausted;
                Ok(None)
            }
        }
    }

    /// Drain the remaining elements.
    pub async fn collect(&mut self) -> QueryResult<Vec<T>> {
        let mut elements = Vec::new();
        while let Some(element) = self.next().await? {
            elements.push(element);
        }
        Ok(elements)
    }
}

impl<T> EmulationCursor<T> {
    /// Release the provider stream.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            trace!(
                "Released cursor on '{}' after {} fetches",
                self.source, self.fetched
            );
        }
        self.state = CursorState::Closed;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Elements fetched so far.
    pub fn fetched(&self) -> usize {
        self.fetched
    }
}

impl<T> Drop for EmulationCursor<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common_error::QueryError;
    use common_runtime::CancellationHandle;
    use quarry_provider::{MemoryProvider, QueryProvider};

    use super::*;

    fn setup() -> (Arc<MemoryProvider<i32>>, QuerySource<i32>) {
        let provider = Arc::new(MemoryProvider::new("test").with_collection("xs", vec![1, 2, 3]));
        let source = QuerySource::new(Arc::clone(&provider) as Arc<dyn QueryProvider<i32>>, "xs");
        (provider, source)
    }

    #[tokio::test]
    async fn test_cursor_lifecycle() {
        let (provider, source) = setup();
        let mut cursor = EmulationCursor::open(&source, &CancellationToken::none())
            .await
            .unwrap();

        assert_eq!(cursor.state(), CursorState::Open);
        assert_eq!(cursor.collect().await.unwrap(), vec![1, 2, 3]);
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert_eq!(provider.stats().open_cursors, 1);

        cursor.close();
        cursor.close();
        assert_eq!(cursor.state(), CursorState::Closed);
        assert_eq!(provider.stats().open_cursors, 0);
        assert_eq!(cursor.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cancelled_before_open() {
        let (provider, source) = setup();
        let result = EmulationCursor::open(&source, &CancellationToken::cancelled_token()).await;

        assert!(matches!(result, Err(QueryError::OperationCanceled)));
        assert_eq!(provider.stats().scans, 0);
    }

    #[tokio::test]
    async fn test_cancel_between_fetches() {
        let (provider, source) = setup();
        let (handle, token) = CancellationHandle::new();
        let mut cursor = EmulationCursor::open(&source, &token).await.unwrap();

        assert_eq!(cursor.next().await.unwrap(), Some(1));
        handle.cancel();
        assert!(matches!(cursor.next().await, Err(QueryError::OperationCanceled)));
        assert_eq!(cursor.fetched(), 1);
        assert_eq!(provider.stats().fetched, 1);

        drop(cursor);
        assert_eq!(provider.stats().open_cursors, 0);
    }
}
