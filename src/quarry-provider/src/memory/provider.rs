//! `MemoryProvider` implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use common_error::{QueryError, QueryResult};
use common_runtime::CancellationToken;
use quarry_core::Element;
use quarry_expr::{QueryExpr, QueryOp, QueryOutput, SourceRef};
use tokio::sync::RwLock;

use crate::caps::{ProviderCaps, ProviderId};
use crate::provider::QueryProvider;
use crate::stream::{CursorCounters, ElementStream, MemoryElementStream};

use super::native::{self, Rows};

// ============================================================================
// MemoryStats
// ============================================================================

/// Snapshot of how a `MemoryProvider` has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Cursors opened through `scan`.
    pub scans: u64,
    /// Elements yielded by those cursors.
    pub fetched: u64,
    /// Native executions requested through `execute`.
    pub executed: u64,
    /// Cursors opened and not yet released.
    pub open_cursors: u64,
}

// ============================================================================
// MemoryProvider
// ============================================================================

/// In-memory provider over named collections.
///
/// # Thread Safety
///
/// `MemoryProvider` is thread-safe and can be shared across async tasks.
/// Collections sit behind a `RwLock`; scans read a copy of the collection
/// taken when the cursor opens.
pub struct MemoryProvider<T> {
    id: ProviderId,
    name: String,
    caps: ProviderCaps,
    collections: RwLock<HashMap<SourceRef, Vec<T>>>,
    failures: HashMap<SourceRef, (usize, String)>,
    counters: Arc<CursorCounters>,
    scans: AtomicU64,
    executed: AtomicU64,
}

impl<T: Element> MemoryProvider<T> {
    /// Create an empty provider that translates nothing.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ProviderId::next(),
            name: name.into(),
            caps: ProviderCaps::none(),
            collections: RwLock::new(HashMap::new()),
            failures: HashMap::new(),
            counters: Arc::new(CursorCounters::default()),
            scans: AtomicU64::new(0),
            executed: AtomicU64::new(0),
        }
    }

    /// Set the declared capabilities.
    #[must_use]
    pub fn with_caps(mut self, caps: ProviderCaps) -> Self {
        self.caps = caps;
        self
    }

    /// Add (or replace) a named collection.
    #[must_use]
    pub fn with_collection(mut self, source: impl Into<SourceRef>, elements: Vec<T>) -> Self {
        self.collections.get_mut().insert(source.into(), elements);
        self
    }

    /// Fail scans and native executions of `source` when they reach `index`.
    #[must_use]
    pub fn with_failure_at(
        mut self,
        source: impl Into<SourceRef>,
        index: usize,
        message: impl Into<String>,
    ) -> Self {
        self.failures
            .insert(source.into(), (index, message.into()));
        self
    }

    /// Replace a collection's contents.
    pub async fn insert(&self, source: impl Into<SourceRef>, elements: Vec<T>) {
        self.collections.write().await.insert(source.into(), elements);
    }

    /// Number of elements in a collection.
    pub async fn collection_len(&self, source: &SourceRef) -> Option<usize> {
        self.collections.read().await.get(source).map(Vec::len)
    }

    /// Current usage counters.
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            scans: self.scans.load(Ordering::Relaxed),
            fetched: self.counters.fetched.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            open_cursors: self.counters.open_cursors.load(Ordering::Relaxed),
        }
    }

    async fn snapshot(&self, source: &SourceRef) -> QueryResult<Vec<T>> {
        self.collections
            .read()
            .await
            .get(source)
            .cloned()
            .ok_or_else(|| {
                QueryError::provider(format!(
                    "provider '{}' has no source '{source}'",
                    self.name
                ))
            })
    }

    async fn rows<'a>(
        &'a self,
        source: &SourceRef,
        cancel: &'a CancellationToken,
    ) -> QueryResult<Rows<'a, T>> {
        let elements = self.snapshot(source).await?;
        Ok(Rows::new(elements, self.failures.get(source), cancel))
    }
}

#[async_trait]
impl<T: Element> QueryProvider<T> for MemoryProvider<T> {
    fn provider_id(&self) -> ProviderId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn caps(&self) -> &ProviderCaps {
        &self.caps
    }

    async fn scan(
        &self,
        source: &SourceRef,
        cancel: &CancellationToken,
    ) -> QueryResult<ElementStream<T>> {
        let elements = self.snapshot(source).await?;
        self.scans.fetch_add(1, Ordering::Relaxed);

        let mut stream = MemoryElementStream::new(elements, cancel.clone())
            .with_counters(Arc::clone(&self.counters));
        if let Some((index, message)) = self.failures.get(source) {
            stream = stream.with_failure_at(*index, message.clone());
        }

        log::trace!("{}: opened cursor on '{source}'", self.name);
        Ok(Box::pin(stream))
    }

    async fn execute(
        &self,
        expr: QueryExpr<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<QueryOutput<T>> {
        self.executed.fetch_add(1, Ordering::Relaxed);
        cancel.check()?;

        let operator = expr.operator();
        if !self.caps.translates(operator) {
            return Err(QueryError::translation(
                operator.name(),
                format!("provider '{}' does not translate {operator}", self.name),
            ));
        }
        log::debug!("{}: executing {operator} on '{}'", self.name, expr.source);

        let first = self.rows(&expr.source, cancel).await?;
        let second = match &expr.op {
            QueryOp::SetOp { second, .. } => Some(self.rows(second, cancel).await?),
            _ => None,
        };

        native::execute(expr.op, first, second, cancel).await
    }
}

impl<T> fmt::Debug for MemoryProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryProvider")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("caps", &self.caps)
            .finish_non_exhaustive()
    }
}
