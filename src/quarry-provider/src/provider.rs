//! The provider trait and bound sources.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use common_error::{QueryError, QueryResult};
use common_runtime::CancellationToken;
use quarry_core::Element;
use quarry_expr::{QueryExpr, QueryOutput, SourceRef};

use crate::caps::{ProviderCaps, ProviderId};
use crate::stream::ElementStream;

/// Trait for backing stores of element sequences.
///
/// Every provider supports forward scanning. Providers that declare
/// operators in [`ProviderCaps`] must also execute the corresponding
/// [`QueryExpr`] natively.
#[async_trait]
pub trait QueryProvider<T: Element>: Send + Sync {
    /// Identity used to decide whether two sources translate jointly.
    fn provider_id(&self) -> ProviderId;

    /// Human-readable provider name for diagnostics.
    fn name(&self) -> &str;

    /// Declared capabilities.
    fn caps(&self) -> &ProviderCaps;

    /// Open a forward cursor over a source.
    ///
    /// The returned stream checks `cancel` before every fetch and is
    /// released when dropped.
    async fn scan(
        &self,
        source: &SourceRef,
        cancel: &CancellationToken,
    ) -> QueryResult<ElementStream<T>>;

    /// Execute a translated operator natively.
    ///
    /// The default rejects every expression with `TranslationFailure`.
    async fn execute(
        &self,
        expr: QueryExpr<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<QueryOutput<T>> {
        let _ = cancel;
        Err(QueryError::translation(
            expr.operator().name(),
            format!("provider '{}' has no native execution", self.name()),
        ))
    }
}

/// A source collection bound to the provider that owns it.
pub struct QuerySource<T: Element> {
    provider: Arc<dyn QueryProvider<T>>,
    source: SourceRef,
}

impl<T: Element> QuerySource<T> {
    /// Bind a source name to its provider.
    pub fn new(provider: Arc<dyn QueryProvider<T>>, source: impl Into<SourceRef>) -> Self {
        Self {
            provider,
            source: source.into(),
        }
    }

    /// The owning provider.
    pub fn provider(&self) -> &Arc<dyn QueryProvider<T>> {
        &self.provider
    }

    /// The source name.
    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    /// Identity of the owning provider.
    pub fn provider_id(&self) -> ProviderId {
        self.provider.provider_id()
    }

    /// Whether both sources belong to the same provider.
    pub fn shares_provider(&self, other: &Self) -> bool {
        self.provider_id() == other.provider_id()
    }

    /// Open a forward cursor over this source.
    pub async fn scan(&self, cancel: &CancellationToken) -> QueryResult<ElementStream<T>> {
        self.provider.scan(&self.source, cancel).await
    }
}

impl<T: Element> Clone for QuerySource<T> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            source: self.source.clone(),
        }
    }
}

impl<T: Element> fmt::Debug for QuerySource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySource")
            .field("provider", &self.provider.name())
            .field("source", &self.source)
            .finish()
    }
}
