//! Typed operator methods.
//!
//! [`AsyncQueryable`] binds a source to an [`AdapterHandle`] and offers one
//! async method per operator, each returning the operator's natural result.

use std::fmt;

use common_error::{QueryError, QueryResult};
use common_runtime::CancellationToken;
use quarry_core::{ComparerRef, Element, OperatorId, SortKey};
use quarry_expr::{AnyValue, Callback, Predicate, QueryOutput};
use quarry_provider::QuerySource;

use crate::adapter::AdapterHandle;
use crate::invocation::OperatorInvocation;

/// A source bound to an adapter handle.
pub struct AsyncQueryable<T: Element> {
    handle: AdapterHandle,
    source: QuerySource<T>,
}

impl<T: Element> AsyncQueryable<T> {
    /// Bind a source to a handle.
    pub fn new(handle: AdapterHandle, source: QuerySource<T>) -> Self {
        Self { handle, source }
    }

    /// The bound source.
    pub fn source(&self) -> &QuerySource<T> {
        &self.source
    }

    fn invocation(&self, operator: OperatorId) -> OperatorInvocation<T> {
        OperatorInvocation::new(operator).with_source(self.source.clone())
    }

    fn with_optional_predicate(
        invocation: OperatorInvocation<T>,
        predicate: Option<Predicate<T>>,
    ) -> OperatorInvocation<T> {
        match predicate {
            Some(predicate) => invocation.with_predicate(predicate),
            None => invocation,
        }
    }

    fn with_optional_comparer(
        invocation: OperatorInvocation<T>,
        comparer: Option<ComparerRef<T>>,
    ) -> OperatorInvocation<T> {
        match comparer {
            Some(comparer) => invocation.with_comparer(comparer),
            None => invocation,
        }
    }

    async fn run(
        &self,
        invocation: OperatorInvocation<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<QueryOutput<T>> {
        self.handle.execute(invocation, cancel).await
    }

    // ========================================================================
    // Existence and Aggregates
    // ========================================================================

    /// Whether any element (matching `predicate`) exists.
    pub async fn any(
        &self,
        predicate: Option<Predicate<T>>,
        cancel: &CancellationToken,
    ) -> QueryResult<bool> {
        let invocation = Self::with_optional_predicate(self.invocation(OperatorId::Any), predicate);
        into_bool(self.run(invocation, cancel).await?)
    }

    /// Whether every element matches `predicate`.
    pub async fn all(
        &self,
        predicate: Predicate<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<bool> {
        let invocation = self.invocation(OperatorId::All).with_predicate(predicate);
        into_bool(self.run(invocation, cancel).await?)
    }

    /// Number of elements (matching `predicate`).
    pub async fn count(
        &self,
        predicate: Option<Predicate<T>>,
        cancel: &CancellationToken,
    ) -> QueryResult<usize> {
        let invocation =
            Self::with_optional_predicate(self.invocation(OperatorId::Count), predicate);
        match self.run(invocation, cancel).await? {
            QueryOutput::Count(count) => Ok(count),
            other => Err(unexpected("count", &other)),
        }
    }

    /// Whether an element equal to `value` exists.
    pub async fn contains(
        &self,
        value: T,
        comparer: Option<ComparerRef<T>>,
        cancel: &CancellationToken,
    ) -> QueryResult<bool> {
        let invocation = Self::with_optional_comparer(
            self.invocation(OperatorId::Contains).with_value(value),
            comparer,
        );
        into_bool(self.run(invocation, cancel).await?)
    }

    // ========================================================================
    // Element Extraction
    // ========================================================================

    async fn extract(
        &self,
        operator: OperatorId,
        predicate: Option<Predicate<T>>,
        default: Option<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<T> {
        let mut invocation = Self::with_optional_predicate(self.invocation(operator), predicate);
        if let Some(default) = default {
            invocation = invocation.with_default(default);
        }
        match self.run(invocation, cancel).await? {
            QueryOutput::Element(element) => Ok(element),
            other => Err(unexpected("element", &other)),
        }
    }

    /// First (matching) element.
    pub async fn first(
        &self,
        predicate: Option<Predicate<T>>,
        cancel: &CancellationToken,
    ) -> QueryResult<T> {
        self.extract(OperatorId::First, predicate, None, cancel).await
    }

    /// First (matching) element, or `default` (the type default if `None`).
    pub async fn first_or_default(
        &self,
        predicate: Option<Predicate<T>>,
        default: Option<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<T> {
        self.extract(OperatorId::FirstOrDefault, predicate, default, cancel)
            .await
    }

    /// Last (matching) element.
    pub async fn last(
        &self,
        predicate: Option<Predicate<T>>,
        cancel: &CancellationToken,
    ) -> QueryResult<T> {
        self.extract(OperatorId::Last, predicate, None, cancel).await
    }

    /// Last (matching) element, or `default` (the type default if `None`).
    pub async fn last_or_default(
        &self,
        predicate: Option<Predicate<T>>,
        default: Option<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<T> {
        self.extract(OperatorId::LastOrDefault, predicate, default, cancel)
            .await
    }

    /// The only (matching) element.
    pub async fn single(
        &self,
        predicate: Option<Predicate<T>>,
        cancel: &CancellationToken,
    ) -> QueryResult<T> {
        self.extract(OperatorId::Single, predicate, None, cancel).await
    }

    /// The only (matching) element, or `default` when there is none.
    ///
    /// More than one qualifying element is still an error.
    pub async fn single_or_default(
        &self,
        predicate: Option<Predicate<T>>,
        default: Option<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<T> {
        self.extract(OperatorId::SingleOrDefault, predicate, default, cancel)
            .await
    }

    // ========================================================================
    // Sequence Operators
    // ========================================================================

    async fn sequence(
        &self,
        invocation: OperatorInvocation<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<T>> {
        match self.run(invocation, cancel).await? {
            QueryOutput::Sequence(elements) => Ok(elements),
            other => Err(unexpected("sequence", &other)),
        }
    }

    /// The source, or `[default]` when it is empty.
    pub async fn default_if_empty(
        &self,
        default: Option<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<T>> {
        let mut invocation = self.invocation(OperatorId::DefaultIfEmpty);
        if let Some(default) = default {
            invocation = invocation.with_default(default);
        }
        self.sequence(invocation, cancel).await
    }

    /// Distinct elements in order of first occurrence.
    pub async fn distinct(
        &self,
        comparer: Option<ComparerRef<T>>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<T>> {
        let invocation =
            Self::with_optional_comparer(self.invocation(OperatorId::Distinct), comparer);
        self.sequence(invocation, cancel).await
    }

    /// Elements in reverse order.
    pub async fn reverse(&self, cancel: &CancellationToken) -> QueryResult<Vec<T>> {
        self.sequence(self.invocation(OperatorId::Reverse), cancel)
            .await
    }

    /// Elements matching `predicate`, in order.
    pub async fn filter(
        &self,
        predicate: Predicate<T>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<T>> {
        let invocation = self.invocation(OperatorId::Filter).with_predicate(predicate);
        self.sequence(invocation, cancel).await
    }

    /// Every element, in order.
    pub async fn to_vec(&self, cancel: &CancellationToken) -> QueryResult<Vec<T>> {
        self.sequence(self.invocation(OperatorId::ToVec), cancel)
            .await
    }

    // ========================================================================
    // Set Operators
    // ========================================================================

    async fn set_operation(
        &self,
        operator: OperatorId,
        second: &QuerySource<T>,
        comparer: Option<ComparerRef<T>>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<T>> {
        let invocation = Self::with_optional_comparer(
            self.invocation(operator).with_second(second.clone()),
            comparer,
        );
        self.sequence(invocation, cancel).await
    }

    /// Distinct elements of either sequence, first then second.
    pub async fn union(
        &self,
        second: &QuerySource<T>,
        comparer: Option<ComparerRef<T>>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<T>> {
        self.set_operation(OperatorId::Union, second, comparer, cancel)
            .await
    }

    /// Distinct elements of this sequence that also appear in `second`.
    pub async fn intersect(
        &self,
        second: &QuerySource<T>,
        comparer: Option<ComparerRef<T>>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<T>> {
        self.set_operation(OperatorId::Intersect, second, comparer, cancel)
            .await
    }

    /// Distinct elements of this sequence that do not appear in `second`.
    pub async fn except(
        &self,
        second: &QuerySource<T>,
        comparer: Option<ComparerRef<T>>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<T>> {
        self.set_operation(OperatorId::Except, second, comparer, cancel)
            .await
    }

    // ========================================================================
    // Projection and Ordering
    // ========================================================================

    /// Project every element through `selector`.
    pub async fn select<U: Send + 'static>(
        &self,
        selector: Callback<T, U>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<U>> {
        let erased = selector.map_output(|value| Box::new(value) as AnyValue);
        let invocation = self.invocation(OperatorId::Select).with_selector(erased);

        match self.run(invocation, cancel).await? {
            QueryOutput::Projected(values) => values
                .into_iter()
                .map(|value| {
                    value.downcast::<U>().map(|value| *value).map_err(|_| {
                        QueryError::internal("projected value has an unexpected type")
                    })
                })
                .collect(),
            other => Err(unexpected("projected", &other)),
        }
    }

    /// Elements sorted by `key`, ascending. Equal keys keep source order.
    pub async fn order_by<K>(
        &self,
        key: Callback<T, K>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<T>>
    where
        K: Ord + Send + Sync + fmt::Debug + 'static,
    {
        let invocation = self
            .invocation(OperatorId::OrderBy)
            .with_key(key.map_output(SortKey::new));
        self.sequence(invocation, cancel).await
    }

    /// Elements sorted by `key`, descending. Equal keys keep source order.
    pub async fn order_by_descending<K>(
        &self,
        key: Callback<T, K>,
        cancel: &CancellationToken,
    ) -> QueryResult<Vec<T>>
    where
        K: Ord + Send + Sync + fmt::Debug + 'static,
    {
        let invocation = self
            .invocation(OperatorId::OrderByDescending)
            .with_key(key.map_output(SortKey::new));
        self.sequence(invocation, cancel).await
    }
}

impl<T: Element> Clone for AsyncQueryable<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            source: self.source.clone(),
        }
    }
}

impl<T: Element> fmt::Debug for AsyncQueryable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncQueryable")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

fn into_bool<T>(output: QueryOutput<T>) -> QueryResult<bool> {
    match output {
        QueryOutput::Bool(value) => Ok(value),
        other => Err(unexpected("bool", &other)),
    }
}

fn unexpected<T>(expected: &str, output: &QueryOutput<T>) -> QueryError {
    QueryError::internal(format!(
        "expected {expected} output, got {}",
        output.kind_name()
    ))
}
