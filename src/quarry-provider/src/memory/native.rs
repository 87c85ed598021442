//! Native execution of translated operators over in-memory collections.

use common_error::{QueryError, QueryResult};
use common_runtime::CancellationToken;
use quarry_core::{ComparerRef, DefaultComparer, Element, ElementSet, SortKey};
use quarry_expr::{ExtractKind, ProviderPredicate, QueryOp, QueryOutput, SetKind};

// ============================================================================
// Rows
// ============================================================================

/// Fallible iterator over a collection copy.
///
/// Yields `OperationCanceled` once the token fires and the injected failure
/// at its index; both end the iteration.
pub(super) struct Rows<'a, T> {
    elements: std::vec::IntoIter<T>,
    index: usize,
    failure: Option<&'a (usize, String)>,
    cancel: &'a CancellationToken,
    done: bool,
}

impl<'a, T> Rows<'a, T> {
    pub(super) fn new(
        elements: Vec<T>,
        failure: Option<&'a (usize, String)>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            elements: elements.into_iter(),
            index: 0,
            failure,
            cancel,
            done: false,
        }
    }

    fn fail(&mut self, err: QueryError) -> Option<QueryResult<T>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<T> Iterator for Rows<'_, T> {
    type Item = QueryResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.cancel.is_cancelled() {
            return self.fail(QueryError::OperationCanceled);
        }
        let index = self.index;
        if let Some((_, message)) = self.failure.filter(|(at, _)| *at == index) {
            return self.fail(QueryError::provider(message.clone()));
        }

        let element = self.elements.next();
        if element.is_none() {
            self.done = true;
        }
        self.index += 1;
        element.map(Ok)
    }
}

// ============================================================================
// Operators
// ============================================================================

async fn matches<T: Element>(
    predicate: Option<&ProviderPredicate<T>>,
    element: &T,
    cancel: &CancellationToken,
) -> QueryResult<bool> {
    match predicate {
        Some(predicate) => predicate.call(element, cancel).await,
        None => Ok(true),
    }
}

/// Run one operator over `first` (and `second` for set operators).
pub(super) async fn execute<T: Element>(
    op: QueryOp<T>,
    first: Rows<'_, T>,
    second: Option<Rows<'_, T>>,
    cancel: &CancellationToken,
) -> QueryResult<QueryOutput<T>> {
    let output = match op {
        QueryOp::Any { predicate } => {
            let mut found = false;
            for element in first {
                if matches(predicate.as_ref(), &element?, cancel).await? {
                    found = true;
                    break;
                }
            }
            QueryOutput::Bool(found)
        }
        QueryOp::All { predicate } => {
            let mut holds = true;
            for element in first {
                if !predicate.call(&element?, cancel).await? {
                    holds = false;
                    break;
                }
            }
            QueryOutput::Bool(holds)
        }
        QueryOp::Count { predicate } => {
            let mut count = 0;
            for element in first {
                if matches(predicate.as_ref(), &element?, cancel).await? {
                    count += 1;
                }
            }
            QueryOutput::Count(count)
        }
        QueryOp::Contains { value, comparer } => {
            let comparer = DefaultComparer::resolve(comparer.as_ref());
            let mut found = false;
            for element in first {
                if comparer.equals(&element?, &value) {
                    found = true;
                    break;
                }
            }
            QueryOutput::Bool(found)
        }
        QueryOp::Extract {
            kind,
            predicate,
            default,
        } => QueryOutput::Element(extract(kind, predicate.as_ref(), default, first, cancel).await?),
        QueryOp::DefaultIfEmpty { default } => {
            let elements = first.collect::<QueryResult<Vec<_>>>()?;
            if elements.is_empty() {
                QueryOutput::Sequence(vec![default])
            } else {
                QueryOutput::Sequence(elements)
            }
        }
        QueryOp::Distinct { comparer } => {
            let mut seen = ElementSet::new(DefaultComparer::resolve(comparer.as_ref()));
            let mut distinct = Vec::new();
            for element in first {
                let element = element?;
                if seen.insert(element.clone()) {
                    distinct.push(element);
                }
            }
            QueryOutput::Sequence(distinct)
        }
        QueryOp::Reverse => {
            let mut elements = first.collect::<QueryResult<Vec<_>>>()?;
            elements.reverse();
            QueryOutput::Sequence(elements)
        }
        QueryOp::SetOp { kind, comparer, .. } => {
            let second = second
                .ok_or_else(|| QueryError::internal("set operation without a second source"))?;
            QueryOutput::Sequence(set_op(kind, comparer, first, second)?)
        }
        QueryOp::Filter { predicate } => {
            let mut kept = Vec::new();
            for element in first {
                let element = element?;
                if predicate.call(&element, cancel).await? {
                    kept.push(element);
                }
            }
            QueryOutput::Sequence(kept)
        }
        QueryOp::Select { selector } => QueryOutput::Projected(
            first
                .map(|element| element.map(|e| selector(&e)))
                .collect::<QueryResult<Vec<_>>>()?,
        ),
        QueryOp::OrderBy { key, descending } => {
            let mut keyed = first
                .map(|element| element.map(|e| (key(&e), e)))
                .collect::<QueryResult<Vec<(SortKey, T)>>>()?;
            if descending {
                keyed.sort_by(|a, b| b.0.cmp(&a.0));
            } else {
                keyed.sort_by(|a, b| a.0.cmp(&b.0));
            }
            QueryOutput::Sequence(keyed.into_iter().map(|(_, e)| e).collect())
        }
        QueryOp::ToVec => QueryOutput::Sequence(first.collect::<QueryResult<Vec<_>>>()?),
    };

    Ok(output)
}

async fn extract<T: Element>(
    kind: ExtractKind,
    predicate: Option<&ProviderPredicate<T>>,
    default: Option<T>,
    rows: Rows<'_, T>,
    cancel: &CancellationToken,
) -> QueryResult<T> {
    let mut found: Option<T> = None;
    for element in rows {
        let element = element?;
        if !matches(predicate, &element, cancel).await? {
            continue;
        }
        match kind {
            ExtractKind::First => return Ok(element),
            ExtractKind::Last => found = Some(element),
            ExtractKind::Single => {
                if found.is_some() {
                    return Err(QueryError::SequenceHasMultipleElements);
                }
                found = Some(element);
            }
        }
    }

    found.or(default).ok_or(QueryError::SequenceHasNoElements)
}

fn set_op<T: Element>(
    kind: SetKind,
    comparer: Option<ComparerRef<T>>,
    first: Rows<'_, T>,
    second: Rows<'_, T>,
) -> QueryResult<Vec<T>> {
    let mut seen = ElementSet::new(DefaultComparer::resolve(comparer.as_ref()));
    let mut out = Vec::new();

    match kind {
        SetKind::Union => {
            for element in first.chain(second) {
                let element = element?;
                if seen.insert(element.clone()) {
                    out.push(element);
                }
            }
        }
        SetKind::Intersect => {
            let mut other = ElementSet::new(DefaultComparer::resolve(comparer.as_ref()));
            for element in second {
                other.insert(element?);
            }
            for element in first {
                let element = element?;
                if other.contains(&element) && seen.insert(element.clone()) {
                    out.push(element);
                }
            }
        }
        SetKind::Except => {
            for element in second {
                seen.insert(element?);
            }
            for element in first {
                let element = element?;
                if seen.insert(element.clone()) {
                    out.push(element);
                }
            }
        }
    }

    Ok(out)
}
