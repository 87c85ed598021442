//! Emulated operator semantics.
//!
//! Each operator pulls from an [`EmulationCursor`] one element at a time and
//! reproduces the std `Iterator` behavior: short-circuiting operators stop
//! fetching as soon as the answer is known, cardinality violations are
//! reported as errors and never coerced to defaults.

use common_error::{QueryError, QueryResult};
use common_runtime::CancellationToken;
use quarry_core::{ComparerRef, DefaultComparer, Element, ElementSet, OperatorId, SortKey};
use quarry_expr::{AnyValue, NormalizedCallback, QueryOutput};

use super::cursor::EmulationCursor;
use crate::normalizer::{NormalizedInvocation, OperatorCallback};

type Predicate<T> = NormalizedCallback<T, bool>;

// ============================================================================
// Dispatch
// ============================================================================

/// Run a single-source operator over an open cursor.
pub(super) async fn run<T: Element>(
    cursor: &mut EmulationCursor<T>,
    invocation: &NormalizedInvocation<T>,
    cancel: &CancellationToken,
) -> QueryResult<QueryOutput<T>> {
    let operator = invocation.operator;
    let predicate = invocation.predicate();
    let comparer = invocation.comparer.as_ref();

    let output = match operator {
        OperatorId::Any => QueryOutput::Bool(any(cursor, predicate, cancel).await?),
        OperatorId::All => {
            let predicate = predicate.ok_or_else(|| missing(operator, "predicate"))?;
            QueryOutput::Bool(all(cursor, predicate, cancel).await?)
        }
        OperatorId::Count => QueryOutput::Count(count(cursor, predicate, cancel).await?),
        OperatorId::Contains => {
            let value = invocation
                .value
                .as_ref()
                .ok_or_else(|| missing(operator, "value"))?;
            QueryOutput::Bool(contains(cursor, value, comparer).await?)
        }
        OperatorId::First => QueryOutput::Element(first(cursor, predicate, None, cancel).await?),
        OperatorId::FirstOrDefault => {
            let default = invocation.default_or_type_default();
            QueryOutput::Element(first(cursor, predicate, Some(default), cancel).await?)
        }
        OperatorId::Last => QueryOutput::Element(last(cursor, predicate, None, cancel).await?),
        OperatorId::LastOrDefault => {
            let default = invocation.default_or_type_default();
            QueryOutput::Element(last(cursor, predicate, Some(default), cancel).await?)
        }
        OperatorId::Single => QueryOutput::Element(single(cursor, predicate, None, cancel).await?),
        OperatorId::SingleOrDefault => {
            let default = invocation.default_or_type_default();
            QueryOutput::Element(single(cursor, predicate, Some(default), cancel).await?)
        }
        OperatorId::DefaultIfEmpty => {
            let default = invocation.default_or_type_default();
            QueryOutput::Sequence(default_if_empty(cursor, default).await?)
        }
        OperatorId::Distinct => QueryOutput::Sequence(distinct(cursor, comparer).await?),
        OperatorId::Reverse => {
            let mut elements = cursor.collect().await?;
            elements.reverse();
            QueryOutput::Sequence(elements)
        }
        OperatorId::Filter => {
            let predicate = predicate.ok_or_else(|| missing(operator, "predicate"))?;
            QueryOutput::Sequence(filter(cursor, predicate, cancel).await?)
        }
        OperatorId::Select => {
            let Some(OperatorCallback::Selector(selector)) = &invocation.callback else {
                return Err(missing(operator, "selector"));
            };
            QueryOutput::Projected(select(cursor, selector, cancel).await?)
        }
        OperatorId::OrderBy | OperatorId::OrderByDescending => {
            let Some(OperatorCallback::Key(key)) = &invocation.callback else {
                return Err(missing(operator, "ordering key"));
            };
            let descending = operator == OperatorId::OrderByDescending;
            QueryOutput::Sequence(order_by(cursor, key, descending, cancel).await?)
        }
        OperatorId::ToVec => QueryOutput::Sequence(cursor.collect().await?),
        OperatorId::Union | OperatorId::Intersect | OperatorId::Except => {
            return Err(QueryError::internal(format!(
                "{operator} needs two cursors"
            )));
        }
    };

    Ok(output)
}

fn missing(operator: OperatorId, what: &str) -> QueryError {
    QueryError::internal(format!("{operator} reached emulation without its {what}"))
}

async fn qualifies<T: Element>(
    predicate: Option<&Predicate<T>>,
    element: &T,
    cancel: &CancellationToken,
) -> QueryResult<bool> {
    match predicate {
        Some(predicate) => predicate.invoke(element, cancel).await,
        None => Ok(true),
    }
}

// ============================================================================
// Existence and Aggregates
// ============================================================================

async fn any<T: Element>(
    cursor: &mut EmulationCursor<T>,
    predicate: Option<&Predicate<T>>,
    cancel: &CancellationToken,
) -> QueryResult<bool> {
    while let Some(element) = cursor.next().await? {
        if qualifies(predicate, &element, cancel).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn all<T: Element>(
    cursor: &mut EmulationCursor<T>,
    predicate: &Predicate<T>,
    cancel: &CancellationToken,
) -> QueryResult<bool> {
    while let Some(element) = cursor.next().await? {
        if !predicate.invoke(&element, cancel).await? {
            return Ok(false);
        }
    }
    Ok(true)
}

async fn count<T: Element>(
    cursor: &mut EmulationCursor<T>,
    predicate: Option<&Predicate<T>>,
    cancel: &CancellationToken,
) -> QueryResult<usize> {
    let mut count = 0;
    while let Some(element) = cursor.next().await? {
        if qualifies(predicate, &element, cancel).await? {
            count += 1;
        }
    }
    Ok(count)
}

async fn contains<T: Element>(
    cursor: &mut EmulationCursor<T>,
    value: &T,
    comparer: Option<&ComparerRef<T>>,
) -> QueryResult<bool> {
    let comparer = DefaultComparer::resolve(comparer);
    while let Some(element) = cursor.next().await? {
        if comparer.equals(&element, value) {
            return Ok(true);
        }
    }
    Ok(false)
}

// ============================================================================
// Element Extraction
// ============================================================================

async fn first<T: Element>(
    cursor: &mut EmulationCursor<T>,
    predicate: Option<&Predicate<T>>,
    default: Option<T>,
    cancel: &CancellationToken,
) -> QueryResult<T> {
    while let Some(element) = cursor.next().await? {
        if qualifies(predicate, &element, cancel).await? {
            return Ok(element);
        }
    }
    default.ok_or(QueryError::SequenceHasNoElements)
}

async fn last<T: Element>(
    cursor: &mut EmulationCursor<T>,
    predicate: Option<&Predicate<T>>,
    default: Option<T>,
    cancel: &CancellationToken,
) -> QueryResult<T> {
    let mut found = None;
    while let Some(element) = cursor.next().await? {
        if qualifies(predicate, &element, cancel).await? {
            found = Some(element);
        }
    }
    found.or(default).ok_or(QueryError::SequenceHasNoElements)
}

async fn single<T: Element>(
    cursor: &mut EmulationCursor<T>,
    predicate: Option<&Predicate<T>>,
    default: Option<T>,
    cancel: &CancellationToken,
) -> QueryResult<T> {
    let mut found = None;
    while let Some(element) = cursor.next().await? {
        if qualifies(predicate, &element, cancel).await? {
            if found.is_some() {
                return Err(QueryError::SequenceHasMultipleElements);
            }
            found = Some(element);
        }
    }
    found.or(default).ok_or(QueryError::SequenceHasNoElements)
}

// ============================================================================
// Sequence Operators
// ============================================================================

async fn default_if_empty<T: Element>(
    cursor: &mut EmulationCursor<T>,
    default: T,
) -> QueryResult<Vec<T>> {
    let elements = cursor.collect().await?;
    if elements.is_empty() {
        Ok(vec![default])
    } else {
        Ok(elements)
    }
}

async fn distinct<T: Element>(
    cursor: &mut EmulationCursor<T>,
    comparer: Option<&ComparerRef<T>>,
) -> QueryResult<Vec<T>> {
    let mut seen = ElementSet::new(DefaultComparer::resolve(comparer));
    let mut distinct = Vec::new();
    while let Some(element) = cursor.next().await? {
        if seen.insert(element.clone()) {
            distinct.push(element);
        }
    }
    Ok(distinct)
}

async fn filter<T: Element>(
    cursor: &mut EmulationCursor<T>,
    predicate: &Predicate<T>,
    cancel: &CancellationToken,
) -> QueryResult<Vec<T>> {
    let mut kept = Vec::new();
    while let Some(element) = cursor.next().await? {
        if predicate.invoke(&element, cancel).await? {
            kept.push(element);
        }
    }
    Ok(kept)
}

async fn select<T: Element>(
    cursor: &mut EmulationCursor<T>,
    selector: &NormalizedCallback<T, AnyValue>,
    cancel: &CancellationToken,
) -> QueryResult<Vec<AnyValue>> {
    let mut projected = Vec::new();
    while let Some(element) = cursor.next().await? {
        projected.push(selector.invoke(&element, cancel).await?);
    }
    Ok(projected)
}

async fn order_by<T: Element>(
    cursor: &mut EmulationCursor<T>,
    key: &NormalizedCallback<T, SortKey>,
    descending: bool,
    cancel: &CancellationToken,
) -> QueryResult<Vec<T>> {
    let mut keyed = Vec::new();
    while let Some(element) = cursor.next().await? {
        keyed.push((key.invoke(&element, cancel).await?, element));
    }

    // `sort_by` is stable, so equal keys keep enumeration order both ways.
    if descending {
        keyed.sort_by(|a, b| b.0.cmp(&a.0));
    } else {
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
    }
    Ok(keyed.into_iter().map(|(_, element)| element).collect())
}

// ============================================================================
// Set Operators
// ============================================================================

/// Run a set operator, opening and closing one cursor per source.
///
/// `union` enumerates first then second. `intersect` and `except`
/// materialize the second sequence before enumerating the first.
pub(super) async fn set_operation<T: Element>(
    invocation: &NormalizedInvocation<T>,
    cancel: &CancellationToken,
) -> QueryResult<Vec<T>> {
    let operator = invocation.operator;
    let second = invocation
        .second
        .as_ref()
        .ok_or_else(|| missing(operator, "second sequence"))?;
    let comparer = DefaultComparer::resolve(invocation.comparer.as_ref());
    let mut seen = ElementSet::new(comparer.clone());
    let mut out = Vec::new();

    match operator {
        OperatorId::Union => {
            for source in [&invocation.source, second] {
                let mut cursor = EmulationCursor::open(source, cancel).await?;
                let result = union_into(&mut cursor, &mut seen, &mut out).await;
                cursor.close();
                result?;
            }
        }
        OperatorId::Intersect | OperatorId::Except => {
            let mut other = ElementSet::new(comparer);
            let mut cursor = EmulationCursor::open(second, cancel).await?;
            let result = cursor.collect().await;
            cursor.close();
            for element in result? {
                other.insert(element);
            }

            let keep_members = operator == OperatorId::Intersect;
            let mut cursor = EmulationCursor::open(&invocation.source, cancel).await?;
            let result = retain_into(&mut cursor, &other, keep_members, &mut seen, &mut out).await;
            cursor.close();
            result?;
        }
        _ => return Err(QueryError::internal(format!("{operator} is not a set operator"))),
    }

    Ok(out)
}

async fn union_into<T: Element>(
    cursor: &mut EmulationCursor<T>,
    seen: &mut ElementSet<T>,
    out: &mut Vec<T>,
) -> QueryResult<()> {
    while let Some(element) = cursor.next().await? {
        if seen.insert(element.clone()) {
            out.push(element);
        }
    }
    Ok(())
}

async fn retain_into<T: Element>(
    cursor: &mut EmulationCursor<T>,
    other: &ElementSet<T>,
    keep_members: bool,
    seen: &mut ElementSet<T>,
    out: &mut Vec<T>,
) -> QueryResult<()> {
    while let Some(element) = cursor.next().await? {
        if other.contains(&element) == keep_members && seen.insert(element.clone()) {
            out.push(element);
        }
    }
    Ok(())
}
