//! Query expression rewriting.
//!
//! Builds the provider-facing [`QueryExpr`] for an invocation bound to the
//! Translate path and submits it to the provider. Asynchronous callbacks are
//! never run synchronously: without a native asynchronous primitive the
//! rewrite fails before the provider is contacted.

use std::sync::Arc;

use common_error::{QueryError, QueryResult};
use common_runtime::CancellationToken;
use log::debug;
use quarry_core::{Element, OperatorId};
use quarry_expr::{
    ExtractKind, NormalizedCallback, ProviderCallback, ProviderPredicate, QueryExpr, QueryOp,
    QueryOutput, SetKind, SyncFn,
};
use quarry_provider::ProviderCaps;

use crate::normalizer::{NormalizedInvocation, OperatorCallback};

/// Translate an invocation and execute it in the provider.
///
/// Provider errors pass through unchanged. A provider answer whose shape
/// does not fit the operator is a `TranslationFailure`.
pub async fn translate<T: Element>(
    invocation: NormalizedInvocation<T>,
    cancel: &CancellationToken,
) -> QueryResult<QueryOutput<T>> {
    let provider = Arc::clone(invocation.source.provider());
    let operator = invocation.operator;

    let expr = rewrite(invocation, provider.caps()).inspect_err(|err| {
        debug!("Translation of {operator} rejected before submission: {err}");
    })?;
    let output = provider.execute(expr, cancel).await?;
    check_output(operator, &output)?;
    Ok(output)
}

/// Build the provider-facing expression for an invocation.
pub fn rewrite<T: Element>(
    invocation: NormalizedInvocation<T>,
    caps: &ProviderCaps,
) -> QueryResult<QueryExpr<T>> {
    let NormalizedInvocation {
        operator,
        source,
        callback,
        comparer,
        default,
        value,
        second,
    } = invocation;

    let second = match second {
        Some(second) if !second.shares_provider(&source) => {
            return Err(QueryError::translation(
                operator.name(),
                "second sequence belongs to a different provider",
            ));
        }
        Some(second) => Some(second.source().clone()),
        None => None,
    };

    let (predicate, selector, key) = match callback {
        Some(OperatorCallback::Predicate(predicate)) => {
            (Some(provider_predicate(operator, predicate, caps)?), None, None)
        }
        Some(OperatorCallback::Selector(selector)) => {
            (None, Some(sync_only(operator, "selector", &selector)?), None)
        }
        Some(OperatorCallback::Key(key)) => {
            (None, None, Some(sync_only(operator, "ordering key", &key)?))
        }
        None => (None, None, None),
    };
    let or_default = || Some(default.clone().unwrap_or_else(T::type_default));

    let op = match operator {
        OperatorId::Any => QueryOp::Any { predicate },
        OperatorId::All => QueryOp::All {
            predicate: predicate.ok_or_else(|| missing(operator, "predicate"))?,
        },
        OperatorId::Count => QueryOp::Count { predicate },
        OperatorId::Contains => QueryOp::Contains {
            value: value.ok_or_else(|| missing(operator, "value"))?,
            comparer,
        },
        OperatorId::First => extract(ExtractKind::First, predicate, None),
        OperatorId::FirstOrDefault => extract(ExtractKind::First, predicate, or_default()),
        OperatorId::Last => extract(ExtractKind::Last, predicate, None),
        OperatorId::LastOrDefault => extract(ExtractKind::Last, predicate, or_default()),
        OperatorId::Single => extract(ExtractKind::Single, predicate, None),
        OperatorId::SingleOrDefault => extract(ExtractKind::Single, predicate, or_default()),
        OperatorId::DefaultIfEmpty => QueryOp::DefaultIfEmpty {
            default: default.clone().unwrap_or_else(T::type_default),
        },
        OperatorId::Distinct => QueryOp::Distinct { comparer },
        OperatorId::Reverse => QueryOp::Reverse,
        OperatorId::Union | OperatorId::Intersect | OperatorId::Except => QueryOp::SetOp {
            kind: set_kind(operator),
            second: second.ok_or_else(|| missing(operator, "second sequence"))?,
            comparer,
        },
        OperatorId::Filter => QueryOp::Filter {
            predicate: predicate.ok_or_else(|| missing(operator, "predicate"))?,
        },
        OperatorId::Select => QueryOp::Select {
            selector: selector.ok_or_else(|| missing(operator, "selector"))?,
        },
        OperatorId::OrderBy | OperatorId::OrderByDescending => QueryOp::OrderBy {
            key: key.ok_or_else(|| missing(operator, "ordering key"))?,
            descending: operator == OperatorId::OrderByDescending,
        },
        OperatorId::ToVec => QueryOp::ToVec,
    };

    Ok(QueryExpr::new(source.source().clone(), op))
}

fn provider_predicate<T>(
    operator: OperatorId,
    predicate: NormalizedCallback<T, bool>,
    caps: &ProviderCaps,
) -> QueryResult<ProviderPredicate<T>> {
    if let Some(f) = predicate.as_sync() {
        return Ok(ProviderCallback::Sync(Arc::clone(f)));
    }
    if caps.async_callbacks {
        Ok(ProviderCallback::Async(predicate))
    } else {
        Err(QueryError::translation(
            operator.name(),
            format!(
                "provider has no primitive for {} predicates",
                predicate.shape()
            ),
        ))
    }
}

fn sync_only<T, R>(
    operator: OperatorId,
    role: &str,
    callback: &NormalizedCallback<T, R>,
) -> QueryResult<SyncFn<T, R>> {
    callback.as_sync().map(Arc::clone).ok_or_else(|| {
        QueryError::translation(
            operator.name(),
            format!("provider has no primitive for {} {role}s", callback.shape()),
        )
    })
}

fn extract<T>(
    kind: ExtractKind,
    predicate: Option<ProviderPredicate<T>>,
    default: Option<T>,
) -> QueryOp<T> {
    QueryOp::Extract {
        kind,
        predicate,
        default,
    }
}

fn set_kind(operator: OperatorId) -> SetKind {
    match operator {
        OperatorId::Intersect => SetKind::Intersect,
        OperatorId::Except => SetKind::Except,
        _ => SetKind::Union,
    }
}

fn missing(operator: OperatorId, what: &str) -> QueryError {
    QueryError::internal(format!("{operator} reached the rewriter without its {what}"))
}

/// Output shape an operator produces.
pub(crate) fn expected_output(operator: OperatorId) -> &'static str {
    match operator {
        OperatorId::Any | OperatorId::All | OperatorId::Contains => "bool",
        OperatorId::Count => "count",
        OperatorId::First
        | OperatorId::FirstOrDefault
        | OperatorId::Last
        | OperatorId::LastOrDefault
        | OperatorId::Single
        | OperatorId::SingleOrDefault => "element",
        OperatorId::Select => "projected",
        _ => "sequence",
    }
}

fn check_output<T>(operator: OperatorId, output: &QueryOutput<T>) -> QueryResult<()> {
    let expected = expected_output(operator);
    if output.kind_name() == expected {
        Ok(())
    } else {
        Err(QueryError::translation(
            operator.name(),
            format!(
                "provider returned {} output where {expected} was expected",
                output.kind_name()
            ),
        ))
    }
}
