//! Argument validation and callback normalization.
//!
//! Runs synchronously before anything else: no source is scanned, no
//! provider is contacted and the cancellation token is not consulted.

use common_error::{QueryError, QueryResult, ensure_argument};
use quarry_core::{CallbackRequirement, ComparerRef, Element, OperatorId, SortKey};
use quarry_expr::{AnyValue, CallbackShape, NormalizedCallback};
use quarry_provider::QuerySource;

use crate::capability::projects;
use crate::invocation::{InvocationCallback, OperatorInvocation};

/// A callback bound to the canonical invocation contract, by role.
pub enum OperatorCallback<T> {
    Predicate(NormalizedCallback<T, bool>),
    Selector(NormalizedCallback<T, AnyValue>),
    Key(NormalizedCallback<T, SortKey>),
}

impl<T> OperatorCallback<T> {
    /// Shape of the underlying callback.
    pub const fn shape(&self) -> CallbackShape {
        match self {
            Self::Predicate(callback) => callback.shape(),
            Self::Selector(callback) => callback.shape(),
            Self::Key(callback) => callback.shape(),
        }
    }
}

/// A validated invocation with its callback normalized.
pub struct NormalizedInvocation<T: Element> {
    pub operator: OperatorId,
    pub source: QuerySource<T>,
    pub callback: Option<OperatorCallback<T>>,
    pub comparer: Option<ComparerRef<T>>,
    pub default: Option<T>,
    pub value: Option<T>,
    pub second: Option<QuerySource<T>>,
}

impl<T: Element> NormalizedInvocation<T> {
    /// The predicate, if one is bound.
    pub fn predicate(&self) -> Option<&NormalizedCallback<T, bool>> {
        match &self.callback {
            Some(OperatorCallback::Predicate(predicate)) => Some(predicate),
            _ => None,
        }
    }

    /// Caller default, or the element type's default.
    pub fn default_or_type_default(&self) -> T {
        self.default.clone().unwrap_or_else(T::type_default)
    }
}

/// Validate an invocation and normalize its callback.
///
/// Errors, in order: `Argument("source")`, `Argument("callback")`,
/// `Argument("second")`, `Argument("value")`.
pub fn normalize<T: Element>(
    invocation: OperatorInvocation<T>,
) -> QueryResult<NormalizedInvocation<T>> {
    let OperatorInvocation {
        operator,
        source,
        callback,
        comparer,
        default,
        value,
        second,
    } = invocation;

    let source = source.ok_or_else(|| QueryError::argument("source"))?;
    let callback = normalize_callback(operator, callback)?;
    ensure_argument!(
        !operator.takes_second_sequence() || second.is_some(),
        "second"
    );
    ensure_argument!(operator != OperatorId::Contains || value.is_some(), "value");

    Ok(NormalizedInvocation {
        operator,
        source,
        callback,
        comparer,
        default,
        value,
        second,
    })
}

fn normalize_callback<T: Element>(
    operator: OperatorId,
    callback: Option<InvocationCallback<T>>,
) -> QueryResult<Option<OperatorCallback<T>>> {
    let requirement = operator.callback_requirement();
    let Some(callback) = callback else {
        ensure_argument!(requirement != CallbackRequirement::Required, "callback");
        return Ok(None);
    };
    ensure_argument!(requirement != CallbackRequirement::None, "callback");

    let normalized = match (operator, callback) {
        (OperatorId::Select, InvocationCallback::Selector(selector)) => {
            OperatorCallback::Selector(NormalizedCallback::new(selector))
        }
        (OperatorId::OrderBy | OperatorId::OrderByDescending, InvocationCallback::Key(key)) => {
            OperatorCallback::Key(NormalizedCallback::new(key))
        }
        (op, InvocationCallback::Predicate(predicate)) if !projects(op) => {
            OperatorCallback::Predicate(NormalizedCallback::new(predicate))
        }
        (op, other) => {
            log::debug!("Rejected {} callback for {op}", other.role());
            return Err(QueryError::argument("callback"));
        }
    };

    Ok(Some(normalized))
}
