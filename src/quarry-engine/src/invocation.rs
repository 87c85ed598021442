//! Operator invocations.
//!
//! An [`OperatorInvocation`] is the transient description of one call to one
//! operator with its bound arguments. Every argument is optional here so an
//! absent source or callback reaches validation instead of being ruled out
//! by construction.

use std::fmt;

use quarry_core::{ComparerRef, Element, ElementType, OperatorId, SortKey};
use quarry_expr::{AnyValue, Callback, CallbackShape, Predicate};
use quarry_provider::QuerySource;

/// The callback bound to an invocation, by role.
pub enum InvocationCallback<T> {
    /// Boolean test on an element.
    Predicate(Predicate<T>),
    /// Projection to a value of another type.
    Selector(Callback<T, AnyValue>),
    /// Ordering key.
    Key(Callback<T, SortKey>),
}

impl<T> InvocationCallback<T> {
    /// Shape of the bound callback.
    pub const fn shape(&self) -> CallbackShape {
        match self {
            Self::Predicate(callback) => callback.shape(),
            Self::Selector(callback) => callback.shape(),
            Self::Key(callback) => callback.shape(),
        }
    }

    pub(crate) const fn role(&self) -> &'static str {
        match self {
            Self::Predicate(_) => "predicate",
            Self::Selector(_) => "selector",
            Self::Key(_) => "key",
        }
    }
}

impl<T> fmt::Debug for InvocationCallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.role(), self.shape())
    }
}

/// One call to one operator.
pub struct OperatorInvocation<T: Element> {
    pub(crate) operator: OperatorId,
    pub(crate) source: Option<QuerySource<T>>,
    pub(crate) callback: Option<InvocationCallback<T>>,
    pub(crate) comparer: Option<ComparerRef<T>>,
    pub(crate) default: Option<T>,
    pub(crate) value: Option<T>,
    pub(crate) second: Option<QuerySource<T>>,
}

impl<T: Element> OperatorInvocation<T> {
    /// Start an invocation of `operator` with no arguments bound.
    pub fn new(operator: OperatorId) -> Self {
        Self {
            operator,
            source: None,
            callback: None,
            comparer: None,
            default: None,
            value: None,
            second: None,
        }
    }

    /// Bind the source sequence.
    #[must_use]
    pub fn with_source(mut self, source: QuerySource<T>) -> Self {
        self.source = Some(source);
        self
    }

    /// Bind a predicate.
    #[must_use]
    pub fn with_predicate(mut self, predicate: Predicate<T>) -> Self {
        self.callback = Some(InvocationCallback::Predicate(predicate));
        self
    }

    /// Bind a type-erased selector.
    #[must_use]
    pub fn with_selector(mut self, selector: Callback<T, AnyValue>) -> Self {
        self.callback = Some(InvocationCallback::Selector(selector));
        self
    }

    /// Bind an ordering key.
    #[must_use]
    pub fn with_key(mut self, key: Callback<T, SortKey>) -> Self {
        self.callback = Some(InvocationCallback::Key(key));
        self
    }

    /// Bind an equality comparer.
    #[must_use]
    pub fn with_comparer(mut self, comparer: ComparerRef<T>) -> Self {
        self.comparer = Some(comparer);
        self
    }

    /// Bind the caller-supplied default value.
    #[must_use]
    pub fn with_default(mut self, default: T) -> Self {
        self.default = Some(default);
        self
    }

    /// Bind the value searched by `contains`.
    #[must_use]
    pub fn with_value(mut self, value: T) -> Self {
        self.value = Some(value);
        self
    }

    /// Bind the second sequence of a set operator.
    #[must_use]
    pub fn with_second(mut self, second: QuerySource<T>) -> Self {
        self.second = Some(second);
        self
    }

    /// Operator being invoked.
    pub fn operator(&self) -> OperatorId {
        self.operator
    }

    /// Shape of the bound callback, if any.
    pub fn callback_shape(&self) -> Option<CallbackShape> {
        self.callback.as_ref().map(InvocationCallback::shape)
    }

    /// Element types participating in the invocation.
    pub fn element_types(&self) -> Vec<ElementType> {
        vec![T::element_type()]
    }
}

impl<T: Element> fmt::Debug for OperatorInvocation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorInvocation")
            .field("operator", &self.operator)
            .field("source", &self.source)
            .field("callback", &self.callback)
            .field("default", &self.default)
            .field("value", &self.value)
            .field("second", &self.second)
            .finish_non_exhaustive()
    }
}
