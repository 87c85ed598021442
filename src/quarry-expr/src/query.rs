//! Provider-facing query expressions.
//!
//! When an operator is translated, the rewriter builds a [`QueryExpr`]: the
//! source it runs against plus one [`QueryOp`]. Synchronous callbacks travel
//! as the caller's own function; asynchronous ones only appear when the
//! provider declares a native asynchronous primitive.

use std::fmt;
use std::sync::Arc;

use common_display::{DisplayTree, TreeNode};
use common_error::QueryResult;
use common_runtime::CancellationToken;
use quarry_core::{ComparerRef, OperatorId, SortKey};

use crate::callback::{AnyValue, CallbackShape, NormalizedCallback, SyncFn};

// ============================================================================
// Source References
// ============================================================================

/// Name of a source collection within one provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceRef(Arc<str>);

impl SourceRef {
    /// Create a source reference.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Source name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TreeNode for SourceRef {
    fn label(&self) -> String {
        format!("Source({self})")
    }
}

impl From<&str> for SourceRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SourceRef {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

// ============================================================================
// Provider Callbacks
// ============================================================================

/// A callback as handed to a provider.
pub enum ProviderCallback<T, R> {
    /// The caller's synchronous function, unchanged.
    Sync(SyncFn<T, R>),
    /// An asynchronous callback for a provider-native async primitive.
    Async(NormalizedCallback<T, R>),
}

/// Boolean provider callback.
pub type ProviderPredicate<T> = ProviderCallback<T, bool>;

impl<T, R> ProviderCallback<T, R> {
    /// Shape of the wrapped callback.
    pub fn shape(&self) -> CallbackShape {
        match self {
            Self::Sync(_) => CallbackShape::Sync,
            Self::Async(callback) => callback.shape(),
        }
    }
}

impl<T, R> ProviderCallback<T, R>
where
    T: Clone + Send + Sync,
    R: Send,
{
    /// Evaluate the callback on one element.
    pub async fn call(&self, element: &T, cancel: &CancellationToken) -> QueryResult<R> {
        match self {
            Self::Sync(f) => Ok(f(element)),
            Self::Async(callback) => callback.invoke(element, cancel).await,
        }
    }
}

impl<T, R> fmt::Debug for ProviderCallback<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProviderCallback({})", self.shape())
    }
}

// ============================================================================
// Query Operations
// ============================================================================

/// Which element a single-element extraction returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractKind {
    First,
    Last,
    Single,
}

/// Which set operation combines two sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    Union,
    Intersect,
    Except,
}

/// One translated operator.
pub enum QueryOp<T> {
    Any {
        predicate: Option<ProviderPredicate<T>>,
    },
    All {
        predicate: ProviderPredicate<T>,
    },
    Count {
        predicate: Option<ProviderPredicate<T>>,
    },
    Contains {
        value: T,
        comparer: Option<ComparerRef<T>>,
    },
    /// `default` set means the `*_or_default` variant.
    Extract {
        kind: ExtractKind,
        predicate: Option<ProviderPredicate<T>>,
        default: Option<T>,
    },
    DefaultIfEmpty {
        default: T,
    },
    Distinct {
        comparer: Option<ComparerRef<T>>,
    },
    Reverse,
    SetOp {
        kind: SetKind,
        second: SourceRef,
        comparer: Option<ComparerRef<T>>,
    },
    Filter {
        predicate: ProviderPredicate<T>,
    },
    Select {
        selector: SyncFn<T, AnyValue>,
    },
    OrderBy {
        key: SyncFn<T, SortKey>,
        descending: bool,
    },
    ToVec,
}

impl<T> QueryOp<T> {
    /// Operator this operation implements.
    pub fn operator(&self) -> OperatorId {
        match self {
            Self::Any { .. } => OperatorId::Any,
            Self::All { .. } => OperatorId::All,
            Self::Count { .. } => OperatorId::Count,
            Self::Contains { .. } => OperatorId::Contains,
            Self::Extract { kind, default, .. } => match (kind, default.is_some()) {
                (ExtractKind::First, false) => OperatorId::First,
                (ExtractKind::First, true) => OperatorId::FirstOrDefault,
                (ExtractKind::Last, false) => OperatorId::Last,
                (ExtractKind::Last, true) => OperatorId::LastOrDefault,
                (ExtractKind::Single, false) => OperatorId::Single,
                (ExtractKind::Single, true) => OperatorId::SingleOrDefault,
            },
            Self::DefaultIfEmpty { .. } => OperatorId::DefaultIfEmpty,
            Self::Distinct { .. } => OperatorId::Distinct,
            Self::Reverse => OperatorId::Reverse,
            Self::SetOp { kind, .. } => match kind {
                SetKind::Union => OperatorId::Union,
                SetKind::Intersect => OperatorId::Intersect,
                SetKind::Except => OperatorId::Except,
            },
            Self::Filter { .. } => OperatorId::Filter,
            Self::Select { .. } => OperatorId::Select,
            Self::OrderBy { descending, .. } => {
                if *descending {
                    OperatorId::OrderByDescending
                } else {
                    OperatorId::OrderBy
                }
            }
            Self::ToVec => OperatorId::ToVec,
        }
    }

    fn details(&self) -> Option<String> {
        fn comparer_detail<T>(comparer: Option<&ComparerRef<T>>) -> &'static str {
            if comparer.is_some() { "custom" } else { "default" }
        }

        match self {
            Self::Any { predicate }
            | Self::Count { predicate }
            | Self::Extract { predicate, .. } => predicate
                .as_ref()
                .map(|p| format!("predicate={}", p.shape())),
            Self::All { predicate } | Self::Filter { predicate } => {
                Some(format!("predicate={}", predicate.shape()))
            }
            Self::Contains { comparer, .. }
            | Self::Distinct { comparer }
            | Self::SetOp { comparer, .. } => Some(format!(
                "comparer={}",
                comparer_detail(comparer.as_ref())
            )),
            Self::Select { .. } => Some("selector=sync".to_string()),
            Self::OrderBy { .. } => Some("key=sync".to_string()),
            Self::DefaultIfEmpty { .. } | Self::Reverse | Self::ToVec => None,
        }
    }
}

// ============================================================================
// Query Expression
// ============================================================================

/// A translated operator bound to its source.
pub struct QueryExpr<T> {
    /// Source the operator runs against.
    pub source: SourceRef,
    /// The operator.
    pub op: QueryOp<T>,
}

impl<T> QueryExpr<T> {
    /// Create a query expression.
    pub fn new(source: SourceRef, op: QueryOp<T>) -> Self {
        Self { source, op }
    }

    /// Operator this expression implements.
    pub fn operator(&self) -> OperatorId {
        self.op.operator()
    }

    /// Render the expression as a tree.
    pub fn explain(&self) -> String {
        DisplayTree::new(self).to_string()
    }
}

impl<T> fmt::Debug for QueryExpr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryExpr")
            .field("source", &self.source)
            .field("operator", &self.operator())
            .finish_non_exhaustive()
    }
}

impl<T> TreeNode for QueryExpr<T> {
    fn label(&self) -> String {
        self.operator().name().to_string()
    }

    fn details(&self) -> Option<String> {
        self.op.details()
    }

    fn children(&self) -> Vec<&dyn TreeNode> {
        let mut children: Vec<&dyn TreeNode> = vec![&self.source];
        if let QueryOp::SetOp { second, .. } = &self.op {
            children.push(second);
        }
        children
    }
}

// ============================================================================
// Query Output
// ============================================================================

/// Result of an operator, in its natural shape.
pub enum QueryOutput<T> {
    Bool(bool),
    Count(usize),
    Element(T),
    Sequence(Vec<T>),
    Projected(Vec<AnyValue>),
}

impl<T> QueryOutput<T> {
    /// Short name of the output shape.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Count(_) => "count",
            Self::Element(_) => "element",
            Self::Sequence(_) => "sequence",
            Self::Projected(_) => "projected",
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for QueryOutput<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Count(n) => f.debug_tuple("Count").field(n).finish(),
            Self::Element(e) => f.debug_tuple("Element").field(e).finish(),
            Self::Sequence(s) => f.debug_tuple("Sequence").field(s).finish(),
            Self::Projected(p) => write!(f, "Projected({} values)", p.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common_runtime::CancellationToken;
    use quarry_core::DefaultComparer;

    use super::*;
    use crate::callback::Callback;

    #[test]
    fn test_operator_mapping() {
        let first = QueryOp::<i32>::Extract {
            kind: ExtractKind::First,
            predicate: None,
            default: None,
        };
        assert_eq!(first.operator(), OperatorId::First);

        let single_or_default = QueryOp::<i32>::Extract {
            kind: ExtractKind::Single,
            predicate: None,
            default: Some(0),
        };
        assert_eq!(single_or_default.operator(), OperatorId::SingleOrDefault);

        let descending = QueryOp::<i32>::OrderBy {
            key: Arc::new(|x: &i32| SortKey::new(*x)),
            descending: true,
        };
        assert_eq!(descending.operator(), OperatorId::OrderByDescending);
    }

    #[test]
    fn test_explain_set_operation() {
        let expr = QueryExpr::new(
            SourceRef::new("a"),
            QueryOp::<i32>::SetOp {
                kind: SetKind::Union,
                second: SourceRef::new("b"),
                comparer: None,
            },
        );

        assert_eq!(
            expr.explain(),
            "union (comparer=default)\n├─ Source(a)\n└─ Source(b)\n"
        );
    }

    #[test]
    fn test_explain_predicate_shape() {
        let expr = QueryExpr::new(
            SourceRef::new("numbers"),
            QueryOp::<i32>::Filter {
                predicate: ProviderCallback::Sync(Arc::new(|x: &i32| *x > 0)),
            },
        );
        assert_eq!(
            expr.explain(),
            "filter (predicate=sync)\n└─ Source(numbers)\n"
        );

        let distinct = QueryExpr::new(
            SourceRef::new("numbers"),
            QueryOp::<i32>::Distinct {
                comparer: Some(DefaultComparer::shared::<i32>()),
            },
        );
        assert!(distinct.explain().starts_with("distinct (comparer=custom)"));
    }

    #[tokio::test]
    async fn test_provider_callback_call() {
        let token = CancellationToken::none();

        let sync: ProviderPredicate<i32> = ProviderCallback::Sync(Arc::new(|x: &i32| *x % 2 == 0));
        assert!(sync.call(&4, &token).await.unwrap());
        assert_eq!(sync.shape(), CallbackShape::Sync);

        let async_cb: ProviderPredicate<i32> = ProviderCallback::Async(NormalizedCallback::new(
            Callback::from_async(|x: i32| async move { x > 10 }),
        ));
        assert!(!async_cb.call(&3, &token).await.unwrap());
        assert_eq!(async_cb.shape(), CallbackShape::AsyncNoToken);
    }

    #[test]
    fn test_output_kind_name() {
        assert_eq!(QueryOutput::<i32>::Bool(true).kind_name(), "bool");
        assert_eq!(QueryOutput::<i32>::Sequence(vec![1]).kind_name(), "sequence");
        assert_eq!(
            format!("{:?}", QueryOutput::<i32>::Projected(vec![Box::new(1_u8)])),
            "Projected(1 values)"
        );
    }
}
