//! Operator identities.
//!
//! Every sequence operator the adapter exposes has exactly one
//! [`OperatorId`]. The id is the key of per-operator policy entries and of
//! provider capability declarations.

use std::fmt;
use std::str::FromStr;

use common_error::QueryError;
use serde::{Deserialize, Serialize};

/// Identity of a sequence operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorId {
    Any,
    All,
    Count,
    Contains,
    First,
    FirstOrDefault,
    Last,
    LastOrDefault,
    Single,
    SingleOrDefault,
    DefaultIfEmpty,
    Distinct,
    Reverse,
    Union,
    Intersect,
    Except,
    Filter,
    Select,
    OrderBy,
    OrderByDescending,
    ToVec,
}

/// Coarse grouping of operators by result shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorFamily {
    /// Boolean result (`any`, `all`, `contains`).
    Existence,
    /// Numeric result (`count`).
    Aggregate,
    /// One element (`first`, `single`, ...).
    ElementExtraction,
    /// Sequence over one source.
    Sequence,
    /// Sequence over two sources.
    Set,
    /// Sequence of another element type.
    Projection,
    /// Reordered sequence.
    Ordering,
}

/// Whether an operator takes a predicate or selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackRequirement {
    /// Never takes a callback.
    None,
    /// Takes an optional predicate.
    Optional,
    /// Requires a callback.
    Required,
}

impl CallbackRequirement {
    /// Whether the callback must be supplied.
    pub const fn is_required(&self) -> bool {
        matches!(self, Self::Required)
    }
}

impl OperatorId {
    /// Every operator, in declaration order.
    pub const ALL: [Self; 21] = [
        Self::Any,
        Self::All,
        Self::Count,
        Self::Contains,
        Self::First,
        Self::FirstOrDefault,
        Self::Last,
        Self::LastOrDefault,
        Self::Single,
        Self::SingleOrDefault,
        Self::DefaultIfEmpty,
        Self::Distinct,
        Self::Reverse,
        Self::Union,
        Self::Intersect,
        Self::Except,
        Self::Filter,
        Self::Select,
        Self::OrderBy,
        Self::OrderByDescending,
        Self::ToVec,
    ];

    /// Stable operator name, as used in configuration and errors.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::All => "all",
            Self::Count => "count",
            Self::Contains => "contains",
            Self::First => "first",
            Self::FirstOrDefault => "first_or_default",
            Self::Last => "last",
            Self::LastOrDefault => "last_or_default",
            Self::Single => "single",
            Self::SingleOrDefault => "single_or_default",
            Self::DefaultIfEmpty => "default_if_empty",
            Self::Distinct => "distinct",
            Self::Reverse => "reverse",
            Self::Union => "union",
            Self::Intersect => "intersect",
            Self::Except => "except",
            Self::Filter => "filter",
            Self::Select => "select",
            Self::OrderBy => "order_by",
            Self::OrderByDescending => "order_by_descending",
            Self::ToVec => "to_vec",
        }
    }

    /// Result-shape family.
    pub const fn family(&self) -> OperatorFamily {
        match self {
            Self::Any | Self::All | Self::Contains => OperatorFamily::Existence,
            Self::Count => OperatorFamily::Aggregate,
            Self::First
            | Self::FirstOrDefault
            | Self::Last
            | Self::LastOrDefault
            | Self::Single
            | Self::SingleOrDefault => OperatorFamily::ElementExtraction,
            Self::DefaultIfEmpty | Self::Distinct | Self::Reverse | Self::Filter | Self::ToVec => {
                OperatorFamily::Sequence
            }
            Self::Union | Self::Intersect | Self::Except => OperatorFamily::Set,
            Self::Select => OperatorFamily::Projection,
            Self::OrderBy | Self::OrderByDescending => OperatorFamily::Ordering,
        }
    }

    /// Callback requirement of this operator.
    pub const fn callback_requirement(&self) -> CallbackRequirement {
        match self {
            Self::All | Self::Filter | Self::Select | Self::OrderBy | Self::OrderByDescending => {
                CallbackRequirement::Required
            }
            Self::Any
            | Self::Count
            | Self::First
            | Self::FirstOrDefault
            | Self::Last
            | Self::LastOrDefault
            | Self::Single
            | Self::SingleOrDefault => CallbackRequirement::Optional,
            Self::Contains
            | Self::DefaultIfEmpty
            | Self::Distinct
            | Self::Reverse
            | Self::Union
            | Self::Intersect
            | Self::Except
            | Self::ToVec => CallbackRequirement::None,
        }
    }

    /// Whether the operator consumes a second sequence.
    pub const fn takes_second_sequence(&self) -> bool {
        matches!(self.family(), OperatorFamily::Set)
    }

    /// Whether the operator accepts a comparer.
    pub const fn takes_comparer(&self) -> bool {
        matches!(
            self,
            Self::Contains | Self::Distinct | Self::Union | Self::Intersect | Self::Except
        )
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperatorId {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| QueryError::invalid_configuration(format!("unknown operator '{s}'")))
    }
}
