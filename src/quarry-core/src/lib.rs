//! Core types for Quarry.
//!
//! - [`Element`]: the capability every queried element type provides
//!   (type tag, type default, intrinsic equality)
//! - [`ElementComparer`]: caller-supplied or default equality for set operators
//! - [`OperatorId`]: the identity of every supported sequence operator
//! - [`SortKey`]: a type-erased ordering key produced by key selectors

pub mod comparer;
pub mod element;
pub mod operator;
pub mod sort_key;

pub use comparer::{ComparerRef, DefaultComparer, ElementComparer, ElementSet, FnComparer};
pub use element::{Element, ElementType};
pub use operator::{CallbackRequirement, OperatorFamily, OperatorId};
pub use sort_key::SortKey;
