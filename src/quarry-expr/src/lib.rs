//! Callbacks and query expressions for Quarry.
//!
//! This crate holds the two representations an operator call passes through:
//!
//! - [`Callback`] / [`NormalizedCallback`]: the three caller-facing predicate
//!   and selector shapes, and the single `(element, token) -> outcome`
//!   contract they normalize to
//! - [`QueryExpr`] / [`QueryOp`]: the provider-facing representation built
//!   when an operator is translated, and the [`QueryOutput`] it yields

pub mod callback;
pub mod query;

pub use callback::{
    AnyValue, AsyncFn, AsyncTokenFn, Callback, CallbackShape, NormalizedCallback, Predicate,
    SyncFn,
};
pub use query::{
    ExtractKind, ProviderCallback, ProviderPredicate, QueryExpr, QueryOp, QueryOutput, SetKind,
    SourceRef,
};
