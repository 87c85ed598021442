//! Async sequence-query adapter for Quarry.
//!
//! This crate decides, per operator call, whether the operator is pushed
//! down into the backing provider or emulated client-side, and executes it
//! with reference `Iterator` semantics either way.

#![allow(clippy::missing_const_for_fn)] // Builder patterns often can't be const
#![allow(clippy::return_self_not_must_use)] // Builder patterns don't always need must_use
#![allow(clippy::significant_drop_tightening)] // Cursors are released explicitly
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐    ┌────────────┐    ┌────────────┐    ┌─────────────────┐
//! │ AsyncQueryable │ ─▶ │ Normalizer │ ─▶ │  Resolver  │ ─▶ │ Rewriter        │ ─▶ provider
//! │ / Invocation   │    │            │    │            │    │ or Emulation    │ ─▶ cursor
//! └────────────────┘    └────────────┘    └────────────┘    └─────────────────┘
//! ```
//!
//! # Key Components
//!
//! - [`AdapterHandle`]: façade holding an immutable [`CapabilityPolicy`]
//! - [`OperatorInvocation`]: one call with its bound arguments
//! - [`normalizer`]: argument validation and callback shape normalization
//! - [`capability`]: the pure `(operator, shape, policy, support) → Decision`
//!   function
//! - [`rewriter`]: builds a provider `QueryExpr` for the Translate path
//! - [`emulation`]: cursor-based client-side evaluation for the Emulate path
//! - [`AsyncQueryable`]: typed methods, one per operator
//!
//! # Example
//!
//! ```rust,ignore
//! use quarry_engine::{AdapterHandle, CapabilityPolicy};
//! use quarry_expr::Callback;
//! use quarry_provider::{MemoryProvider, QuerySource};
//!
//! let provider = Arc::new(MemoryProvider::new("numbers").with_collection("xs", vec![1, 2, 2, 3]));
//! let handle = AdapterHandle::new(CapabilityPolicy::permissive());
//! let xs = handle.queryable(QuerySource::new(provider, "xs"));
//!
//! let evens = xs.count(Some(Callback::sync(|x: &i32| x % 2 == 0)), &token).await?;
//! let unique = xs.distinct(None, &token).await?;
//! ```

pub mod adapter;
pub mod capability;
pub mod emulation;
pub mod invocation;
pub mod normalizer;
pub mod queryable;
pub mod rewriter;

pub use adapter::{AdapterHandle, InvocationState, PreparedInvocation};
pub use capability::{CapabilityPolicy, Decision, ExecutionPath, TranslationSupport, resolve};
pub use emulation::{CursorState, EmulationCursor};
pub use invocation::{InvocationCallback, OperatorInvocation};
pub use normalizer::{NormalizedInvocation, OperatorCallback, normalize};
pub use queryable::AsyncQueryable;
