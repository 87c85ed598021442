//! Provider layer for Quarry.
//!
//! This crate is the boundary between the query engine and whatever backs a
//! sequence:
//!
//! - [`QueryProvider`]: the trait every backing store implements
//! - [`ElementStream`]: pull-based, cancellable forward cursor over elements
//! - [`ProviderCaps`]: which operators a provider translates natively
//! - [`MemoryProvider`]: named in-memory collections, used as the reference
//!   backend in tests
//!
//! # Architecture
//!
//! - Execution-agnostic: a provider never decides between translating and
//!   emulating; it only scans or executes what it is handed
//! - Pull-based: scans return an [`ElementStream`] that fetches lazily
//! - Cancellable: the token handed to `scan` is checked on every fetch
//!
//! ```rust,ignore
//! use quarry_provider::{MemoryProvider, QueryProvider};
//!
//! let provider = MemoryProvider::new("numbers").with_collection("xs", vec![1, 2, 3]);
//! let mut stream = provider.scan(&"xs".into(), &token).await?;
//! while let Some(element) = stream.next().await {
//!     process(element?);
//! }
//! ```

mod caps;
pub mod memory;
mod provider;
mod stream;

pub use caps::{ProviderCaps, ProviderId};
pub use memory::{MemoryProvider, MemoryStats};
pub use provider::{QueryProvider, QuerySource};
pub use stream::{ElementStream, ElementStreamExt, MemoryElementStream, empty_stream};
