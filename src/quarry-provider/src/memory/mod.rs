//! In-memory provider.
//!
//! Named collections held in memory, with configurable declared
//! capabilities and native execution of every translated operator. Counters
//! expose how the engine touched the data, and a failure can be injected at
//! a fixed position of a source to exercise mid-scan errors.
//!
//! ```rust,ignore
//! use quarry_provider::{MemoryProvider, ProviderCaps};
//!
//! let provider = MemoryProvider::new("orders")
//!     .with_caps(ProviderCaps::all())
//!     .with_collection("open", vec![3, 1, 2])
//!     .with_failure_at("broken", 2, "replica lost");
//! ```

mod native;
mod provider;

pub use provider::{MemoryProvider, MemoryStats};
