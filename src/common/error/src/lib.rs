//! Error types and result aliases for Quarry.
//!
//! Every crate in the workspace reports failures through [`QueryError`], so a
//! caller can classify an outcome without knowing which execution path ran.

mod error;

pub use error::{GenericError, QueryError, QueryResult};
