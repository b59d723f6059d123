//! allOf flattening
//!
//! This crate handles:
//! - Collapsing `allOf` groups into one equivalent schema
//! - Resolving conflicting constraints (type, format, bounds, enum, pattern)
//! - Breaking reference cycles without unbounded recursion

pub mod error;
pub mod state;
mod flatten;
mod keywords;

pub use error::MergeError;
pub use flatten::{merge, merge_schema, Flattened};
pub use state::{Handle, MergeState};
