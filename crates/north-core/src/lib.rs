//! North Core: error model, canonical encoding and evaluation context
//!
//! Shared plumbing for the North change-governance engine. Nothing in here
//! knows about risk; it only gives the other crates one error type, one way
//! to serialize values deterministically and one way to carry the caller's
//! correlation data.

pub mod canonical;
pub mod context;
pub mod error;

pub use canonical::{canonical_json, digest_hex};
pub use context::EvaluationContext;
pub use error::NorthError;

/// Engine version reported by the service and stamped into audit metadata
pub const NORTH_VERSION: &str = env!("CARGO_PKG_VERSION");
