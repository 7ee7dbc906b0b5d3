//! North-IN: canonical change requests
//!
//! Everything upstream of scoring lives here: the [`ChangeRequest`] model,
//! the keyword vocabulary used to bucket free-form text, and the normalizer
//! that turns loosely-typed caller input into a request.
//!
//! # Example
//!
//! ```
//! use north_in::{normalize, Environment};
//! use serde_json::json;
//!
//! let request = normalize(&json!({
//!     "env": "prod",
//!     "actionType": "Delete",
//!     "irreversible": "true",
//!     "blastRadius": "tenant-wide",
//!     "governanceMissing": ["approval"],
//!     "ticket": "CHG-1234"
//! }));
//!
//! assert_eq!(request.environment, Environment::Prod);
//! assert_eq!(request.action_category, "delete");
//! assert!(!request.reversible);
//! assert!(request.blast_radius.is_global());
//! assert!(request.extra.contains_key("ticket"));
//! ```

pub mod normalizer;
pub mod request;
pub mod vocabulary;

pub use normalizer::{coerce_bool, coerce_number, normalize, normalize_map, normalize_token};
pub use request::{
    AssetCriticality, BlastRadius, BlastSource, ChangeRequest, ChangeWindow, Environment,
    PrivilegeLevel,
};
pub use vocabulary::{ActionClass, BlastScope, GovernanceGap};
