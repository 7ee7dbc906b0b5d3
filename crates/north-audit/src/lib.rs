//! North Audit: persistence and decision metrics
//!
//! The policy engine only builds [`AuditRecord`](north_policy::AuditRecord)s.
//! This crate gets them onto disk without slowing evaluation down, and
//! reads them back for aggregate reporting.
//!
//! - [`AuditStore`]: append-only sink ([`FsAuditStore`], [`MemoryAuditStore`])
//! - [`AuditDispatcher`]: bounded queue plus one background writer
//! - [`aggregate`]: counts by risk level, decision and policy version

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod store;

pub use dispatcher::{AuditDispatcher, DispatchOutcome};
pub use error::{PersistError, StoreError};
pub use metrics::{aggregate, collect, DecisionMetrics};
pub use store::{AuditStore, FsAuditStore, MemoryAuditStore, PersistReceipt};
