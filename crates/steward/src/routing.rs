//! Capability routing: keyword scoring with a fuzzy closest-match fallback,
//! plus the dispatch audit trail used by diagnostics.

pub mod audit;
pub mod fuzzy;
pub mod router;

pub use audit::{AuditEntry, DispatchAudit};
pub use router::{Router, RouterOptions};
