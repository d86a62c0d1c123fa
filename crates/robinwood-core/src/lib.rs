//! Shared vocabulary for robinwood: errors, ids, wire operations, metrics,
//! idempotency keys and the usage data model.

pub mod errors;
pub mod idempotency;
pub mod ids;
pub mod metrics;
pub mod operation;
pub mod usage;

pub use errors::{Result, StealError};
pub use metrics::{calculate_metrics, Metrics, SizeUnit};
pub use operation::{NamedOperation, Operation, PipelineType};
