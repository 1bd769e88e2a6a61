//! # Data Model
//!
//! Value types flowing through one probe run: registry rows, per-attempt probe
//! outcomes, page-load results, and the metric points sent to the sink.

pub mod domain_record;
pub mod metric_point;
pub mod probe_outcome;

pub use domain_record::{probe_url, DomainRecord};
pub use metric_point::{Batch, MetricPoint, Tags};
pub use probe_outcome::{PageLoadResult, ProbeOutcome};
