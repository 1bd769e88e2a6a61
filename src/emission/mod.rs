//! # Metric Emission
//!
//! Delivery of assembled batches to the time-series sink.

pub mod batch_emitter;

pub use batch_emitter::{EmissionError, EmitOutcome, HttpBatchEmitter, MetricSink};
