//! # Metric Assembly
//!
//! Conversion of probe results into tagged, timestamped metric points.

pub mod assembler;

pub use assembler::{MetricAssembler, MetricFamilies};
