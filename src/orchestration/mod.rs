//! # Run Orchestration
//!
//! Turns a list of domain records into concurrently probed chunks and
//! emitted batches.
//!
//! - [`chunking`] - contiguous chunk partitioning
//! - [`context`] - shared collaborators handed to every chunk task
//! - [`dispatcher`] - per-chunk fan-out and barrier join
//! - [`runner`] - one complete run from registry to summary
//! - [`summary`] - run tallies

pub mod chunking;
pub mod context;
pub mod dispatcher;
pub mod runner;
pub mod summary;

pub use chunking::partition;
pub use context::ProbeContext;
pub use dispatcher::ChunkDispatcher;
pub use runner::ProbeRunner;
pub use summary::{ChunkReport, RunSummary};
