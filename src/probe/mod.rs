//! # Domain Probing
//!
//! Instrumented HTTP(S) probes and the scheme-fallback policy applied per domain.
//!
//! - [`latency_prober`] - one GET with DNS/TLS/TTFB/TTLB phase timing
//! - [`fallback`] - plain-then-secure attempt ordering
//! - [`phases`] - phase marks and duration derivation

pub mod errors;
pub mod fallback;
pub mod latency_prober;
pub mod phases;

pub use errors::ProbeError;
pub use fallback::ProtocolFallbackPolicy;
pub use latency_prober::{
    build_tls_connector, build_tls_connector_with_roots, HttpLatencyProber, LatencyProbe,
};
pub use phases::PhaseMarks;
