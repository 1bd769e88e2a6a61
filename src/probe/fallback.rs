//! # Protocol Fallback Policy
//!
//! Two-element, fixed-order chain: the plain scheme first, the secure scheme
//! only if the plain attempt was not serviceable. When both fail, the secure
//! attempt's outcome is reported as-is; outcomes are never merged.

use std::sync::Arc;
use tracing::debug;

use super::latency_prober::LatencyProbe;
use crate::constants::schemes;
use crate::models::{probe_url, ProbeOutcome};

#[derive(Clone)]
pub struct ProtocolFallbackPolicy {
    prober: Arc<dyn LatencyProbe>,
}

impl ProtocolFallbackPolicy {
    pub fn new(prober: Arc<dyn LatencyProbe>) -> Self {
        Self { prober }
    }

    /// Probe `domain`, stopping at the first serviceable scheme.
    pub async fn resolve(&self, domain: &str) -> ProbeOutcome {
        let plain = self.prober.probe(&probe_url(schemes::PLAIN, domain)).await;
        if plain.serviceable {
            return plain;
        }

        debug!(domain = %domain, "Plain scheme unserviceable, retrying over secure scheme");
        self.prober.probe(&probe_url(schemes::SECURE, domain)).await
    }
}
