use serde::{Deserialize, Serialize};

use crate::constants::NOT_MEASURED;

/// Result of one scheme attempt against a domain.
///
/// Durations are microseconds. A phase the attempt never reached stays at zero,
/// so a failed attempt still carries whatever it measured before failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub serviceable: bool,
    pub ttfb_us: i64,
    pub ttlb_us: i64,
    pub dns_us: i64,
    pub ssl_us: i64,
}

impl ProbeOutcome {
    /// Outcome of an attempt that failed before any phase was timed.
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Value of the `uptime` metric.
    pub fn uptime(&self) -> i64 {
        i64::from(self.serviceable)
    }
}

/// Full page-load measurement in microseconds, `-1` when not measured or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLoadResult {
    pub value_us: i64,
}

impl PageLoadResult {
    pub fn measured(value_us: i64) -> Self {
        Self { value_us }
    }

    pub fn not_measured() -> Self {
        Self {
            value_us: NOT_MEASURED,
        }
    }

    pub fn is_measured(&self) -> bool {
        self.value_us != NOT_MEASURED
    }
}

impl Default for PageLoadResult {
    fn default() -> Self {
        Self::not_measured()
    }
}
