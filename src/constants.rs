//! # System Constants
//!
//! Fixed values shared across the probe pipeline: metric family names, the
//! probe path, sentinel values, and configuration defaults.

/// Path requested on every probed domain.
pub const PROBE_PATH: &str = "/favicon.ico";

/// Redirect hops followed before a probe attempt gives up.
pub const MAX_REDIRECTS: usize = 10;

/// Value reported for a measurement that was not taken or failed.
pub const NOT_MEASURED: i64 = -1;

/// Metric family names, in emission order.
pub mod families {
    pub const UPTIME: &str = "uptime";
    pub const TTFB: &str = "ttfb";
    pub const TTLB: &str = "ttlb";
    pub const DNS: &str = "dns";
    pub const SSL: &str = "ssl";
    pub const PAGE_LOAD: &str = "pageLoad";
}

/// URL schemes in fallback order.
pub mod schemes {
    pub const PLAIN: &str = "http";
    pub const SECURE: &str = "https";
}

/// Configuration defaults.
pub mod defaults {
    pub const CHUNK_SIZE: usize = 10;
    pub const PROBE_TIMEOUT_MS: u64 = 10_000;
    pub const SINK_URL: &str = "http://localhost:4242/api/put";
    pub const REGISTRY_DSN: &str = "postgresql://localhost/organization_service";
    pub const REGISTRY_MAX_CONNECTIONS: u32 = 20;
    pub const METRIC_NAMESPACE: &str = "domain";
    pub const PAGE_LOAD_TIMEOUT_MS: u64 = 60_000;
    pub const MAX_CONCURRENT_PAGE_LOADS: usize = 2;
    pub const USER_AGENT: &str = concat!("domain-probe/", env!("CARGO_PKG_VERSION"));
}

/// Registry query returning every active organization with a domain.
pub const ACTIVE_DOMAINS_QUERY: &str = "SELECT id::BIGINT AS id, COALESCE(name, '') AS name, domain \
     FROM organizations \
     WHERE deleted_at IS NULL AND domain IS NOT NULL \
     ORDER BY id";
