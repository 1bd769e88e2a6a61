//! # Metric Assembler
//!
//! Pure transformation of one domain's probe outcome into its ordered metric
//! points. Every point of a domain shares the run timestamp and the same tags.

use crate::constants::families;
use crate::models::{DomainRecord, MetricPoint, PageLoadResult, ProbeOutcome, Tags};

/// Optional metric families. `uptime`, `ttfb` and `ttlb` are always produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricFamilies {
    pub include_dns: bool,
    pub include_ssl: bool,
    pub include_page_load: bool,
}

impl Default for MetricFamilies {
    fn default() -> Self {
        Self {
            include_dns: true,
            include_ssl: true,
            include_page_load: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricAssembler {
    namespace: String,
    families: MetricFamilies,
}

impl MetricAssembler {
    pub fn new(namespace: impl Into<String>, families: MetricFamilies) -> Self {
        Self {
            namespace: namespace.into(),
            families,
        }
    }

    pub fn families(&self) -> MetricFamilies {
        self.families
    }

    /// `<namespace>.<family>`, or the bare family with an empty namespace.
    pub fn metric_name(&self, family: &str) -> String {
        if self.namespace.is_empty() {
            family.to_string()
        } else {
            format!("{}.{family}", self.namespace)
        }
    }

    /// Build the points for one domain, in fixed family order.
    ///
    /// `page_load` is `Some` exactly when a measurement was attempted; its value
    /// may be the `-1` sentinel.
    pub fn assemble(
        &self,
        record: &DomainRecord,
        outcome: &ProbeOutcome,
        page_load: Option<PageLoadResult>,
        run_timestamp: i64,
    ) -> Vec<MetricPoint> {
        let tags = Tags::from(record);

        let mut values = vec![
            (families::UPTIME, outcome.uptime()),
            (families::TTFB, outcome.ttfb_us),
            (families::TTLB, outcome.ttlb_us),
        ];
        if self.families.include_dns {
            values.push((families::DNS, outcome.dns_us));
        }
        if self.families.include_ssl {
            values.push((families::SSL, outcome.ssl_us));
        }
        if let Some(page_load) = page_load {
            values.push((families::PAGE_LOAD, page_load.value_us));
        }

        values
            .into_iter()
            .map(|(family, value)| {
                MetricPoint::new(self.metric_name(family), run_timestamp, value, tags.clone())
            })
            .collect()
    }
}

impl Default for MetricAssembler {
    fn default() -> Self {
        Self::new(crate::constants::defaults::METRIC_NAMESPACE, MetricFamilies::default())
    }
}
