//! # Probe Context
//!
//! Everything a chunk worker needs, built once per process and shared by
//! reference-counted handles. Workers hold no other shared state.

use reqwest::Client;
use std::sync::Arc;
use tracing::info;

use crate::config::ProbeConfig;
use crate::emission::{HttpBatchEmitter, MetricSink};
use crate::error::Result;
use crate::metrics::MetricAssembler;
use crate::page_load::{PageLoadAdapter, WebDriverPageLoad};
use crate::probe::{build_tls_connector, HttpLatencyProber, LatencyProbe, ProtocolFallbackPolicy};

#[derive(Clone)]
pub struct ProbeContext {
    pub fallback: ProtocolFallbackPolicy,
    pub page_load: Option<PageLoadAdapter>,
    pub assembler: MetricAssembler,
    pub sink: Arc<dyn MetricSink>,
    pub max_concurrent_chunks: Option<usize>,
}

impl std::fmt::Debug for ProbeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeContext")
            .field("page_load", &self.page_load.is_some())
            .field("assembler", &self.assembler)
            .field("max_concurrent_chunks", &self.max_concurrent_chunks)
            .finish_non_exhaustive()
    }
}

impl ProbeContext {
    pub fn new(
        prober: Arc<dyn LatencyProbe>,
        assembler: MetricAssembler,
        sink: Arc<dyn MetricSink>,
    ) -> Self {
        Self {
            fallback: ProtocolFallbackPolicy::new(prober),
            page_load: None,
            assembler,
            sink,
            max_concurrent_chunks: None,
        }
    }

    pub fn with_page_load(mut self, adapter: Option<PageLoadAdapter>) -> Self {
        self.page_load = adapter;
        self
    }

    pub fn with_max_concurrent_chunks(mut self, cap: Option<usize>) -> Self {
        self.max_concurrent_chunks = cap;
        self
    }

    /// Wire the production collaborators from configuration.
    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        let tls = build_tls_connector()?;
        let prober = Arc::new(HttpLatencyProber::new(
            tls,
            config.probe_timeout(),
            config.user_agent.clone(),
        ));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;

        let sink = HttpBatchEmitter::new(client.clone(), &config.sink_url, config.sink_timeout())?;

        let page_load = if config.metrics.include_page_load {
            WebDriverPageLoad::from_config(client, &config.page_load)?.map(|driver| {
                PageLoadAdapter::new(Arc::new(driver))
                    .with_timeout(config.page_load.timeout())
                    .with_max_sessions(config.page_load.max_concurrent_sessions)
            })
        } else {
            None
        };

        info!(
            sink_url = %config.sink_url,
            probe_timeout_ms = config.probe_timeout_ms,
            page_load = page_load.is_some(),
            max_concurrent_chunks = ?config.max_concurrent_chunks,
            "Probe context initialized"
        );

        Ok(Self::new(
            prober,
            MetricAssembler::new(config.metrics.namespace.clone(), config.metrics.families()),
            Arc::new(sink),
        )
        .with_page_load(page_load)
        .with_max_concurrent_chunks(config.max_concurrent_chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds_without_page_load() {
        let context = ProbeContext::from_config(&ProbeConfig::default()).unwrap();
        assert!(context.page_load.is_none());
        assert_eq!(context.max_concurrent_chunks, None);
    }

    #[test]
    fn test_remote_driver_enables_page_load() {
        let mut config = ProbeConfig::default();
        config.page_load.webdriver_url = Some("http://localhost:4444".to_string());

        let context = ProbeContext::from_config(&config).unwrap();
        assert!(context.page_load.is_some());
    }

    #[test]
    fn test_disabled_family_skips_page_load() {
        let mut config = ProbeConfig::default();
        config.page_load.webdriver_url = Some("http://localhost:4444".to_string());
        config.metrics.include_page_load = false;

        let context = ProbeContext::from_config(&config).unwrap();
        assert!(context.page_load.is_none());
    }
}
