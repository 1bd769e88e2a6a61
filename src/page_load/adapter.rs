//! # Page-Load Estimator Adapter
//!
//! Boundary to the page-load collaborator. Bounds each call with a deadline
//! and caps concurrently open sessions, then folds every failure into the
//! `-1` sentinel so a broken collaborator never blocks the remaining domains.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::errors::PageLoadError;
use super::webdriver::PageLoadCollaborator;
use crate::models::PageLoadResult;

#[derive(Clone)]
pub struct PageLoadAdapter {
    collaborator: Arc<dyn PageLoadCollaborator>,
    timeout: Option<Duration>,
    sessions: Option<Arc<Semaphore>>,
}

impl PageLoadAdapter {
    pub fn new(collaborator: Arc<dyn PageLoadCollaborator>) -> Self {
        Self {
            collaborator,
            timeout: None,
            sessions: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_sessions(mut self, max_sessions: Option<usize>) -> Self {
        self.sessions = max_sessions.map(|permits| Arc::new(Semaphore::new(permits)));
        self
    }

    /// Measure `url`, returning the sentinel on any failure.
    pub async fn estimate(&self, url: &str) -> PageLoadResult {
        let started = Instant::now();

        match self.try_estimate(url).await {
            Ok(value_us) => {
                debug!(
                    url = %url,
                    page_load_us = value_us,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Page load measured"
                );
                PageLoadResult::measured(value_us)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Page load measurement failed");
                PageLoadResult::not_measured()
            }
        }
    }

    async fn try_estimate(&self, url: &str) -> Result<i64, PageLoadError> {
        let _permit = match &self.sessions {
            Some(sessions) => Some(
                sessions
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| PageLoadError::Closed)?,
            ),
            None => None,
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.collaborator.measure(url))
                .await
                .map_err(|_| PageLoadError::Timeout(limit))?,
            None => self.collaborator.measure(url).await,
        }
    }
}
