use std::time::Duration;
use thiserror::Error;

/// Failures of one page-load measurement. The adapter turns every variant
/// into the `-1` sentinel.
#[derive(Debug, Error)]
pub enum PageLoadError {
    #[error("Driver unavailable: {0}")]
    Driver(String),

    #[error("Browser session could not be started: {0}")]
    SessionStart(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Load timing could not be extracted: {0}")]
    Extraction(String),

    #[error("WebDriver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Page load measurement exceeded {0:?}")]
    Timeout(Duration),

    #[error("Page load sessions are no longer being issued")]
    Closed,
}

impl PageLoadError {
    pub fn navigation(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
