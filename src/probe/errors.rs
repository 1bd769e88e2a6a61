//! Probe attempt failures. These never leave the prober; they are logged and
//! reflected as `serviceable = false` in the attempt's outcome.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Invalid probe URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("DNS resolution failed for {host}: {reason}")]
    Dns { host: String, reason: String },

    #[error("Connection to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS handshake with {host} failed: {source}")]
    Tls {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP exchange failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("Stopped after {0} redirects")]
    TooManyRedirects(usize),

    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),
}

impl ProbeError {
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
