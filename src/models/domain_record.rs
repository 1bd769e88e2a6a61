use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::constants::{schemes, PROBE_PATH};

/// DomainRecord represents one active organization with a configured domain
/// Maps to rows of the `organizations` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DomainRecord {
    pub id: i64,
    pub name: String,
    pub domain: String,
}

impl DomainRecord {
    pub fn new(id: i64, name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            domain: domain.into(),
        }
    }

    /// Probe URL for this domain over the plain scheme.
    pub fn plain_url(&self) -> String {
        probe_url(schemes::PLAIN, &self.domain)
    }

    /// Landing page over the plain scheme, used for page-load measurement.
    pub fn page_url(&self) -> String {
        format!("{}://{}/", schemes::PLAIN, self.domain.trim_end_matches('/'))
    }

    /// Probe URL for this domain over the secure scheme.
    pub fn secure_url(&self) -> String {
        probe_url(schemes::SECURE, &self.domain)
    }
}

/// Build `<scheme>://<domain>/favicon.ico`, tolerating a trailing slash on the domain.
pub fn probe_url(scheme: &str, domain: &str) -> String {
    format!("{scheme}://{}{PROBE_PATH}", domain.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_urls() {
        let record = DomainRecord::new(1, "Acme", "a.example");
        assert_eq!(record.plain_url(), "http://a.example/favicon.ico");
        assert_eq!(record.secure_url(), "https://a.example/favicon.ico");
        assert_eq!(record.page_url(), "http://a.example/");
    }

    #[test]
    fn test_probe_url_keeps_port_and_drops_trailing_slash() {
        assert_eq!(
            probe_url("http", "127.0.0.1:8080/"),
            "http://127.0.0.1:8080/favicon.ico"
        );
    }
}
