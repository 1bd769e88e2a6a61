//! Active-domain query against the organization registry.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::PgPool;
use std::time::Instant;

use crate::constants::ACTIVE_DOMAINS_QUERY;
use crate::logging::{log_error, log_registry_operation};
use crate::models::DomainRecord;

/// Source of the domains to probe in one run.
///
/// A read failure is not an error to the caller: a row that cannot be
/// decoded is logged and skipped, and a failed query returns whatever rows
/// were read before it, possibly none.
#[async_trait]
pub trait DomainRegistry: Send + Sync {
    async fn active_domains(&self) -> Vec<DomainRecord>;
}

#[derive(Debug, Clone)]
pub struct PgDomainRegistry {
    pool: PgPool,
}

impl PgDomainRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DomainRegistry for PgDomainRegistry {
    async fn active_domains(&self) -> Vec<DomainRecord> {
        let started = Instant::now();
        let mut rows = sqlx::query_as::<_, DomainRecord>(ACTIVE_DOMAINS_QUERY).fetch(&self.pool);
        let mut records = Vec::new();
        let mut status = "complete";
        let mut skipped = 0usize;

        loop {
            match rows.try_next().await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => break,
                Err(e) if is_row_error(&e) => {
                    skipped += 1;
                    log_error(
                        "domain_registry",
                        "decode_row",
                        &e.to_string(),
                        Some(&format!("rows_read={}", records.len())),
                    );
                }
                Err(e) => {
                    log_error(
                        "domain_registry",
                        "active_domains",
                        &e.to_string(),
                        Some(&format!("rows_read={}", records.len())),
                    );
                    status = "partial";
                    break;
                }
            }
        }

        log_registry_operation(
            "active_domains",
            records.len(),
            status,
            Some(started.elapsed().as_millis() as u64),
            (skipped > 0).then(|| format!("rows_skipped={skipped}")).as_deref(),
        );
        records
    }
}

/// Failures confined to a single row; the result stream stays usable.
fn is_row_error(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_)
    )
}
