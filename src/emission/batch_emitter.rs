//! # Batch Emitter
//!
//! Delivers one worker's batch to the sink as a single JSON array POST. A
//! failed delivery is logged and the batch is dropped; there is no retry and
//! no local persistence.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::time::Duration;
use thiserror::Error;

use crate::logging::{log_emission_operation, log_error};
use crate::models::Batch;

#[derive(Debug, Error)]
pub enum EmissionError {
    #[error("Invalid sink URL {url}: {reason}")]
    InvalidSinkUrl { url: String, reason: String },

    #[error("Batch serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Sink unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Sink rejected batch with status {status}")]
    Rejected { status: u16, headers: String },
}

/// Terminal state of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    Delivered { points: usize },
    Dropped { points: usize },
}

impl EmitOutcome {
    pub fn points(&self) -> usize {
        match self {
            Self::Delivered { points } | Self::Dropped { points } => *points,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Destination for assembled batches. Delivery never fails outward; the
/// outcome reports whether the batch landed or was dropped.
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn emit(&self, batch: Batch) -> EmitOutcome;
}

/// Sink client for an OpenTSDB-style `/api/put` endpoint
#[derive(Debug, Clone)]
pub struct HttpBatchEmitter {
    client: Client,
    sink_url: Url,
    timeout: Option<Duration>,
}

impl HttpBatchEmitter {
    pub fn new(client: Client, sink_url: &str, timeout: Option<Duration>) -> Result<Self, EmissionError> {
        let sink_url = Url::parse(sink_url).map_err(|e| EmissionError::InvalidSinkUrl {
            url: sink_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            sink_url,
            timeout,
        })
    }

    pub fn sink_url(&self) -> &Url {
        &self.sink_url
    }

    /// POST the batch, returning the sink's status and headers on a 2xx.
    async fn deliver(&self, batch: &Batch) -> Result<(u16, String), EmissionError> {
        let body = serde_json::to_vec(batch)?;

        let mut request = self
            .client
            .post(self.sink_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let headers = format!("{:?}", response.headers());

        if !status.is_success() {
            return Err(EmissionError::Rejected {
                status: status.as_u16(),
                headers,
            });
        }

        Ok((status.as_u16(), headers))
    }
}

#[async_trait]
impl MetricSink for HttpBatchEmitter {
    async fn emit(&self, batch: Batch) -> EmitOutcome {
        let points = batch.len();
        if points == 0 {
            return EmitOutcome::Delivered { points };
        }

        match self.deliver(&batch).await {
            Ok((status, headers)) => {
                log_emission_operation("deliver", points, Some(status), Some(&headers));
                EmitOutcome::Delivered { points }
            }
            Err(e) => {
                let status = match &e {
                    EmissionError::Rejected { status, .. } => Some(*status),
                    _ => None,
                };
                let details = match &e {
                    EmissionError::Rejected { headers, .. } => Some(headers.as_str()),
                    _ => None,
                };
                log_error("batch_emitter", "deliver", &e.to_string(), details);
                log_emission_operation("drop", points, status, details);
                EmitOutcome::Dropped { points }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricPoint, Tags};
    use mockito::Matcher;

    fn batch(len: usize) -> Batch {
        let tags = Tags {
            organization: "a.example".to_string(),
            organization_id: 1,
        };
        (0..len)
            .map(|i| MetricPoint::new("domain.ttfb", 1_700_000_000, i as i64, tags.clone()))
            .collect()
    }

    fn emitter(server: &mockito::ServerGuard) -> HttpBatchEmitter {
        HttpBatchEmitter::new(Client::new(), &format!("{}/api/put", server.url()), None).unwrap()
    }

    #[tokio::test]
    async fn test_delivers_json_array() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/put")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::to_value(batch(3)).unwrap()))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let outcome = emitter(&server).emit(batch(3)).await;

        mock.assert_async().await;
        assert_eq!(outcome, EmitOutcome::Delivered { points: 3 });
    }

    #[tokio::test]
    async fn test_non_2xx_drops_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/put")
            .with_status(500)
            .with_body(r#"{"error":"storage unavailable"}"#)
            .expect(1)
            .create_async()
            .await;

        let outcome = emitter(&server).emit(batch(5)).await;

        mock.assert_async().await;
        assert_eq!(outcome, EmitOutcome::Dropped { points: 5 });
    }

    #[tokio::test]
    async fn test_unreachable_sink_drops() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let emitter =
            HttpBatchEmitter::new(Client::new(), &format!("http://{addr}/api/put"), None).unwrap();
        let outcome = emitter.emit(batch(2)).await;

        assert!(!outcome.is_delivered());
        assert_eq!(outcome.points(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/put")
            .expect(0)
            .create_async()
            .await;

        let outcome = emitter(&server).emit(Vec::new()).await;

        mock.assert_async().await;
        assert_eq!(outcome, EmitOutcome::Delivered { points: 0 });
    }

    #[test]
    fn test_invalid_sink_url() {
        assert!(matches!(
            HttpBatchEmitter::new(Client::new(), "not a url", None),
            Err(EmissionError::InvalidSinkUrl { .. })
        ));
    }
}
