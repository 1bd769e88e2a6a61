//! # Latency Prober
//!
//! Performs one instrumented HTTP(S) GET and decomposes its timing into DNS,
//! TLS handshake, time-to-first-byte, and time-to-last-byte.
//!
//! Each attempt resolves, connects, and handshakes on a fresh connection so
//! every phase is observed; the HTTP/1.1 exchange then runs through hyper's
//! connection-level client. Redirects are followed up to `MAX_REDIRECTS`
//! hops under the same deadline, with TTFB and TTLB measured from the start
//! of the first request. The TLS configuration is built once and shared by
//! every worker.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::header::{ACCEPT, HOST, LOCATION, USER_AGENT};
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{self, ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::debug;
use url::{Host, Url};

use super::errors::ProbeError;
use super::phases::PhaseMarks;
use crate::constants::MAX_REDIRECTS;
use crate::logging::log_probe_operation;
use crate::models::ProbeOutcome;

/// One instrumented attempt against a URL. Implementations never fail: every
/// error is folded into the returned outcome.
#[async_trait]
pub trait LatencyProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Build the TLS connector shared by all probe attempts, trusting the
/// bundled webpki roots.
pub fn build_tls_connector() -> Result<TlsConnector, rustls::Error> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    build_tls_connector_with_roots(roots)
}

/// Build a probe TLS connector trusting only `roots`.
pub fn build_tls_connector_with_roots(roots: RootCertStore) -> Result<TlsConnector, rustls::Error> {
    let mut config =
        ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(TlsConnector::from(Arc::new(config)))
}

/// Where one attempt connects and what it asks for
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProbeTarget {
    secure: bool,
    host: String,
    ip: Option<IpAddr>,
    port: u16,
    authority: String,
    path: String,
}

impl ProbeTarget {
    #[cfg(test)]
    fn parse(raw: &str) -> Result<Self, ProbeError> {
        let url = Url::parse(raw).map_err(|e| ProbeError::invalid_url(raw, e.to_string()))?;
        Self::from_url(&url)
    }

    fn from_url(url: &Url) -> Result<Self, ProbeError> {
        let raw = url.as_str();

        let secure = match url.scheme() {
            "http" => false,
            "https" => true,
            other => {
                return Err(ProbeError::invalid_url(
                    raw,
                    format!("unsupported scheme '{other}'"),
                ))
            }
        };

        let (host, ip) = match url.host() {
            Some(Host::Domain(domain)) => (domain.to_string(), None),
            Some(Host::Ipv4(addr)) => (addr.to_string(), Some(IpAddr::V4(addr))),
            Some(Host::Ipv6(addr)) => (addr.to_string(), Some(IpAddr::V6(addr))),
            None => return Err(ProbeError::invalid_url(raw, "missing host")),
        };

        let port = url
            .port_or_known_default()
            .ok_or_else(|| ProbeError::invalid_url(raw, "missing port"))?;

        let authority = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(ProbeError::invalid_url(raw, "missing host")),
        };

        let path = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };

        Ok(Self {
            secure,
            host,
            ip,
            port,
            authority,
            path,
        })
    }
}

/// Production prober over raw TCP, rustls, and hyper's HTTP/1.1 client connection
#[derive(Clone)]
pub struct HttpLatencyProber {
    tls: TlsConnector,
    timeout: Duration,
    user_agent: String,
}

impl std::fmt::Debug for HttpLatencyProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLatencyProber")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl HttpLatencyProber {
    pub fn new(tls: TlsConnector, timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            tls,
            timeout,
            user_agent: user_agent.into(),
        }
    }

    /// Run one attempt, recording phase marks as they are reached and
    /// following redirects. Returns the final HTTP status.
    async fn execute(&self, url: &str, marks: &mut PhaseMarks) -> Result<u16, ProbeError> {
        let mut current = Url::parse(url).map_err(|e| ProbeError::invalid_url(url, e.to_string()))?;
        let mut redirects = 0;

        loop {
            let target = ProbeTarget::from_url(&current)?;
            let reply = self.request(&target, marks).await?;

            let location = match reply.location {
                Some(location) if is_redirect(reply.status) => location,
                _ => {
                    marks.mark_completion();
                    return Ok(reply.status);
                }
            };

            if redirects == MAX_REDIRECTS {
                return Err(ProbeError::TooManyRedirects(MAX_REDIRECTS));
            }
            redirects += 1;

            let next = current
                .join(&location)
                .map_err(|e| ProbeError::invalid_url(location.as_str(), e.to_string()))?;
            debug!(from = %current, to = %next, status = reply.status, "Following redirect");
            current = next;
        }
    }

    /// One request on a fresh connection
    async fn request(&self, target: &ProbeTarget, marks: &mut PhaseMarks) -> Result<Reply, ProbeError> {
        let addrs = resolve(target, marks).await?;
        let stream = connect_any(&addrs).await?;

        if !target.secure {
            return self.exchange(TokioIo::new(stream), target, marks).await;
        }

        let server_name = ServerName::try_from(target.host.clone())
            .map_err(|e| ProbeError::invalid_url(target.host.as_str(), e.to_string()))?;

        marks.mark_tls_start();
        let handshake = self.tls.connect(server_name, stream).await;
        marks.mark_tls_end();
        let tls_stream = handshake.map_err(|source| ProbeError::Tls {
            host: target.host.clone(),
            source,
        })?;

        self.exchange(TokioIo::new(tls_stream), target, marks).await
    }

    async fn exchange<T>(
        &self,
        io: T,
        target: &ProbeTarget,
        marks: &mut PhaseMarks,
    ) -> Result<Reply, ProbeError>
    where
        T: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
    {
        let (mut sender, connection) =
            hyper::client::conn::http1::handshake::<_, Empty<Bytes>>(io).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "Probe connection closed with error");
            }
        });

        let request = Request::builder()
            .method(Method::GET)
            .uri(target.path.as_str())
            .header(HOST, target.authority.as_str())
            .header(USER_AGENT, self.user_agent.as_str())
            .header(ACCEPT, "*/*")
            .body(Empty::<Bytes>::new())
            .map_err(|e| ProbeError::invalid_url(target.authority.as_str(), e.to_string()))?;

        let response = sender.send_request(request).await?;
        marks.mark_first_byte();

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let mut body = response.into_body();
        while let Some(frame) = body.frame().await {
            frame?;
        }

        Ok(Reply { status, location })
    }
}

/// Status and redirect target of one completed exchange
#[derive(Debug)]
struct Reply {
    status: u16,
    location: Option<String>,
}

fn is_redirect(status: u16) -> bool {
    matches!(
        StatusCode::from_u16(status),
        Ok(StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT)
    )
}

#[async_trait]
impl LatencyProbe for HttpLatencyProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let mut marks = PhaseMarks::start();

        let result = match tokio::time::timeout(self.timeout, self.execute(url, &mut marks)).await
        {
            Ok(result) => result,
            Err(_) => {
                marks.close_open_phases();
                Err(ProbeError::Timeout(self.timeout))
            }
        };
        marks.mark_completion();

        let (outcome, status, error) = match result {
            Ok(status) => (marks.outcome(status == 200), Some(status), None),
            Err(e) => (marks.outcome(false), None, Some(e.to_string())),
        };

        log_probe_operation(url, status, &outcome, error.as_deref());
        outcome
    }
}

async fn resolve(target: &ProbeTarget, marks: &mut PhaseMarks) -> Result<Vec<SocketAddr>, ProbeError> {
    if let Some(ip) = target.ip {
        return Ok(vec![SocketAddr::new(ip, target.port)]);
    }

    marks.mark_dns_start();
    let lookup = tokio::net::lookup_host((target.host.as_str(), target.port)).await;
    marks.mark_dns_end();
    let addrs: Vec<SocketAddr> = lookup
        .map_err(|e| ProbeError::Dns {
            host: target.host.clone(),
            reason: e.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(ProbeError::Dns {
            host: target.host.clone(),
            reason: "no addresses returned".to_string(),
        });
    }

    Ok(addrs)
}

/// Connect to the first address that accepts, reporting the last failure otherwise.
async fn connect_any(addrs: &[SocketAddr]) -> Result<TcpStream, ProbeError> {
    let mut last_error = None;

    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                return Ok(stream);
            }
            Err(source) => {
                last_error = Some(ProbeError::Connect {
                    addr: *addr,
                    source,
                })
            }
        }
    }

    Err(last_error.unwrap_or_else(|| ProbeError::Dns {
        host: String::new(),
        reason: "no addresses to connect to".to_string(),
    }))
}
