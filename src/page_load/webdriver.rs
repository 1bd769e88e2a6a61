//! # WebDriver Page-Load Collaborator
//!
//! Measures full page-load time by driving a real browser through the W3C
//! WebDriver HTTP protocol (chromedriver or compatible).
//!
//! One measurement owns one session lifecycle: start the driver (when a binary
//! is configured), create a session, navigate, read the Navigation Timing
//! `loadEventEnd`, delete the session, stop the driver. Teardown runs on every
//! exit path.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::errors::PageLoadError;
use crate::config::PageLoadConfig;

/// Reads `loadEventEnd` in milliseconds relative to navigation start.
const LOAD_TIMING_SCRIPT: &str = r#"
const entries = performance.getEntriesByType('navigation');
if (entries.length > 0 && entries[0].loadEventEnd > 0) {
    return entries[0].loadEventEnd;
}
const timing = performance.timing;
return timing.loadEventEnd > 0 ? timing.loadEventEnd - timing.navigationStart : null;
"#;

const DRIVER_READY_ATTEMPTS: u32 = 50;
const DRIVER_READY_INTERVAL: Duration = Duration::from_millis(100);

/// An opaque, possibly slow, page-load timing service
#[async_trait]
pub trait PageLoadCollaborator: Send + Sync {
    /// Full load time of `url` in microseconds.
    async fn measure(&self, url: &str) -> Result<i64, PageLoadError>;
}

#[derive(Debug, Clone)]
enum DriverEndpoint {
    /// An already running driver
    Remote(Url),
    /// A driver binary started for each measurement on a free local port
    Spawned(String),
}

/// Envelope every WebDriver response is wrapped in
#[derive(Debug, Deserialize)]
struct WireResponse {
    value: Value,
}

/// Page-load collaborator speaking the W3C WebDriver protocol
#[derive(Debug, Clone)]
pub struct WebDriverPageLoad {
    client: Client,
    endpoint: DriverEndpoint,
    browser_args: Vec<String>,
}

impl WebDriverPageLoad {
    /// Use a driver that is already listening at `base_url`.
    pub fn remote(client: Client, base_url: &str) -> Result<Self, PageLoadError> {
        let url = Url::parse(base_url)
            .map_err(|e| PageLoadError::Driver(format!("invalid WebDriver URL {base_url}: {e}")))?;

        Ok(Self {
            client,
            endpoint: DriverEndpoint::Remote(url),
            browser_args: default_browser_args(),
        })
    }

    /// Start `driver_path` for every measurement.
    pub fn spawned(client: Client, driver_path: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: DriverEndpoint::Spawned(driver_path.into()),
            browser_args: default_browser_args(),
        }
    }

    /// Build from configuration, preferring a running driver over spawning one.
    pub fn from_config(client: Client, config: &PageLoadConfig) -> Result<Option<Self>, PageLoadError> {
        if !config.enabled {
            return Ok(None);
        }

        match (&config.webdriver_url, &config.driver_path) {
            (Some(url), _) => Self::remote(client, url).map(Some),
            (None, Some(path)) => Ok(Some(Self::spawned(client, path.clone()))),
            (None, None) => Ok(None),
        }
    }

    async fn start_driver(&self) -> Result<DriverHandle, PageLoadError> {
        match &self.endpoint {
            DriverEndpoint::Remote(url) => Ok(DriverHandle {
                base_url: url.clone(),
                child: None,
            }),
            DriverEndpoint::Spawned(path) => {
                let port = free_local_port().await?;
                let child = Command::new(path)
                    .arg(format!("--port={port}"))
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .kill_on_drop(true)
                    .spawn()
                    .map_err(|e| PageLoadError::Driver(format!("failed to start {path}: {e}")))?;

                let base_url = Url::parse(&format!("http://127.0.0.1:{port}"))
                    .map_err(|e| PageLoadError::Driver(e.to_string()))?;
                let handle = DriverHandle {
                    base_url,
                    child: Some(child),
                };

                if let Err(e) = self.wait_until_ready(&handle.base_url).await {
                    handle.stop().await;
                    return Err(e);
                }

                debug!(driver = %path, port = port, "WebDriver started");
                Ok(handle)
            }
        }
    }

    async fn wait_until_ready(&self, base_url: &Url) -> Result<(), PageLoadError> {
        let status_url = endpoint(base_url, "status")?;

        for _ in 0..DRIVER_READY_ATTEMPTS {
            if let Ok(response) = self.client.get(status_url.clone()).send().await {
                if let Ok(body) = response.json::<WireResponse>().await {
                    if body.value.get("ready").and_then(Value::as_bool) == Some(true) {
                        return Ok(());
                    }
                }
            }
            tokio::time::sleep(DRIVER_READY_INTERVAL).await;
        }

        Err(PageLoadError::Driver(format!(
            "driver at {base_url} did not become ready"
        )))
    }

    async fn create_session(&self, base_url: &Url) -> Result<String, PageLoadError> {
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "pageLoadStrategy": "normal",
                    "goog:chromeOptions": { "args": self.browser_args }
                }
            }
        });

        let value = self
            .command(endpoint(base_url, "session")?, capabilities)
            .await
            .map_err(|e| PageLoadError::SessionStart(e.to_string()))?;

        value
            .get("sessionId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PageLoadError::SessionStart("response carried no sessionId".to_string()))
    }

    async fn navigate(&self, base_url: &Url, session_id: &str, url: &str) -> Result<(), PageLoadError> {
        self.command(
            endpoint(base_url, &format!("session/{session_id}/url"))?,
            json!({ "url": url }),
        )
        .await
        .map(|_| ())
        .map_err(|e| PageLoadError::navigation(url, e.to_string()))
    }

    async fn extract_load_time(&self, base_url: &Url, session_id: &str) -> Result<i64, PageLoadError> {
        let value = self
            .command(
                endpoint(base_url, &format!("session/{session_id}/execute/sync"))?,
                json!({ "script": LOAD_TIMING_SCRIPT, "args": [] }),
            )
            .await
            .map_err(|e| PageLoadError::Extraction(e.to_string()))?;

        let load_ms = value
            .as_f64()
            .ok_or_else(|| PageLoadError::Extraction(format!("unexpected timing value {value}")))?;

        if !load_ms.is_finite() || load_ms < 0.0 {
            return Err(PageLoadError::Extraction(format!(
                "invalid load time {load_ms}"
            )));
        }

        Ok((load_ms * 1000.0).round() as i64)
    }

    /// POST a WebDriver command and unwrap its `value`, surfacing protocol errors.
    async fn command(&self, url: Url, body: Value) -> Result<Value, PageLoadError> {
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let wire: WireResponse = response.json().await?;

        if status != StatusCode::OK {
            let error = wire.value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
            let message = wire.value.get("message").and_then(Value::as_str).unwrap_or_default();
            return Err(PageLoadError::Driver(format!("{status}: {error} {message}")));
        }

        Ok(wire.value)
    }

    async fn measure_in_session(&self, base_url: &Url, url: &str) -> Result<i64, PageLoadError> {
        let session_id = self.create_session(base_url).await?;
        let session = SessionGuard::new(self.client.clone(), base_url, session_id);

        let result = match self.navigate(base_url, session.id(), url).await {
            Ok(()) => self.extract_load_time(base_url, session.id()).await,
            Err(e) => Err(e),
        };

        session.release().await;
        result
    }
}

#[async_trait]
impl PageLoadCollaborator for WebDriverPageLoad {
    async fn measure(&self, url: &str) -> Result<i64, PageLoadError> {
        let driver = self.start_driver().await?;
        let result = self.measure_in_session(&driver.base_url, url).await;
        driver.stop().await;
        result
    }
}

/// An open browser session. Released inline on normal exit; if the owning
/// measurement is cancelled first, dropping the guard sends the DELETE from a
/// background task so the driver does not keep the browser alive.
struct SessionGuard {
    client: Client,
    base_url: Url,
    session_id: String,
    armed: bool,
}

impl SessionGuard {
    fn new(client: Client, base_url: &Url, session_id: String) -> Self {
        Self {
            client,
            base_url: base_url.clone(),
            session_id,
            armed: true,
        }
    }

    fn id(&self) -> &str {
        &self.session_id
    }

    async fn release(mut self) {
        self.armed = false;
        delete_session(&self.client, &self.base_url, &self.session_id).await;
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let session_id = std::mem::take(&mut self.session_id);

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!(session_id = %session_id, "Measurement cancelled, deleting session in background");
                runtime.spawn(async move {
                    delete_session(&client, &base_url, &session_id).await;
                });
            }
            Err(_) => {
                warn!(session_id = %session_id, "No runtime available to delete abandoned WebDriver session");
            }
        }
    }
}

async fn delete_session(client: &Client, base_url: &Url, session_id: &str) {
    let url = match endpoint(base_url, &format!("session/{session_id}")) {
        Ok(url) => url,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Could not build session delete URL");
            return;
        }
    };

    if let Err(e) = client.delete(url).send().await {
        warn!(session_id = %session_id, error = %e, "Failed to delete WebDriver session");
    }
}

/// A driver endpoint plus the process backing it, if this measurement started one
struct DriverHandle {
    base_url: Url,
    child: Option<Child>,
}

impl DriverHandle {
    async fn stop(self) {
        if let Some(mut child) = self.child {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to stop WebDriver process");
            }
        }
    }
}

fn default_browser_args() -> Vec<String> {
    ["--headless=new", "--no-sandbox", "--disable-gpu"]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
}

fn endpoint(base_url: &Url, path: &str) -> Result<Url, PageLoadError> {
    let base = base_url.as_str().trim_end_matches('/');
    Url::parse(&format!("{base}/{path}")).map_err(|e| PageLoadError::Driver(e.to_string()))
}

async fn free_local_port() -> Result<u16, PageLoadError> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| PageLoadError::Driver(format!("no free local port: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| PageLoadError::Driver(e.to_string()))?
        .port();
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_load::PageLoadAdapter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn collaborator(server: &mockito::ServerGuard) -> WebDriverPageLoad {
        WebDriverPageLoad::remote(Client::new(), &server.url()).unwrap()
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let base = Url::parse("http://localhost:9515/wd/hub/").unwrap();
        assert_eq!(
            endpoint(&base, "session/abc/url").unwrap().as_str(),
            "http://localhost:9515/wd/hub/session/abc/url"
        );
    }

    #[test]
    fn test_from_config_prefers_running_driver() {
        let config = PageLoadConfig {
            webdriver_url: Some("http://chrome:9515".to_string()),
            driver_path: Some("/usr/bin/chromedriver".to_string()),
            ..PageLoadConfig::default()
        };
        let collaborator = WebDriverPageLoad::from_config(Client::new(), &config)
            .unwrap()
            .unwrap();
        assert!(matches!(collaborator.endpoint, DriverEndpoint::Remote(_)));

        let disabled = PageLoadConfig {
            enabled: false,
            ..config
        };
        assert!(WebDriverPageLoad::from_config(Client::new(), &disabled)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_measure_converts_milliseconds_to_microseconds() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/session")
            .with_status(200)
            .with_body(r#"{"value":{"sessionId":"s-1","capabilities":{}}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/session/s-1/url")
            .match_body(mockito::Matcher::PartialJson(
                json!({"url": "http://a.example/"}),
            ))
            .with_status(200)
            .with_body(r#"{"value":null}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/session/s-1/execute/sync")
            .with_status(200)
            .with_body(r#"{"value":1234.5}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/session/s-1")
            .with_status(200)
            .with_body(r#"{"value":null}"#)
            .expect(1)
            .create_async()
            .await;

        let load_us = collaborator(&server)
            .measure("http://a.example/")
            .await
            .unwrap();

        assert_eq!(load_us, 1_234_500);
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_session_is_deleted_when_navigation_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/session")
            .with_status(200)
            .with_body(r#"{"value":{"sessionId":"s-2","capabilities":{}}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/session/s-2/url")
            .with_status(500)
            .with_body(r#"{"value":{"error":"unknown error","message":"net::ERR_NAME_NOT_RESOLVED"}}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/session/s-2")
            .with_status(200)
            .with_body(r#"{"value":null}"#)
            .expect(1)
            .create_async()
            .await;

        let result = collaborator(&server).measure("http://dead.invalid/").await;

        assert!(matches!(result, Err(PageLoadError::Navigation { .. })));
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_timing_is_an_extraction_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/session")
            .with_status(200)
            .with_body(r#"{"value":{"sessionId":"s-3","capabilities":{}}}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/session/s-3/url")
            .with_status(200)
            .with_body(r#"{"value":null}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/session/s-3/execute/sync")
            .with_status(200)
            .with_body(r#"{"value":null}"#)
            .create_async()
            .await;
        server
            .mock("DELETE", "/session/s-3")
            .with_status(200)
            .with_body(r#"{"value":null}"#)
            .create_async()
            .await;

        let result = collaborator(&server).measure("http://a.example/").await;
        assert!(matches!(result, Err(PageLoadError::Extraction(_))));
    }

    #[tokio::test]
    async fn test_session_start_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/session")
            .with_status(500)
            .with_body(r#"{"value":{"error":"session not created","message":"Chrome failed to start"}}"#)
            .create_async()
            .await;

        let result = collaborator(&server).measure("http://a.example/").await;
        assert!(matches!(result, Err(PageLoadError::SessionStart(_))));
    }

    /// Read one request, returning its request line once the body is consumed.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return String::new();
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        head.lines().next().unwrap_or_default().to_string()
    }

    /// Driver that opens session `s-1`, never finishes navigating, and counts deletes.
    async fn stalled_driver(deletes: Arc<AtomicUsize>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                let deletes = deletes.clone();
                tokio::spawn(async move {
                    let request_line = read_request(&mut socket).await;
                    let body = if request_line.starts_with("POST /session HTTP") {
                        r#"{"value":{"sessionId":"s-1","capabilities":{}}}"#
                    } else if request_line.starts_with("POST /session/s-1/url") {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        r#"{"value":null}"#
                    } else {
                        if request_line.starts_with("DELETE /session/s-1") {
                            deletes.fetch_add(1, Ordering::SeqCst);
                        }
                        r#"{"value":null}"#
                    };
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_session_is_deleted_when_deadline_cancels_navigation() {
        let deletes = Arc::new(AtomicUsize::new(0));
        let base_url = stalled_driver(deletes.clone()).await;
        let adapter = PageLoadAdapter::new(Arc::new(
            WebDriverPageLoad::remote(Client::new(), &base_url).unwrap(),
        ))
        .with_timeout(Some(Duration::from_millis(300)));

        let result = adapter.estimate("http://slow.example/").await;
        assert!(!result.is_measured());

        for _ in 0..40 {
            if deletes.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(deletes.load(Ordering::SeqCst), 1);
    }
}
