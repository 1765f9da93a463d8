use reqwest::{Client, Method, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::client::error::{ClientError, ClientResult};
use crate::config::EngineConfig;

/// Sub-paths almost certainly shouldn't start with leading slashes, since
/// that makes the request relative to the server root. These are the only
/// root-relative paths the engine protocol actually needs.
const SAFE_ABSOLUTE_PATHS: [&str; 4] = ["/_bulk", "/_status", "/_aliases", "/_search/scroll"];

/// Severity used when the engine answers 5xx. Some server errors are
/// expected, such as a shard running out of results mid-scroll, and should
/// not page anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorLevel {
    Error,
    Warn,
}

/// Thin JSON-over-HTTP transport to the search engine
#[derive(Clone)]
pub struct EngineClient {
    http: Client,
    base_url: Url,
    timeout_secs: u64,
    server_error_level: ServerErrorLevel,
}

impl EngineClient {
    /// Create a client with the interactive timeouts
    pub fn new(config: &EngineConfig) -> ClientResult<Self> {
        Self::with_timeout(config, config.timeout())
    }

    /// Create a client with the administrative timeout, for index
    /// creation and deletion
    pub fn admin(config: &EngineConfig) -> ClientResult<Self> {
        Self::with_timeout(config, config.admin_timeout())
    }

    fn with_timeout(config: &EngineConfig, timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ClientError::Connection(format!("failed to build HTTP client: {}", e)))?;

        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::Url(format!("{}: {}", config.base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http,
            base_url,
            timeout_secs: timeout.as_secs(),
            server_error_level: ServerErrorLevel::Error,
        })
    }

    /// A copy of this client that records 5xx responses at warn level
    pub fn quiet_server_errors(&self) -> Self {
        let mut copy = self.clone();
        copy.server_error_level = ServerErrorLevel::Warn;
        copy
    }

    pub async fn get_json(&self, sub_path: &str) -> ClientResult<Value> {
        self.send(Method::GET, sub_path, None).await
    }

    /// GET with a JSON payload; the engine accepts bodies on searches
    pub async fn get_with_body(&self, sub_path: &str, body: &Value) -> ClientResult<Value> {
        self.send(Method::GET, sub_path, Some(RequestBody::Json(body)))
            .await
    }

    pub async fn post_json(&self, sub_path: &str, body: &Value) -> ClientResult<Value> {
        self.send(Method::POST, sub_path, Some(RequestBody::Json(body)))
            .await
    }

    /// POST with no payload (refresh, close and friends)
    pub async fn post_empty(&self, sub_path: &str) -> ClientResult<Value> {
        self.send(Method::POST, sub_path, None).await
    }

    /// POST a newline-delimited payload (bulk and msearch wire format)
    pub async fn post_ndjson(&self, sub_path: &str, payload: String) -> ClientResult<Value> {
        self.send(Method::POST, sub_path, Some(RequestBody::Ndjson(payload)))
            .await
    }

    pub async fn put_json(&self, sub_path: &str, body: &Value) -> ClientResult<Value> {
        self.send(Method::PUT, sub_path, Some(RequestBody::Json(body)))
            .await
    }

    pub async fn delete(&self, sub_path: &str) -> ClientResult<Value> {
        self.send(Method::DELETE, sub_path, None).await
    }

    /// HEAD request mapped to its response status. Used for existence
    /// probes, where 404 is an answer rather than an error.
    pub async fn head(&self, sub_path: &str) -> ClientResult<u16> {
        let url = self.url_for(sub_path)?;
        debug!(url = %url, "sending engine head request");
        let response = self
            .http
            .head(url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        Ok(response.status().as_u16())
    }

    fn map_send_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout(format!(
                "no response within {} seconds: {}",
                self.timeout_secs, e
            ))
        } else if e.is_connect() {
            ClientError::Connection(format!("failed to connect to engine: {}", e))
        } else {
            ClientError::Connection(format!("engine request failed: {}", e))
        }
    }

    async fn send(
        &self,
        method: Method,
        sub_path: &str,
        body: Option<RequestBody<'_>>,
    ) -> ClientResult<Value> {
        let url = self.url_for(sub_path)?;
        debug!(method = %method, url = %url, "sending engine request");

        let mut request = self.http.request(method, url);
        request = match body {
            Some(RequestBody::Json(json)) => request.json(json),
            Some(RequestBody::Ndjson(text)) => request
                .header("Content-Type", "application/x-ndjson")
                .body(text),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout(format!(
                    "no response within {} seconds: {}",
                    self.timeout_secs, e
                ))
            } else if e.is_connect() {
                ClientError::Connection(format!("failed to connect to engine: {}", e))
            } else {
                ClientError::Connection(format!("engine request failed: {}", e))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Connection(format!("failed to read response body: {}", e)))?;

        if status.is_client_error() {
            return Err(ClientError::Request {
                status: status.as_u16(),
                body: text,
            });
        }
        if status.is_server_error() {
            match self.server_error_level {
                ServerErrorLevel::Error => {
                    error!(status = status.as_u16(), body = %text, "engine server error")
                }
                ServerErrorLevel::Warn => {
                    warn!(status = status.as_u16(), body = %text, "engine server error")
                }
            }
            return Err(ClientError::Server {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn url_for(&self, sub_path: &str) -> ClientResult<Url> {
        if sub_path.starts_with('/') {
            let path_without_query = sub_path.split('?').next().unwrap_or(sub_path);
            if !SAFE_ABSOLUTE_PATHS.contains(&path_without_query) {
                error!(sub_path = sub_path, "request sub-path has a leading slash");
                return Err(ClientError::ForbiddenPath(sub_path.to_string()));
            }
        }

        self.base_url
            .join(sub_path)
            .map_err(|e| ClientError::Url(format!("{}: {}", sub_path, e)))
    }
}

enum RequestBody<'a> {
    Json(&'a Value),
    Ndjson(String),
}
