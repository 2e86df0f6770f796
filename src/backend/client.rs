//! # BackendClient: JSON over HTTP bound to one base address and context.
//!
//! Every request carries the [`CallContext`] headers. JSON requests are bounded by
//! [`Config::request_timeout`]. The task stream body is long-lived and unbounded,
//! but opening it (TCP connect plus response headers) is bounded by
//! [`Config::connect_timeout`].
//!
//! ## Error mapping
//! ```text
//! network failure / non-2xx ─► CallError::Transport
//! reqwest timeout            ─► CallError::Timeout
//! body not valid JSON / T    ─► CallError::Decode
//! ```

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time;

use crate::config::Config;
use crate::context::CallContext;
use crate::error::{CallError, StreamError};

const EVENT_STREAM: &str = "text/event-stream";

/// HTTP client for the copilot backend.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: Client,
    base: Url,
    ctx: CallContext,
    request_timeout: Duration,
    connect_timeout: Duration,
}

impl BackendClient {
    /// Creates a client for `base` (e.g. `https://api.example.com/v1`).
    ///
    /// Fails with [`StreamError::InvalidUrl`] when `base` is not an absolute http(s) URL.
    pub fn new(base: &str, ctx: CallContext, cfg: &Config) -> Result<Self, StreamError> {
        let trimmed = base.trim().trim_end_matches('/');
        let base = Url::parse(trimmed).map_err(|e| StreamError::InvalidUrl {
            url: base.to_string(),
            error: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(StreamError::InvalidUrl {
                url: trimmed.to_string(),
                error: format!("unsupported scheme {:?}", base.scheme()),
            });
        }

        let http = Client::builder()
            .default_headers(ctx.headers())
            .connect_timeout(cfg.connect_timeout)
            .build()
            .map_err(|e| StreamError::Connect {
                error: e.to_string(),
            })?;

        Ok(Self {
            http,
            base,
            ctx,
            request_timeout: cfg.request_timeout,
            connect_timeout: cfg.connect_timeout,
        })
    }

    /// Base address without trailing slash.
    pub fn base(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    pub fn context(&self) -> &CallContext {
        &self.ctx
    }

    /// Absolute URL for `path` relative to the base address.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base(), path.trim_start_matches('/'))
    }

    /// `GET {base}/{path}` decoded as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CallError> {
        let req = self.http.get(self.url(path));
        self.send_json(req).await
    }

    /// `POST {base}/{path}` with a JSON body, decoded as `T`.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, CallError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.http.post(self.url(path)).json(body);
        self.send_json(req).await
    }

    /// Audit detail of a terminal task: `GET {base}/tasks/{id}/audit`.
    ///
    /// Read-only; never touches a registry.
    pub async fn task_audit(&self, id: &str) -> Result<Value, CallError> {
        self.get_json(&format!("tasks/{id}/audit")).await
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, CallError> {
        let resp = req.timeout(self.request_timeout).send().await?;
        let resp = check_status(resp).map_err(|status| {
            CallError::transport(format!("backend answered {status}"))
        })?;
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Opens `GET {base}/tasks/stream` with `Accept: text/event-stream`.
    ///
    /// Only the wait for response headers is bounded; the body stays open.
    pub(crate) async fn open_task_stream(&self) -> Result<Response, StreamError> {
        let send = self
            .http
            .get(self.url("tasks/stream"))
            .header(ACCEPT, HeaderValue::from_static(EVENT_STREAM))
            .send();
        let resp = match time::timeout(self.connect_timeout, send).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                return Err(StreamError::Connect {
                    error: e.to_string(),
                });
            }
            Err(_) => {
                return Err(StreamError::Timeout {
                    timeout: self.connect_timeout,
                });
            }
        };
        check_status(resp).map_err(|status| StreamError::Status { status })
    }
}

fn check_status(resp: Response) -> Result<Response, u16> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ActorRole;

    fn ctx() -> CallContext {
        CallContext::new("acme", ActorRole::Agent, false).unwrap()
    }

    #[test]
    fn urls_are_joined_without_double_slashes() {
        let client = BackendClient::new("http://localhost:8080/api/", ctx(), &Config::default()).unwrap();
        assert_eq!(client.base(), "http://localhost:8080/api");
        assert_eq!(client.url("/tasks/stream"), "http://localhost:8080/api/tasks/stream");
        assert_eq!(client.url("tasks/t1/audit"), "http://localhost:8080/api/tasks/t1/audit");
    }

    #[test]
    fn rejects_relative_and_non_http_bases() {
        let err = BackendClient::new("/api", ctx(), &Config::default()).unwrap_err();
        assert_eq!(err.as_label(), "stream_invalid_url");

        let err = BackendClient::new("ftp://files.example.com", ctx(), &Config::default()).unwrap_err();
        assert!(matches!(err, StreamError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        // port 9 (discard) is not expected to accept HTTP
        let client = BackendClient::new("http://127.0.0.1:9", ctx(), &Config::default()).unwrap();
        let err = client.get_json::<Value>("deals").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
