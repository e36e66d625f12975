//! reqwest based transport.
//!
//! # Examples
//!
//! ```ignore
//! use rest_client_http::client::ClientConfig;
//! use rest_client_http::transport::{ReqwestTransport, Transport};
//! use rest_client_http::HttpRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = ReqwestTransport::with_config(&ClientConfig::default())?;
//!     let url = url::Url::parse("http://example.com/api/posts")?;
//!     let response = transport.send(&HttpRequest::new(http::Method::GET, url)).await;
//!     println!("Status: {}", response.status);
//!     Ok(())
//! }
//! ```

use super::{ProgressSender, Transport};
use crate::client::ClientConfig;
use crate::error::{RestError, Result};
use crate::types::{HttpRequest, RawResponse, TransportError};
use async_trait::async_trait;
use bytes::BytesMut;
use std::collections::BTreeMap;
use std::time::Duration;

/// Transport backed by a pooled [`reqwest::Client`].
///
/// Responses with a 4xx or 5xx status carry a [`TransportError`] whose code
/// is the status, in addition to the status and body themselves. The reply
/// pipeline reports such responses as failures when the body parses and as
/// network errors when it does not.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    enable_logging: bool,
}

impl ReqwestTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a transport using the timeouts, pool and proxy settings of `config`.
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(config.max_idle_per_host);

        if !config.user_agent.is_empty() {
            builder = builder.user_agent(config.user_agent.clone());
        }

        if !config.proxy_url.is_empty() {
            match reqwest::Proxy::all(&config.proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => tracing::warn!("Ignoring invalid proxy {}: {}", config.proxy_url, e),
            }
        }

        let client = builder.build().map_err(|e| RestError::Http(e.to_string()))?;

        Ok(ReqwestTransport {
            client,
            enable_logging: config.enable_logging,
        })
    }

    /// Wrap an already configured reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        ReqwestTransport {
            client,
            enable_logging: false,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> RawResponse {
        self.send_with_progress(request, &ProgressSender::disabled())
            .await
    }

    /// Upload progress is reported once before sending and once the server
    /// answered; download progress after every body chunk.
    async fn send_with_progress(
        &self,
        request: &HttpRequest,
        progress: &ProgressSender,
    ) -> RawResponse {
        let upload_total = request.body.len() as u64;
        let mut req_builder = self
            .client
            .request(request.method.clone(), request.url.clone());

        for (k, v) in &request.headers {
            req_builder = req_builder.header(k.as_str(), v.as_str());
        }

        if !request.body.is_empty() {
            req_builder = req_builder.body(request.body.clone());
            progress.upload(0, Some(upload_total));
        }

        let mut response = match req_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                if self.enable_logging {
                    tracing::warn!("{} {} failed: {}", request.method, request.url, e);
                }
                return RawResponse::from_transport_error(map_error(&e));
            }
        };

        if upload_total > 0 {
            progress.upload(upload_total, Some(upload_total));
        }

        let status = response.status();

        let mut headers = BTreeMap::new();
        for (k, v) in response.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_string(), val.to_string());
            }
        }

        let mut transport_error = if status.is_client_error() || status.is_server_error() {
            Some(TransportError::new(
                i32::from(status.as_u16()),
                format!("Server replied: {}", status),
            ))
        } else {
            None
        };

        let download_total = response.content_length();
        let mut body = BytesMut::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    body.extend_from_slice(&chunk);
                    progress.download(body.len() as u64, download_total);
                }
                Ok(None) => break,
                Err(e) => {
                    transport_error = Some(map_error(&e));
                    body.clear();
                    break;
                }
            }
        }
        let body = body.freeze();

        if self.enable_logging {
            tracing::debug!(
                "{} {} -> {} ({} bytes)",
                request.method,
                request.url,
                status.as_u16(),
                body.len()
            );
        }

        RawResponse {
            status: status.as_u16(),
            headers,
            body,
            transport_error,
        }
    }
}

fn map_error(e: &reqwest::Error) -> TransportError {
    let code = if e.is_timeout() {
        TransportError::TIMEOUT
    } else if e.is_connect() {
        TransportError::CONNECT
    } else if e.is_redirect() {
        TransportError::REDIRECT
    } else if e.is_body() || e.is_decode() {
        TransportError::BODY
    } else if e.is_request() || e.is_builder() {
        TransportError::REQUEST
    } else {
        TransportError::UNKNOWN
    };
    TransportError::new(code, e.to_string())
}
