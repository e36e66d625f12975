//! In-memory transport with canned responses.
//!
//! Responses are queued per method and route. A route is the URL path,
//! optionally followed by `?query`; an exact `path?query` match wins over a
//! bare path. The last queued response of a route is replayed for every
//! further request. Every request is recorded so tests can count dispatches.

use super::{ProgressSender, Transport};
use crate::types::{HttpRequest, RawResponse, TransportError};
use async_trait::async_trait;
use http::Method;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
struct MockEntry {
    response: RawResponse,
    delay: Option<Duration>,
}

/// Transport answering from a table of canned responses.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<MockEntry>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    /// Create a transport without routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method` on `route`.
    pub fn respond(&self, method: Method, route: &str, response: RawResponse) -> &Self {
        self.push(method, route, MockEntry {
            response,
            delay: None,
        })
    }

    /// Queue a response that is only delivered after `delay`.
    pub fn respond_after(
        &self,
        method: Method,
        route: &str,
        response: RawResponse,
        delay: Duration,
    ) -> &Self {
        self.push(method, route, MockEntry {
            response,
            delay: Some(delay),
        })
    }

    fn push(&self, method: Method, route: &str, entry: MockEntry) -> &Self {
        self.routes
            .lock()
            .entry((method, route.to_string()))
            .or_default()
            .push_back(entry);
        self
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of requests received for a URL path.
    pub fn requests_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.path() == path)
            .count()
    }

    fn next_entry(&self, method: &Method, url: &Url) -> Option<MockEntry> {
        let mut routes = self.routes.lock();
        let candidates = match url.query() {
            Some(query) => vec![format!("{}?{}", url.path(), query), url.path().to_string()],
            None => vec![url.path().to_string()],
        };

        for route in candidates {
            if let Some(queue) = routes.get_mut(&(method.clone(), route)) {
                let entry = if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                };
                if entry.is_some() {
                    return entry;
                }
            }
        }
        None
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> RawResponse {
        self.send_with_progress(request, &ProgressSender::disabled())
            .await
    }

    /// Reports the whole request body as sent up front and the whole
    /// response body as received once the delay passed.
    async fn send_with_progress(
        &self,
        request: &HttpRequest,
        progress: &ProgressSender,
    ) -> RawResponse {
        self.requests.lock().push(request.clone());
        if !request.body.is_empty() {
            let sent = request.body.len() as u64;
            progress.upload(sent, Some(sent));
        }

        let Some(entry) = self.next_entry(&request.method, &request.url) else {
            tracing::debug!("no mock route for {} {}", request.method, request.url);
            return RawResponse::empty(404).with_transport_error(TransportError::new(
                404,
                format!("No mock response for {} {}", request.method, request.url.path()),
            ));
        };

        if let Some(delay) = entry.delay {
            tokio::time::sleep(delay).await;
        }
        if !entry.response.body.is_empty() {
            let received = entry.response.body.len() as u64;
            progress.download(received, Some(received));
        }
        entry.response
    }
}
