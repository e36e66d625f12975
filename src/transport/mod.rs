//! Transport adapters.
//!
//! A transport sends one [`HttpRequest`] and resolves to a [`RawResponse`].
//! Network failures are not returned as `Err`; they travel inside the
//! response as [`RawResponse::transport_error`] so that the reply state
//! machine can classify them together with the status and body.
//!
//! # Module Organization
//!
//! ```text
//! transport/
//! ├── fetch    - ReqwestTransport, the production adapter
//! ├── mock     - MockTransport, canned responses for tests
//! └── progress - upload and download progress reports
//! ```
//!
//! # Implementing a Transport
//!
//! ```
//! use async_trait::async_trait;
//! use rest_client_http::transport::Transport;
//! use rest_client_http::{HttpRequest, RawResponse};
//!
//! struct Teapot;
//!
//! #[async_trait]
//! impl Transport for Teapot {
//!     async fn send(&self, _request: &HttpRequest) -> RawResponse {
//!         RawResponse::json(418, r#"{"message": "short and stout"}"#)
//!     }
//! }
//! ```

mod fetch;
pub mod mock;
mod progress;

pub use fetch::ReqwestTransport;
pub use mock::MockTransport;
pub use progress::{Progress, ProgressSender};

use crate::types::{HttpRequest, RawResponse};
use async_trait::async_trait;

/// Sends requests and reports what came back.
///
/// Implementations must be shareable across threads so that a client in
/// threaded mode can run sends on the runtime's worker pool.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send the request and wait for the complete response.
    ///
    /// Dropping the returned future cancels the request.
    async fn send(&self, request: &HttpRequest) -> RawResponse;

    /// Like [`Transport::send`], reporting transfer progress to `progress`.
    ///
    /// Replies always call this one. The default reports nothing.
    async fn send_with_progress(
        &self,
        request: &HttpRequest,
        _progress: &ProgressSender,
    ) -> RawResponse {
        self.send(request).await
    }
}
