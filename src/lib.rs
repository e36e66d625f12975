#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! ## Overview
//!
//! A request goes through four stages:
//!
//! 1. **Build** - [`RequestBuilder`] composes base URL, API version, path,
//!    query, headers and body
//! 2. **Send** - a [`Transport`](transport::Transport) delivers it; reqwest
//!    by default, optionally on the runtime's worker pool
//! 3. **Classify** - the [`Reply`] parses the body (JSON or CBOR) and fires
//!    exactly one of `succeeded`, `failed` or `error`
//! 4. **Decode** - [`GenericReply`], [`VoidReply`] and [`PagingReply`] turn
//!    the structured value into your serde types
//!
//! Handlers may call `retry()` or `retry_after(delay)` to send the same
//! request again. Paged collections are walked with
//! [`PagingReply::iterate`], which requests following pages on demand.
//!
//! ## Runtime
//!
//! Replies deliver their callbacks on a [`tokio::task::LocalSet`]:
//!
//! ```ignore
//! let local = tokio::task::LocalSet::new();
//! local.run_until(async {
//!     let client = RestClient::new(ClientConfig::new("https://api.example.com"))?;
//!     let (status, data) = client.builder().add_path("status").send().result().await?;
//!     Ok::<_, anyhow::Error>(())
//! }).await?;
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - structured values and wire types
//! - **[error]** - error types and result handling
//! - **[protocol]** - media types, header parsing and body codecs
//! - **[serializer]** - conversion between serde types and structured values
//! - **[transport]** - the transport seam, progress reports and the reqwest adapter
//! - **[reply]** - reply state machine and typed replies
//! - **[paging]** - paged collections and cross-page iteration
//! - **[client]** - client, request builder, API classes, registry and summary extensions

pub mod client;
pub mod error;
pub mod paging;
pub mod protocol;
pub mod reply;
pub mod serializer;
pub mod transport;
pub mod types;

pub use client::{ClientConfig, RequestBuilder, RestClass, RestClient};
pub use error::{DeserializationError, RestError, Result};
pub use paging::{PageInfo, Paging, PagingFactory, StandardPagingFactory};
pub use reply::{
    AwaitedError, ErrorKind, ErrorPolicy, GenericReply, PagingReply, Reply, ReplyState, Scope,
    VoidReply,
};
pub use serializer::Serializer;
pub use types::{Data, DataMode, HttpRequest, RawResponse, TransportError};

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;
