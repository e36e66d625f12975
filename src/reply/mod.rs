//! Replies: request lifecycle, classification and typed dispatch.
//!
//! # Module Organization
//!
//! ```text
//! reply/
//! ├── state     - Reply, the untyped state machine
//! ├── handlers  - handler signatures, scopes and error policies
//! ├── generic   - GenericReply, VoidReply and PagingReply
//! └── awaitable - result() futures on every reply type
//! ```
//!
//! Replies live on a [`tokio::task::LocalSet`]: responses are processed and
//! handlers run on the task that owns the set, never concurrently.

mod awaitable;
mod generic;
mod handlers;
mod state;

pub use awaitable::AwaitedError;
pub use generic::{GenericReply, PagingReply, VoidReply};
pub use handlers::{
    DataHandler, ErrorHandler, ErrorKind, ErrorPolicy, ExceptionHandler, FailureHandler,
    ProgressHandler, Scope, StatusHandler,
};
pub use state::{Reply, ReplyState};
