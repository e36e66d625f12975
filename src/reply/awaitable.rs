//! `async` access to reply outcomes.
//!
//! Every reply type has a `result()` method that registers handlers right
//! away and returns a future resolving with the first outcome. Handlers added
//! before or after still run; a retry requested by one of them does not
//! change the value the future already resolved with.
//!
//! ```ignore
//! let post: Post = client
//!     .builder()
//!     .add_path("posts/1")
//!     .send_generic::<Post, ApiError>()
//!     .result()
//!     .await
//!     .map(|(_, post)| post)?;
//! ```

use super::generic::{GenericReply, PagingReply, VoidReply};
use super::handlers::ErrorKind;
use super::state::Reply;
use crate::paging::Paging;
use crate::types::Data;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use thiserror::Error;
use tokio::sync::oneshot;

/// Why an awaited reply did not succeed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AwaitedError<E> {
    /// The server answered with a status of 300 or above.
    #[error("request failed with status {code}")]
    Failure {
        /// HTTP status.
        code: u16,
        /// Decoded error body.
        error: E,
    },
    /// A network, parse or deserialization error.
    #[error("{kind} {code}: {message}")]
    Error {
        /// Description of the problem.
        message: String,
        /// Transport, parser or HTTP code; 0 for deserialization errors.
        code: i32,
        /// Kind of problem.
        kind: ErrorKind,
    },
    /// The reply was destroyed before any outcome.
    #[error("reply destroyed before completion")]
    Dropped,
}

impl<E> AwaitedError<E> {
    /// The [`ErrorKind`] callbacks would have reported.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AwaitedError::Failure { .. } => Some(ErrorKind::Failure),
            AwaitedError::Error { kind, .. } => Some(*kind),
            AwaitedError::Dropped => None,
        }
    }
}

type Outcome<D, E> = Result<(u16, D), AwaitedError<E>>;

/// One-shot slot shared by the handlers of one `result()` call.
struct Completion<T>(Rc<RefCell<Option<oneshot::Sender<T>>>>);

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> Completion<T> {
    fn channel() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Self(Rc::new(RefCell::new(Some(tx)))), rx)
    }

    fn complete(&self, value: T) {
        if let Some(tx) = self.0.borrow_mut().take() {
            let _ = tx.send(value);
        }
    }
}

async fn resolve<D, E>(rx: oneshot::Receiver<Outcome<D, E>>) -> Outcome<D, E> {
    rx.await.unwrap_or(Err(AwaitedError::Dropped))
}

fn error_outcome<D, E>(message: &str, code: i32, kind: ErrorKind) -> Outcome<D, E> {
    Err(AwaitedError::Error {
        message: message.to_string(),
        code,
        kind,
    })
}

impl Reply {
    /// Resolve with the status and body of the first outcome.
    ///
    /// Failures carry the raw error body.
    pub fn result(&self) -> impl Future<Output = Outcome<Data, Data>> + 'static {
        let (completion, rx) = Completion::channel();
        let (succeeded, failed, error) = (completion.clone(), completion.clone(), completion);
        self.on_succeeded(move |status, data| succeeded.complete(Ok((status, data.clone()))))
            .on_failed(move |code, data| {
                failed.complete(Err(AwaitedError::Failure {
                    code,
                    error: data.clone(),
                }))
            })
            .on_error(move |message, code, kind| error.complete(error_outcome(message, code, kind)));
        resolve(rx)
    }
}

impl<D, E> GenericReply<D, E>
where
    D: DeserializeOwned + Default + 'static,
    E: DeserializeOwned + Default + 'static,
{
    /// Resolve with the decoded body of the first outcome.
    ///
    /// A body that cannot be decoded resolves with
    /// [`ErrorKind::Deserialization`]; an exception handler registered earlier
    /// still sees the error first.
    pub fn result(&self) -> impl Future<Output = Outcome<D, E>> + 'static {
        let (completion, rx) = Completion::channel();
        let (succeeded, failed, error, exception) = (
            completion.clone(),
            completion.clone(),
            completion.clone(),
            completion,
        );
        self.chain_serialize_exception(move |err| {
            exception.complete(error_outcome(err.message(), 0, ErrorKind::Deserialization))
        })
        .on_succeeded(move |status, value| succeeded.complete(Ok((status, value))))
        .on_failed(move |code, value| failed.complete(Err(AwaitedError::Failure { code, error: value })))
        .on_error(move |message, code, kind| error.complete(error_outcome(message, code, kind)));
        resolve(rx)
    }
}

impl<E> VoidReply<E>
where
    E: DeserializeOwned + Default + 'static,
{
    /// Resolve with the status of the first outcome.
    pub fn result(&self) -> impl Future<Output = Result<u16, AwaitedError<E>>> + 'static {
        let (completion, rx) = Completion::channel();
        let (succeeded, failed, error, exception) = (
            completion.clone(),
            completion.clone(),
            completion.clone(),
            completion,
        );
        self.chain_serialize_exception(move |err| {
            exception.complete(error_outcome(err.message(), 0, ErrorKind::Deserialization))
        })
        .on_succeeded(move |status| succeeded.complete(Ok((status, ()))))
        .on_failed(move |code, value| failed.complete(Err(AwaitedError::Failure { code, error: value })))
        .on_error(move |message, code, kind| error.complete(error_outcome(message, code, kind)));
        async move { resolve(rx).await.map(|(status, ())| status) }
    }
}

impl<T, E> PagingReply<T, E>
where
    T: DeserializeOwned + 'static,
    E: DeserializeOwned + Default + 'static,
{
    /// Resolve with the first page, or the first problem.
    pub fn result(&self) -> impl Future<Output = Outcome<Paging<T>, E>> + 'static {
        let (completion, rx) = Completion::channel();
        let (succeeded, failed, error, exception) = (
            completion.clone(),
            completion.clone(),
            completion.clone(),
            completion,
        );
        self.chain_serialize_exception(move |err| {
            exception.complete(error_outcome(err.message(), 0, ErrorKind::Deserialization))
        })
        .on_succeeded(move |status, paging| succeeded.complete(Ok((status, paging))))
        .on_failed(move |code, value| failed.complete(Err(AwaitedError::Failure { code, error: value })))
        .on_error(move |message, code, kind| error.complete(error_outcome(message, code, kind)));
        resolve(rx)
    }
}
