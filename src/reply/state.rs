//! The untyped reply and its lifecycle.
//!
//! # Lifecycle
//!
//! 1. **Pending**: the request was handed to the transport
//! 2. **Succeeded / Failed / NetworkError / ParseError**: the response was
//!    classified and exactly one outcome event fired
//! 3. **Pending** again if a handler called [`Reply::retry`] or
//!    [`Reply::retry_after`], otherwise **Completed**
//! 4. With auto-delete enabled a completed reply is destroyed: its handlers
//!    are released and `destroyed` listeners run
//!
//! # Classification
//!
//! | Parse error | Status | Transport error | Outcome |
//! |-------------|--------|-----------------|---------|
//! | no | ≥ 300 | any | `failed` |
//! | any | any | yes | `error(Network)` |
//! | yes | any | no | `error(Parse)` |
//! | no | < 300 | no | `succeeded` |

use super::handlers::{
    live, DataHandler, ErrorHandler, ErrorKind, ProgressHandler, Scope, Slot, StatusHandler,
};
use crate::protocol::{decode_body, ParseFailure};
use crate::transport::{Progress, ProgressSender, Transport};
use crate::types::{Data, HttpRequest, RawResponse, TransportError};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Position of a reply in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    /// Waiting for the transport
    Pending,
    /// `succeeded` fired for the current attempt
    Succeeded,
    /// `failed` fired for the current attempt
    Failed,
    /// `error` fired with [`ErrorKind::Network`]
    NetworkError,
    /// `error` fired with [`ErrorKind::Parse`]
    ParseError,
    /// Finished without a pending retry
    Completed,
}

/// Classified result of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Succeeded { status: u16, data: Data },
    Failed { status: u16, data: Data },
    Error { message: String, code: i32, kind: ErrorKind },
}

/// Pick the single outcome of an attempt.
pub(crate) fn classify(
    status: u16,
    data: Data,
    transport_error: Option<TransportError>,
    parse_error: Option<ParseFailure>,
) -> Outcome {
    match (parse_error, transport_error) {
        (None, _) if status >= 300 => Outcome::Failed { status, data },
        (_, Some(err)) => Outcome::Error {
            message: err.message,
            code: err.code,
            kind: ErrorKind::Network,
        },
        (Some(err), None) => Outcome::Error {
            message: err.message,
            code: err.code,
            kind: ErrorKind::Parse,
        },
        (None, None) => Outcome::Succeeded { status, data },
    }
}

#[derive(Default)]
struct Handlers {
    succeeded: Vec<Slot<DataHandler>>,
    failed: Vec<Slot<DataHandler>>,
    completed: Vec<Slot<StatusHandler>>,
    error: Vec<Slot<ErrorHandler>>,
    download_progress: Vec<Slot<ProgressHandler>>,
    upload_progress: Vec<Slot<ProgressHandler>>,
    destroyed: Vec<Rc<dyn Fn()>>,
}

struct ReplyInner {
    transport: Arc<dyn Transport>,
    threaded: bool,
    request: HttpRequest,
    state: Cell<ReplyState>,
    auto_delete: Cell<bool>,
    allow_empty_replies: Cell<bool>,
    retry_delay: Cell<Option<Duration>>,
    attempts: Cell<u32>,
    destroyed: Cell<bool>,
    abort_signal: RefCell<Rc<Notify>>,
    handlers: RefCell<Handlers>,
}

/// One request and its response handling.
///
/// A reply is dispatched as soon as it is created. Handlers registered right
/// after creation are always in place before the response is processed,
/// because processing runs as a task on the current [`tokio::task::LocalSet`].
/// Creating a reply outside a `LocalSet` panics.
///
/// Clones share the same reply; a retry keeps the identity.
///
/// # Examples
///
/// ```ignore
/// let reply = client.builder().add_path("posts").send();
/// reply
///     .on_succeeded(|status, data| println!("{}: {:?}", status, data))
///     .on_all_errors(|message, code, kind| eprintln!("{} {}: {}", kind, code, message));
/// ```
#[derive(Clone)]
pub struct Reply {
    inner: Rc<ReplyInner>,
}

impl Reply {
    /// Dispatch `request` through `transport`.
    ///
    /// With `threaded` set the send runs on the runtime's worker pool; parsing
    /// and handlers still run on the calling `LocalSet`.
    pub fn dispatch(transport: Arc<dyn Transport>, request: HttpRequest, threaded: bool) -> Self {
        let inner = Rc::new(ReplyInner {
            transport,
            threaded,
            request,
            state: Cell::new(ReplyState::Pending),
            auto_delete: Cell::new(true),
            allow_empty_replies: Cell::new(false),
            retry_delay: Cell::new(None),
            attempts: Cell::new(0),
            destroyed: Cell::new(false),
            abort_signal: RefCell::new(Rc::new(Notify::new())),
            handlers: RefCell::new(Handlers::default()),
        });
        inner.start_attempt();
        Reply { inner }
    }

    // ========== Handler Registration ==========

    fn register(&self, add: impl FnOnce(&mut Handlers)) -> &Self {
        if self.inner.destroyed.get() {
            tracing::warn!(
                "Ignoring handler registered on destroyed reply for {}",
                self.inner.request.url
            );
        } else {
            add(&mut self.inner.handlers.borrow_mut());
        }
        self
    }

    /// Called with the status and parsed body when the request succeeded.
    pub fn on_succeeded(&self, handler: impl Fn(u16, &Data) + 'static) -> &Self {
        let handler: Rc<DataHandler> = Rc::new(handler);
        self.register(|h| h.succeeded.push(Slot::new(handler, None)))
    }

    /// [`Reply::on_succeeded`], skipped once `scope` is dropped.
    pub fn on_succeeded_scoped(
        &self,
        scope: &Scope,
        handler: impl Fn(u16, &Data) + 'static,
    ) -> &Self {
        let handler: Rc<DataHandler> = Rc::new(handler);
        self.register(|h| h.succeeded.push(Slot::new(handler, Some(scope))))
    }

    /// Called with the status and parsed body when the server answered with 300 or above.
    pub fn on_failed(&self, handler: impl Fn(u16, &Data) + 'static) -> &Self {
        let handler: Rc<DataHandler> = Rc::new(handler);
        self.register(|h| h.failed.push(Slot::new(handler, None)))
    }

    /// [`Reply::on_failed`], skipped once `scope` is dropped.
    pub fn on_failed_scoped(&self, scope: &Scope, handler: impl Fn(u16, &Data) + 'static) -> &Self {
        let handler: Rc<DataHandler> = Rc::new(handler);
        self.register(|h| h.failed.push(Slot::new(handler, Some(scope))))
    }

    /// Called after `succeeded` or `failed` handlers with the status.
    pub fn on_completed(&self, handler: impl Fn(u16) + 'static) -> &Self {
        let handler: Rc<StatusHandler> = Rc::new(handler);
        self.register(|h| h.completed.push(Slot::new(handler, None)))
    }

    /// [`Reply::on_completed`], skipped once `scope` is dropped.
    pub fn on_completed_scoped(&self, scope: &Scope, handler: impl Fn(u16) + 'static) -> &Self {
        let handler: Rc<StatusHandler> = Rc::new(handler);
        self.register(|h| h.completed.push(Slot::new(handler, Some(scope))))
    }

    /// Called with message, code and kind on network and parse errors.
    pub fn on_error(&self, handler: impl Fn(&str, i32, ErrorKind) + 'static) -> &Self {
        let handler: Rc<ErrorHandler> = Rc::new(handler);
        self.register(|h| h.error.push(Slot::new(handler, None)))
    }

    /// [`Reply::on_error`], skipped once `scope` is dropped.
    pub fn on_error_scoped(
        &self,
        scope: &Scope,
        handler: impl Fn(&str, i32, ErrorKind) + 'static,
    ) -> &Self {
        let handler: Rc<ErrorHandler> = Rc::new(handler);
        self.register(|h| h.error.push(Slot::new(handler, Some(scope))))
    }

    /// Route failures and errors into one handler; failures carry an empty message.
    pub fn on_all_errors(&self, handler: impl Fn(&str, i32, ErrorKind) + 'static) -> &Self {
        self.on_all_errors_with(handler, |_, _| String::new())
    }

    /// Route failures and errors into one handler, describing failures with
    /// `failure_transformer(data, status)`.
    pub fn on_all_errors_with(
        &self,
        handler: impl Fn(&str, i32, ErrorKind) + 'static,
        failure_transformer: impl Fn(&Data, u16) -> String + 'static,
    ) -> &Self {
        let handler: Rc<ErrorHandler> = Rc::new(handler);
        let on_failure = Rc::clone(&handler);
        self.on_failed(move |status, data| {
            on_failure(
                &failure_transformer(data, status),
                i32::from(status),
                ErrorKind::Failure,
            )
        });
        self.on_error(move |message, code, kind| handler(message, code, kind))
    }

    /// Called while the response body arrives with the bytes received so far
    /// and the announced length.
    pub fn on_download_progress(&self, handler: impl Fn(u64, Option<u64>) + 'static) -> &Self {
        let handler: Rc<ProgressHandler> = Rc::new(handler);
        self.register(|h| h.download_progress.push(Slot::new(handler, None)))
    }

    /// Called while the request body is sent with the bytes sent so far and
    /// the body size.
    pub fn on_upload_progress(&self, handler: impl Fn(u64, Option<u64>) + 'static) -> &Self {
        let handler: Rc<ProgressHandler> = Rc::new(handler);
        self.register(|h| h.upload_progress.push(Slot::new(handler, None)))
    }

    /// Called once when the reply is destroyed.
    pub fn on_destroyed(&self, listener: impl Fn() + 'static) -> &Self {
        let listener: Rc<dyn Fn()> = Rc::new(listener);
        self.register(|h| h.destroyed.push(listener))
    }

    // ========== Control ==========

    /// Cancel the in-flight request.
    ///
    /// The attempt finishes with a network error carrying
    /// [`TransportError::CANCELED`]. Does nothing unless a send is pending.
    pub fn abort(&self) {
        if self.inner.state.get() == ReplyState::Pending {
            self.inner.abort_signal.borrow().notify_one();
        }
    }

    /// Send the same request again once the current outcome handlers return.
    ///
    /// Only has an effect when called from an outcome handler.
    pub fn retry(&self) {
        self.inner.retry_delay.set(Some(Duration::ZERO));
    }

    /// Like [`Reply::retry`], sending again after `delay`.
    pub fn retry_after(&self, delay: Duration) {
        self.inner.retry_delay.set(Some(delay));
    }

    /// Whether the reply destroys itself after completing. Defaults to true.
    pub fn auto_delete(&self) -> bool {
        self.inner.auto_delete.get()
    }

    /// Enable or disable destruction after completion.
    pub fn set_auto_delete(&self, enabled: bool) -> &Self {
        self.inner.auto_delete.set(enabled);
        self
    }

    /// Keep the reply and its handlers after completion.
    pub fn disable_auto_delete(&self) -> &Self {
        self.set_auto_delete(false)
    }

    /// Whether an empty body counts as success without data.
    pub fn allow_empty_replies(&self) -> bool {
        self.inner.allow_empty_replies.get()
    }

    /// Treat empty bodies as success without data instead of a parse error.
    pub fn set_allow_empty_replies(&self, allow: bool) -> &Self {
        self.inner.allow_empty_replies.set(allow);
        self
    }

    /// Destroy the reply now, releasing all handlers.
    pub fn dispose(&self) {
        self.inner.destroy();
    }

    // ========== Inspection ==========

    /// Current lifecycle state.
    pub fn state(&self) -> ReplyState {
        self.inner.state.get()
    }

    /// Number of attempts dispatched so far.
    pub fn attempts(&self) -> u32 {
        self.inner.attempts.get()
    }

    /// Whether the reply was destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// The request this reply sends.
    pub fn request(&self) -> &HttpRequest {
        &self.inner.request
    }

    /// Whether both values refer to the same reply.
    pub fn ptr_eq(&self, other: &Reply) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("method", &self.inner.request.method)
            .field("url", &self.inner.request.url.as_str())
            .field("state", &self.inner.state.get())
            .field("attempts", &self.inner.attempts.get())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}

/// Aborts a task spawned on the worker pool when the send is dropped.
struct AbortOnDrop(JoinHandle<RawResponse>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl ReplyInner {
    fn start_attempt(self: &Rc<Self>) {
        let signal = Rc::new(Notify::new());
        *self.abort_signal.borrow_mut() = Rc::clone(&signal);
        self.state.set(ReplyState::Pending);
        self.attempts.set(self.attempts.get() + 1);

        tracing::debug!(
            "Dispatching {} {} (attempt {})",
            self.request.method,
            self.request.url,
            self.attempts.get()
        );

        let inner = Rc::clone(self);
        tokio::task::spawn_local(async move {
            let (progress, mut reports) = ProgressSender::channel();
            let response = {
                let send = inner.send_request(progress);
                tokio::pin!(send);
                loop {
                    tokio::select! {
                        response = &mut send => break response,
                        Some(report) = reports.recv() => inner.emit_progress(report),
                        _ = signal.notified() => {
                            tracing::debug!("Aborted {} {}", inner.request.method, inner.request.url);
                            break RawResponse::canceled();
                        }
                    }
                }
            };
            while let Ok(report) = reports.try_recv() {
                inner.emit_progress(report);
            }
            inner.finish(response);
        });
    }

    async fn send_request(&self, progress: ProgressSender) -> RawResponse {
        if !self.threaded {
            return self
                .transport
                .send_with_progress(&self.request, &progress)
                .await;
        }

        let transport = Arc::clone(&self.transport);
        let request = self.request.clone();
        let mut task = AbortOnDrop(tokio::spawn(async move {
            transport.send_with_progress(&request, &progress).await
        }));
        match (&mut task.0).await {
            Ok(response) => response,
            Err(e) => RawResponse::from_transport_error(TransportError::new(
                TransportError::UNKNOWN,
                e.to_string(),
            )),
        }
    }

    fn parse(&self, response: &RawResponse) -> (Data, Option<ParseFailure>) {
        let status = response.status;
        let no_content = status == http::StatusCode::NO_CONTENT.as_u16();
        if response.body.is_empty()
            && (no_content || status >= 300 || self.allow_empty_replies.get())
        {
            return (Data::Empty, None);
        }

        match decode_body(response.content_type(), &response.body) {
            Ok(data) => (data, None),
            Err(err) => (Data::Empty, Some(err)),
        }
    }

    fn finish(self: &Rc<Self>, response: RawResponse) {
        self.retry_delay.set(None);

        let (data, parse_error) = self.parse(&response);
        let outcome = classify(response.status, data, response.transport_error, parse_error);

        match outcome {
            Outcome::Succeeded { status, data } => {
                self.state.set(ReplyState::Succeeded);
                self.emit_succeeded(status, &data);
                self.emit_completed(status);
            }
            Outcome::Failed { status, data } => {
                self.state.set(ReplyState::Failed);
                self.emit_failed(status, &data);
                self.emit_completed(status);
            }
            Outcome::Error {
                message,
                code,
                kind,
            } => {
                self.state.set(if kind == ErrorKind::Network {
                    ReplyState::NetworkError
                } else {
                    ReplyState::ParseError
                });
                self.emit_error(&message, code, kind);
            }
        }

        if self.destroyed.get() {
            return;
        }

        match self.retry_delay.take() {
            Some(delay) if delay.is_zero() => {
                tracing::debug!("Retrying {} {}", self.request.method, self.request.url);
                self.start_attempt();
            }
            Some(delay) => {
                tracing::debug!(
                    "Retrying {} {} in {:?}",
                    self.request.method,
                    self.request.url,
                    delay
                );
                self.state.set(ReplyState::Pending);
                let signal = Rc::new(Notify::new());
                *self.abort_signal.borrow_mut() = Rc::clone(&signal);
                let inner = Rc::clone(self);
                tokio::task::spawn_local(async move {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {
                            if !inner.destroyed.get() {
                                inner.start_attempt();
                            }
                        }
                        _ = signal.notified() => {
                            tracing::debug!(
                                "Aborted delayed retry of {} {}",
                                inner.request.method,
                                inner.request.url
                            );
                            if !inner.destroyed.get() {
                                inner.finish(RawResponse::canceled());
                            }
                        }
                    }
                });
            }
            None => {
                self.state.set(ReplyState::Completed);
                if self.auto_delete.get() {
                    self.destroy();
                }
            }
        }
    }

    fn emit_progress(&self, report: Progress) {
        let handlers = self.handlers.borrow();
        let (slots, transferred, total) = match report {
            Progress::Download { received, total } => (&handlers.download_progress, received, total),
            Progress::Upload { sent, total } => (&handlers.upload_progress, sent, total),
        };
        let slots = live(slots);
        drop(handlers);
        for handler in slots {
            handler(transferred, total);
        }
    }

    fn emit_succeeded(&self, status: u16, data: &Data) {
        let handlers = live(&self.handlers.borrow().succeeded);
        for handler in handlers {
            handler(status, data);
        }
    }

    fn emit_failed(&self, status: u16, data: &Data) {
        let handlers = live(&self.handlers.borrow().failed);
        for handler in handlers {
            handler(status, data);
        }
    }

    fn emit_completed(&self, status: u16) {
        let handlers = live(&self.handlers.borrow().completed);
        for handler in handlers {
            handler(status);
        }
    }

    fn emit_error(&self, message: &str, code: i32, kind: ErrorKind) {
        let handlers = live(&self.handlers.borrow().error);
        for handler in handlers {
            handler(message, code, kind);
        }
    }

    fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        let handlers = std::mem::take(&mut *self.handlers.borrow_mut());
        tracing::trace!("Destroying reply for {}", self.request.url);
        for listener in &handlers.destroyed {
            listener();
        }
    }
}
