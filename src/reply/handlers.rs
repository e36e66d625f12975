//! Handler types, liveness scopes and error policies.

use crate::error::DeserializationError;
use crate::types::Data;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Which kind of problem an error callback reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The transport failed (DNS, connect, TLS, timeout, abort, HTTP error without a parsable body).
    Network,
    /// The body could not be decoded as its declared content type.
    Parse,
    /// The server answered with a status of 300 or above and a parsable body.
    Failure,
    /// The body parsed but did not match the requested type.
    Deserialization,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "NetworkError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Failure => "FailureError",
            ErrorKind::Deserialization => "DeserializationError",
        };
        f.write_str(name)
    }
}

/// `(status, data)` handler of the untyped reply.
pub type DataHandler = dyn Fn(u16, &Data);
/// `(status)` handler.
pub type StatusHandler = dyn Fn(u16);
/// `(message, code, kind)` handler.
pub type ErrorHandler = dyn Fn(&str, i32, ErrorKind);
/// Deserialization exception handler.
pub type ExceptionHandler = dyn Fn(&DeserializationError);
/// Typed failure handler.
pub type FailureHandler<E> = dyn Fn(u16, E);
/// `(bytes transferred, total bytes if known)` progress handler.
pub type ProgressHandler = dyn Fn(u64, Option<u64>);

/// Liveness token for handler registrations.
///
/// Handlers registered with a scope stop being called once every clone of
/// the scope has been dropped.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    token: Rc<()>,
}

impl Scope {
    /// Create a new scope.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn watch(&self) -> Weak<()> {
        Rc::downgrade(&self.token)
    }
}

/// A registered handler with its optional scope.
pub(crate) struct Slot<F: ?Sized> {
    scope: Option<Weak<()>>,
    handler: Rc<F>,
}

impl<F: ?Sized> Slot<F> {
    pub(crate) fn new(handler: Rc<F>, scope: Option<&Scope>) -> Self {
        Self {
            scope: scope.map(Scope::watch),
            handler,
        }
    }

    fn is_live(&self) -> bool {
        self.scope
            .as_ref()
            .map_or(true, |scope| scope.strong_count() > 0)
    }
}

/// Handlers whose scope is still alive, cloned out so they can run without
/// holding a borrow of the registry.
pub(crate) fn live<F: ?Sized>(slots: &[Slot<F>]) -> Vec<Rc<F>> {
    slots
        .iter()
        .filter(|slot| slot.is_live())
        .map(|slot| Rc::clone(&slot.handler))
        .collect()
}

/// A single replaceable handler shared between a reply and its callbacks.
pub(crate) struct HandlerSlot<F: ?Sized>(Rc<RefCell<Option<Rc<F>>>>);

impl<F: ?Sized> HandlerSlot<F> {
    pub(crate) fn new() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }

    pub(crate) fn set(&self, handler: Rc<F>) {
        *self.0.borrow_mut() = Some(handler);
    }

    pub(crate) fn get(&self) -> Option<Rc<F>> {
        self.0.borrow().clone()
    }
}

impl<F: ?Sized> Clone for HandlerSlot<F> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

/// Hand a deserialization error to the registered exception handler.
///
/// Without a handler the error is only logged.
pub(crate) fn report_exception(slot: &HandlerSlot<ExceptionHandler>, err: &DeserializationError) {
    match slot.get() {
        Some(handler) => handler(err),
        None => tracing::warn!("Unhandled deserialization error: {}", err),
    }
}

/// Failure, error and exception handlers that travel with a paging iteration.
///
/// Every continuation request issued while iterating gets these handlers
/// attached, so a problem on any page reaches the same callbacks once.
pub struct ErrorPolicy<E> {
    pub(crate) failure: Option<Rc<FailureHandler<E>>>,
    pub(crate) error: Option<Rc<ErrorHandler>>,
    pub(crate) exception: Option<Rc<ExceptionHandler>>,
}

impl<E> Default for ErrorPolicy<E> {
    fn default() -> Self {
        Self {
            failure: None,
            error: None,
            exception: None,
        }
    }
}

impl<E> Clone for ErrorPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            failure: self.failure.clone(),
            error: self.error.clone(),
            exception: self.exception.clone(),
        }
    }
}

impl<E> fmt::Debug for ErrorPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorPolicy")
            .field("failure", &self.failure.is_some())
            .field("error", &self.error.is_some())
            .field("exception", &self.exception.is_some())
            .finish()
    }
}

impl<E: 'static> ErrorPolicy<E> {
    /// A policy without handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the typed failure handler.
    pub fn on_failed(mut self, handler: impl Fn(u16, E) + 'static) -> Self {
        self.failure = Some(Rc::new(handler));
        self
    }

    /// Set the network/parse error handler.
    pub fn on_error(mut self, handler: impl Fn(&str, i32, ErrorKind) + 'static) -> Self {
        self.error = Some(Rc::new(handler));
        self
    }

    /// Set the deserialization exception handler.
    pub fn on_serialize_exception(
        mut self,
        handler: impl Fn(&DeserializationError) + 'static,
    ) -> Self {
        self.exception = Some(Rc::new(handler));
        self
    }

    /// Route every kind of problem into one handler.
    ///
    /// Failures are reported with an empty message.
    pub fn all_errors(handler: impl Fn(&str, i32, ErrorKind) + 'static) -> Self {
        Self::unified(Rc::new(handler), None)
    }

    /// Like [`ErrorPolicy::all_errors`], with failure messages produced by
    /// `failure_transformer(error, status)`.
    pub fn all_errors_with(
        handler: impl Fn(&str, i32, ErrorKind) + 'static,
        failure_transformer: impl Fn(&E, u16) -> String + 'static,
    ) -> Self {
        Self::unified(Rc::new(handler), Some(Rc::new(failure_transformer)))
    }

    pub(crate) fn unified(
        handler: Rc<ErrorHandler>,
        failure_transformer: Option<Rc<dyn Fn(&E, u16) -> String>>,
    ) -> Self {
        let on_exception = Rc::clone(&handler);
        let on_failure = Rc::clone(&handler);
        Self {
            exception: Some(Rc::new(move |err: &DeserializationError| {
                on_exception(err.message(), 0, ErrorKind::Deserialization)
            })),
            failure: Some(Rc::new(move |code: u16, error: E| {
                let message = failure_transformer
                    .as_ref()
                    .map(|transform| transform(&error, code))
                    .unwrap_or_default();
                on_failure(&message, i32::from(code), ErrorKind::Failure);
            })),
            error: Some(handler),
        }
    }
}
