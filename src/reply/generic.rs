//! Typed replies.
//!
//! [`GenericReply`] turns the untyped `succeeded`/`failed` events of a
//! [`Reply`] into typed callbacks using the client's [`Serializer`]. Two
//! companions cover the shapes that need different success handling:
//!
//! | Type | Success handler | Notes |
//! |------|-----------------|-------|
//! | [`GenericReply<D, E>`] | `Fn(u16, D)` | empty body yields `D::default()` |
//! | [`VoidReply<E>`] | `Fn(u16)` | empty replies allowed from the start |
//! | [`PagingReply<T, E>`] | `Fn(u16, Paging<T>)` | adds [`PagingReply::iterate`] |
//!
//! All three share the failure, error and exception plumbing.
//!
//! [`Serializer`]: crate::Serializer

use super::handlers::{
    report_exception, ErrorHandler, ErrorKind, ErrorPolicy, ExceptionHandler, FailureHandler,
    HandlerSlot,
};
use super::state::{Reply, ReplyState};
use crate::client::RestClient;
use crate::error::DeserializationError;
use crate::paging::{Paging, SharedIterator};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::time::Duration;

/// Shared state of every typed reply.
pub(crate) struct ReplyCore<E> {
    pub(crate) reply: Reply,
    pub(crate) client: RestClient,
    pub(crate) exception: HandlerSlot<ExceptionHandler>,
    pub(crate) failure: HandlerSlot<FailureHandler<E>>,
    pub(crate) error: HandlerSlot<ErrorHandler>,
}

impl<E> Clone for ReplyCore<E> {
    fn clone(&self) -> Self {
        Self {
            reply: self.reply.clone(),
            client: self.client.clone(),
            exception: self.exception.clone(),
            failure: self.failure.clone(),
            error: self.error.clone(),
        }
    }
}

impl<E: DeserializeOwned + Default + 'static> ReplyCore<E> {
    fn new(reply: Reply, client: RestClient) -> Self {
        Self {
            reply,
            client,
            exception: HandlerSlot::new(),
            failure: HandlerSlot::new(),
            error: HandlerSlot::new(),
        }
    }

    fn on_failed(&self, handler: Rc<FailureHandler<E>>) {
        self.failure.set(Rc::clone(&handler));
        let client = self.client.clone();
        let exception = self.exception.clone();
        self.reply.on_failed(move |status, data| {
            let error = if data.is_empty() {
                E::default()
            } else {
                client
                    .serializer()
                    .deserialize::<E>(data)
                    .unwrap_or_else(|err| {
                        report_exception(&exception, &err);
                        E::default()
                    })
            };
            handler(status, error);
        });
    }

    fn on_error(&self, handler: Rc<ErrorHandler>) {
        self.error.set(Rc::clone(&handler));
        self.reply
            .on_error(move |message, code, kind| handler(message, code, kind));
    }

    fn attach(&self, policy: &ErrorPolicy<E>) {
        if let Some(exception) = &policy.exception {
            self.exception.set(Rc::clone(exception));
        }
        if let Some(failure) = &policy.failure {
            self.on_failed(Rc::clone(failure));
        }
        if let Some(error) = &policy.error {
            self.on_error(Rc::clone(error));
        }
    }

    fn chain_exception(&self, handler: impl Fn(&DeserializationError) + 'static) {
        let previous = self.exception.get();
        self.exception.set(Rc::new(move |err: &DeserializationError| {
            if let Some(previous) = &previous {
                previous(err);
            }
            handler(err);
        }));
    }

    fn error_policy(&self) -> ErrorPolicy<E> {
        ErrorPolicy {
            failure: self.failure.get(),
            error: self.error.get(),
            exception: self.exception.get(),
        }
    }
}

/// Generates the API every typed reply shares.
macro_rules! typed_reply_api {
    (impl<$($gen:ident),*> $name:ident<$($arg:ident),*> where $($bounds:tt)*) => {
        impl<$($gen),*> $name<$($arg),*>
        where
            $($bounds)*
        {
            /// Called with the status and the decoded error body when the server
            /// answered with 300 or above.
            ///
            /// An empty body, or one that cannot be decoded as `E`, yields
            /// `E::default()`; decoding problems also reach the exception handler.
            pub fn on_failed(&self, handler: impl Fn(u16, E) + 'static) -> &Self {
                self.core.on_failed(Rc::new(handler));
                self
            }

            /// Called with message, code and kind on network and parse errors.
            pub fn on_error(&self, handler: impl Fn(&str, i32, ErrorKind) + 'static) -> &Self {
                self.core.on_error(Rc::new(handler));
                self
            }

            /// Called after the success or failure handlers with the status.
            pub fn on_completed(&self, handler: impl Fn(u16) + 'static) -> &Self {
                self.core.reply.on_completed(handler);
                self
            }

            /// Called when a body cannot be converted into the requested type.
            ///
            /// Replaces any previously set exception handler.
            pub fn on_serialize_exception(
                &self,
                handler: impl Fn(&DeserializationError) + 'static,
            ) -> &Self {
                self.core.exception.set(Rc::new(handler));
                self
            }

            /// Add an exception handler that runs after the current one.
            pub(crate) fn chain_serialize_exception(
                &self,
                handler: impl Fn(&DeserializationError) + 'static,
            ) -> &Self {
                self.core.chain_exception(handler);
                self
            }

            /// Route failures, errors and deserialization exceptions into one
            /// handler. Failures are reported with an empty message.
            pub fn on_all_errors(&self, handler: impl Fn(&str, i32, ErrorKind) + 'static) -> &Self {
                self.core.attach(&ErrorPolicy::unified(Rc::new(handler), None));
                self
            }

            /// Like `on_all_errors`, describing failures with
            /// `failure_transformer(error, status)`.
            pub fn on_all_errors_with(
                &self,
                handler: impl Fn(&str, i32, ErrorKind) + 'static,
                failure_transformer: impl Fn(&E, u16) -> String + 'static,
            ) -> &Self {
                self.core.attach(&ErrorPolicy::unified(
                    Rc::new(handler),
                    Some(Rc::new(failure_transformer)),
                ));
                self
            }

            /// Register every handler of `policy` on this reply.
            pub fn attach_policy(&self, policy: &ErrorPolicy<E>) -> &Self {
                self.core.attach(policy);
                self
            }

            /// The failure, error and exception handlers registered last.
            pub fn error_policy(&self) -> ErrorPolicy<E> {
                self.core.error_policy()
            }

            /// Called once when the reply is destroyed.
            /// See [`Reply::on_download_progress`].
            pub fn on_download_progress(&self, handler: impl Fn(u64, Option<u64>) + 'static) -> &Self {
                self.core.reply.on_download_progress(handler);
                self
            }

            /// See [`Reply::on_upload_progress`].
            pub fn on_upload_progress(&self, handler: impl Fn(u64, Option<u64>) + 'static) -> &Self {
                self.core.reply.on_upload_progress(handler);
                self
            }

            pub fn on_destroyed(&self, listener: impl Fn() + 'static) -> &Self {
                self.core.reply.on_destroyed(listener);
                self
            }

            /// See [`Reply::abort`].
            pub fn abort(&self) {
                self.core.reply.abort();
            }

            /// See [`Reply::retry`].
            pub fn retry(&self) {
                self.core.reply.retry();
            }

            /// See [`Reply::retry_after`].
            pub fn retry_after(&self, delay: Duration) {
                self.core.reply.retry_after(delay);
            }

            /// Whether the reply destroys itself after completing.
            pub fn auto_delete(&self) -> bool {
                self.core.reply.auto_delete()
            }

            /// Enable or disable destruction after completion.
            pub fn set_auto_delete(&self, enabled: bool) -> &Self {
                self.core.reply.set_auto_delete(enabled);
                self
            }

            /// Keep the reply and its handlers after completion.
            pub fn disable_auto_delete(&self) -> &Self {
                self.core.reply.disable_auto_delete();
                self
            }

            /// Whether an empty body counts as success without data.
            pub fn allow_empty_replies(&self) -> bool {
                self.core.reply.allow_empty_replies()
            }

            /// Treat empty bodies as success without data.
            pub fn set_allow_empty_replies(&self, allow: bool) -> &Self {
                self.core.reply.set_allow_empty_replies(allow);
                self
            }

            /// Current lifecycle state.
            pub fn state(&self) -> ReplyState {
                self.core.reply.state()
            }

            /// The untyped reply underneath.
            pub fn reply(&self) -> &Reply {
                &self.core.reply
            }

            /// The client that sent the request.
            pub fn client(&self) -> &RestClient {
                &self.core.client
            }
        }

        impl<$($gen),*> Clone for $name<$($arg),*> {
            fn clone(&self) -> Self {
                Self {
                    core: self.core.clone(),
                    marker: PhantomData,
                }
            }
        }

        impl<$($gen),*> fmt::Debug for $name<$($arg),*> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("reply", &self.core.reply)
                    .finish()
            }
        }
    };
}

/// Reply decoding success bodies as `D` and failure bodies as `E`.
///
/// # Examples
///
/// ```ignore
/// #[derive(Debug, Default, Deserialize)]
/// struct Post { id: u64, title: String }
///
/// client
///     .create_class("posts")
///     .get::<Post, serde_json::Value>("1")
///     .on_succeeded(|_, post| println!("{}", post.title))
///     .on_all_errors(|message, code, kind| eprintln!("{} {}: {}", kind, code, message));
/// ```
pub struct GenericReply<D, E = serde_json::Value> {
    core: ReplyCore<E>,
    marker: PhantomData<fn() -> D>,
}

typed_reply_api!(impl<D, E> GenericReply<D, E> where
    D: DeserializeOwned + Default + 'static,
    E: DeserializeOwned + Default + 'static,
);

impl<D, E> GenericReply<D, E>
where
    D: DeserializeOwned + Default + 'static,
    E: DeserializeOwned + Default + 'static,
{
    /// Wrap `reply`, decoding with the serializer of `client`.
    pub fn new(reply: Reply, client: RestClient) -> Self {
        Self {
            core: ReplyCore::new(reply, client),
            marker: PhantomData,
        }
    }

    /// Called with the status and the decoded body on success.
    ///
    /// An empty body yields `D::default()`. If the body cannot be decoded the
    /// handler is skipped and the exception handler is called instead.
    pub fn on_succeeded(&self, handler: impl Fn(u16, D) + 'static) -> &Self {
        let client = self.core.client.clone();
        let exception = self.core.exception.clone();
        self.core.reply.on_succeeded(move |status, data| {
            let value = if data.is_empty() {
                D::default()
            } else {
                match client.serializer().deserialize::<D>(data) {
                    Ok(value) => value,
                    Err(err) => {
                        report_exception(&exception, &err);
                        return;
                    }
                }
            };
            handler(status, value);
        });
        self
    }
}

/// Reply for requests whose success carries no body.
///
/// Empty replies are allowed from construction, so `204 No Content` is the
/// expected success.
pub struct VoidReply<E = serde_json::Value> {
    core: ReplyCore<E>,
    marker: PhantomData<fn()>,
}

typed_reply_api!(impl<E> VoidReply<E> where E: DeserializeOwned + Default + 'static,);

impl<E> VoidReply<E>
where
    E: DeserializeOwned + Default + 'static,
{
    /// Wrap `reply` and allow empty replies on it.
    pub fn new(reply: Reply, client: RestClient) -> Self {
        reply.set_allow_empty_replies(true);
        Self {
            core: ReplyCore::new(reply, client),
            marker: PhantomData,
        }
    }

    /// Called with the status on success. Any body is ignored.
    pub fn on_succeeded(&self, handler: impl Fn(u16) + 'static) -> &Self {
        self.core.reply.on_succeeded(move |status, _| handler(status));
        self
    }
}

/// Reply decoding a paging envelope of `T` items.
pub struct PagingReply<T, E = serde_json::Value> {
    core: ReplyCore<E>,
    marker: PhantomData<fn() -> T>,
}

typed_reply_api!(impl<T, E> PagingReply<T, E> where
    T: DeserializeOwned + 'static,
    E: DeserializeOwned + Default + 'static,
);

impl<T, E> PagingReply<T, E>
where
    T: DeserializeOwned + 'static,
    E: DeserializeOwned + Default + 'static,
{
    /// Wrap `reply`, building pages with the factory of `client`.
    pub fn new(reply: Reply, client: RestClient) -> Self {
        Self {
            core: ReplyCore::new(reply, client),
            marker: PhantomData,
        }
    }

    /// Called with the status and the decoded page on success.
    ///
    /// If the body is not a page envelope, or its items cannot be decoded as
    /// `T`, the handler is skipped and the exception handler is called.
    pub fn on_succeeded(&self, handler: impl Fn(u16, Paging<T>) + 'static) -> &Self {
        let client = self.core.client.clone();
        let exception = self.core.exception.clone();
        self.core.reply.on_succeeded(move |status, data| {
            match Paging::from_data(&client, data) {
                Ok(paging) => handler(status, paging),
                Err(err) => report_exception(&exception, &err),
            }
        });
        self
    }

    /// Walk every item of this and all following pages.
    ///
    /// Same as `iterate_range(iterator, -1, 0)`.
    pub fn iterate(&self, iterator: impl FnMut(T, i64) -> bool + 'static) -> &Self {
        self.iterate_range(iterator, -1, 0)
    }

    /// Walk items with absolute indices in `from..to` once the reply succeeds,
    /// fetching further pages as needed. A negative `to` means no limit.
    ///
    /// `iterator` receives each item and its absolute index (`-1` for cursor
    /// based pages) and returns false to stop. Continuation requests get the
    /// failure, error and exception handlers of this reply attached.
    pub fn iterate_range(
        &self,
        iterator: impl FnMut(T, i64) -> bool + 'static,
        to: i64,
        from: i64,
    ) -> &Self {
        let iterator: SharedIterator<T> = Rc::new(RefCell::new(iterator));
        let failure = self.core.failure.clone();
        let error = self.core.error.clone();
        let exception = self.core.exception.clone();
        self.on_succeeded(move |_, paging| {
            let policy = ErrorPolicy {
                failure: failure.get(),
                error: error.get(),
                exception: exception.get(),
            };
            paging.iterate_shared(Rc::clone(&iterator), policy, to, from);
        })
    }
}
