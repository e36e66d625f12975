//! Summary objects that link to an extended representation.
//!
//! A list endpoint often returns small summaries, each with a link to the
//! full object. Implement [`Simple`] on the summary to fetch the full object
//! on demand and keep it cached next to the summary.

use super::RestClient;
use crate::paging::is_valid_link;
use crate::reply::{ErrorKind, GenericReply};
use http::Method;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Cache slot for the extended object.
///
/// Clones share the slot, so a cloned summary sees an extension fetched
/// through the original. Deserializes as empty, so it can sit in a
/// `#[serde(skip)]` field.
pub struct Extension<T>(Rc<RefCell<Option<T>>>);

impl<T> Extension<T> {
    /// An empty slot.
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }

    /// Whether an object is cached.
    pub fn is_set(&self) -> bool {
        self.0.borrow().is_some()
    }

    /// Cache `value`, replacing any earlier one.
    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = Some(value);
    }

    /// Drop the cached object.
    pub fn clear(&self) {
        self.0.borrow_mut().take();
    }

    fn downgrade(&self) -> Weak<RefCell<Option<T>>> {
        Rc::downgrade(&self.0)
    }
}

impl<T: Clone> Extension<T> {
    /// A copy of the cached object.
    pub fn get(&self) -> Option<T> {
        self.0.borrow().clone()
    }
}

impl<T> Default for Extension<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Extension<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Extension<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Extension").field(&*self.0.borrow()).finish()
    }
}

/// A summary type whose full version lives at [`Simple::extension_href`].
///
/// # Example
///
/// ```
/// use rest_client_http::client::{Extension, Simple};
/// use serde::Deserialize;
///
/// #[derive(Debug, Clone, Default, Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
///     email: String,
/// }
///
/// #[derive(Debug, Clone, Deserialize)]
/// struct UserSummary {
///     id: u64,
///     href: Option<String>,
///     #[serde(skip)]
///     full: Extension<User>,
/// }
///
/// impl Simple for UserSummary {
///     type Extended = User;
///
///     fn extension_href(&self) -> Option<&str> {
///         self.href.as_deref()
///     }
///
///     fn extension(&self) -> &Extension<User> {
///         &self.full
///     }
/// }
///
/// let summary = UserSummary { id: 1, href: Some("/users/1".into()), full: Extension::new() };
/// assert!(summary.has_extension());
/// assert!(!summary.is_extended());
/// ```
pub trait Simple {
    /// The full object.
    type Extended: DeserializeOwned + Default + Clone + 'static;

    /// Link to the full object, absolute or relative to the client's base URL.
    fn extension_href(&self) -> Option<&str>;

    /// Where the fetched full object is cached.
    fn extension(&self) -> &Extension<Self::Extended>;

    /// Whether [`Simple::extension_href`] is a usable link.
    fn has_extension(&self) -> bool {
        self.extension_href().is_some_and(is_valid_link)
    }

    /// Whether the full object is cached.
    fn is_extended(&self) -> bool {
        self.extension().is_set()
    }

    /// The cached full object, `None` until an extension request succeeded.
    fn current_extended(&self) -> Option<Self::Extended> {
        self.extension().get()
    }

    /// Send a `GET` for the full object. The decoded object is cached once the
    /// reply succeeds. Returns `None` without a usable link.
    fn extend<E>(&self, client: &RestClient) -> Option<GenericReply<Self::Extended, E>>
    where
        Self: Sized,
        E: DeserializeOwned + Default + 'static,
    {
        let href = self.extension_href().filter(|href| is_valid_link(href))?;
        let reply = match client
            .root_class()
            .call_url::<Self::Extended, E>(Method::GET, href)
        {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!("Cannot resolve extension link {}: {}", href, err);
                return None;
            }
        };

        let cache = self.extension().downgrade();
        reply.on_succeeded(move |_, data| {
            if let Some(cell) = cache.upgrade() {
                *cell.borrow_mut() = Some(data);
            }
        });
        Some(reply)
    }

    /// Pass the full object to `handler`, fetching it first if needed.
    ///
    /// The flag is `true` when a request was sent and `false` when the cached
    /// object was used. Errors of the request go to `error_handler` as with
    /// `on_all_errors`. Nothing happens without a cached object or a link.
    fn extend_with<E>(
        &self,
        client: &RestClient,
        handler: impl Fn(Self::Extended, bool) + 'static,
        error_handler: impl Fn(&str, i32, ErrorKind) + 'static,
    ) where
        Self: Sized,
        E: DeserializeOwned + Default + 'static,
    {
        if let Some(extended) = self.current_extended() {
            handler(extended, false);
            return;
        }

        match self.extend::<E>(client) {
            Some(reply) => {
                reply
                    .on_succeeded(move |_, data| handler(data, true))
                    .on_all_errors(error_handler);
            }
            None => tracing::debug!("Nothing to extend: no extension link"),
        }
    }
}
