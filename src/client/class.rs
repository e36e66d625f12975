//! Path-scoped request helpers.

use super::builder::RequestBuilder;
use super::rest_client::RestClient;
use crate::error::Result;
use crate::reply::{GenericReply, PagingReply, VoidReply};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A resource path of an API, e.g. `/users`.
///
/// Every call builds on the client's builder with this path prepended, then
/// the method path appended.
///
/// ```ignore
/// let posts = client.create_class("posts");
/// posts.get::<Post, ApiError>("1").on_succeeded(|_, post| println!("{:?}", post));
/// posts.sub_class("archived").get_paging::<Post, ApiError>("").iterate(|post, _| {
///     println!("{:?}", post);
///     true
/// });
/// ```
#[derive(Debug, Clone)]
pub struct RestClass {
    client: RestClient,
    path: Vec<String>,
}

impl RestClass {
    pub(crate) fn new(client: RestClient, path: Vec<String>) -> Self {
        Self { client, path }
    }

    /// The client this class sends through.
    pub fn client(&self) -> &RestClient {
        &self.client
    }

    /// Path segments of this class.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// A class for `path` below this one; `path` is split on `/`.
    pub fn sub_class(&self, path: &str) -> RestClass {
        let mut sub_path = self.path.clone();
        sub_path.extend(
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string),
        );
        RestClass::new(self.client.clone(), sub_path)
    }

    /// A client builder with this class's path already added.
    pub fn builder(&self) -> RequestBuilder {
        self.client.builder().add_paths(self.path.iter().cloned())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.builder().add_path(path).with_method(method)
    }

    /// Send `method` to `path` below this class.
    pub fn call<D, E>(&self, method: Method, path: &str) -> GenericReply<D, E>
    where
        D: DeserializeOwned + Default + 'static,
        E: DeserializeOwned + Default + 'static,
    {
        self.request(method, path).send_generic()
    }

    /// Send `method` to `path` with `body` serialized by the client's serializer.
    ///
    /// # Errors
    ///
    /// Fails if `body` cannot be serialized; nothing is sent then.
    pub fn call_with_body<D, E, B>(&self, method: Method, path: &str, body: &B) -> Result<GenericReply<D, E>>
    where
        D: DeserializeOwned + Default + 'static,
        E: DeserializeOwned + Default + 'static,
        B: Serialize + ?Sized,
    {
        Ok(self
            .request(method, path)
            .with_serialized(body)?
            .send_generic())
    }

    /// Send `method` to `url`, resolved against this class's URL.
    ///
    /// # Errors
    ///
    /// Fails if `url` cannot be resolved.
    pub fn call_url<D, E>(&self, method: Method, url: &str) -> Result<GenericReply<D, E>>
    where
        D: DeserializeOwned + Default + 'static,
        E: DeserializeOwned + Default + 'static,
    {
        Ok(self
            .builder()
            .update_from_relative_url(url, true, false)?
            .with_method(method)
            .send_generic())
    }

    /// Send `method` to `path`, expecting no body on success.
    pub fn call_void<E>(&self, method: Method, path: &str) -> VoidReply<E>
    where
        E: DeserializeOwned + Default + 'static,
    {
        self.request(method, path).send_void()
    }

    /// `GET path`.
    pub fn get<D, E>(&self, path: &str) -> GenericReply<D, E>
    where
        D: DeserializeOwned + Default + 'static,
        E: DeserializeOwned + Default + 'static,
    {
        self.call(Method::GET, path)
    }

    /// `POST path` with a serialized body.
    pub fn post<D, E, B>(&self, path: &str, body: &B) -> Result<GenericReply<D, E>>
    where
        D: DeserializeOwned + Default + 'static,
        E: DeserializeOwned + Default + 'static,
        B: Serialize + ?Sized,
    {
        self.call_with_body(Method::POST, path, body)
    }

    /// `PUT path` with a serialized body.
    pub fn put<D, E, B>(&self, path: &str, body: &B) -> Result<GenericReply<D, E>>
    where
        D: DeserializeOwned + Default + 'static,
        E: DeserializeOwned + Default + 'static,
        B: Serialize + ?Sized,
    {
        self.call_with_body(Method::PUT, path, body)
    }

    /// `PATCH path` with a serialized body.
    pub fn patch<D, E, B>(&self, path: &str, body: &B) -> Result<GenericReply<D, E>>
    where
        D: DeserializeOwned + Default + 'static,
        E: DeserializeOwned + Default + 'static,
        B: Serialize + ?Sized,
    {
        self.call_with_body(Method::PATCH, path, body)
    }

    /// `DELETE path`.
    pub fn delete<E>(&self, path: &str) -> VoidReply<E>
    where
        E: DeserializeOwned + Default + 'static,
    {
        self.call_void(Method::DELETE, path)
    }

    /// `GET path`, decoding a page of `T` items.
    pub fn get_paging<T, E>(&self, path: &str) -> PagingReply<T, E>
    where
        T: DeserializeOwned + 'static,
        E: DeserializeOwned + Default + 'static,
    {
        self.request(Method::GET, path).send_paging()
    }
}
