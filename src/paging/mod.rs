//! Paged collections.
//!
//! A [`PagingFactory`] recognises the page envelope of an API and yields a
//! [`PageInfo`]; [`Paging`] pairs it with the decoded items and knows how to
//! follow `next`/`previous` links through the client that fetched it.
//!
//! ```text
//! paging/
//! ├── factory - PageInfo, PagingFactory and the standard envelope
//! └── page    - Paging<T> and cross-page iteration
//! ```

mod factory;
mod page;

pub(crate) use factory::is_valid_link;
pub use factory::{PageInfo, PagingFactory, StandardPaging, StandardPagingFactory};
pub use page::{Paging, SharedIterator};
