//! Typed page snapshots and the cross-page iteration algorithm.

use super::factory::PageInfo;
use crate::client::{RestClient, WeakClient};
use crate::error::DeserializationError;
use crate::reply::{ErrorPolicy, PagingReply};
use crate::types::Data;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Item callback shared by every page of one iteration.
pub type SharedIterator<T> = Rc<RefCell<dyn FnMut(T, i64) -> bool>>;

struct PagingShared<T> {
    page: Option<Box<dyn PageInfo>>,
    items: RefCell<Vec<T>>,
    client: Option<WeakClient>,
}

/// One page of a collection with its decoded items.
///
/// Clones share the page. The client is only referenced weakly; once it is
/// dropped, [`Paging::next`] and [`Paging::previous`] return `None`.
///
/// A default `Paging` is invalid: it has no items, a total of 0, an offset
/// of -1 and no neighbours.
pub struct Paging<T> {
    shared: Rc<PagingShared<T>>,
}

impl<T> Clone for Paging<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T> Default for Paging<T> {
    fn default() -> Self {
        Self {
            shared: Rc::new(PagingShared {
                page: None,
                items: RefCell::new(Vec::new()),
                client: None,
            }),
        }
    }
}

impl<T> fmt::Debug for Paging<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paging")
            .field("valid", &self.is_valid())
            .field("items", &self.item_count())
            .field("offset", &self.offset())
            .field("total", &self.total())
            .field("next", &self.next_url())
            .finish()
    }
}

impl<T> Paging<T> {
    /// Build a page from an envelope and its already decoded items.
    pub fn new(page: Box<dyn PageInfo>, items: Vec<T>, client: &RestClient) -> Self {
        Self {
            shared: Rc::new(PagingShared {
                page: Some(page),
                items: RefCell::new(items),
                client: Some(client.downgrade()),
            }),
        }
    }

    /// Whether this page was built from an envelope.
    pub fn is_valid(&self) -> bool {
        self.shared.page.is_some()
    }

    /// The untyped envelope.
    pub fn page_info(&self) -> Option<&dyn PageInfo> {
        self.shared.page.as_deref()
    }

    /// Copy of the items still held by this page.
    pub fn items(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.shared.items.borrow().clone()
    }

    /// Number of items still held by this page.
    pub fn item_count(&self) -> usize {
        self.shared.items.borrow().len()
    }

    /// Size of the whole collection, `i64::MAX` if the server does not say.
    pub fn total(&self) -> i64 {
        self.page_info().map_or(0, |page| page.total())
    }

    /// Absolute index of the first item, `-1` for cursor-only paging.
    pub fn offset(&self) -> i64 {
        self.page_info().map_or(-1, |page| page.offset())
    }

    /// Whether a following page exists.
    pub fn has_next(&self) -> bool {
        self.next_url().is_some()
    }

    /// Link to the following page.
    pub fn next_url(&self) -> Option<&str> {
        self.page_info().and_then(|page| page.next())
    }

    /// Whether a preceding page exists.
    pub fn has_previous(&self) -> bool {
        self.previous_url().is_some()
    }

    /// Link to the preceding page.
    pub fn previous_url(&self) -> Option<&str> {
        self.page_info().and_then(|page| page.previous())
    }

    /// Envelope fields outside the paging protocol.
    pub fn properties(&self) -> BTreeMap<String, Data> {
        self.page_info()
            .map(|page| page.properties())
            .unwrap_or_default()
    }

    /// The envelope as received.
    pub fn original_data(&self) -> Option<&Data> {
        self.page_info().map(|page| page.original_data())
    }

    /// The client that fetched this page, if it is still alive.
    pub fn client(&self) -> Option<RestClient> {
        self.shared.client.as_ref().and_then(WeakClient::upgrade)
    }

    /// Release every item held by this page, in every clone.
    pub fn delete_all_items(&self) {
        self.shared.items.borrow_mut().clear();
    }
}

impl<T: DeserializeOwned + 'static> Paging<T> {
    /// Build a page from a response body with the client's paging factory.
    pub(crate) fn from_data(client: &RestClient, data: &Data) -> Result<Self, DeserializationError> {
        let serializer = client.serializer();
        let page = client.paging_factory().create_paging(&serializer, data)?;
        let items = serializer.deserialize::<Vec<T>>(page.items())?;
        Ok(Self::new(page, items, client))
    }

    /// Request the following page. `None` if there is none.
    pub fn next<E>(&self) -> Option<PagingReply<T, E>>
    where
        E: DeserializeOwned + Default + 'static,
    {
        self.follow(self.next_url()?)
    }

    /// Request the preceding page. `None` if there is none.
    pub fn previous<E>(&self) -> Option<PagingReply<T, E>>
    where
        E: DeserializeOwned + Default + 'static,
    {
        self.follow(self.previous_url()?)
    }

    fn follow<E>(&self, link: &str) -> Option<PagingReply<T, E>>
    where
        E: DeserializeOwned + Default + 'static,
    {
        let Some(client) = self.client() else {
            tracing::warn!("Cannot follow page link {}: client was dropped", link);
            return None;
        };
        match client.builder().update_from_relative_url(link, true, false) {
            Ok(builder) => Some(builder.send_paging()),
            Err(err) => {
                tracing::warn!("Cannot follow page link {}: {}", link, err);
                None
            }
        }
    }

    /// Walk every item of this and all following pages.
    ///
    /// See [`Paging::iterate_with`].
    pub fn iterate(&self, iterator: impl FnMut(T, i64) -> bool + 'static) -> i64 {
        self.iterate_range(iterator, -1, 0)
    }

    /// Walk items with absolute indices in `from..to`; a negative `to` means no limit.
    ///
    /// See [`Paging::iterate_with`].
    pub fn iterate_range(
        &self,
        iterator: impl FnMut(T, i64) -> bool + 'static,
        to: i64,
        from: i64,
    ) -> i64 {
        self.iterate_with::<serde_json::Value>(iterator, ErrorPolicy::new(), to, from)
    }

    /// Walk items across pages, attaching `policy` to every page request.
    ///
    /// The items of this page are handed to `iterator` right away together
    /// with their absolute index, or `-1` on cursor-only pages. Returning
    /// false stops the walk. When the end of the page is reached below `to`
    /// and the collection total, the next page is requested and walked the
    /// same way once it arrives.
    ///
    /// Iterating consumes the items: visited, skipped and trimmed items are
    /// released, so the page holds none afterwards.
    ///
    /// Returns `-1` if the walk was stopped on this page, otherwise the index
    /// it resumes from on the next page (`0` on cursor-only pages).
    pub fn iterate_with<E>(
        &self,
        iterator: impl FnMut(T, i64) -> bool + 'static,
        policy: ErrorPolicy<E>,
        to: i64,
        from: i64,
    ) -> i64
    where
        E: DeserializeOwned + Default + 'static,
    {
        self.iterate_shared(Rc::new(RefCell::new(iterator)), policy, to, from)
    }

    pub(crate) fn iterate_shared<E>(
        &self,
        iterator: SharedIterator<T>,
        policy: ErrorPolicy<E>,
        to: i64,
        from: i64,
    ) -> i64
    where
        E: DeserializeOwned + Default + 'static,
    {
        let index = self.internal_iterate(&iterator, to, from);
        if index < 0 || index >= self.calc_max(to) || !self.has_next() {
            return index;
        }

        if let Some(reply) = self.next::<E>() {
            reply.attach_policy(&policy);
            reply.on_succeeded(move |_, paging| {
                paging.iterate_shared(Rc::clone(&iterator), policy.clone(), to, index);
            });
        }
        index
    }

    fn internal_iterate(&self, iterator: &SharedIterator<T>, to: i64, from: i64) -> i64 {
        let items = std::mem::take(&mut *self.shared.items.borrow_mut());
        let mut iterator = iterator.borrow_mut();

        let offset = self.offset();
        if offset < 0 {
            for item in items {
                if !(&mut *iterator)(item, -1) {
                    return -1;
                }
            }
            return 0;
        }

        if from < offset {
            tracing::debug!(
                "Iteration start {} lies before page offset {}, starting at the offset",
                from,
                offset
            );
        }

        let count = items.len() as i64;
        let start = from.max(offset) - offset;
        let max = if to >= 0 {
            to.min(offset.saturating_add(count)) - offset
        } else {
            count
        };

        let mut index = start;
        for item in items.into_iter().skip(start as usize) {
            if index >= max {
                break;
            }
            if !(&mut *iterator)(item, offset.saturating_add(index)) {
                return -1;
            }
            index += 1;
        }
        offset.saturating_add(index)
    }

    fn calc_max(&self, to: i64) -> i64 {
        if self.offset() < 0 {
            i64::MAX
        } else if to >= 0 {
            to.min(self.total())
        } else {
            self.total()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_client;
    use serde_json::json;
    use std::cell::Cell;

    fn page(client: &RestClient, envelope: serde_json::Value) -> Paging<i64> {
        Paging::from_data(client, &Data::Json(envelope)).unwrap()
    }

    fn collect(paging: &Paging<i64>, to: i64, from: i64) -> (Rc<RefCell<Vec<(i64, i64)>>>, i64) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let index = paging.iterate_range(
            move |item, index| {
                sink.borrow_mut().push((item, index));
                true
            },
            to,
            from,
        );
        (seen, index)
    }

    #[test]
    fn test_accessors() {
        let (client, _) = mock_client();
        let paging = page(
            &client,
            json!({ "total": 9, "offset": 3, "next": "/items?offset=6", "items": [3, 4, 5], "id": 1 }),
        );
        assert!(paging.is_valid());
        assert_eq!(paging.items(), vec![3, 4, 5]);
        assert_eq!(paging.total(), 9);
        assert_eq!(paging.offset(), 3);
        assert!(paging.has_next());
        assert!(!paging.has_previous());
        assert_eq!(paging.properties()["id"], Data::Json(json!(1)));
        assert!(paging.client().is_some());

        paging.delete_all_items();
        assert_eq!(paging.item_count(), 0);
    }

    #[test]
    fn test_default_is_invalid() {
        let paging = Paging::<i64>::default();
        assert!(!paging.is_valid());
        assert_eq!(paging.total(), 0);
        assert_eq!(paging.offset(), -1);
        assert!(paging.next::<serde_json::Value>().is_none());
    }

    #[test]
    fn test_items_must_match_type() {
        let (client, _) = mock_client();
        let result = Paging::<i64>::from_data(
            &client,
            &Data::Json(json!({ "next": null, "items": ["a"] })),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_window_inside_single_page() {
        let (client, _) = mock_client();
        let paging = page(
            &client,
            json!({ "total": 10, "offset": 0, "next": "/items?offset=10", "items": [0, 1, 2, 3, 4, 5, 6, 7, 8, 9] }),
        );
        let (seen, index) = collect(&paging, 5, 2);
        assert_eq!(*seen.borrow(), vec![(2, 2), (3, 3), (4, 4)]);
        assert_eq!(index, 5);
        assert_eq!(paging.item_count(), 0);
    }

    #[test]
    fn test_from_before_offset_is_clamped() {
        let (client, _) = mock_client();
        let paging = page(
            &client,
            json!({ "total": 7, "offset": 5, "next": null, "items": [5, 6] }),
        );
        let (seen, index) = collect(&paging, -1, 0);
        assert_eq!(*seen.borrow(), vec![(5, 5), (6, 6)]);
        assert_eq!(index, 7);
    }

    #[test]
    fn test_huge_offset_saturates() {
        let (client, _) = mock_client();
        let envelope = json!({ "offset": i64::MAX - 1, "next": null, "items": [1, 2, 3] });

        let (seen, index) = collect(&page(&client, envelope.clone()), -1, 0);
        assert_eq!(
            *seen.borrow(),
            vec![(1, i64::MAX - 1), (2, i64::MAX), (3, i64::MAX)]
        );
        assert_eq!(index, i64::MAX);

        let (seen, index) = collect(&page(&client, envelope), i64::MAX, 0);
        assert_eq!(*seen.borrow(), vec![(1, i64::MAX - 1)]);
        assert_eq!(index, i64::MAX);
    }

    #[test]
    fn test_cursor_pages_report_no_index() {
        let (client, _) = mock_client();
        let paging = page(&client, json!({ "next": null, "items": [7, 8] }));
        let (seen, index) = collect(&paging, -1, 0);
        assert_eq!(*seen.borrow(), vec![(7, -1), (8, -1)]);
        assert_eq!(index, 0);
    }

    #[test]
    fn test_cancel_releases_page() {
        let (client, _) = mock_client();
        let paging = page(
            &client,
            json!({ "total": 4, "offset": 0, "next": null, "items": [0, 1, 2, 3] }),
        );
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let index = paging.iterate(move |_, _| {
            counter.set(counter.get() + 1);
            counter.get() < 2
        });
        assert_eq!(index, -1);
        assert_eq!(calls.get(), 2);
        assert_eq!(paging.item_count(), 0);
    }

    #[test]
    fn test_dropped_client_stops_following() {
        let (client, _) = mock_client();
        let paging = page(&client, json!({ "next": "/items?page=2", "items": [] }));
        drop(client);
        assert!(paging.has_next());
        assert!(paging.next::<serde_json::Value>().is_none());
    }
}
