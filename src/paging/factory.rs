//! Page envelopes and the factories that recognise them.

use crate::error::DeserializationError;
use crate::serializer::Serializer;
use crate::types::Data;
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

const NOT_A_PAGE: &str = "Given data is not a standard paging object";
const STANDARD_KEYS: [&str; 5] = ["items", "next", "previous", "total", "offset"];

/// Untyped view of one page envelope.
///
/// Only the item array and the link to the next page are required; the
/// remaining accessors default to "unknown total", "no offset support",
/// "no previous page" and "no extra properties".
pub trait PageInfo: fmt::Debug {
    /// The raw item array.
    fn items(&self) -> &Data;

    /// Link to the following page, if any.
    fn next(&self) -> Option<&str>;

    /// The complete envelope as received.
    fn original_data(&self) -> &Data;

    /// Number of items in the whole collection, `i64::MAX` if unknown.
    fn total(&self) -> i64 {
        i64::MAX
    }

    /// Absolute index of the first item on this page, `-1` for cursor-only paging.
    fn offset(&self) -> i64 {
        -1
    }

    /// Link to the preceding page, if any.
    fn previous(&self) -> Option<&str> {
        None
    }

    /// Envelope fields that are not part of the paging protocol.
    fn properties(&self) -> BTreeMap<String, Data> {
        BTreeMap::new()
    }
}

/// Builds a [`PageInfo`] from a decoded response body.
///
/// A client holds one factory; replace it with
/// [`RestClient::set_paging_factory`](crate::RestClient::set_paging_factory)
/// for APIs with a different envelope.
pub trait PagingFactory {
    /// Interpret `data` as a page envelope.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] if `data` has the wrong shape.
    fn create_paging(
        &self,
        serializer: &Serializer,
        data: &Data,
    ) -> Result<Box<dyn PageInfo>, DeserializationError>;
}

/// The default envelope:
///
/// ```json
/// {
///     "total": 42,
///     "offset": 10,
///     "next": "https://api.example.com/items?offset=20",
///     "previous": "https://api.example.com/items?offset=0",
///     "items": [ ... ]
/// }
/// ```
///
/// `items` must be an array and `next` must be present, either `null` or a
/// link. Everything else is optional; unknown fields end up in
/// [`PageInfo::properties`].
#[derive(Debug, Clone, PartialEq)]
pub struct StandardPaging {
    items: Data,
    next: Option<String>,
    previous: Option<String>,
    total: i64,
    offset: i64,
    properties: BTreeMap<String, Data>,
    original: Data,
}

impl StandardPaging {
    fn from_json(value: &serde_json::Value) -> Result<Self, DeserializationError> {
        use serde_json::Value;

        let object = value.as_object().ok_or_else(not_a_page)?;
        let items = object
            .get("items")
            .filter(|items| items.is_array())
            .ok_or_else(not_a_page)?;
        let next = match object.get("next") {
            Some(Value::Null) => None,
            Some(Value::String(link)) if is_valid_link(link) => Some(link.clone()),
            _ => return Err(not_a_page()),
        };

        Ok(Self {
            items: Data::Json(items.clone()),
            next,
            previous: object
                .get("previous")
                .and_then(Value::as_str)
                .filter(|link| is_valid_link(link))
                .map(str::to_string),
            total: object.get("total").and_then(Value::as_i64).unwrap_or(i64::MAX),
            offset: object.get("offset").and_then(Value::as_i64).unwrap_or(-1),
            properties: object
                .iter()
                .filter(|(key, _)| !STANDARD_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), Data::Json(value.clone())))
                .collect(),
            original: Data::Json(value.clone()),
        })
    }

    fn from_cbor(value: &serde_cbor::Value) -> Result<Self, DeserializationError> {
        use serde_cbor::Value;

        let Value::Map(map) = value else {
            return Err(not_a_page());
        };
        let field = |name: &str| map.get(&Value::Text(name.to_string()));
        let integer = |name: &str| match field(name) {
            Some(Value::Integer(n)) => i64::try_from(*n).ok(),
            _ => None,
        };
        let link = |name: &str| match field(name) {
            Some(Value::Text(link)) if is_valid_link(link) => Some(link.clone()),
            _ => None,
        };

        let items = match field("items") {
            Some(items @ Value::Array(_)) => items.clone(),
            _ => return Err(not_a_page()),
        };
        let next = match field("next") {
            Some(Value::Null) => None,
            Some(Value::Text(_)) => Some(link("next").ok_or_else(not_a_page)?),
            _ => return Err(not_a_page()),
        };

        let properties = map
            .iter()
            .filter_map(|(key, value)| match key {
                Value::Text(key) if !STANDARD_KEYS.contains(&key.as_str()) => {
                    Some((key.clone(), Data::Cbor(value.clone())))
                }
                _ => None,
            })
            .collect();

        Ok(Self {
            items: Data::Cbor(items),
            next,
            previous: link("previous"),
            total: integer("total").unwrap_or(i64::MAX),
            offset: integer("offset").unwrap_or(-1),
            properties,
            original: Data::Cbor(value.clone()),
        })
    }
}

impl PageInfo for StandardPaging {
    fn items(&self) -> &Data {
        &self.items
    }

    fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    fn original_data(&self) -> &Data {
        &self.original
    }

    fn total(&self) -> i64 {
        self.total
    }

    fn offset(&self) -> i64 {
        self.offset
    }

    fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    fn properties(&self) -> BTreeMap<String, Data> {
        self.properties.clone()
    }
}

/// Factory for [`StandardPaging`] envelopes in JSON or CBOR.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPagingFactory;

impl PagingFactory for StandardPagingFactory {
    fn create_paging(
        &self,
        _serializer: &Serializer,
        data: &Data,
    ) -> Result<Box<dyn PageInfo>, DeserializationError> {
        let paging = match data {
            Data::Json(value) => StandardPaging::from_json(value)?,
            Data::Cbor(value) => StandardPaging::from_cbor(value)?,
            Data::Empty => return Err(not_a_page()),
        };
        Ok(Box::new(paging))
    }
}

fn not_a_page() -> DeserializationError {
    DeserializationError::new(NOT_A_PAGE)
}

/// Any non-empty reference that resolves against a base URL is a link:
/// absolute URLs, rooted paths, bare relative paths and query-only links.
pub(crate) fn is_valid_link(link: &str) -> bool {
    !link.is_empty()
        && Url::parse("http://localhost/")
            .and_then(|base| base.join(link))
            .is_ok()
}
