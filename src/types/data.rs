use serde::{Deserialize, Serialize};

/// Structured value carried from a response body to the typed layer.
///
/// Every branch of reply processing switches on this tag, so JSON and CBOR
/// bodies travel through the same code path.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Data {
    /// No body, or a body that was deliberately not parsed.
    #[default]
    Empty,
    /// A JSON value tree.
    Json(serde_json::Value),
    /// A CBOR value tree.
    Cbor(serde_cbor::Value),
}

impl Data {
    /// Whether this is [`Data::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Data::Empty)
    }

    /// The JSON value, if this is JSON data.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Data::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The CBOR value, if this is CBOR data.
    pub fn as_cbor(&self) -> Option<&serde_cbor::Value> {
        match self {
            Data::Cbor(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the value is a JSON object or CBOR map.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Data::Json(serde_json::Value::Object(_)) | Data::Cbor(serde_cbor::Value::Map(_))
        )
    }

    /// Whether the value is an array.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Data::Json(serde_json::Value::Array(_)) | Data::Cbor(serde_cbor::Value::Array(_))
        )
    }

    /// Number of elements if the value is an array.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Data::Json(serde_json::Value::Array(values)) => Some(values.len()),
            Data::Cbor(serde_cbor::Value::Array(values)) => Some(values.len()),
            _ => None,
        }
    }

    /// Short name of the representation, used in log messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Data::Empty => "empty",
            Data::Json(_) => "json",
            Data::Cbor(_) => "cbor",
        }
    }
}

impl From<serde_json::Value> for Data {
    fn from(value: serde_json::Value) -> Self {
        Data::Json(value)
    }
}

impl From<serde_cbor::Value> for Data {
    fn from(value: serde_cbor::Value) -> Self {
        Data::Cbor(value)
    }
}

/// Encoding for request bodies and the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    /// `application/json`
    #[default]
    Json,
    /// `application/cbor`
    Cbor,
}

impl DataMode {
    /// Media type used for bodies in this mode.
    pub fn content_type(self) -> &'static str {
        match self {
            DataMode::Json => crate::protocol::media_types::JSON,
            DataMode::Cbor => crate::protocol::media_types::CBOR,
        }
    }
}
