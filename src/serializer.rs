//! Conversion between typed values and [`Data`].
//!
//! The per-type capability comes from serde: anything that derives
//! `Serialize` / `Deserialize` can be sent and received. The serializer only
//! decides which structured representation to produce.
//!
//! ```
//! use rest_client_http::{Data, DataMode, Serializer};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Post { id: u32, title: String }
//!
//! let serializer = Serializer::new(DataMode::Cbor);
//! let post = Post { id: 1, title: "hello".into() };
//! let data = serializer.serialize(&post).unwrap();
//! assert!(matches!(data, Data::Cbor(_)));
//! assert_eq!(serializer.deserialize::<Post>(&data).unwrap(), post);
//! ```

use crate::error::{DeserializationError, RestError, Result};
use crate::types::{Data, DataMode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Serde based serializer producing JSON or CBOR structured values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Serializer {
    mode: DataMode,
}

impl Serializer {
    /// Create a serializer for the given mode.
    pub fn new(mode: DataMode) -> Self {
        Self { mode }
    }

    /// The structured representation produced by [`Serializer::serialize`].
    pub fn mode(&self) -> DataMode {
        self.mode
    }

    /// Convert a typed value into a structured value.
    pub fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Data> {
        match self.mode {
            DataMode::Json => serde_json::to_value(value)
                .map(Data::Json)
                .map_err(RestError::from),
            DataMode::Cbor => serde_cbor::value::to_value(value)
                .map(Data::Cbor)
                .map_err(RestError::from),
        }
    }

    /// Convert a structured value into a typed value.
    ///
    /// Both JSON and CBOR input are accepted regardless of the mode.
    ///
    /// # Errors
    ///
    /// [`DeserializationError`] when the value does not match `T`, or when
    /// there is no data at all.
    pub fn deserialize<T: DeserializeOwned>(
        &self,
        data: &Data,
    ) -> std::result::Result<T, DeserializationError> {
        match data {
            Data::Empty => Err(DeserializationError::new(
                "Cannot deserialize a value from an empty reply",
            )),
            Data::Json(value) => {
                T::deserialize(value).map_err(|e| DeserializationError::new(e.to_string()))
            }
            Data::Cbor(value) => serde_cbor::value::from_value(value.clone())
                .map_err(|e| DeserializationError::new(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Post {
        id: u32,
        title: String,
    }

    #[test]
    fn test_json_roundtrip() {
        let serializer = Serializer::new(DataMode::Json);
        let data = serializer
            .serialize(&Post {
                id: 3,
                title: "three".into(),
            })
            .unwrap();
        assert_eq!(data, Data::Json(json!({"id": 3, "title": "three"})));
        let post: Post = serializer.deserialize(&data).unwrap();
        assert_eq!(post.id, 3);
    }

    #[test]
    fn test_deserialize_accepts_other_representation() {
        let json = Serializer::new(DataMode::Json);
        let cbor_data = Serializer::new(DataMode::Cbor)
            .serialize(&Post {
                id: 9,
                title: "nine".into(),
            })
            .unwrap();
        let post: Post = json.deserialize(&cbor_data).unwrap();
        assert_eq!(post.title, "nine");
    }

    #[test]
    fn test_deserialize_shape_mismatch() {
        let serializer = Serializer::default();
        let err = serializer
            .deserialize::<Post>(&Data::Json(json!({"id": "nope"})))
            .unwrap_err();
        assert!(err.message().contains("invalid type"));

        let err = serializer.deserialize::<Post>(&Data::Empty).unwrap_err();
        assert!(err.message().contains("empty"));
    }
}
