//! Object codec used to turn values into payloads and bodies back into values.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

/// Codec converts between in-memory trees and byte payloads.
///
/// Typed conversions are provided on `dyn Codec` and always go through the
/// tree form, so a codec can be swapped at runtime behind an `Arc`.
pub trait Codec: Debug + Send + Sync + 'static {
    /// The `Content-Type` announced for payloads produced by this codec.
    fn content_type(&self) -> &str;

    /// Encode a tree into bytes.
    fn encode_tree(&self, tree: &Value) -> Result<Vec<u8>>;

    /// Parse bytes into a tree.
    fn parse_tree(&self, bs: &[u8]) -> Result<Value>;
}

impl dyn Codec {
    /// Serialize `value` into a payload.
    pub fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let tree = serde_json::to_value(value)
            .map_err(|e| Error::codec("failed to serialize value").with_source(e))?;
        self.encode_tree(&tree)
    }

    /// Deserialize a payload into the shape `T`.
    pub fn deserialize<T: DeserializeOwned>(&self, bs: &[u8]) -> Result<T> {
        let tree = self.parse_tree(bs)?;
        serde_json::from_value(tree).map_err(|e| {
            Error::codec(format!(
                "body does not match {}",
                std::any::type_name::<T>()
            ))
            .with_source(e)
        })
    }
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
    skip_nulls: bool,
    pretty: bool,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self {
            skip_nulls: true,
            pretty: false,
        }
    }
}

impl JsonCodec {
    /// Create a codec that omits `null` members and writes compact JSON.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep or omit object members whose value is `null`.
    pub fn with_skip_nulls(mut self, skip_nulls: bool) -> Self {
        self.skip_nulls = skip_nulls;
        self
    }

    /// Write indented JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Codec for JsonCodec {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn encode_tree(&self, tree: &Value) -> Result<Vec<u8>> {
        let stripped;
        let tree = if self.skip_nulls {
            stripped = strip_nulls(tree.clone());
            &stripped
        } else {
            tree
        };

        let bs = if self.pretty {
            serde_json::to_vec_pretty(tree)
        } else {
            serde_json::to_vec(tree)
        };
        bs.map_err(|e| Error::codec("failed to encode json").with_source(e))
    }

    fn parse_tree(&self, bs: &[u8]) -> Result<Value> {
        serde_json::from_slice(bs).map_err(|e| Error::codec("malformed json body").with_source(e))
    }
}

fn strip_nulls(tree: Value) -> Value {
    match tree {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        v => v,
    }
}
