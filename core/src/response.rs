use std::borrow::Cow;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use bytes::{Buf, Bytes};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::http::ResponseHead;
use crate::{Codec, Result};

/// ApiResponse is a fully buffered response.
///
/// A non-2xx status is not an error: check [`ApiResponse::is_successful`].
/// Decoding reads the buffered body every time, so it can be repeated with
/// different target shapes.
#[derive(Clone)]
pub struct ApiResponse {
    codec: Arc<dyn Codec>,
    status: StatusCode,
    status_text: Option<String>,
    successful: bool,
    body: Bytes,
}

impl ApiResponse {
    /// Assemble a response from its head and drained body.
    pub fn from_parts(head: &ResponseHead, body: Bytes, codec: Arc<dyn Codec>) -> Self {
        Self {
            codec,
            status: head.status,
            status_text: head.status_text.clone(),
            successful: head.is_successful(),
            body,
        }
    }

    /// Status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Status code as a number.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Reason phrase, if the transport reported one.
    pub fn status_text(&self) -> Option<&str> {
        self.status_text.as_deref()
    }

    /// Whether the status is in the 2xx range.
    pub fn is_successful(&self) -> bool {
        self.successful
    }

    /// Codec used by the decode methods.
    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    /// Decode with `codec` from now on.
    pub fn set_codec(&mut self, codec: Arc<dyn Codec>) -> &mut Self {
        self.codec = codec;
        self
    }

    /// Raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Fresh reader over the body.
    pub fn body_reader(&self) -> impl std::io::Read + Send + 'static {
        self.body.clone().reader()
    }

    /// Body as text, invalid UTF-8 replaced.
    pub fn body_string(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Parse the body into a tree.
    pub fn read_tree(&self) -> Result<Value> {
        self.codec.parse_tree(&self.body)
    }

    /// Decode the body into `T`.
    pub fn read_object<T: DeserializeOwned>(&self) -> Result<T> {
        self.codec.deserialize(&self.body)
    }
}

impl Debug for ApiResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("successful", &self.successful)
            .field("body", &self.body.len())
            .finish()
    }
}
