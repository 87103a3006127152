//! Immutable request model and its builder.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::io::Read;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use bytes::{Buf, Bytes};
use http::{Method, Uri};
use serde::Serialize;
use serde_json::Value;

use crate::utils::Redact;
use crate::{Codec, Error, JsonCodec, Result};

/// Multi-valued map used for headers and query parameters.
///
/// Keys are case-sensitive; values keep insertion order.
pub type MultiValueMap = BTreeMap<String, Vec<String>>;

const DEFAULT_PORT: u16 = 443;
const DEFAULT_PATH: &str = "/";

/// Payload is a readable source consumed at most once.
///
/// Clones share the same source: whichever request gets signed first drains
/// it, and a request has to be rebuilt with a new payload to be sent again.
#[derive(Clone)]
pub struct Payload {
    reader: Arc<Mutex<Option<Box<dyn Read + Send>>>>,
}

impl Payload {
    /// Wrap a readable source.
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Arc::new(Mutex::new(Some(Box::new(reader)))),
        }
    }

    /// Wrap bytes already in memory.
    pub fn from_bytes(bs: impl Into<Bytes>) -> Self {
        Self::new(bs.into().reader())
    }

    /// Take the source out, leaving the payload consumed.
    pub fn take(&self) -> Option<Box<dyn Read + Send>> {
        self.reader.lock().expect("lock poisoned").take()
    }

    /// Whether the source has already been taken.
    pub fn is_consumed(&self) -> bool {
        self.reader.lock().expect("lock poisoned").is_none()
    }
}

impl Debug for Payload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

/// ApiRequest describes one call to a signed endpoint.
///
/// It is immutable once built and can be shared across threads. Use
/// [`ApiRequest::to_builder`] to derive a modified copy.
#[derive(Clone)]
pub struct ApiRequest {
    codec: Arc<dyn Codec>,
    host: String,
    port: u16,
    method: Method,
    path: String,
    api_key: Option<String>,
    query_parameters: MultiValueMap,
    headers: MultiValueMap,
    payload: Option<Payload>,
}

impl ApiRequest {
    /// Start a builder for `host` on port 443, method `GET` and path `/`.
    pub fn builder(host: impl Into<String>) -> Result<ApiRequestBuilder> {
        let mut builder = ApiRequestBuilder::new();
        builder.set_host(host)?;
        Ok(builder)
    }

    /// Start a builder taking host, port, path and query parameters from `uri`.
    pub fn builder_from_uri(uri: &Uri) -> Result<ApiRequestBuilder> {
        let mut builder = ApiRequestBuilder::new();
        builder.set_uri(uri)?;
        Ok(builder)
    }

    /// Start a builder taking host, port, path and query parameters from `url`.
    pub fn builder_from_url(url: &str) -> Result<ApiRequestBuilder> {
        let mut builder = ApiRequestBuilder::new();
        builder.set_url(url)?;
        Ok(builder)
    }

    /// Start a builder seeded with every field of this request.
    pub fn to_builder(&self) -> ApiRequestBuilder {
        let mut builder = ApiRequestBuilder::new();
        builder.copy_from(self);
        builder
    }

    /// Codec used to serialize payloads and decode responses.
    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    /// Endpoint host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Endpoint port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path, already percent-encoded.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// API key sent as `x-api-key`.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Query parameters.
    pub fn query_parameters(&self) -> &MultiValueMap {
        &self.query_parameters
    }

    /// Headers supplied by the caller.
    pub fn headers(&self) -> &MultiValueMap {
        &self.headers
    }

    /// Payload source, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
}

impl Debug for ApiRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("codec", &self.codec)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("api_key", &Redact::from(&self.api_key))
            .field("query_parameters", &self.query_parameters)
            .field("headers", &self.headers)
            .field("payload", &self.payload)
            .finish()
    }
}

/// ApiRequestBuilder accumulates the state of an [`ApiRequest`].
///
/// Every map handed to a setter is copied; [`ApiRequestBuilder::build`]
/// snapshots the current state, so later mutations never reach requests
/// that were already built.
#[derive(Clone)]
pub struct ApiRequestBuilder {
    codec: Arc<dyn Codec>,
    host: String,
    port: u16,
    method: Method,
    path: String,
    api_key: Option<String>,
    query_parameters: MultiValueMap,
    headers: MultiValueMap,
    payload: Option<Payload>,
}

impl ApiRequestBuilder {
    fn new() -> Self {
        Self {
            codec: Arc::new(JsonCodec::default()),
            host: String::new(),
            port: DEFAULT_PORT,
            method: Method::GET,
            path: DEFAULT_PATH.to_string(),
            api_key: None,
            query_parameters: MultiValueMap::new(),
            headers: MultiValueMap::new(),
            payload: None,
        }
    }

    /// Use `codec` for payload serialization and response decoding.
    pub fn set_codec(&mut self, codec: Arc<dyn Codec>) -> &mut Self {
        self.codec = codec;
        self
    }

    /// Go back to the default [`JsonCodec`].
    pub fn reset_codec(&mut self) -> &mut Self {
        self.codec = Arc::new(JsonCodec::default());
        self
    }

    /// Set the endpoint host.
    pub fn set_host(&mut self, host: impl Into<String>) -> Result<&mut Self> {
        let host = host.into();
        check_host(&host)?;
        self.host = host;
        Ok(self)
    }

    /// Set the endpoint port.
    pub fn set_port(&mut self, port: u16) -> Result<&mut Self> {
        check_port(port)?;
        self.port = port;
        Ok(self)
    }

    /// Set the HTTP method: `GET`, `POST`, `PUT`, `PATCH`, `DELETE`, ...
    pub fn set_method(&mut self, method: &str) -> Result<&mut Self> {
        if method.is_empty() {
            return Err(Error::invalid_argument("method must not be empty"));
        }
        self.method = Method::from_bytes(method.as_bytes()).map_err(|e| {
            Error::invalid_argument(format!("invalid method {method:?}")).with_source(e)
        })?;
        Ok(self)
    }

    /// Set the request path.
    pub fn set_path(&mut self, path: impl Into<String>) -> Result<&mut Self> {
        let path = path.into();
        check_path(&path)?;
        self.path = path;
        Ok(self)
    }

    /// Set the API key sent as `x-api-key`.
    pub fn set_api_key(&mut self, api_key: impl Into<String>) -> &mut Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Stop sending an API key.
    pub fn clear_api_key(&mut self) -> &mut Self {
        self.api_key = None;
        self
    }

    /// Replace all query parameters with a copy of `parameters`.
    pub fn set_query_parameters<I, K, V, S>(&mut self, parameters: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.query_parameters = deep_copy(parameters);
        self
    }

    /// Append `value` to the query parameter `name`.
    pub fn add_query_parameter(&mut self, name: &str, value: &str) -> &mut Self {
        self.add_query_parameter_values(name, [value])
    }

    /// Append `values` to the query parameter `name`.
    pub fn add_query_parameter_values<V, S>(&mut self, name: &str, values: V) -> &mut Self
    where
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        append(&mut self.query_parameters, name, values);
        self
    }

    /// Replace the query parameter `name` with the single `value`.
    pub fn set_query_parameter(&mut self, name: &str, value: &str) -> &mut Self {
        self.set_query_parameter_values(name, [value])
    }

    /// Replace the query parameter `name` with `values`.
    pub fn set_query_parameter_values<V, S>(&mut self, name: &str, values: V) -> &mut Self
    where
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.query_parameters
            .insert(name.to_string(), copy_values(values));
        self
    }

    /// Remove the query parameter `name`.
    pub fn remove_query_parameter(&mut self, name: &str) -> &mut Self {
        self.query_parameters.remove(name);
        self
    }

    /// Replace all headers with a copy of `headers`.
    pub fn set_headers<I, K, V, S>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.headers = deep_copy(headers);
        self
    }

    /// Append `value` to the header `name`.
    pub fn add_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.add_header_values(name, [value])
    }

    /// Append `values` to the header `name`.
    pub fn add_header_values<V, S>(&mut self, name: &str, values: V) -> &mut Self
    where
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        append(&mut self.headers, name, values);
        self
    }

    /// Replace the header `name` with the single `value`.
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.set_header_values(name, [value])
    }

    /// Replace the header `name` with `values`.
    pub fn set_header_values<V, S>(&mut self, name: &str, values: V) -> &mut Self
    where
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.headers.insert(name.to_string(), copy_values(values));
        self
    }

    /// Remove the header `name`.
    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.remove(name);
        self
    }

    /// Use `reader` as the request payload.
    pub fn set_payload(&mut self, reader: impl Read + Send + 'static) -> &mut Self {
        self.payload = Some(Payload::new(reader));
        self
    }

    /// Send no payload.
    pub fn clear_payload(&mut self) -> &mut Self {
        self.payload = None;
        self
    }

    /// Serialize `payload` with the current codec and announce its content type.
    pub fn set_json_payload<T: Serialize + ?Sized>(&mut self, payload: &T) -> Result<&mut Self> {
        let bs = self.codec.serialize(payload)?;
        Ok(self.set_encoded_payload(bs))
    }

    /// Encode `tree` with the current codec and announce its content type.
    pub fn set_tree_payload(&mut self, tree: &Value) -> Result<&mut Self> {
        let bs = self.codec.encode_tree(tree)?;
        Ok(self.set_encoded_payload(bs))
    }

    fn set_encoded_payload(&mut self, bs: Vec<u8>) -> &mut Self {
        let content_type = self.codec.content_type().to_string();
        self.set_header("Content-Type", &content_type);
        self.payload = Some(Payload::from_bytes(bs));
        self
    }

    /// Overwrite host, port, path and query parameters from `uri`.
    ///
    /// Nothing is changed if any component is rejected.
    ///
    /// The port falls back to the scheme's default (80 for `http`, 443
    /// otherwise) and an absent query yields no parameters.
    pub fn set_uri(&mut self, uri: &Uri) -> Result<&mut Self> {
        let host = uri
            .host()
            .ok_or_else(|| Error::invalid_argument(format!("uri {uri} has no host")))?;
        let port = match uri.port_u16() {
            Some(port) => port,
            None if uri.scheme_str() == Some("http") => 80,
            None => DEFAULT_PORT,
        };
        let path = match uri.path() {
            "" => DEFAULT_PATH,
            path => path,
        };
        let query = uri
            .query()
            .map(|q| {
                form_urlencoded::parse(q.as_bytes()).fold(MultiValueMap::new(), |mut m, (k, v)| {
                    m.entry(k.into_owned()).or_default().push(v.into_owned());
                    m
                })
            })
            .unwrap_or_default();

        check_host(host)?;
        check_port(port)?;
        check_path(path)?;

        self.host = host.to_string();
        self.port = port;
        self.path = path.to_string();
        self.query_parameters = query;
        Ok(self)
    }

    /// Overwrite host, port, path and query parameters from `url`.
    pub fn set_url(&mut self, url: &str) -> Result<&mut Self> {
        let uri = Uri::from_str(url).map_err(|e| {
            Error::invalid_argument(format!("invalid url {url:?}")).with_source(e)
        })?;
        self.set_uri(&uri)
    }

    /// Copy every field of `request`, sharing its payload source.
    pub fn copy_from(&mut self, request: &ApiRequest) -> &mut Self {
        self.codec = request.codec.clone();
        self.host = request.host.clone();
        self.port = request.port;
        self.method = request.method.clone();
        self.path = request.path.clone();
        self.api_key = request.api_key.clone();
        self.query_parameters = request.query_parameters.clone();
        self.headers = request.headers.clone();
        self.payload = request.payload.clone();
        self
    }

    /// Snapshot the current state into an immutable request.
    pub fn build(&self) -> ApiRequest {
        ApiRequest {
            codec: self.codec.clone(),
            host: self.host.clone(),
            port: self.port,
            method: self.method.clone(),
            path: self.path.clone(),
            api_key: self.api_key.clone(),
            query_parameters: self.query_parameters.clone(),
            headers: self.headers.clone(),
            payload: self.payload.clone(),
        }
    }
}

impl Debug for ApiRequestBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequestBuilder")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("api_key", &Redact::from(&self.api_key))
            .field("query_parameters", &self.query_parameters)
            .field("headers", &self.headers)
            .field("payload", &self.payload)
            .finish()
    }
}

fn copy_values<V, S>(values: V) -> Vec<String>
where
    V: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values.into_iter().map(|v| v.as_ref().to_string()).collect()
}

fn append<V, S>(map: &mut MultiValueMap, name: &str, values: V)
where
    V: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    map.entry(name.to_string())
        .or_default()
        .extend(copy_values(values));
}

fn deep_copy<I, K, V, S>(map: I) -> MultiValueMap
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    map.into_iter()
        .map(|(k, vs)| (k.as_ref().to_string(), copy_values(vs)))
        .collect()
}

fn check_host(host: &str) -> Result<()> {
    if host.trim().is_empty() {
        return Err(Error::invalid_argument("host must not be empty"));
    }
    Ok(())
}

fn check_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(Error::invalid_argument("port must be between 1 and 65535"));
    }
    Ok(())
}

fn check_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::invalid_argument("path must not be empty"));
    }
    Ok(())
}
