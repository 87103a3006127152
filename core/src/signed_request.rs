use std::collections::BTreeMap;
use std::fmt::Write;
use std::io::Read;
use std::str::FromStr;

use bytes::{Buf, Bytes};
use http::header::HeaderName;
use http::uri::Scheme;
use http::{HeaderMap, HeaderValue, Method, Uri};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::Result;

/// Everything but the unreserved characters is escaped in query components.
static QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// ContentStreamProvider hands out fresh readers over a fully buffered body.
///
/// Signers hash the content through it and transports re-read it after
/// signing, so every stream starts from the first byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentStreamProvider {
    content: Bytes,
}

impl ContentStreamProvider {
    /// Wrap buffered content.
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Open a new stream over the whole content.
    pub fn new_stream(&self) -> impl Read + Send + 'static {
        self.content.clone().reader()
    }

    /// The buffered content.
    pub fn bytes(&self) -> &Bytes {
        &self.content
    }

    /// Exact content length in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the content is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// SignedRequest is the canonical, transport-ready description of a call.
///
/// The factory fills it from an `ApiRequest`, the signer mutates it in place,
/// and transports read it back to put bytes on the wire.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    /// Protocol, `https` unless configured otherwise.
    pub scheme: Scheme,
    /// HTTP method.
    pub method: Method,
    /// Endpoint host.
    pub host: String,
    /// Endpoint port.
    pub port: u16,
    /// Already percent-encoded path.
    pub path: String,
    /// Decoded query parameters; encoding happens when the URI is rendered.
    pub query: BTreeMap<String, Vec<String>>,
    /// HTTP headers, including the computed ones.
    pub headers: HeaderMap,
    content: Option<ContentStreamProvider>,
}

impl SignedRequest {
    /// Create an https request without headers, query or content.
    pub fn new(method: Method, host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            scheme: Scheme::HTTPS,
            method,
            host: host.into(),
            port,
            path: path.into(),
            query: BTreeMap::new(),
            headers: HeaderMap::new(),
            content: None,
        }
    }

    /// Replace the protocol.
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Attach buffered content.
    pub fn with_content(mut self, content: ContentStreamProvider) -> Self {
        self.content = Some(content);
        self
    }

    /// The buffered content, if the request carries a payload.
    pub fn content(&self) -> Option<&ContentStreamProvider> {
        self.content.as_ref()
    }

    /// Host plus port, with the port omitted when it is the scheme's default.
    pub fn authority(&self) -> String {
        let default_port = match self.scheme.as_str() {
            "http" => 80,
            _ => 443,
        };
        if self.port == default_port {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Flatten the query into sorted `(name, value)` pairs, values kept in insertion order.
    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        self.query
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
            .collect()
    }

    /// Render the query string with every component percent-encoded.
    pub fn encoded_query(&self) -> String {
        let mut s = String::with_capacity(16);
        for (idx, (k, v)) in self.query_pairs().into_iter().enumerate() {
            if idx != 0 {
                s.push('&');
            }
            // Writing into a String never fails.
            let _ = write!(
                s,
                "{}={}",
                utf8_percent_encode(k, &QUERY_ENCODE_SET),
                utf8_percent_encode(v, &QUERY_ENCODE_SET)
            );
        }
        s
    }

    /// Full request URI.
    pub fn uri(&self) -> Result<Uri> {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        let query = self.encoded_query();
        let uri = if query.is_empty() {
            format!("{}://{}{}", self.scheme, self.authority(), path)
        } else {
            format!("{}://{}{}?{}", self.scheme, self.authority(), path, query)
        };
        Ok(Uri::from_str(&uri)?)
    }

    /// Build an `http::Request` carrying `body`.
    pub fn to_http_request<B>(&self, body: B) -> Result<http::Request<B>> {
        let mut req = http::Request::new(body);
        *req.method_mut() = self.method.clone();
        *req.uri_mut() = self.uri()?;
        *req.headers_mut() = self.headers.clone();
        Ok(req)
    }

    /// Get header value by name.
    ///
    /// Returns empty string if header not found.
    #[inline]
    pub fn header_get_or_default(&self, key: &HeaderName) -> Result<&str> {
        match self.headers.get(key) {
            Some(v) => Ok(v.to_str()?),
            None => Ok(""),
        }
    }

    /// Trim leading and trailing spaces of a header value.
    pub fn header_value_normalize(v: &mut HeaderValue) {
        let bs = v.as_bytes();

        let starting_index = bs.iter().position(|b| *b != b' ').unwrap_or(0);
        let ending_offset = bs.iter().rev().position(|b| *b != b' ').unwrap_or(0);
        let ending_index = bs.len() - ending_offset;

        let sensitive = v.is_sensitive();
        // This can't fail because we started with a valid HeaderValue and then only trimmed spaces
        *v = HeaderValue::from_bytes(&bs[starting_index..ending_index])
            .expect("invalid header value");
        v.set_sensitive(sensitive);
    }

    /// Get header names as sorted vector.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }
}
