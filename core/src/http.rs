//! Transport contracts the clients call into.
//!
//! Transports own connections, TLS and socket-level retries. The blocking
//! contract hands back a readable body; the non-blocking one pushes typed
//! [`ResponseEvent`]s into a [`ResponseHandler`] under credit-based flow control.

use std::fmt::{Debug, Formatter};
use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, StatusCode};

use crate::{Error, Result, SignedRequest};

/// ResponseHead is the status line plus headers of a response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// Status code.
    pub status: StatusCode,
    /// Reason phrase as sent by the server, if the transport exposes it.
    pub status_text: Option<String>,
    /// Response headers.
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Create a head without a reason phrase.
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            status,
            status_text: None,
            headers,
        }
    }

    /// Attach the reason phrase.
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = Some(status_text.into());
        self
    }

    /// Whether the status is in the 2xx range.
    pub fn is_successful(&self) -> bool {
        self.status.is_success()
    }

    /// Declared `Content-Length`.
    ///
    /// Returns `None` when the header is absent, not a number, or negative.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
    }
}

/// HttpExecuteResponse is what a blocking call returns.
pub struct HttpExecuteResponse {
    /// Status and headers.
    pub head: ResponseHead,
    /// Body stream, absent when the response carries none.
    pub body: Option<Box<dyn Read + Send>>,
}

impl Debug for HttpExecuteResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExecuteResponse")
            .field("head", &self.head)
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// HttpExecute is the blocking transport.
///
/// A request is first prepared, which is where transports validate it and
/// attach the content stream, then called on the current thread.
pub trait HttpExecute: Debug + Send + Sync + 'static {
    /// Prepare `req` for execution.
    fn prepare(&self, req: &SignedRequest) -> Result<Box<dyn ExecutableHttpRequest>>;
}

/// ExecutableHttpRequest is a prepared blocking exchange.
pub trait ExecutableHttpRequest: Send {
    /// Perform the exchange, returning once the head has been received.
    ///
    /// Connection and I/O failures are reported as errors; a non-2xx status
    /// is a normal response.
    fn call(self: Box<Self>) -> Result<HttpExecuteResponse>;
}

/// Subscription lets the consumer pace a response body stream.
pub trait Subscription: Debug + Send + Sync + 'static {
    /// Allow the producer to send `n` more bytes.
    fn request(&self, n: u64);

    /// Tell the producer no more bytes are wanted.
    fn cancel(&self);
}

/// ResponseEvent is everything a non-blocking transport reports about a response.
///
/// `Headers` precedes every `Chunk` of the same exchange but may come before
/// or after `Subscribed`. A stream ends with exactly one `Complete` or
/// `Error`, except that `Error` may also be reported before any header.
pub enum ResponseEvent {
    /// Status and headers arrived.
    Headers(ResponseHead),
    /// The body stream is ready to be paced.
    Subscribed(Arc<dyn Subscription>),
    /// A piece of the body, never larger than the outstanding credit.
    Chunk(Bytes),
    /// The body stream ended.
    Complete,
    /// The exchange failed.
    Error(Error),
}

impl Debug for ResponseEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseEvent::Headers(head) => f.debug_tuple("Headers").field(head).finish(),
            ResponseEvent::Subscribed(s) => f.debug_tuple("Subscribed").field(s).finish(),
            ResponseEvent::Chunk(bs) => f.debug_tuple("Chunk").field(&bs.len()).finish(),
            ResponseEvent::Complete => f.write_str("Complete"),
            ResponseEvent::Error(err) => f.debug_tuple("Error").field(err).finish(),
        }
    }
}

/// ResponseHandler receives the events of one exchange, in order.
pub trait ResponseHandler: Send + 'static {
    /// Handle one event.
    fn on_event(&mut self, event: ResponseEvent);
}

/// RequestBodyPublisher emits the buffered request content exactly once.
#[derive(Debug, Clone, Default)]
pub struct RequestBodyPublisher {
    content: Option<Bytes>,
}

impl RequestBodyPublisher {
    /// Publisher for the content attached to `req`.
    pub fn from_request(req: &SignedRequest) -> Self {
        Self {
            content: req.content().map(|c| c.bytes().clone()),
        }
    }

    /// Exact number of bytes that will be published.
    pub fn content_length(&self) -> Option<u64> {
        self.content.as_ref().map(|bs| bs.len() as u64)
    }

    /// Take the content out for sending.
    pub fn into_bytes(self) -> Option<Bytes> {
        self.content
    }
}

/// AsyncExecuteRequest bundles one non-blocking exchange.
pub struct AsyncExecuteRequest {
    /// Signed request to send.
    pub request: SignedRequest,
    /// Request body to publish.
    pub body: RequestBodyPublisher,
    /// Receiver of the response events.
    pub response_handler: Box<dyn ResponseHandler>,
}

impl Debug for AsyncExecuteRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncExecuteRequest")
            .field("request", &self.request)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// AsyncHttpExecute is the non-blocking transport.
#[async_trait]
pub trait AsyncHttpExecute: Debug + Send + Sync + 'static {
    /// Run the exchange, pushing response events into the handler.
    ///
    /// The returned future completes once the transport is done with the
    /// exchange. Failing to send the request is reported both here and, when
    /// possible, as an [`ResponseEvent::Error`]; failures while streaming the
    /// body are reported only as events.
    async fn execute(&self, req: AsyncExecuteRequest) -> Result<()>;
}
