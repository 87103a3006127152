//! Streaming response consumer and its result handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::Method;
use log::{debug, warn};
use tokio::sync::oneshot;

use crate::http::{ResponseEvent, ResponseHandler, ResponseHead, Subscription};
use crate::{ApiResponse, Buffer, Codec, Error, Result};

/// Credit granted at a time when the body length is unknown.
const UNKNOWN_LENGTH_WINDOW: u64 = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingHeaders,
    AwaitingBody,
    Completed,
    Failed,
}

/// StreamingResponseConsumer assembles a pushed response body into an [`ApiResponse`].
///
/// Credit is granted only once both the head and the subscription are
/// known, whichever arrives first. With a declared length the outstanding
/// credit never exceeds the bytes still expected; without one, credit is
/// granted in fixed windows until the stream completes.
///
/// The paired [`ResponseFuture`] resolves exactly once: with the response on
/// completion, or with the first error. Events arriving after that are
/// ignored.
pub struct StreamingResponseConsumer {
    state: State,
    codec: Arc<dyn Codec>,
    ignore_length: bool,
    head: Option<ResponseHead>,
    subscription: Option<Arc<dyn Subscription>>,
    /// Bytes still expected, `None` if unknown.
    remaining: Option<u64>,
    /// Credit granted but not yet used by the producer.
    outstanding: u64,
    buffer: Buffer,
    sender: Option<oneshot::Sender<Result<ApiResponse>>>,
}

impl StreamingResponseConsumer {
    /// Create a consumer for a response to `method`, decoding with `codec`.
    ///
    /// Responses to `HEAD` never carry a body whatever `Content-Length` says.
    pub fn new(codec: Arc<dyn Codec>, method: &Method) -> (Self, ResponseFuture) {
        let (tx, rx) = oneshot::channel();
        let consumer = Self {
            state: State::AwaitingHeaders,
            codec,
            ignore_length: *method == Method::HEAD,
            head: None,
            subscription: None,
            remaining: None,
            outstanding: 0,
            buffer: Buffer::new(),
            sender: Some(tx),
        };
        (consumer, ResponseFuture { rx })
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, State::Completed | State::Failed)
    }

    fn on_headers(&mut self, head: ResponseHead) {
        if self.state != State::AwaitingHeaders {
            self.fail(Error::transport("response headers received twice"));
            return;
        }

        self.remaining = if self.ignore_length {
            Some(0)
        } else {
            head.content_length()
        };
        debug!(
            "response headers received: status={}, content_length={:?}",
            head.status, self.remaining
        );
        self.head = Some(head);
        self.state = State::AwaitingBody;
        self.grant_credit();
    }

    fn on_subscribed(&mut self, subscription: Arc<dyn Subscription>) {
        if self.subscription.is_some() {
            warn!("response body subscribed twice, cancelling the new subscription");
            subscription.cancel();
            return;
        }
        self.subscription = Some(subscription);
        self.grant_credit();
    }

    fn on_chunk(&mut self, chunk: bytes::Bytes) {
        if self.state != State::AwaitingBody {
            self.fail(Error::transport("response body received before headers"));
            return;
        }

        let len = chunk.len() as u64;
        if let Some(remaining) = self.remaining {
            if len > remaining {
                self.fail(Error::transport(format!(
                    "response body exceeds declared content length by {} bytes",
                    len - remaining
                )));
                return;
            }
            self.remaining = Some(remaining - len);
        }
        self.outstanding = self.outstanding.saturating_sub(len);
        self.buffer.write(&chunk);
        self.grant_credit();
    }

    fn on_complete(&mut self) {
        let Some(head) = self.head.take().filter(|_| self.state == State::AwaitingBody) else {
            self.fail(Error::transport("response stream completed before headers"));
            return;
        };
        if let Some(remaining) = self.remaining.filter(|v| *v > 0) {
            self.fail(Error::transport(format!(
                "response body ended {remaining} bytes short of declared content length"
            )));
            return;
        }

        self.state = State::Completed;
        self.subscription = None;
        let body = std::mem::take(&mut self.buffer).freeze();
        debug!(
            "response completed: status={}, body={} bytes",
            head.status,
            body.len()
        );
        let resp = ApiResponse::from_parts(&head, body, self.codec.clone());
        self.resolve(Ok(resp));
    }

    fn fail(&mut self, err: Error) {
        debug!("response failed: {err}");
        self.state = State::Failed;
        self.buffer = Buffer::new();
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        self.resolve(Err(err));
    }

    fn resolve(&mut self, result: Result<ApiResponse>) {
        if let Some(tx) = self.sender.take() {
            if tx.send(result).is_err() {
                debug!("response future dropped before the response was resolved");
            }
        }
    }

    /// Top the credit up to what is still needed.
    fn grant_credit(&mut self) {
        if self.state != State::AwaitingBody {
            return;
        }
        let Some(subscription) = &self.subscription else {
            return;
        };

        let n = match self.remaining {
            Some(remaining) => remaining.saturating_sub(self.outstanding),
            None if self.outstanding == 0 => UNKNOWN_LENGTH_WINDOW,
            None => 0,
        };
        if n > 0 {
            self.outstanding += n;
            subscription.request(n);
        }
    }
}

impl ResponseHandler for StreamingResponseConsumer {
    fn on_event(&mut self, event: ResponseEvent) {
        if self.is_terminal() {
            match event {
                ResponseEvent::Subscribed(subscription) => subscription.cancel(),
                event => warn!("ignoring {event:?} after the response was resolved"),
            }
            return;
        }

        match event {
            ResponseEvent::Headers(head) => self.on_headers(head),
            ResponseEvent::Subscribed(subscription) => self.on_subscribed(subscription),
            ResponseEvent::Chunk(chunk) => self.on_chunk(chunk),
            ResponseEvent::Complete => self.on_complete(),
            ResponseEvent::Error(err) => self.fail(err),
        }
    }
}

/// ResponseFuture resolves to the outcome of one async invocation.
///
/// If the transport drops the consumer without finishing the stream, the
/// future resolves to an [`ErrorKind::Unexpected`](crate::ErrorKind::Unexpected) error.
#[derive(Debug)]
pub struct ResponseFuture {
    rx: oneshot::Receiver<Result<ApiResponse>>,
}

impl ResponseFuture {
    /// Block the current thread until the response is resolved.
    ///
    /// # Panics
    ///
    /// Panics when called inside an asynchronous execution context.
    pub fn wait(self) -> Result<ApiResponse> {
        self.rx.blocking_recv().unwrap_or_else(|_| Err(abandoned()))
    }
}

impl Future for ResponseFuture {
    type Output = Result<ApiResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or_else(|_| Err(abandoned())))
    }
}

fn abandoned() -> Error {
    Error::unexpected("response handler was dropped before the response was resolved")
}
