use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use reqgate_core::http::{
    AsyncExecuteRequest, AsyncHttpExecute, ExecutableHttpRequest, HttpExecute,
    HttpExecuteResponse, ResponseEvent, ResponseHead, Subscription,
};
use reqgate_core::{
    Context, Error, ProvideCredential, Result, SignRequest, SignedRequest, SignedRequestFactory,
    Signer, SigningCredential,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Debug)]
pub struct Token(pub String);

impl SigningCredential for Token {
    fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }
}

#[derive(Debug)]
pub struct TokenProvider(pub Option<&'static str>);

impl ProvideCredential for TokenProvider {
    type Credential = Token;

    fn provide_credential(&self, _: &Context) -> Result<Option<Token>> {
        Ok(self.0.map(|v| Token(v.to_string())))
    }
}

#[derive(Debug)]
pub struct TokenSigner;

impl SignRequest for TokenSigner {
    type Credential = Token;

    fn sign_request(&self, _: &Context, req: &mut SignedRequest, cred: &Token) -> Result<()> {
        req.headers
            .insert("authorization", format!("Token {}", cred.0).parse()?);
        Ok(())
    }
}

pub fn factory() -> SignedRequestFactory<Token> {
    SignedRequestFactory::new(Signer::new(
        Context::new(),
        TokenProvider(Some("t0k3n")),
        TokenSigner,
    ))
}

pub fn anonymous_factory() -> SignedRequestFactory<Token> {
    SignedRequestFactory::new(Signer::new(Context::new(), TokenProvider(None), TokenSigner))
}

/// What the mock server answers.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub status_text: &'static str,
    /// `None` echoes the request content back.
    pub body: Option<Bytes>,
}

impl Reply {
    pub fn echo() -> Self {
        Self {
            status: StatusCode::OK,
            status_text: "OK",
            body: None,
        }
    }

    pub fn with(status: StatusCode, status_text: &'static str, body: &'static [u8]) -> Self {
        Self {
            status,
            status_text,
            body: Some(Bytes::from_static(body)),
        }
    }

    fn content(&self, req: &SignedRequest) -> Bytes {
        match &self.body {
            Some(bs) => bs.clone(),
            None => req
                .content()
                .map(|c| c.bytes().clone())
                .unwrap_or_default(),
        }
    }

    fn headers(&self, req: &SignedRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if self.body.is_none() {
            if let Some(v) = req.headers.get(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, v.clone());
            }
        }
        headers
    }
}

/// Blocking transport answering from memory.
#[derive(Debug, Clone)]
pub struct MockTransport {
    reply: Reply,
    /// Reply without any body stream.
    bodiless: bool,
    fail: bool,
    pub sent: Arc<Mutex<Vec<SignedRequest>>>,
}

impl MockTransport {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            bodiless: false,
            fail: false,
            sent: Arc::default(),
        }
    }

    pub fn bodiless(mut self) -> Self {
        self.bodiless = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl HttpExecute for MockTransport {
    fn prepare(&self, req: &SignedRequest) -> Result<Box<dyn ExecutableHttpRequest>> {
        Ok(Box::new(MockCall {
            transport: self.clone(),
            req: req.clone(),
        }))
    }
}

struct MockCall {
    transport: MockTransport,
    req: SignedRequest,
}

impl ExecutableHttpRequest for MockCall {
    fn call(self: Box<Self>) -> Result<HttpExecuteResponse> {
        let MockCall { transport, req } = *self;
        if transport.fail {
            return Err(Error::transport("failed to send request").with_source(
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            ));
        }

        let reply = &transport.reply;
        let head = ResponseHead::new(reply.status, reply.headers(&req))
            .with_status_text(reply.status_text);
        let body = if transport.bodiless {
            None
        } else {
            let content = reply.content(&req);
            Some(Box::new(bytes::Buf::reader(content)) as Box<dyn Read + Send>)
        };
        transport.sent.lock().unwrap().push(req);
        Ok(HttpExecuteResponse { head, body })
    }
}

/// Credit granted by the consumer, recorded for assertions.
#[derive(Debug, Default)]
pub struct Credit {
    requests: Mutex<Vec<u64>>,
    available: AtomicU64,
    cancelled: AtomicBool,
}

impl Credit {
    pub fn requests(&self) -> Vec<u64> {
        self.requests.lock().unwrap().clone()
    }

    pub fn total(&self) -> u64 {
        self.requests().iter().sum()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn take(&self, max: u64) -> u64 {
        let n = self.available.load(Ordering::SeqCst).min(max);
        self.available.fetch_sub(n, Ordering::SeqCst);
        n
    }
}

impl Subscription for Credit {
    fn request(&self, n: u64) {
        self.requests.lock().unwrap().push(n);
        self.available.fetch_add(n, Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Non-blocking transport pushing a reply through the event interface.
#[derive(Debug, Clone)]
pub struct MockAsyncTransport {
    reply: Reply,
    chunk_size: u64,
    subscription_first: bool,
    declared_length: Option<Option<u64>>,
    fail_send: bool,
    fail_after: Option<u64>,
    drop_handler: bool,
    pub credit: Arc<Mutex<Vec<Arc<Credit>>>>,
}

impl MockAsyncTransport {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            chunk_size: 4,
            subscription_first: false,
            declared_length: None,
            fail_send: false,
            fail_after: None,
            drop_handler: false,
            credit: Arc::default(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn subscription_first(mut self, subscription_first: bool) -> Self {
        self.subscription_first = subscription_first;
        self
    }

    /// Override `Content-Length`; `None` omits the header.
    pub fn with_declared_length(mut self, length: Option<u64>) -> Self {
        self.declared_length = Some(length);
        self
    }

    pub fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    pub fn failing_after(mut self, bytes: u64) -> Self {
        self.fail_after = Some(bytes);
        self
    }

    pub fn dropping_handler(mut self) -> Self {
        self.drop_handler = true;
        self
    }

    pub fn last_credit(&self) -> Arc<Credit> {
        self.credit
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("transport must have been called")
    }
}

#[async_trait]
impl AsyncHttpExecute for MockAsyncTransport {
    async fn execute(&self, req: AsyncExecuteRequest) -> Result<()> {
        let AsyncExecuteRequest {
            request,
            body,
            mut response_handler,
        } = req;

        if self.fail_send {
            response_handler.on_event(ResponseEvent::Error(Error::transport("connection refused")));
            return Err(Error::transport("connection refused"));
        }
        if self.drop_handler {
            return Ok(());
        }

        assert_eq!(
            body.content_length(),
            request.content().map(|c| c.len() as u64)
        );
        let content = self.reply.content(&request);
        let mut headers = self.reply.headers(&request);
        match self.declared_length {
            None => {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(content.len()));
            }
            Some(Some(n)) => {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(n));
            }
            Some(None) => {}
        }
        let head =
            ResponseHead::new(self.reply.status, headers).with_status_text(self.reply.status_text);

        let credit = Arc::new(Credit::default());
        self.credit.lock().unwrap().push(credit.clone());
        if self.subscription_first {
            response_handler.on_event(ResponseEvent::Subscribed(credit.clone()));
            response_handler.on_event(ResponseEvent::Headers(head));
        } else {
            response_handler.on_event(ResponseEvent::Headers(head));
            response_handler.on_event(ResponseEvent::Subscribed(credit.clone()));
        }
        tokio::task::yield_now().await;

        let total = content.len() as u64;
        let mut sent = 0;
        while sent < total {
            if credit.is_cancelled() {
                return Ok(());
            }
            let mut max = self.chunk_size.min(total - sent);
            if let Some(limit) = self.fail_after {
                if sent >= limit {
                    response_handler
                        .on_event(ResponseEvent::Error(Error::transport("connection reset")));
                    return Ok(());
                }
                max = max.min(limit - sent);
            }

            let n = credit.take(max);
            if n == 0 {
                return Err(Error::unexpected("producer ran out of credit"));
            }
            response_handler.on_event(ResponseEvent::Chunk(
                content.slice(sent as usize..(sent + n) as usize),
            ));
            sent += n;
            tokio::task::yield_now().await;
        }
        response_handler.on_event(ResponseEvent::Complete);
        Ok(())
    }
}
