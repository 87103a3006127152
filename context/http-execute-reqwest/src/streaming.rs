use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use reqgate_core::http::{
    AsyncExecuteRequest, AsyncHttpExecute, ResponseEvent, ResponseHandler, Subscription,
};
use reqgate_core::{Error, Result, SignedRequest};
use reqwest::{Client, Response};
use tokio::sync::Notify;

use crate::blocking::response_head;

/// ReqwestAsyncHttpExecute sends requests with a `reqwest::Client` and pushes
/// the response body as credit allows.
///
/// A chunk read from the connection is split so that no
/// [`ResponseEvent::Chunk`] exceeds the credit granted so far. Reading stops
/// once the subscription is cancelled.
#[derive(Debug, Clone, Default)]
pub struct ReqwestAsyncHttpExecute {
    client: Client,
}

impl ReqwestAsyncHttpExecute {
    /// Create a new ReqwestAsyncHttpExecute with a `reqwest::Client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, req: &SignedRequest, body: Option<bytes::Bytes>) -> Result<Response> {
        let uri = req.uri()?;
        let mut builder = self
            .client
            .request(req.method.clone(), uri.to_string())
            .headers(req.headers.clone());
        if let Some(bs) = body {
            builder = builder.body(bs);
        }

        builder.send().await.map_err(|e| {
            Error::transport(format!("failed to send {} {uri}", req.method)).with_source(e)
        })
    }
}

#[async_trait]
impl AsyncHttpExecute for ReqwestAsyncHttpExecute {
    async fn execute(&self, req: AsyncExecuteRequest) -> Result<()> {
        let AsyncExecuteRequest {
            request,
            body,
            mut response_handler,
        } = req;

        let resp = match self.send(&request, body.into_bytes()).await {
            Ok(resp) => resp,
            Err(err) => {
                response_handler.on_event(ResponseEvent::Error(Error::transport(
                    err.message().to_string(),
                )));
                return Err(err);
            }
        };
        debug!(
            "{} {} responded with {}",
            request.method,
            request.path,
            resp.status()
        );

        response_handler.on_event(ResponseEvent::Headers(response_head(
            resp.status(),
            resp.headers().clone(),
        )));
        let demand = Arc::new(Demand::default());
        response_handler.on_event(ResponseEvent::Subscribed(demand.clone()));

        stream_body(resp, demand, response_handler).await;
        Ok(())
    }
}

async fn stream_body(
    mut resp: Response,
    demand: Arc<Demand>,
    mut handler: Box<dyn ResponseHandler>,
) {
    loop {
        let mut chunk = match resp.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                handler.on_event(ResponseEvent::Complete);
                return;
            }
            Err(e) => {
                warn!("response body stream failed: {e}");
                handler.on_event(ResponseEvent::Error(
                    Error::transport("failed to read response body").with_source(e),
                ));
                return;
            }
        };

        while !chunk.is_empty() {
            let Some(n) = demand.acquire(chunk.len() as u64).await else {
                debug!("response body subscription cancelled");
                return;
            };
            handler.on_event(ResponseEvent::Chunk(chunk.split_to(n as usize)));
        }
    }
}

/// Demand tracks the credit granted by the consumer.
#[derive(Debug, Default)]
struct Demand {
    credit: AtomicU64,
    cancelled: AtomicBool,
    notify: Notify,
}

impl Demand {
    /// Take up to `max` bytes of credit, waiting until some is granted.
    ///
    /// Returns `None` once the subscription is cancelled.
    async fn acquire(&self, max: u64) -> Option<u64> {
        loop {
            if self.cancelled.load(Ordering::Acquire) {
                return None;
            }
            let available = self.credit.load(Ordering::Acquire);
            if available > 0 {
                let n = available.min(max);
                self.credit.fetch_sub(n, Ordering::AcqRel);
                return Some(n);
            }
            self.notify.notified().await;
        }
    }
}

impl Subscription for Demand {
    fn request(&self, n: u64) {
        self.credit.fetch_add(n, Ordering::AcqRel);
        self.notify.notify_one();
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}
