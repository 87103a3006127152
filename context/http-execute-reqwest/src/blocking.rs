use http::StatusCode;
use log::debug;
use reqgate_core::http::{ExecutableHttpRequest, HttpExecute, HttpExecuteResponse, ResponseHead};
use reqgate_core::{Error, Result, SignedRequest};
use reqwest::blocking::{Client, Request};

/// ReqwestHttpExecute sends requests with a `reqwest::blocking::Client`.
///
/// # Note
///
/// `reqwest::blocking` spins up its own runtime, so the client must not be
/// created, used or dropped from within an async context.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpExecute {
    client: Client,
}

impl ReqwestHttpExecute {
    /// Create a new ReqwestHttpExecute with a `reqwest::blocking::Client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl HttpExecute for ReqwestHttpExecute {
    fn prepare(&self, req: &SignedRequest) -> Result<Box<dyn ExecutableHttpRequest>> {
        let uri = req.uri()?;
        let mut builder = self
            .client
            .request(req.method.clone(), uri.to_string())
            .headers(req.headers.clone());
        if let Some(content) = req.content() {
            builder = builder.body(content.bytes().clone());
        }

        let request = builder
            .build()
            .map_err(|e| Error::request_invalid("failed to build http request").with_source(e))?;
        Ok(Box::new(PreparedRequest {
            client: self.client.clone(),
            request,
        }))
    }
}

struct PreparedRequest {
    client: Client,
    request: Request,
}

impl ExecutableHttpRequest for PreparedRequest {
    fn call(self: Box<Self>) -> Result<HttpExecuteResponse> {
        let PreparedRequest { client, request } = *self;
        let method = request.method().clone();
        let url = request.url().to_string();

        let resp = client.execute(request).map_err(|e| {
            Error::transport(format!("failed to send {method} {url}")).with_source(e)
        })?;
        debug!("{method} {url} responded with {}", resp.status());

        let head = response_head(resp.status(), resp.headers().clone());
        Ok(HttpExecuteResponse {
            head,
            body: Some(Box::new(resp)),
        })
    }
}

pub(crate) fn response_head(status: StatusCode, headers: http::HeaderMap) -> ResponseHead {
    let head = ResponseHead::new(status, headers);
    match status.canonical_reason() {
        Some(reason) => head.with_status_text(reason),
        None => head,
    }
}
