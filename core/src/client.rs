use std::sync::Arc;

use log::debug;

use crate::http::HttpExecute;
use crate::{
    ApiRequest, ApiResponse, Buffer, Error, Result, SignedRequestFactory, SigningCredential,
};

/// BlockingClient invokes signed endpoints on the calling thread.
///
/// ```no_run
/// # fn example<K: reqgate_core::SigningCredential>(
/// #     client: reqgate_core::BlockingClient<K>,
/// # ) -> reqgate_core::Result<()> {
/// use reqgate_core::ApiRequest;
///
/// let req = ApiRequest::builder_from_url("https://api.example.com/v1/items?id=123")?.build();
/// let resp = client.invoke(&req)?;
/// if resp.is_successful() {
///     let tree = resp.read_tree()?;
///     println!("{tree}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BlockingClient<K: SigningCredential> {
    factory: SignedRequestFactory<K>,
    transport: Arc<dyn HttpExecute>,
}

impl<K: SigningCredential> BlockingClient<K> {
    /// Create a client signing through `factory` and sending through `transport`.
    pub fn new(factory: SignedRequestFactory<K>, transport: impl HttpExecute) -> Self {
        Self {
            factory,
            transport: Arc::new(transport),
        }
    }

    /// Sign `req`, send it and buffer the whole response.
    ///
    /// Signing and transport failures are returned as errors. A response with
    /// a non-2xx status is returned normally.
    pub fn invoke(&self, req: &ApiRequest) -> Result<ApiResponse> {
        let signed = self.factory.create(req)?;
        debug!("invoking {} {}:{}{}", signed.method, signed.host, signed.port, signed.path);

        let resp = self.transport.prepare(&signed)?.call()?;

        let mut buf = Buffer::new();
        if let Some(body) = resp.body {
            buf.transfer_from(body).map_err(|e| {
                Error::transport("failed to read response body").with_source(e)
            })?;
        }
        debug!(
            "response received: status={}, body={} bytes",
            resp.head.status,
            buf.len()
        );

        Ok(ApiResponse::from_parts(
            &resp.head,
            buf.freeze(),
            req.codec().clone(),
        ))
    }
}
