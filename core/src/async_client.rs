use std::sync::Arc;

use log::debug;

use crate::http::{AsyncExecuteRequest, AsyncHttpExecute, RequestBodyPublisher};
use crate::{
    ApiRequest, ApiResponse, Result, SignedRequestFactory, SigningCredential,
    StreamingResponseConsumer,
};

/// AsyncClient invokes signed endpoints without blocking.
///
/// The response body is pushed by the transport into a
/// [`StreamingResponseConsumer`] under credit-based flow control and
/// assembled in memory before the call resolves.
#[derive(Debug, Clone)]
pub struct AsyncClient<K: SigningCredential> {
    factory: SignedRequestFactory<K>,
    transport: Arc<dyn AsyncHttpExecute>,
}

impl<K: SigningCredential> AsyncClient<K> {
    /// Create a client signing through `factory` and sending through `transport`.
    pub fn new(factory: SignedRequestFactory<K>, transport: impl AsyncHttpExecute) -> Self {
        Self {
            factory,
            transport: Arc::new(transport),
        }
    }

    /// Sign `req`, send it and resolve once the whole response is buffered.
    ///
    /// The call completes only after both the transport and the response
    /// stream are done. A transport failure wins over the stream outcome.
    pub async fn invoke(&self, req: &ApiRequest) -> Result<ApiResponse> {
        let signed = self.factory.create(req)?;
        debug!("invoking {} {}:{}{}", signed.method, signed.host, signed.port, signed.path);

        let (consumer, response) =
            StreamingResponseConsumer::new(req.codec().clone(), &signed.method);
        let body = RequestBodyPublisher::from_request(&signed);
        let execute = self.transport.execute(AsyncExecuteRequest {
            request: signed,
            body,
            response_handler: Box::new(consumer),
        });

        let (executed, response) = tokio::join!(execute, response);
        executed?;
        response
    }
}
