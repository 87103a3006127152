use http::header::{HeaderName, CONTENT_LENGTH};
use http::uri::Scheme;
use http::HeaderValue;
use log::debug;

use crate::{
    ApiRequest, Buffer, ContentStreamProvider, Error, Result, SignedRequest, Signer,
    SigningCredential,
};

const X_API_KEY: &str = "x-api-key";

/// SignedRequestFactory turns an [`ApiRequest`] into a signed, transport-ready request.
///
/// The payload is drained into memory so the signer can hash it and the
/// transport can read it again afterwards.
#[derive(Debug, Clone)]
pub struct SignedRequestFactory<K: SigningCredential> {
    signer: Signer<K>,
    scheme: Scheme,
}

impl<K: SigningCredential> SignedRequestFactory<K> {
    /// Create a factory producing https requests.
    pub fn new(signer: Signer<K>) -> Self {
        Self {
            signer,
            scheme: Scheme::HTTPS,
        }
    }

    /// Produce requests with `scheme` instead.
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Build the canonical request and sign it.
    ///
    /// Fails if the payload was already consumed by an earlier call, and
    /// otherwise surfaces signer errors unchanged.
    pub fn create(&self, req: &ApiRequest) -> Result<SignedRequest> {
        let mut signed = SignedRequest::new(
            req.method().clone(),
            req.host(),
            req.port(),
            req.path(),
        )
        .with_scheme(self.scheme.clone());

        for (name, values) in req.headers() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::request_invalid(format!("invalid header name {name:?}")).with_source(e)
            })?;
            for value in values {
                signed
                    .headers
                    .append(name.clone(), HeaderValue::from_str(value)?);
            }
        }
        signed.query = req.query_parameters().clone();

        if let Some(payload) = req.payload() {
            let reader = payload.take().ok_or_else(|| {
                Error::request_invalid("request payload has already been consumed")
            })?;
            let buf = Buffer::from_reader(reader).map_err(|e| {
                Error::request_invalid("failed to read request payload").with_source(e)
            })?;
            debug!("buffered request payload of {} bytes", buf.len());

            signed
                .headers
                .insert(CONTENT_LENGTH, HeaderValue::from(buf.len() as u64));
            signed = signed.with_content(ContentStreamProvider::new(buf.freeze()));
        }

        if let Some(api_key) = req.api_key() {
            let mut value = HeaderValue::from_str(api_key)?;
            value.set_sensitive(true);
            signed
                .headers
                .insert(HeaderName::from_static(X_API_KEY), value);
        }

        self.signer.sign(&mut signed)?;
        Ok(signed)
    }
}
